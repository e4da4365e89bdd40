use std::env;
use std::path::PathBuf;

use docqa_core::chunker::chunk;
use docqa_core::config::{expand_path, Config};
use docqa_core::document::{extract_text, open_document};
use docqa_text::IndexSnapshot;

const SNIPPET_WORDS: usize = 24;

struct Args {
    document: PathBuf,
    query: String,
    limit: usize,
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {} <document> <query...> [--limit N]", prog);
    eprintln!("Example: {} manual.txt water filter --limit 3", prog);
    std::process::exit(1)
}

fn parse_args() -> Args {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    let mut limit = 5;
    if let Some(pos) = args.iter().position(|a| a == "--limit") {
        limit = args.get(pos + 1).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(&prog));
        args.drain(pos..=pos + 1);
    }
    if args.len() < 2 {
        usage(&prog);
    }
    let document = expand_path(args.remove(0));
    Args { document, query: args.join(" "), limit }
}

fn main() -> anyhow::Result<()> {
    docqa_cli::init_logging();
    let args = parse_args();
    let settings = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?.settings()?;

    let text = extract_text(open_document(&args.document).as_ref())?;
    let snapshot = IndexSnapshot::build(chunk(&text, settings.chunking.chunk_size()?));

    println!("🔍 docqa-rank\n============");
    println!("Document: {} ({} chunks, {} terms)", args.document.display(), snapshot.len(), snapshot.index().idf_table().len());
    println!("Query: {}", args.query);

    for (i, hit) in snapshot.rank(&args.query).iter().take(args.limit).enumerate() {
        let Some(chunk) = snapshot.chunk(hit.id) else { continue };
        let snippet: Vec<&str> = chunk.words().take(SNIPPET_WORDS).collect();
        println!("\n  {}. score={:.4}  chunk={}", i + 1, hit.score, hit.id);
        println!("     📝 {}{}", snippet.join(" "), if chunk.word_count() > SNIPPET_WORDS { " ..." } else { "" });
    }
    Ok(())
}
