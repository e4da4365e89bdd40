use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use docqa_cli::{init_logging, AnswerPrinter};
use docqa_core::config::{expand_path, Config};
use docqa_core::document::open_document;
use docqa_llm::load_default_generator;
use docqa_query::{channel, AskOutcome, Session, Update};

fn parse_args() -> (PathBuf, String) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.len() < 2 {
        eprintln!("Usage: {} <document> <question...>", prog);
        eprintln!("Example: {} manual.txt 'How often should the filter be replaced?'", prog);
        std::process::exit(1);
    }
    let document = expand_path(args.remove(0));
    (document, args.join(" "))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let (document, question) = parse_args();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let (notifier, mut updates) = channel();
    let session = Arc::new(Session::new(&settings, notifier)?);

    let llm = settings.llm.clone();
    let loading = session.spawn_load_generator(async move { load_default_generator(&llm).await });
    let indexing = session.spawn_index(open_document(&document));

    let printer = tokio::spawn(async move {
        let pb = spinner();
        let (mut indexing, mut loading) = (false, false);
        let (mut indexed, mut loaded) = (false, false);
        let mut printer = AnswerPrinter::new();
        let mut stdout = std::io::stdout();
        while let Some(update) = updates.recv().await {
            match update {
                Update::Indexing(on) => {
                    indexing = on;
                    indexed |= !on;
                }
                Update::ModelLoading(on) => {
                    loading = on;
                    loaded |= !on;
                }
                Update::Answer(text) => {
                    let _ = write!(stdout, "{}", printer.next(&text));
                    let _ = stdout.flush();
                }
                Update::Log(line) => pb.println(format!("ℹ️  {}", line)),
                Update::Query(_) => {}
            }
            match (indexing, loading) {
                (true, true) => pb.set_message("indexing document, loading model..."),
                (true, false) => pb.set_message("indexing document..."),
                (false, true) => pb.set_message("loading model..."),
                (false, false) if indexed && loaded => pb.finish_and_clear(),
                (false, false) => {}
            }
        }
        pb.finish_and_clear();
    });

    let chunks = indexing.await??;
    if let Err(e) = loading.await? {
        eprintln!("⚠️  {}", e);
    }
    tracing::info!(chunks, "ready to answer");

    let outcome = session.ask(&question).await;
    drop(session);
    printer.await?;
    match outcome {
        AskOutcome::Completed(_) => println!(),
        AskOutcome::Superseded => eprintln!("question was cancelled"),
    }
    Ok(())
}
