use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;

/// Separator placed between consecutive pages of extracted text.
pub const PAGE_SEPARATOR: &str = "\n\n";

const FORM_FEED: char = '\x0c';

/// Extract the full text of a document, pages joined by a blank line.
///
/// A document without any non-whitespace text is an extraction failure.
pub fn extract_text(source: &dyn DocumentSource) -> Result<String> {
    let pages = source.pages()?;
    let text = pages.join(PAGE_SEPARATOR);
    if text.trim().is_empty() {
        return Err(Error::Extraction(format!("{} contains no text", source.describe())));
    }
    tracing::debug!(source = %source.describe(), pages = pages.len(), "extracted document text");
    Ok(text)
}

/// Pick a source for `path`: a directory of page files or a single text file.
pub fn open_document(path: &Path) -> Box<dyn DocumentSource> {
    if path.is_dir() {
        Box::new(PageDirectory::new(path))
    } else {
        Box::new(TextFile::new(path))
    }
}

/// Plain text file, as produced by a PDF-to-text tool. Form feeds delimit pages.
pub struct TextFile {
    path: PathBuf,
}

impl TextFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for TextFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn pages(&self) -> Result<Vec<String>> {
        let content = read_file_content(&self.path)?;
        Ok(content
            .split(FORM_FEED)
            .filter(|page| !page.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Directory holding one `.txt` file per page; pages are ordered by path.
pub struct PageDirectory {
    root: PathBuf,
}

impl PageDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn list_txt_files(&self) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(|e| e.path().to_path_buf())
            .collect();
        txt_files.sort();
        txt_files
    }
}

impl DocumentSource for PageDirectory {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn pages(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::NotFound(format!("{} is not a directory", self.root.display())));
        }
        let files = self.list_txt_files();
        if files.is_empty() {
            return Err(Error::Extraction(format!("no .txt pages under {}", self.root.display())));
        }
        files.iter().map(|p| read_file_content(p)).collect()
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))?;
    Ok(match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
