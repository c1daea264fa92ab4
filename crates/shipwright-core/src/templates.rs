//! Content of the files pushed to the site repository.

use crate::types::FileEntry;

pub const INDEX_HTML: &str = "index.html";
pub const README_MD: &str = "README.md";
pub const LICENSE: &str = "LICENSE";

const LICENSE_TEXT: &str = "MIT License\n\nCopyright (c) 2025";

pub fn default_create_brief(task: &str) -> String {
    format!("Demo app for {task}")
}

pub fn default_update_brief(task: &str) -> String {
    format!("Updated brief for {task}")
}

/// The three files written on the first round.
pub fn initial_files(task: &str, brief: &str) -> Vec<FileEntry> {
    vec![
        FileEntry::new(
            INDEX_HTML,
            format!("<html><body><h1>{brief}</h1></body></html>"),
        ),
        FileEntry::new(README_MD, format!("# {task}\n\n{brief}\n")),
        FileEntry::new(LICENSE, LICENSE_TEXT.to_string()),
    ]
}

/// Files rewritten on later rounds. `LICENSE` is left alone.
pub fn round_files(task: &str, brief: &str, round: u32) -> Vec<FileEntry> {
    vec![
        FileEntry::new(
            INDEX_HTML,
            format!("<html><body><h1>{brief}</h1><p>Updated for round {round}</p></body></html>"),
        ),
        FileEntry::new(README_MD, format!("# {task}\n\nUpdated Brief: {brief}\n")),
    ]
}
