use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use ytripper_core::core::dialog::FolderPicker;

/// Terminal stand-in for a folder dialog: reads a directory from stdin.
pub struct PromptFolderPicker;

#[async_trait]
impl FolderPicker for PromptFolderPicker {
    async fn pick_folder(&self) -> Option<PathBuf> {
        eprint!("Save to folder (empty to cancel): ");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader.read_line(&mut line).await.ok()?;
        parse_choice(&line)
    }
}

fn parse_choice(line: &str) -> Option<PathBuf> {
    let choice = line.trim();
    if choice.is_empty() {
        return None;
    }

    let path = PathBuf::from(choice);
    if path.is_dir() {
        Some(path)
    } else {
        tracing::warn!("{} is not a folder", path.display());
        None
    }
}
