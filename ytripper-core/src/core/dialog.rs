use std::path::PathBuf;

use async_trait::async_trait;

/// Folder selection offered by the host. `None` when the user cancels.
#[async_trait]
pub trait FolderPicker: Send + Sync {
    async fn pick_folder(&self) -> Option<PathBuf>;
}
