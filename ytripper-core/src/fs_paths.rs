use std::path::{Path, PathBuf};

pub trait AppPaths: Send + Sync {
    fn downloads_dir(&self) -> PathBuf;
    fn config_dir(&self) -> PathBuf;
    /// Root whose `bin/` holds the bundled ffmpeg and downloader.
    fn install_root(&self) -> PathBuf;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallLayout {
    Packaged,
    Development,
}

impl InstallLayout {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            InstallLayout::Development
        } else {
            InstallLayout::Packaged
        }
    }
}

pub struct DesktopPaths {
    layout: InstallLayout,
    dev_root: PathBuf,
}

impl DesktopPaths {
    /// `dev_root` is the source checkout used when running unpackaged builds.
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            layout: InstallLayout::current(),
            dev_root: dev_root.into(),
        }
    }

    pub fn with_layout(mut self, layout: InstallLayout) -> Self {
        self.layout = layout;
        self
    }

    fn packaged_root() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl AppPaths for DesktopPaths {
    fn downloads_dir(&self) -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("ytripper"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn install_root(&self) -> PathBuf {
        match self.layout {
            InstallLayout::Packaged => Self::packaged_root(),
            InstallLayout::Development => self.dev_root.clone(),
        }
    }
}
