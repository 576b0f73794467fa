pub mod dependencies;
pub mod dialog;
pub mod events;
pub mod process;
pub mod progress;
pub mod supervisor;
pub mod ytdlp;
