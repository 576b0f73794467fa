pub mod dialog;
pub mod events;
