pub mod app;
pub mod editor;
pub mod error;
pub mod logging;
pub mod search;
pub mod speaker;
pub mod srt;
pub mod subtitle;
pub mod transcript;
pub mod ui;
pub mod viewport;

pub use error::{Result, SublineError};
