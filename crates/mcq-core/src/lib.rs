pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod generate;
pub mod io;
pub mod issue;
pub mod jira;
pub mod markup;
pub mod models;
pub mod paths;
pub mod prompt;
pub mod prompter;
pub mod system;
pub mod template;
pub mod title;
pub mod user_error;

pub use app::{App, Outcome, Story};
pub use error::{McqError, Result};
pub use user_error::{ErrorCode, UserError};
