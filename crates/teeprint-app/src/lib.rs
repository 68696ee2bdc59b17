//! Teeprint session shell.
//!
//! Drives the composition engine from a scripted list of user actions, the way
//! the customizer's side panel and canvas would.

pub mod error;
pub mod script;

pub use error::{AppError, AppResult};
pub use script::{FrameSummary, Script, Session, Step};
