//! Application commands.
//!
//! # Module Organization
//!
//! - **analysis**: save and profile uploads, render the HTML report
//! - **ml**: train models, predict, read prediction history
//!
//! Every command takes the [`AppContext`](crate::context::AppContext)
//! explicitly and returns a serializable response or an
//! [`AppError`](crate::error::AppError).

pub mod analysis;
pub mod ml;

pub use analysis::{AnalyzeResponse, analyze, report};
pub use ml::{HistoryResponse, TrainResponse, get_history, predict, train};
