//! DataQC application layer.
//!
//! Exposes the four service entry points (`analyze`, `train`, `predict`,
//! `get_history`) plus the HTML `report` over an explicit [`AppContext`].
//! The `dataqc` binary wraps them in a CLI.

pub mod commands;
pub mod context;
pub mod error;

pub use commands::*;
pub use context::{AppContext, AppContextBuilder};
pub use error::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(AppContext: Send, Sync, Clone);
    assert_impl_all!(AppError: Send, Sync);
}
