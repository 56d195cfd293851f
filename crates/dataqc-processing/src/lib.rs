//! Dataset loading and data-quality profiling for DataQC.
//!
//! # Overview
//!
//! - **Loading**: CSV bytes or saved uploads into a Polars `DataFrame`
//! - **Profiling**: missing values, duplicate rows, IQR outliers, preview rows
//! - **Target Discovery**: decide whether a dataset has a supervised target
//! - **Reporting**: a minimal HTML data-quality page
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dataqc_processing::{EdaProfiler, discover_target, read_csv_bytes};
//!
//! let df = read_csv_bytes(&upload)?;
//! let summary = EdaProfiler::profile(&df)?;
//! let target = discover_target(&df)?;
//!
//! println!("{} rows, {} duplicates", summary.shape.0, summary.duplicates);
//! println!("target: {:?}", target);
//! ```

pub mod error;
pub mod loader;
pub mod profiler;
pub mod reporting;
pub mod target;
pub mod types;
pub mod utils;

pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use loader::{ensure_not_empty, read_csv_bytes, read_csv_path};
pub use profiler::EdaProfiler;
pub use reporting::render_html_report;
pub use target::{TARGET_CANDIDATES, discover_target};
pub use types::EdaSummary;
pub use utils::{
    DtypeCategory, any_value_to_json, column_as_f64, get_dtype_category,
    is_numeric_dtype, numeric_column_names,
};
