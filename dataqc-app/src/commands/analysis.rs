//! Upload analysis and the data-quality report.

use std::path::Path;

use dataqc_processing::{EdaProfiler, EdaSummary, discover_target, read_csv_path, render_html_report};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::{AppError, Result};

// ============================================================================
// TYPES
// ============================================================================

/// Result of analyzing an upload.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub summary: EdaSummary,
    pub target_detected: Option<String>,
    /// Where the upload was saved; pass it to `train`.
    pub saved_path: String,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Save an upload, profile it and look for a target column.
///
/// The upload is stored as `{upload_dir}/{uid8}_{file_name}` before it is
/// parsed, so a malformed file is still kept on disk.
pub fn analyze(ctx: &AppContext, file_name: &str, bytes: &[u8]) -> Result<AnalyzeResponse> {
    let base_name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::DatasetRead(format!("Invalid file name: {}", file_name)))?;

    let uid = &Uuid::new_v4().simple().to_string()[..8];
    let saved_path = ctx.upload_dir().join(format!("{}_{}", uid, base_name));
    std::fs::write(&saved_path, bytes)?;

    let df = read_csv_path(&saved_path)?;
    let summary = EdaProfiler::profile(&df)?;
    let target_detected = discover_target(&df)?;

    info!(
        "Analyzed {} ({} rows, {} columns), target: {:?}",
        saved_path.display(),
        summary.shape.0,
        summary.shape.1,
        target_detected
    );

    Ok(AnalyzeResponse {
        summary,
        target_detected,
        saved_path: saved_path.to_string_lossy().into_owned(),
    })
}

/// Render the HTML data-quality report of a CSV file.
pub fn report(path: impl AsRef<Path>) -> Result<String> {
    let df = read_csv_path(path)?;
    let summary = EdaProfiler::profile(&df)?;
    Ok(render_html_report(&summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn context() -> (TempDir, AppContext) {
        let tmp = TempDir::new().unwrap();
        let ctx = AppContext::builder().data_dir(tmp.path()).build().unwrap();
        (tmp, ctx)
    }

    #[test]
    fn test_analyze_saves_upload() {
        let (_tmp, ctx) = context();
        let bytes = b"clicked,age\n0,25\n1,40\n0,22\n1,55\n";

        let response = analyze(&ctx, "ads.csv", bytes).unwrap();
        assert_eq!(response.target_detected.as_deref(), Some("clicked"));
        assert_eq!(response.summary.shape, (4, 2));

        let saved = Path::new(&response.saved_path);
        assert_eq!(saved.parent().unwrap(), ctx.upload_dir());
        let name = saved.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_ads.csv"));
        assert_eq!(name.len(), 8 + "_ads.csv".len());
        assert_eq!(std::fs::read(saved).unwrap(), bytes);
    }

    #[test]
    fn test_analyze_strips_directories() {
        let (_tmp, ctx) = context();
        let response = analyze(&ctx, "../../evil.csv", b"a\n1\n").unwrap();
        assert!(Path::new(&response.saved_path).starts_with(ctx.upload_dir()));
    }

    #[test]
    fn test_analyze_empty_file() {
        let (_tmp, ctx) = context();
        let err = analyze(&ctx, "empty.csv", b"").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_report_html() {
        let (tmp, _ctx) = context();
        let path = tmp.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,\n2,x\n").unwrap();

        let html = report(&path).unwrap();
        assert!(html.contains("<h1>Data Quality Report</h1>"));
        assert!(html.contains("<p>Rows: 2 Columns: 2</p>"));
        assert!(html.contains("<li>b: 1</li>"));
    }
}
