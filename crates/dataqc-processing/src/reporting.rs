//! Minimal HTML data-quality report.

use crate::types::EdaSummary;

/// Render the summary as a small standalone HTML page.
pub fn render_html_report(summary: &EdaSummary) -> String {
    let mut html = String::from("<html><body><h1>Data Quality Report</h1>");
    html.push_str(&format!(
        "<p>Rows: {} Columns: {}</p>",
        summary.shape.0, summary.shape.1
    ));

    html.push_str("<h2>Missing</h2><ul>");
    for (column, count) in &summary.missing {
        html.push_str(&format!("<li>{}: {}</li>", escape(column), count));
    }
    html.push_str("</ul>");

    if !summary.outliers.is_empty() {
        html.push_str("<h2>Outliers</h2><ul>");
        for (column, count) in &summary.outliers {
            html.push_str(&format!("<li>{}: {}</li>", escape(column), count));
        }
        html.push_str("</ul>");
    }

    html.push_str(&format!("<p>Duplicate rows: {}</p>", summary.duplicates));
    html.push_str("</body></html>");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
