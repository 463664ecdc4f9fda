//! Report rendering subsystem.
//!
//! Turns a provider scan report into PDF bytes. The renderer is a pure
//! function behind the `ReportRenderer` seam so the controller can be
//! tested with a failing or canned implementation.

pub mod pdf;

use crate::error_handling::types::RenderError;
use crate::scan_provider::types::ScanReport;

/// Seam between the lifecycle controller and the PDF generator.
pub trait ReportRenderer: Send + Sync {
    /// Renders `report` into PDF bytes. Must not mutate the report and must
    /// degrade gracefully (omit a section) when optional fields are absent.
    fn render(&self, report: &ScanReport, url: &str) -> Result<Vec<u8>, RenderError>;
}

/// Production renderer backed by `report::pdf::render`.
pub struct PdfRenderer;

impl ReportRenderer for PdfRenderer {
    fn render(&self, report: &ScanReport, url: &str) -> Result<Vec<u8>, RenderError> {
        pdf::render(report, url)
    }
}
