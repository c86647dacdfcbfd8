//! Requirements file rendering

use crate::resolve::types::{CompatibilityResult, ResolutionReport, ResolutionStatus};

/// Render one result as a requirements line
///
/// Unresolved libraries become comment lines so they are never dropped silently.
pub fn requirement_line(result: &CompatibilityResult) -> String {
    match (&result.status, &result.chosen_version) {
        (ResolutionStatus::Matched, Some(version)) => format!("{}=={}", result.library, version),
        (ResolutionStatus::Fallback, Some(version)) => {
            format!("{}=={}  # unverified", result.library, version)
        }
        (ResolutionStatus::Failed, _) => {
            format!("# {}: signature extraction failed", result.library)
        }
        _ => format!(
            "# {}: no signatures indexed (run `pinpoint add {}`)",
            result.library, result.library
        ),
    }
}

/// Render a whole report, one line per library in name order
pub fn render_requirements(report: &ResolutionReport) -> String {
    report
        .results
        .values()
        .map(|result| requirement_line(result) + "\n")
        .collect()
}
