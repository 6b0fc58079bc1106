//! Per-request provenance: which backends contributed, which failed.

use serde::Serialize;

/// Error descriptions kept verbatim; anything past this is only counted.
pub const MAX_ERROR_DESCRIPTIONS: usize = 10;

/// Counters describing how each backend contributed to a merged response.
///
/// Invariants: `queried = responded + failed` and
/// `responded = with_content + not_found`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub queried: usize,
    pub responded: usize,
    pub with_content: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Spans (or list entries) in the merged output.
    pub total_spans: usize,
    /// True iff at least one backend failed.
    pub partial: bool,
    /// Per-backend error descriptions, bounded by [`MAX_ERROR_DESCRIPTIONS`].
    pub errors: Vec<String>,
    /// Error descriptions dropped once the bound was reached.
    pub truncated_errors: usize,
}

impl Provenance {
    pub fn record_failure(&mut self, backend: &str, message: impl std::fmt::Display) {
        self.failed += 1;
        self.partial = true;
        if self.errors.len() < MAX_ERROR_DESCRIPTIONS {
            self.errors.push(format!("{backend}: {message}"));
        } else {
            self.truncated_errors += 1;
        }
    }

    pub fn record_not_found(&mut self) {
        self.responded += 1;
        self.not_found += 1;
    }

    pub fn record_content(&mut self) {
        self.responded += 1;
        self.with_content += 1;
    }

    /// Human-readable completeness line for the v2 trace response.
    pub fn status_message(&self) -> String {
        if self.partial {
            format!(
                "{} of {} backends contributed, {} failed",
                self.with_content, self.queried, self.failed
            )
        } else {
            format!("{} of {} backends contributed", self.with_content, self.queried)
        }
    }
}
