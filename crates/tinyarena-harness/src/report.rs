//! Report generation for fixture verification.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// Verification report for one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaReport {
    pub title: String,
    /// Check levels exercised (e.g. `strict+off`).
    pub mode: String,
    pub timestamp: String,
    pub summary: VerificationSummary,
}

impl ArenaReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n", self.summary.failed));
        out.push_str(&format!("- Skipped: {}\n\n", self.summary.skipped));

        out.push_str("| Case | Family | Mode | Status | Failure |\n");
        out.push_str("|------|--------|------|--------|---------|\n");
        for r in &self.summary.results {
            let status = match (r.skipped, r.passed) {
                (true, _) => "SKIP",
                (false, true) => "PASS",
                (false, false) => "FAIL",
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                r.case_name,
                r.family,
                r.mode,
                status,
                r.failure.as_deref().unwrap_or("")
            ));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
