//! Case results and their aggregation.

use serde::{Deserialize, Serialize};

/// Result of replaying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the test case.
    pub case_name: String,
    /// Fixture family the case belongs to.
    pub family: String,
    /// Check level the case ran under.
    pub mode: String,
    /// Whether every step met its expectation.
    pub passed: bool,
    /// The case was written for another word size and did not run.
    #[serde(default)]
    pub skipped: bool,
    /// Steps executed before the case finished or failed.
    pub steps_run: usize,
    /// First failing step, if any.
    pub failure: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.passed && !r.skipped).count();
        Self {
            total,
            passed,
            failed: total - passed - skipped,
            skipped,
            results,
        }
    }

    /// Returns true if no case failed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
