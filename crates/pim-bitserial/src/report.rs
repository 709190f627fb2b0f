//! Aggregated results of a harness run

use crate::category::NumericCategory;
use crate::engine::{CategoryRun, TestOutcome};
use pim_backends::DeviceFamily;
use serde::Serialize;
use std::fmt;

/// Pass count of one (family, category) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub family: DeviceFamily,
    pub category: NumericCategory,
    pub passed: usize,
    pub total: usize,
}

impl CategorySummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// An error that skipped a category, a family, or a requested name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub family: Option<DeviceFamily>,
    pub category: Option<NumericCategory>,
    pub message: String,
}

/// Everything a run produced, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarnessReport {
    pub stats: Vec<CategorySummary>,
    pub outcomes: Vec<TestOutcome>,
    pub errors: Vec<ReportedError>,
}

impl HarnessReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the results of one category run
    pub fn record(&mut self, run: CategoryRun) {
        self.stats.push(CategorySummary {
            family: run.family,
            category: run.category,
            passed: run.passed(),
            total: run.total(),
        });
        self.outcomes.extend(run.outcomes);
    }

    pub fn record_error(
        &mut self,
        family: Option<DeviceFamily>,
        category: Option<NumericCategory>,
        message: impl Into<String>,
    ) {
        self.errors.push(ReportedError {
            family,
            category,
            message: message.into(),
        });
    }

    pub fn stats(&self, family: DeviceFamily, category: NumericCategory) -> Option<&CategorySummary> {
        self.stats
            .iter()
            .find(|s| s.family == family && s.category == category)
    }

    pub fn passed(&self) -> usize {
        self.stats.iter().map(|s| s.passed).sum()
    }

    pub fn total(&self) -> usize {
        self.stats.iter().map(|s| s.total).sum()
    }

    /// True when nothing was skipped and every test passed
    pub fn all_passed(&self) -> bool {
        self.errors.is_empty() && self.stats.iter().all(CategorySummary::all_passed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:<8} {:>7} {:>6}", "device", "category", "passed", "total")?;
        for s in &self.stats {
            let marker = if s.all_passed() { "" } else { "  <-" };
            writeln!(
                f,
                "{:<10} {:<8} {:>7} {:>6}{marker}",
                s.family.name(),
                s.category.name(),
                s.passed,
                s.total
            )?;
        }
        writeln!(f, "{:<19} {:>7} {:>6}", "all", self.passed(), self.total())?;
        for err in &self.errors {
            let scope = match (err.family, err.category) {
                (Some(family), Some(category)) => format!("{family}:{category}"),
                (Some(family), None) => family.to_string(),
                (None, Some(category)) => category.to_string(),
                (None, None) => "harness".to_string(),
            };
            writeln!(f, "error [{scope}]: {}", err.message)?;
        }
        Ok(())
    }
}
