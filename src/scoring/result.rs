use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use super::rubric::{Category, Check};

/// Outcome of grading a single module.
///
/// The total score is always derived from the check outcomes, there is no
/// stored score that could drift from them.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub module: String,
    pub category: Category,
    pub has_secret_file: bool,
    pub page_renders: bool,
    pub ts_strictness: bool,
    pub get_all: bool,
    pub create: bool,
    pub get_by_id: bool,
    pub update: bool,
    pub delete: bool,
    pub validation: bool,
    pub negative_price: bool,
    pub xss_prevention: bool,
    pub invalid_id: bool,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    /// A result with every check failed, stamped with the current time.
    pub fn new(category: Category, module: impl Into<String>) -> Self {
        Self::with_timestamp(category, module, Utc::now())
    }

    /// The timestamp is truncated to milliseconds, the precision it is stored with.
    pub fn with_timestamp(
        category: Category,
        module: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            module: module.into(),
            category,
            has_secret_file: false,
            page_renders: false,
            ts_strictness: false,
            get_all: false,
            create: false,
            get_by_id: false,
            update: false,
            delete: false,
            validation: false,
            negative_price: false,
            xss_prevention: false,
            invalid_id: false,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }

    pub fn passed(&self, check: Check) -> bool {
        match check {
            Check::SecretFile => self.has_secret_file,
            Check::PageRenders => self.page_renders,
            Check::TsStrictness => self.ts_strictness,
            Check::GetAll => self.get_all,
            Check::Create => self.create,
            Check::GetById => self.get_by_id,
            Check::Update => self.update,
            Check::Delete => self.delete,
            Check::Validation => self.validation,
            Check::NegativePrice => self.negative_price,
            Check::XssPrevention => self.xss_prevention,
            Check::InvalidId => self.invalid_id,
        }
    }

    pub fn record(&mut self, check: Check, passed: bool) {
        let slot = match check {
            Check::SecretFile => &mut self.has_secret_file,
            Check::PageRenders => &mut self.page_renders,
            Check::TsStrictness => &mut self.ts_strictness,
            Check::GetAll => &mut self.get_all,
            Check::Create => &mut self.create,
            Check::GetById => &mut self.get_by_id,
            Check::Update => &mut self.update,
            Check::Delete => &mut self.delete,
            Check::Validation => &mut self.validation,
            Check::NegativePrice => &mut self.negative_price,
            Check::XssPrevention => &mut self.xss_prevention,
            Check::InvalidId => &mut self.invalid_id,
        };
        *slot = passed;
    }

    /// Sum of the weights of every passed check.
    pub fn total_score(&self) -> u32 {
        Check::ALL
            .iter()
            .filter(|c| self.passed(**c))
            .map(|c| c.points())
            .sum()
    }

    /// Scored checks that did not pass, in probe order.
    pub fn failed_checks(&self) -> Vec<Check> {
        Check::ALL
            .into_iter()
            .filter(|c| c.is_scored() && !self.passed(*c))
            .collect()
    }

    /// `true` unless a create-dependent check passed without a create.
    pub fn dependencies_hold(&self) -> bool {
        self.create || Check::DEPENDS_ON_CREATE.iter().all(|c| !self.passed(*c))
    }

    /// Timestamp in the `2024-01-31T12:00:00.000Z` form.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// `category/module`, the identity used in logs and tables.
    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.module)
    }
}
