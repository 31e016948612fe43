use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level grouping of modules under test.
///
/// `Fruits` modules were built by coding agents, `Vegetables` modules by bare
/// models. Ordering is fruits first, which is also the CSV row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fruits,
    Vegetables,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Fruits, Category::Vegetables];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fruits => "fruits",
            Category::Vegetables => "vegetables",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "fruits" => Ok(Category::Fruits),
            "vegetables" => Ok(Category::Vegetables),
            other => bail!("Unknown category '{}' (expected fruits or vegetables)", other),
        }
    }
}

/// One row of the grading rubric.
///
/// Variants are declared in probe order: checks later in the list may depend
/// on state produced by earlier ones (the create/read/update/delete chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    SecretFile,
    PageRenders,
    TsStrictness,
    GetAll,
    Create,
    GetById,
    Update,
    Delete,
    Validation,
    NegativePrice,
    XssPrevention,
    InvalidId,
}

impl Check {
    /// Every check in probe order, including the informational one.
    pub const ALL: [Check; 12] = [
        Check::SecretFile,
        Check::PageRenders,
        Check::TsStrictness,
        Check::GetAll,
        Check::Create,
        Check::GetById,
        Check::Update,
        Check::Delete,
        Check::Validation,
        Check::NegativePrice,
        Check::XssPrevention,
        Check::InvalidId,
    ];

    /// Checks that require a record id from a successful create.
    pub const DEPENDS_ON_CREATE: [Check; 3] = [Check::GetById, Check::Update, Check::Delete];

    pub const MAX_SCORE: u32 = 100;

    /// Fixed weight of this check. `SecretFile` is informational and worth nothing.
    pub fn points(&self) -> u32 {
        match self {
            Check::SecretFile => 0,
            Check::PageRenders => 5,
            Check::TsStrictness => 5,
            Check::GetAll => 15,
            Check::Create => 15,
            Check::GetById => 10,
            Check::Update => 15,
            Check::Delete => 10,
            Check::Validation => 5,
            Check::NegativePrice => 5,
            Check::XssPrevention => 5,
            Check::InvalidId => 10,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.points() > 0
    }

    /// Column name used in the results CSV.
    pub fn column(&self) -> &'static str {
        match self {
            Check::SecretFile => "hasSecretFile",
            Check::PageRenders => "pageRenders",
            Check::TsStrictness => "tsStrictness",
            Check::GetAll => "getAll",
            Check::Create => "create",
            Check::GetById => "getById",
            Check::Update => "update",
            Check::Delete => "delete",
            Check::Validation => "validation",
            Check::NegativePrice => "negativePrice",
            Check::XssPrevention => "xssPrevention",
            Check::InvalidId => "invalidId",
        }
    }

    /// Human-readable label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Check::SecretFile => "Secret file",
            Check::PageRenders => "Page renders",
            Check::TsStrictness => "Type strictness",
            Check::GetAll => "List",
            Check::Create => "Create",
            Check::GetById => "Read one",
            Check::Update => "Update",
            Check::Delete => "Delete",
            Check::Validation => "Empty name rejected",
            Check::NegativePrice => "Negative price rejected",
            Check::XssPrevention => "XSS contained",
            Check::InvalidId => "Invalid id rejected",
        }
    }

    pub fn from_column(column: &str) -> Option<Check> {
        Check::ALL.into_iter().find(|c| c.column() == column)
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
