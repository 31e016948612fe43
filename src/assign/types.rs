use serde::{Deserialize, Serialize};

use crate::scoring::Category;

/// Something a participant builds a module for (a fruit or a vegetable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// A coding agent or model taking part in the benchmark.
///
/// Extra fields in the input file (vendor, notes, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub participant: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// The result of a blind draw, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub version: u32,
    pub category: Category,
    /// In participant input order.
    pub pairings: Vec<Pairing>,
}

impl Assignment {
    pub fn new(category: Category, pairings: Vec<Pairing>) -> Self {
        Self {
            version: 1,
            category,
            pairings,
        }
    }
}
