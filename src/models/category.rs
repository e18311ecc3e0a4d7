//! Two-level document classification (major head / minor head).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Major head of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Personal,
    Professional,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "Personal",
            Category::Professional => "Professional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Personal" => Some(Category::Personal),
            "Professional" => Some(Category::Professional),
            _ => None,
        }
    }
}

/// Immutable mapping from category to its ordered sub-categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable {
    entries: BTreeMap<Category, Vec<String>>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            Category::Personal,
            ["Medical", "Identity", "Finance", "Education", "Insurance"]
                .map(String::from)
                .to_vec(),
        );
        entries.insert(
            Category::Professional,
            ["Accounts", "HR", "IT", "Finance", "Legal"]
                .map(String::from)
                .to_vec(),
        );
        Self { entries }
    }
}

impl CategoryTable {
    /// Load a table from a JSON object keyed by category name.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!(
                "Failed to read category table {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Validation(format!(
                "Invalid category table {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Sub-categories for a category, in display order.
    pub fn sub_categories(&self, category: Category) -> &[String] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, category: Category, sub_category: &str) -> bool {
        self.sub_categories(category)
            .iter()
            .any(|s| s == sub_category)
    }
}
