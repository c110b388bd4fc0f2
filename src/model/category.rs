use crate::error::Res;
use anyhow::bail;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The threshold applied to an expense whose category has no entry of its own.
pub const DEFAULT_THRESHOLD: i64 = 500;

/// The fixed set of expense categories.
///
/// Each category carries the per-expense ceiling above which a single expense is reported as
/// unusually large. This enum is the only place those thresholds are defined.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Education,
    Shopping,
    Bills,
    Healthcare,
    #[default]
    Other,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

impl Category {
    /// All categories, in the order they are presented to the user.
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Education,
        Category::Shopping,
        Category::Bills,
        Category::Healthcare,
        Category::Other,
    ];

    /// The amount above which a single expense in this category triggers a large-expense alert.
    pub fn threshold(&self) -> Decimal {
        let limit = match self {
            Category::Food => 300,
            Category::Transport => 200,
            Category::Entertainment => 400,
            Category::Education => 1000,
            Category::Shopping => 500,
            Category::Bills => 800,
            Category::Healthcare => 600,
            Category::Other => DEFAULT_THRESHOLD,
        };
        Decimal::from(limit)
    }

    /// Parses a category name as stored or typed by a user. Matching ignores case and
    /// surrounding whitespace.
    pub fn parse(name: &str) -> Res<Category> {
        let name = name.trim();
        match Category::ALL
            .iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(name))
        {
            Some(category) => Ok(*category),
            None => bail!(
                "Unknown category '{name}', expected one of: {}",
                Category::ALL
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Looks up the large-expense threshold for a category name, falling back to
/// `DEFAULT_THRESHOLD` when the name is not one of the known categories.
pub fn threshold_for(name: &str) -> Decimal {
    Category::parse(name)
        .map(|c| c.threshold())
        .unwrap_or_else(|_| Decimal::from(DEFAULT_THRESHOLD))
}
