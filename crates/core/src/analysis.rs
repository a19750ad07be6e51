//! Input analysis seam.
//!
//! The agent loop consumes sentiment and topic extraction through this trait;
//! the concrete analyzer is swappable.

use serde::{Deserialize, Serialize};

/// Structural facts about a piece of user text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnalysis {
    pub is_question: bool,
    /// At most three topic words
    pub topics: Vec<String>,
}

pub trait InputAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> TextAnalysis;

    /// Signed sentiment score; positive means friendly.
    fn sentiment(&self, text: &str) -> f64;
}
