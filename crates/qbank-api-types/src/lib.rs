//! Records supplied by the question-bank content API.
//!
//! `GET /questions` yields [`Question`] values and `GET /questions/categories`
//! yields [`Category`] values. Both use camelCase field names on the wire.

use serde::{Deserialize, Serialize};

/// Identifier type used by the content API for questions and categories.
pub type RecordId = i64;

/// A question as returned by `GET /questions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: RecordId,
    pub title: String,
    /// Markdown body describing the reference solution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    /// Markdown transcript of the original interview exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub category_id: RecordId,
    /// Popularity score; absent scores rank as zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_score: Option<i64>,
}

impl Question {
    pub fn new(id: RecordId, title: impl Into<String>, category_id: RecordId) -> Self {
        Self {
            id,
            title: title.into(),
            solution: None,
            transcript: None,
            category_id,
            hot_score: None,
        }
    }

    pub fn with_hot_score(mut self, score: i64) -> Self {
        self.hot_score = Some(score);
        self
    }

    /// Score used for ranking; a missing score counts as zero.
    pub fn effective_hot_score(&self) -> i64 {
        self.hot_score.unwrap_or(0)
    }
}

/// A category as returned by `GET /questions/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: RecordId,
    pub name: String,
}

/// Parse the body of `GET /questions`.
pub fn parse_questions(body: &str) -> serde_json::Result<Vec<Question>> {
    serde_json::from_str(body)
}

/// Parse the body of `GET /questions/categories`.
pub fn parse_categories(body: &str) -> serde_json::Result<Vec<Category>> {
    serde_json::from_str(body)
}
