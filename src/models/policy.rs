//! Policy documents searched by embedding similarity.

use serde::{Deserialize, Serialize};

use super::Embedding;

/// A free-text policy paragraph with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: i64,
    pub content: String,
    pub embedding: Embedding,
}
