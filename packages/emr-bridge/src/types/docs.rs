//! Documentation discovery and fetch records.

use serde::{Deserialize, Serialize};

/// Search queries produced by the query synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchQueries {
    #[serde(default)]
    pub queries: Vec<String>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Content snippet, capped by the discovery layer.
    #[serde(default)]
    pub content: String,
}

impl DocHit {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// De-duplicated search results across queries and backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocSearchResult {
    #[serde(default)]
    pub results: Vec<DocHit>,
}

impl DocSearchResult {
    pub fn urls(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A fetched documentation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FetchedDoc {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FetchedDocs {
    #[serde(default)]
    pub docs: Vec<FetchedDoc>,
}

impl FetchedDocs {
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn total_chars(&self) -> usize {
        self.docs.iter().map(|d| d.content.chars().count()).sum()
    }
}
