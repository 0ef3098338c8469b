//! Documentation fetch: per-URL retrieval plus size capping.

mod documents;
mod http;

pub use documents::{
    join_docs, DocumentFetch, JOINED_DOC_CHARS, MAX_DOCS, MAX_DOC_CHARS, MAX_JOINED_CHARS, NO_CONTENT,
    NO_DOCS_FETCHED, TRUNCATION_MARKER,
};
pub use http::HttpFetcher;
