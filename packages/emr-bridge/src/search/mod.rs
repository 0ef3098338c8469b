//! Documentation discovery over pluggable search backends.

mod discovery;
mod duckduckgo;
mod tavily;

pub use discovery::{DocDiscovery, MAX_QUERIES, MAX_SNIPPET_CHARS};
pub use duckduckgo::DuckDuckGoSearcher;
pub use tavily::TavilySearcher;
