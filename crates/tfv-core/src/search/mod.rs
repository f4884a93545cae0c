//! Search layer — ranked full-text search with a substring fallback, plus
//! structured filter queries against the store.

pub mod index;
pub mod query;

pub use index::{IndexState, SearchIndex};
pub use query::{LogQuery, DEFAULT_LIMIT};
