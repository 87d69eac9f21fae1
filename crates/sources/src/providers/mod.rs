//! Source adapter implementations.

pub mod internal_index;
pub mod knowledge_base;
pub mod mock;
pub mod web_search;

pub use internal_index::InternalIndexAdapter;
pub use knowledge_base::KnowledgeBaseAdapter;
pub use mock::MockAdapter;
pub use web_search::WebSearchAdapter;
