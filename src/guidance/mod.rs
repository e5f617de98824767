pub mod engine;
pub mod job_analysis;
pub mod page_state;
pub mod relevance;
pub mod resolver;
pub mod types;
