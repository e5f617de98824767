pub mod parser;
pub mod prompt;
pub mod reconciler;
pub mod service;
