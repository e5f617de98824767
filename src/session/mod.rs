pub mod store;
pub mod tracker;
pub mod types;
