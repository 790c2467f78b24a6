pub mod catalog;
pub mod collaborative;
pub mod config;
pub mod content;
pub mod enrichment;
pub mod errors;
pub mod logging;
pub mod preferences;
pub mod ranker;
pub mod search;
pub mod server;
pub mod store;
pub mod text;
