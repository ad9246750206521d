pub mod config;
pub mod info;
pub mod ingest;
pub mod stacks;
