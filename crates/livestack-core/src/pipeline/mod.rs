pub mod config;
mod ingest;
mod subscribers;
mod types;
mod worker;

pub use ingest::{Collaborators, Ingestor};
pub use subscribers::{SubscriptionId, Subscribers};
pub use types::{Outcome, Stage};
pub use worker::{Pipeline, WorkerState};
