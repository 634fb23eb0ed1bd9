// Voter Store: loads the voter CSV once, then serves filter-and-sample queries.
// The dataset is read-only after load and shared across requests without locking.

pub mod cache;
pub mod handlers;
pub mod models;
pub mod sampling;
pub mod store;
