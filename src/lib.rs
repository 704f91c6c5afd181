//! `swarmdash` — monitoring dashboard backend for pod swarm deployments.
//!
//! Read-only query API over the records a pod fleet reports: captured
//! frames, classified specimens, sensor telemetry, and per-pod status. The
//! interesting part lives in [`binning`] (time-windowed bins, per-bin
//! aggregates, period comparisons) and [`filters`] (composable record
//! predicates); everything else is plumbing around a [`source::RecordSource`]
//! collaborator.
//!
//! Library + binary split so integration tests can mount the router over an
//! in-memory record source without a server or database.

pub mod binning;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod routes;
pub mod schema;
pub mod source;
pub mod thumbs;

pub use config::Config;
pub use routes::{router, AppState};
