//! Scan pipeline wiring: model context, per-kind dispatch, scan logging,
//! alerting, export and demo seeding. The `shield` binary is a thin CLI over this.

pub mod alert;
pub mod config;
pub mod context;
pub mod export;
pub mod pipeline;
pub mod seed;

pub use context::ScoringContext;
pub use pipeline::{ExplanationState, Logged, Pipeline, ScanOutcome};
