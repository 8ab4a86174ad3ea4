//! Coachtrace - Derivation core for member health-coaching dashboards
//!
//! Coachtrace turns a member's raw coaching bundle (wearable days, sparse
//! lab panels, interventions, chat transcripts, rationales) into the
//! derived shapes a dashboard renders: daily metric series with rolling
//! windows and lab interpolation, direction-aware range segmentation,
//! scored intervention outcomes, and a unified decision timeline.
//!
//! ## Modules
//!
//! - **Series**: Align every metric onto the wearable-day timeline
//! - **Score**: Segment series against range policy; grade outcomes
//! - **Decisions**: Merge interventions and panels into one timeline
//! - **Chat / Assistant**: Normalize transcripts; answer canned queries

pub mod assistant;
pub mod bundle;
pub mod chat;
pub mod decisions;
pub mod demo;
pub mod error;
pub mod kpi;
pub mod metrics;
pub mod score;
pub mod series;
pub mod types;

pub use bundle::{load_jsonl, Dataset, JsonlBatch, Snapshot};
pub use error::CoreError;
pub use metrics::{Direction, MetricId, SeriesSource, ALL_METRICS};

// Derivation exports
pub use decisions::{build_decisions, filter_decisions, find_rationale};
pub use score::{parse_delta, score_outcome, segment, Outcome, OutcomeStatus};
pub use series::build_series;

// Chat exports
pub use chat::{normalize_chat, simple_search, ChatNormalization, Message};

/// Coachtrace version embedded in CLI output envelopes
pub const COACHTRACE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI output envelopes
pub const PRODUCER_NAME: &str = "coachtrace";
