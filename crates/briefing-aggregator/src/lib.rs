//! Cache store and incremental refresh orchestration.

pub mod bootstrap;
pub mod cache;
pub mod deadline;
pub mod merge;
pub mod orchestrator;
pub mod sink;

pub use bootstrap::{build_orchestrator, registry_from_config, sink_from_config, BootstrapError};
pub use cache::{CacheSettings, CacheStore};
pub use deadline::{Checkpoint, Deadline};
pub use orchestrator::{
    Orchestrator, RefreshOutcome, RefreshReport, RefreshSettings, REFRESH_FAILED_SUMMARY,
};
pub use sink::{KvSink, NoopSink, SinkError, SnapshotSink};
