//! roundup - autonomous interview round scheduling.
//!
//! Polls a candidate directory, batches checked-in candidates that have a slot
//! and no round yet, and submits each batch to a round creation service.

pub mod api;
pub mod config;
pub mod core;
pub mod directory;
pub mod events;
pub mod rounds;
pub mod scheduler;
pub mod testing;

pub use api::{ApiConfig, ApiState, build_router, start_server};
pub use config::{AppConfig, ConfigError, SchedulerBuilder, YamlLoader, load_scheduler};
pub use core::candidate::{CandidateSnapshot, RoundProgress, RoundStatus};
pub use core::request::{BatchResult, RoundRequest};
pub use core::types::{BatchId, CandidateId};
pub use directory::{CandidateDirectory, DirectoryError, HttpCandidateDirectory};
pub use events::{DispatchEvent, DispatchObserver, EventLog, FnObserver, ObserverSet};
pub use rounds::{HttpRoundService, RoundCreationError, RoundCreationService};
pub use scheduler::{
    CycleOutcome, RoundScheduler, SchedulerError, SchedulerMetrics, SchedulerOptions,
    SchedulerSettings, SchedulerState, SchedulerStatus,
};
