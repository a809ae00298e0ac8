pub mod analysis;
pub mod cli;
pub mod collector;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod facts;
pub mod orchestrator;
pub mod pipeline;
pub mod shaper;

pub use analysis::{AnalysisEngine, AnalysisRequest, AnalysisSettings, NarrativeService};
pub use collector::Collector;
pub use config::AppConfig;
pub use domain::{Report, Snapshot, SourceId, SourceResult, Status};
pub use error::{Result, VigilError};
pub use orchestrator::collect_all;
pub use pipeline::{run_health_check, run_with_service, RunOutcome};
