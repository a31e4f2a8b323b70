//! Avatar generation pipeline.
//!
//! The [`orchestrator::AvatarGenerationOrchestrator`] drives one run for
//! one avatar: every pose/expression cell through the
//! [`retry::GenerationRetrier`], optional background removal, storage,
//! and cost accounting, then the [`comments::CommentPipeline`], then the
//! token debit. External systems are reached only through the traits in
//! [`ports`]; [`adapters`] binds them to the concrete clients.

pub mod accounting;
pub mod adapters;
pub mod comments;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod retry;

pub use config::PipelineConfig;
pub use error::{PortError, RunError};
pub use orchestrator::{AvatarGenerationOrchestrator, Collaborators, GenerationJob, RunReport};
