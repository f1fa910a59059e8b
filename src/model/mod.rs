//! Data models for SiteQuery.
//!
//! This module contains the domain models:
//! - Project, Phase, Subphase, PhaseTask (the work breakdown)
//! - Budget, ProjectTask, Milestone, ProjectIssue, Document, Person
//! - QueryAnalysis (the structured form of a question)
//! - ResultEnvelope (the uniform answer shape)
//! - ConversationContext (the previous turn of a conversation)

pub mod analysis;
pub mod context;
pub mod envelope;
pub mod project;
pub mod records;
pub mod status;

pub use analysis::{
    AnalysisSource, ChartType, Filters, Intent, QueryAnalysis, TimePeriod, Timeframe,
};
pub use context::ConversationContext;
pub use envelope::ResultEnvelope;
pub use project::{Phase, PhaseTask, Project, ProjectStatus, Subphase, SubphaseMatch};
pub use records::{Budget, Document, Milestone, Person, ProjectIssue, ProjectTask};
pub use status::WorkStatus;
