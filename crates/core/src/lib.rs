//! Domain model and pure rules of the workflow catalog.
//!
//! This crate performs no I/O. It defines the records the catalog builder
//! assembles, the registries of scannable collections, the dependency
//! inversion pass, and the health classifier.

pub mod catalog;
pub mod collections;
pub mod dependency;
pub mod error;
pub mod health;
pub mod registry;
pub mod types;
pub mod workflow;

pub use catalog::{BuildSummary, Catalog, CatalogEntry, EnrichmentIssue, EnrichmentStage};
pub use dependency::{DependencyEdge, DependencyMatrix, ForwardEdges, WorkflowDependencies};
pub use error::CatalogError;
pub use health::{ClassifierConfig, HealthSignals, HealthTag, MigrationKind, SimpleApprovalRule};
pub use registry::{ReferenceRegistry, ReferenceSource, TriggerRegistry, TriggerSource};
pub use types::{SysId, Timestamp};
pub use workflow::{
    Activity, Reference, ReferenceKind, Statistics, Trigger, TriggerKind, WorkflowRecord,
};
