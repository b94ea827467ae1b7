//! Workflow catalog enrichment engine.
//!
//! Reads workflow definitions from a [`RecordStore`](wfcat_db::RecordStore),
//! enriches each one from the surrounding collections, classifies it, and
//! assembles a [`Catalog`](wfcat_core::Catalog) with a catalog-wide
//! dependency matrix.

pub mod activities;
pub mod builder;
pub mod dependencies;
pub mod error;
pub mod references;
pub mod scanner;
pub mod statistics;
pub mod triggers;

pub use activities::ActivityLoader;
pub use builder::{BuildRequest, CatalogOutcome, CatalogRun, WorkflowCatalogBuilder};
pub use dependencies::{DependencyResolver, MatrixBuild};
pub use error::{BuildError, Interruption, Partial};
pub use references::ReferenceScanner;
pub use scanner::{BatchScanner, Page, PageCursor, ProgressTracker};
pub use statistics::{StatisticsAggregator, StuckExecutionProbe};
pub use triggers::TriggerScanner;
