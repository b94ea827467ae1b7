//! Catalog assembly.
//!
//! [`WorkflowCatalogBuilder::build`] enriches one definition row: the
//! trigger, activity, reference, dependency, statistics and stuck-probe
//! stages run concurrently, and any non-primary failure becomes an issue on
//! the entry instead of an error.
//!
//! [`CatalogRun`] drives the definition scan page by page. Entries of a page
//! are built with bounded concurrency and come back in scan order. The run
//! can stop at any page boundary; [`CatalogRun::finish`] then performs the
//! dependency inversion over everything built so far.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use wfcat_core::collections::{
    FIELD_ACTIVE, FIELD_CREATED_BY, FIELD_CREATED_ON, FIELD_DESCRIPTION, FIELD_NAME,
    FIELD_PUBLISHED, FIELD_SYS_ID, FIELD_TABLE, FIELD_UPDATED_BY, FIELD_UPDATED_ON,
    WORKFLOW_VERSION,
};
use wfcat_core::health::classify;
use wfcat_core::{
    BuildSummary, Catalog, CatalogEntry, CatalogError, ClassifierConfig, DependencyMatrix,
    EnrichmentIssue, EnrichmentStage, HealthSignals, ReferenceRegistry, TriggerRegistry,
    WorkflowRecord,
};
use wfcat_db::{Filter, OrderBy, Query, Record, RecordStore};
use wfcat_events::{EventBus, EventKind};

use crate::activities::ActivityLoader;
use crate::dependencies::{DependencyResolver, DEFAULT_CONCURRENCY};
use crate::error::{BuildError, Interruption};
use crate::references::ReferenceScanner;
use crate::scanner::{BatchScanner, PageCursor, ProgressTracker};
use crate::statistics::{StatisticsAggregator, StuckExecutionProbe};
use crate::triggers::TriggerScanner;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

// ---------------------------------------------------------------------------
// Build request / outcome
// ---------------------------------------------------------------------------

/// Which definitions to scan and from where.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    /// Extra filters ANDed with `published = true`.
    pub filters: Vec<Filter>,
    pub start: u64,
    pub page_size: u64,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            start: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BuildRequest {
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A catalog plus the reason the build stopped early, if it did.
#[derive(Debug, Clone)]
pub struct CatalogOutcome {
    pub catalog: Catalog,
    pub interruption: Option<Interruption>,
}

impl CatalogOutcome {
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

// ---------------------------------------------------------------------------
// WorkflowCatalogBuilder
// ---------------------------------------------------------------------------

pub struct WorkflowCatalogBuilder {
    store: Arc<dyn RecordStore>,
    scanner: BatchScanner,
    triggers: TriggerScanner,
    activities: ActivityLoader,
    references: ReferenceScanner,
    dependencies: DependencyResolver,
    statistics: StatisticsAggregator,
    stuck: StuckExecutionProbe,
    classifier: ClassifierConfig,
    concurrency: usize,
    events: Option<Arc<EventBus>>,
}

impl WorkflowCatalogBuilder {
    /// Builder over `store` with the default registries and classifier.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let classifier = ClassifierConfig::default();
        Self {
            scanner: BatchScanner::new(store.clone()),
            triggers: TriggerScanner::new(store.clone(), TriggerRegistry::default()),
            activities: ActivityLoader::new(store.clone()),
            references: ReferenceScanner::new(store.clone(), ReferenceRegistry::default()),
            dependencies: DependencyResolver::new(store.clone()),
            statistics: StatisticsAggregator::new(store.clone()),
            stuck: StuckExecutionProbe::new(store.clone(), classifier.stuck_after),
            store,
            classifier,
            concurrency: DEFAULT_CONCURRENCY,
            events: None,
        }
    }

    pub fn with_reference_registry(mut self, registry: ReferenceRegistry) -> Self {
        self.references = ReferenceScanner::new(self.store.clone(), registry);
        self
    }

    pub fn with_trigger_registry(mut self, registry: TriggerRegistry) -> Self {
        self.triggers = TriggerScanner::new(self.store.clone(), registry);
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.stuck = StuckExecutionProbe::new(self.store.clone(), classifier.stuck_after);
        self.classifier = classifier;
        self
    }

    /// Number of workflows enriched at once within a page.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, BuildError> {
        if concurrency == 0 {
            return Err(BuildError::InvalidConcurrency(concurrency));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn publish(&self, kind: EventKind) {
        if let Some(events) = &self.events {
            events.publish(kind);
        }
    }

    /// Definition query: published versions, ordered by name then id.
    fn definition_query(filters: &[Filter]) -> Query {
        Query::with_filters(
            std::iter::once(Filter::eq(FIELD_PUBLISHED, true))
                .chain(filters.iter().cloned())
                .collect(),
        )
        .order_by(OrderBy::asc(FIELD_NAME))
        .order_by(OrderBy::asc(FIELD_SYS_ID))
    }

    // -- single workflow -----------------------------------------------------

    /// Enrich and classify one definition row.
    ///
    /// Fails only when the row has no identifier. A row without a name uses
    /// its id as the name and carries a `MalformedRecord` issue.
    pub async fn build(&self, raw: &Record) -> Result<CatalogEntry, CatalogError> {
        let id = raw.sys_id().ok_or_else(|| CatalogError::MalformedRecord {
            collection: WORKFLOW_VERSION.to_string(),
            source_id: String::new(),
            field: FIELD_SYS_ID,
        })?;

        let mut issues = Vec::new();
        let name = match raw.non_blank(FIELD_NAME) {
            Some(name) => name,
            None => {
                issues.push(EnrichmentIssue::new(
                    EnrichmentStage::Definition,
                    CatalogError::MalformedRecord {
                        collection: WORKFLOW_VERSION.to_string(),
                        source_id: id.clone(),
                        field: FIELD_NAME,
                    },
                ));
                id.clone()
            }
        };

        let now = Utc::now();
        let (triggers, activities, references, calls, statistics, stuck) = tokio::join!(
            self.triggers.find_triggers(&id),
            self.activities.load(&id),
            self.references.find_references(&id, &name),
            self.dependencies.find_dependencies(&id),
            self.statistics.compute_statistics(&id),
            self.stuck.probe(&id, now),
        );

        let mut record = WorkflowRecord::new(id.clone(), name);
        record.target_table = raw.text_or_empty(FIELD_TABLE);
        record.description = raw.text_or_empty(FIELD_DESCRIPTION);
        record.active = raw.flag(FIELD_ACTIVE).unwrap_or(false);
        record.created_at = raw.timestamp(FIELD_CREATED_ON);
        record.created_by = raw.text_or_empty(FIELD_CREATED_BY);
        record.updated_at = raw.timestamp(FIELD_UPDATED_ON);
        record.updated_by = raw.text_or_empty(FIELD_UPDATED_BY);

        record.triggers = triggers.value;
        issues.extend(triggers.issues);

        record.activities = match activities {
            Ok(activities) => activities,
            Err(e) => {
                tracing::warn!(workflow_id = %id, error = %e, "Activities unavailable");
                issues.push(EnrichmentIssue::new(EnrichmentStage::Activities, e.into()));
                Vec::new()
            }
        };

        record.references = references.value;
        issues.extend(references.issues);

        let calls = match calls {
            Ok(edges) => edges.calls,
            Err(e) => {
                tracing::warn!(workflow_id = %id, error = %e, "Dependency scan failed");
                issues.push(EnrichmentIssue::new(EnrichmentStage::Dependencies, e.into()));
                Vec::new()
            }
        };

        record.statistics = statistics.value;
        issues.extend(statistics.issues);

        let stuck_executions = match stuck {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(workflow_id = %id, error = %e, "Stuck execution probe failed");
                issues.push(EnrichmentIssue::new(EnrichmentStage::StuckProbe, e.into()));
                0
            }
        };

        let signals = HealthSignals { stuck_executions };
        let tags = classify(&record, &signals, &self.classifier);

        Ok(CatalogEntry {
            record,
            tags,
            stuck_executions,
            calls,
            issues,
        })
    }

    // -- whole catalog -------------------------------------------------------

    /// Start a paged run. Counts the matching definitions up front.
    pub async fn start(&self, request: &BuildRequest) -> Result<CatalogRun<'_>, BuildError> {
        let cursor = PageCursor::new(request.start, request.page_size)?;
        let query = Self::definition_query(&request.filters);

        let total = self
            .scanner
            .get_total_count(WORKFLOW_VERSION, &query.filters)
            .await
            .map_err(|source| BuildError::DefinitionScan {
                resume_from: request.start,
                source,
            })?;

        self.publish(EventKind::BuildStarted {
            total,
            start: cursor.start(),
            page_size: cursor.page_size(),
        });

        Ok(CatalogRun {
            builder: self,
            query,
            cursor,
            progress: ProgressTracker::new(cursor.start(), total),
            summary: BuildSummary {
                total_available: total,
                ..BuildSummary::default()
            },
        })
    }

    /// Build every page, stopping early on cancellation or a failed page.
    ///
    /// Pages completed before the stop are kept and the dependency
    /// inversion runs over them.
    pub async fn build_all(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<CatalogOutcome, BuildError> {
        let mut run = self.start(request).await?;
        let mut entries = Vec::new();

        let interruption = loop {
            if run.is_done() {
                break None;
            }
            let resume_from = run.cursor();
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.publish(EventKind::Cancelled { resume_from });
                    break Some(Interruption::Cancelled { resume_from });
                }
                page = run.next_page() => page,
            };
            match page {
                Ok(page) => entries.extend(page),
                Err(BuildError::DefinitionScan {
                    resume_from,
                    source,
                }) => {
                    break Some(Interruption::StoreUnavailable {
                        resume_from,
                        error: source.into(),
                    });
                }
                Err(e) => return Err(e),
            }
        };

        Ok(CatalogOutcome {
            catalog: run.finish(entries),
            interruption,
        })
    }
}

// ---------------------------------------------------------------------------
// CatalogRun
// ---------------------------------------------------------------------------

/// A paged catalog build in progress.
///
/// State only advances when a page completes, so dropping a
/// [`next_page`](Self::next_page) future part-way leaves the run at the
/// start of that page.
pub struct CatalogRun<'a> {
    builder: &'a WorkflowCatalogBuilder,
    query: Query,
    cursor: PageCursor,
    progress: ProgressTracker,
    summary: BuildSummary,
}

impl CatalogRun<'_> {
    /// Offset of the next definition to scan.
    pub fn cursor(&self) -> u64 {
        self.cursor.start()
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    /// Scan and build the next page. Returns an empty list once done.
    pub async fn next_page(&mut self) -> Result<Vec<CatalogEntry>, BuildError> {
        if self.cursor.is_done() {
            return Ok(Vec::new());
        }
        let builder = self.builder;

        let page = match builder
            .scanner
            .scan(WORKFLOW_VERSION, &self.query, &self.cursor)
            .await
        {
            Ok(page) => page,
            Err(source) => {
                let resume_from = self.cursor.start();
                builder.publish(EventKind::PageFailed {
                    resume_from,
                    error: source.to_string(),
                });
                return Err(BuildError::DefinitionScan {
                    resume_from,
                    source,
                });
            }
        };

        let mut progress = self.progress;
        let mut summary = self.summary.clone();
        let mut entries = Vec::with_capacity(page.items.len());

        let mut built = futures::stream::iter(&page.items)
            .map(|raw| builder.build(raw))
            .buffered(builder.concurrency);

        while let Some(result) = built.next().await {
            match result {
                Ok(entry) => {
                    publish_issues(builder, &entry);
                    summary.record_entry(&entry);
                    entries.push(entry);
                }
                Err(e) => {
                    builder.publish(EventKind::DefinitionSkipped {
                        reason: e.to_string(),
                    });
                    summary.skipped += 1;
                }
            }
            if let Some((processed, total)) = progress.advance() {
                builder.publish(EventKind::Progress { processed, total });
            }
        }

        summary.pages += 1;
        builder.publish(EventKind::PageCompleted {
            start: page.start,
            items: page.items.len() as u64,
            next_start: page.next_start,
            done: page.done,
        });

        self.cursor.advance(&page);
        self.progress = progress;
        self.summary = summary;
        Ok(entries)
    }

    /// Dependency inversion over `entries` and final summary.
    pub fn finish(self, entries: Vec<CatalogEntry>) -> Catalog {
        let dependencies =
            DependencyMatrix::from_forward(entries.iter().map(CatalogEntry::forward_edges));

        self.builder.publish(EventKind::BuildFinished {
            summary: self.summary.clone(),
        });

        Catalog {
            generated_at: Utc::now(),
            entries,
            dependencies,
            summary: self.summary,
        }
    }
}

fn publish_issues(builder: &WorkflowCatalogBuilder, entry: &CatalogEntry) {
    let Some(degradation) = entry.degradation() else {
        return;
    };
    for issue in &entry.issues {
        if let CatalogError::StoreUnavailable {
            collection,
            message,
        } = &issue.error
        {
            builder.publish(EventKind::SourceSkipped {
                workflow_id: entry.record.id.clone(),
                stage: issue.stage.as_str().to_string(),
                collection: collection.clone(),
                error: message.clone(),
            });
        }
    }
    builder.publish(EventKind::EntryDegraded {
        workflow_id: entry.record.id.clone(),
        issues: entry.issues.len(),
        error: degradation.to_string(),
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wfcat_core::HealthTag;
    use wfcat_db::MemoryRecordStore;

    fn builder(store: MemoryRecordStore) -> WorkflowCatalogBuilder {
        WorkflowCatalogBuilder::new(Arc::new(store))
    }

    fn raw(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn header_fields_are_copied() {
        let entry = builder(MemoryRecordStore::new())
            .build(&raw(json!({
                "sys_id": "wf1", "name": "Onboarding", "table": "hr_case",
                "description": "New hire", "active": "true",
                "sys_created_on": "2023-01-02 03:04:05", "sys_created_by": "admin",
            })))
            .await
            .unwrap();

        assert_eq!(entry.record.name, "Onboarding");
        assert_eq!(entry.record.target_table, "hr_case");
        assert!(entry.record.active);
        assert_eq!(entry.record.created_by, "admin");
        assert!(entry.record.created_at.is_some());
        assert!(!entry.is_degraded());
    }

    #[tokio::test]
    async fn missing_name_uses_id_and_flags_the_entry() {
        let entry = builder(MemoryRecordStore::new())
            .build(&raw(json!({"sys_id": "wf1"})))
            .await
            .unwrap();

        assert_eq!(entry.record.name, "wf1");
        assert_eq!(entry.issues.len(), 1);
        assert_matches!(
            entry.issues[0].error,
            CatalogError::MalformedRecord { field: "name", .. }
        );
    }

    #[tokio::test]
    async fn row_without_id_is_rejected() {
        let err = builder(MemoryRecordStore::new())
            .build(&raw(json!({"name": "Orphan"})))
            .await;
        assert_matches!(err, Err(CatalogError::MalformedRecord { field: "sys_id", .. }));
    }

    #[tokio::test]
    async fn activity_failure_degrades_but_still_classifies() {
        let store = MemoryRecordStore::new();
        store.fail_collection("wf_activity");

        let entry = builder(store)
            .build(&raw(json!({"sys_id": "wf1", "name": "Flow"})))
            .await
            .unwrap();

        assert!(entry.is_degraded());
        let stages: Vec<_> = entry.issues.iter().map(|i| i.stage).collect();
        assert!(stages.contains(&EnrichmentStage::Activities));
        assert!(stages.contains(&EnrichmentStage::Dependencies));
        assert!(entry.has_tag(HealthTag::EmptyWorkflow));
    }

    #[tokio::test]
    async fn stuck_contexts_are_tagged() {
        let store = MemoryRecordStore::new().with_records(
            "wf_context",
            [json!({"workflow_version": "wf1", "state": "executing",
                    "sys_created_on": "2001-01-01 00:00:00"})],
        );
        let entry = builder(store)
            .build(&raw(json!({"sys_id": "wf1", "name": "Flow"})))
            .await
            .unwrap();

        assert_eq!(entry.stuck_executions, 1);
        assert!(entry.has_tag(HealthTag::StuckExecution));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = builder(MemoryRecordStore::new()).with_concurrency(0);
        assert_matches!(result.err(), Some(BuildError::InvalidConcurrency(0)));
    }

    #[test]
    fn definition_query_orders_by_name_then_id() {
        let query = WorkflowCatalogBuilder::definition_query(&[]);
        assert_eq!(query.filters, [Filter::eq("published", true)]);
        assert_eq!(query.order_by, [OrderBy::asc("name"), OrderBy::asc("sys_id")]);
    }
}
