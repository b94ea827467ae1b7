//! Loads the activities of one workflow version in execution order.

use std::sync::Arc;

use wfcat_core::collections::{
    ACTIVITY, FIELD_ACTIVITY_TYPE, FIELD_CONDITION, FIELD_DESCRIPTION, FIELD_NAME, FIELD_ORDER,
    FIELD_WORKFLOW_VERSION,
};
use wfcat_core::Activity;
use wfcat_db::{Filter, OrderBy, Query, Record, RecordStore, StoreError};

/// Order assumed for activities whose `order` is missing or not numeric.
pub const DEFAULT_ACTIVITY_ORDER: i64 = 0;

pub struct ActivityLoader {
    store: Arc<dyn RecordStore>,
}

impl ActivityLoader {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Activities sorted by `order`; equal orders keep the store's natural
    /// order.
    pub async fn load(&self, workflow_id: &str) -> Result<Vec<Activity>, StoreError> {
        let query = Query::new()
            .filter(Filter::eq(FIELD_WORKFLOW_VERSION, workflow_id))
            .order_by(OrderBy::asc(FIELD_ORDER).numeric());
        let rows = self.store.query(ACTIVITY, &query).await?;

        let mut activities: Vec<Activity> = rows.iter().map(to_activity).collect();
        // Defaulted orders must sort like their substituted value.
        activities.sort_by_key(|a| a.order);
        Ok(activities)
    }
}

fn to_activity(row: &Record) -> Activity {
    Activity {
        name: row.text_or_empty(FIELD_NAME),
        type_name: row.text_or_empty(FIELD_ACTIVITY_TYPE),
        order: row.integer(FIELD_ORDER).unwrap_or(DEFAULT_ACTIVITY_ORDER),
        condition: row.text_or_empty(FIELD_CONDITION),
        description: row.text_or_empty(FIELD_DESCRIPTION),
        source_id: row.sys_id().unwrap_or_default(),
    }
}
