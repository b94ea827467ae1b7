use wfcat_core::CatalogError;

/// Failure of a single store call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error on {collection}: {source}")]
    Database {
        collection: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Collection {collection} unavailable: {reason}")]
    Unavailable { collection: String, reason: String },

    #[error("Invalid fixture: {0}")]
    Fixture(String),
}

impl StoreError {
    pub fn database(collection: &str, source: sqlx::Error) -> Self {
        Self::Database {
            collection: collection.to_string(),
            source,
        }
    }

    /// Collection the failed call targeted, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Database { collection, .. } | Self::Unavailable { collection, .. } => {
                Some(collection)
            }
            Self::Fixture(_) => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        let collection = err.collection().unwrap_or("<store>").to_string();
        CatalogError::StoreUnavailable {
            collection,
            message: err.to_string(),
        }
    }
}
