//! Source path resolution
//!
//! Decides whether a source path names a concrete object or may be a
//! virtual directory, using exactly one lookup.

use crate::error::Result;
use crate::path::ObjectLocation;
use crate::traits::{ObjectInfo, ObjectStore};

/// What a source path turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An object exists at exactly this key
    Object(ObjectInfo),
    /// No object at this key; it may be a prefix with children
    Prefix,
}

/// Look the source up once
///
/// `NotFound` becomes [`Resolution::Prefix`]; every other error is returned
/// unchanged.
pub async fn resolve(store: &dyn ObjectStore, source: &ObjectLocation) -> Result<Resolution> {
    match store.head_object(source).await {
        Ok(info) => Ok(Resolution::Object(info)),
        Err(e) if e.is_not_found() => {
            tracing::debug!(%source, "no object at key, treating as prefix");
            Ok(Resolution::Prefix)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::traits::MockObjectStore;

    #[tokio::test]
    async fn test_existing_object_resolves_to_object() {
        let mut store = MockObjectStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Ok(ObjectInfo::file("reports/jan.csv", 4096)));

        let source = ObjectLocation::new("reports", "reports/jan.csv");
        let resolution = resolve(&store, &source).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Object(ObjectInfo::file("reports/jan.csv", 4096))
        );
    }

    #[tokio::test]
    async fn test_not_found_resolves_to_prefix() {
        let mut store = MockObjectStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|loc| Err(Error::NotFound(loc.to_string())));

        let source = ObjectLocation::new("data", "reports");
        assert_eq!(resolve(&store, &source).await.unwrap(), Resolution::Prefix);
    }

    #[tokio::test]
    async fn test_other_errors_are_propagated() {
        let mut store = MockObjectStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Err(Error::Auth("AccessDenied".into())));

        let source = ObjectLocation::new("data", "reports");
        let err = resolve(&store, &source).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
