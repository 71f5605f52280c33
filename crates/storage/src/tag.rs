//! Tag persistence.
//!
//! Tags label users the way roles group them, but carry no access
//! semantics: nothing resolves permissions through a tag. The store is
//! shaped like the role store so tag listings ride the same keyset
//! pagination machinery.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    pagination::{self, PageRequest, RowFilter, SortDirection},
    types::TagId,
};

/// A tag row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct TagRecord {
    /// Tag ID (primary key).
    #[builder(into)]
    pub id: TagId,

    /// Human-readable label shown in listings. Not unique.
    #[builder(into)]
    pub display_name: String,

    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Sort orders supported by tag listings.
///
/// Every order tie-breaks on the tag ID in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOrder {
    /// By tag ID, smallest first.
    IdAscending,
    /// By tag ID, largest first.
    IdDescending,
    /// By display name, lexicographic.
    DisplayNameAscending,
    /// By display name, reverse lexicographic.
    DisplayNameDescending,
}

/// Persistence layer for tags.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Persists a new tag.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the ID is already taken.
    async fn create(&self, tag: &TagRecord) -> StorageResult<()>;

    /// Retrieves a tag by ID.
    async fn get(&self, id: TagId) -> StorageResult<Option<TagRecord>>;

    /// Retrieves several tags at once, aligned with `ids`.
    async fn get_many(&self, ids: &[TagId]) -> StorageResult<Vec<Option<TagRecord>>>;

    /// Counts tags matching the filter, or all tags without one.
    async fn count(&self, filter: Option<RowFilter<TagRecord>>) -> StorageResult<u64>;

    /// Returns one page of tags under the keyset contract.
    async fn list(
        &self,
        page: PageRequest,
        order: TagOrder,
        filter: Option<RowFilter<TagRecord>>,
    ) -> StorageResult<Vec<TagRecord>>;
}

/// In-memory implementation of [`TagStore`] for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryTagStore {
    rows: Arc<RwLock<HashMap<TagId, TagRecord>>>,
}

impl MemoryTagStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    #[tracing::instrument(skip(self, tag), fields(id = %tag.id))]
    async fn create(&self, tag: &TagRecord) -> StorageResult<()> {
        let mut rows = self.rows.write();

        if rows.contains_key(&tag.id) {
            return Err(StorageError::already_exists(format!("tag/{}", tag.id)));
        }
        rows.insert(tag.id, tag.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: TagId) -> StorageResult<Option<TagRecord>> {
        let rows = self.rows.read();
        Ok(rows.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(&self, ids: &[TagId]) -> StorageResult<Vec<Option<TagRecord>>> {
        let rows = self.rows.read();
        Ok(ids.iter().map(|id| rows.get(id).cloned()).collect())
    }

    #[tracing::instrument(skip(self, filter))]
    async fn count(&self, filter: Option<RowFilter<TagRecord>>) -> StorageResult<u64> {
        let rows = self.rows.read();
        let count = rows.values().filter(|row| filter.as_ref().is_none_or(|f| f(row))).count();
        Ok(count as u64)
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(
        &self,
        page: PageRequest,
        order: TagOrder,
        filter: Option<RowFilter<TagRecord>>,
    ) -> StorageResult<Vec<TagRecord>> {
        let rows = self.rows.read();
        let snapshot: Vec<&TagRecord> =
            rows.values().filter(|row| filter.as_ref().is_none_or(|f| f(row))).collect();

        let page_rows = match order {
            TagOrder::IdAscending => pagination::list_page(
                &snapshot,
                |tag| tag.id.0,
                |tag| tag.id.0,
                SortDirection::Ascending,
                page,
            ),
            TagOrder::IdDescending => pagination::list_page(
                &snapshot,
                |tag| tag.id.0,
                |tag| tag.id.0,
                SortDirection::Descending,
                page,
            ),
            TagOrder::DisplayNameAscending => pagination::list_page(
                &snapshot,
                |tag| tag.display_name.clone(),
                |tag| tag.id.0,
                SortDirection::Ascending,
                page,
            ),
            TagOrder::DisplayNameDescending => pagination::list_page(
                &snapshot,
                |tag| tag.display_name.clone(),
                |tag| tag.id.0,
                SortDirection::Descending,
                page,
            ),
        };

        Ok(page_rows.into_iter().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn tag(id: i64, display_name: &str) -> TagRecord {
        TagRecord::builder().id(id).display_name(display_name).build()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryTagStore::new();
        let beta = tag(1, "beta-cohort");

        store.create(&beta).await.unwrap();

        assert_eq!(store.get(TagId::from(1)).await.unwrap(), Some(beta));
        assert_eq!(store.get(TagId::from(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = MemoryTagStore::new();
        store.create(&tag(1, "beta-cohort")).await.unwrap();

        let err = store.create(&tag(1, "other")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_list_id_descending() {
        let store = MemoryTagStore::new();
        for id in 1..=4 {
            store.create(&tag(id, "label")).await.unwrap();
        }

        let page =
            store.list(PageRequest::new(1, 2), TagOrder::IdDescending, None).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_filtered_count_and_list_agree() {
        let store = MemoryTagStore::new();
        store.create(&tag(1, "beta")).await.unwrap();
        store.create(&tag(2, "gamma")).await.unwrap();
        store.create(&tag(3, "beta")).await.unwrap();

        let filter: RowFilter<TagRecord> = Arc::new(|t: &TagRecord| t.display_name == "beta");
        let count = store.count(Some(filter.clone())).await.unwrap();
        let page = store
            .list(PageRequest::new(0, 10), TagOrder::IdAscending, Some(filter))
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|t| t.display_name == "beta"));
    }
}
