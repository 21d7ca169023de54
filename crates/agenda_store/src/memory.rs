//! In-memory document store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    AccessRules, AuthContext, Document, DocumentStore, DocumentWrite, Query, StoreError,
    StoreResult,
};

/// In-memory document store for tests and local development.
///
/// Collections keep documents in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    rules: AccessRules,
}

impl MemoryDocumentStore {
    /// Creates an empty store enforcing `rules`.
    pub fn new(rules: AccessRules) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            rules,
        }
    }
}

/// Generates a document ID.
pub(crate) fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(
        &self,
        auth: &AuthContext,
        collection: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document> {
        self.rules.check_create(collection, auth, &write)?;

        let now = Utc::now();
        let document = Document {
            id: new_document_id(),
            fields: write.resolve(now),
            create_time: now,
            update_time: now,
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());

        tracing::debug!(collection = %collection, id = %document.id, "Document created");
        Ok(document)
    }

    async fn get(
        &self,
        auth: &AuthContext,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let Some(document) = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
        else {
            return Ok(None);
        };

        self.rules.check_read(collection, auth, &document.fields)?;
        Ok(Some(document.clone()))
    }

    async fn query(&self, auth: &AuthContext, query: &Query) -> StoreResult<Vec<Document>> {
        self.rules.check_query(auth, query)?;

        let collections = self.collections.read().await;
        Ok(collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(&doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(
        &self,
        auth: &AuthContext,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document> {
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        self.rules
            .check_update(collection, auth, &document.fields, &write)?;

        let now = Utc::now();
        document.fields.extend(write.resolve(now));
        document.update_time = now;

        tracing::debug!(collection = %collection, id = %id, "Document updated");
        Ok(document.clone())
    }

    async fn delete(&self, auth: &AuthContext, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(());
        };
        let Some(index) = docs.iter().position(|doc| doc.id == id) else {
            return Ok(());
        };

        self.rules.check_delete(collection, auth, &docs[index].fields)?;
        docs.remove(index);

        tracing::debug!(collection = %collection, id = %id, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn open_store() -> MemoryDocumentStore {
        MemoryDocumentStore::new(AccessRules::new())
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_timestamps() {
        let store = open_store();
        let auth = AuthContext::anonymous();

        let doc = store
            .add(
                &auth,
                "notes",
                DocumentWrite::new().set("text", "a").server_timestamp("createdAt"),
            )
            .await
            .unwrap();

        assert!(!doc.id.is_empty());
        assert_eq!(doc.create_time, doc.update_time);
        assert_eq!(
            doc.get_str("createdAt"),
            Some(crate::timestamp_value(doc.create_time).as_str().unwrap())
        );

        let fetched = store.get(&auth, "notes", &doc.id).await.unwrap();
        assert_eq!(fetched, Some(doc));
    }

    #[tokio::test]
    async fn test_query_preserves_insertion_order() {
        let store = open_store();
        let auth = AuthContext::anonymous();

        for n in 0..5 {
            store
                .add(&auth, "notes", DocumentWrite::new().set("n", n).set("even", n % 2 == 0))
                .await
                .unwrap();
        }

        let evens = store
            .query(&auth, &Query::new("notes").where_eq("even", true))
            .await
            .unwrap();
        let ns: Vec<_> = evens.iter().map(|d| d.get("n").cloned().unwrap()).collect();
        assert_eq!(ns, vec![json!(0), json!(2), json!(4)]);

        let none = store.query(&auth, &Query::new("missing")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = open_store();
        let auth = AuthContext::anonymous();
        let doc = store
            .add(&auth, "notes", DocumentWrite::new().set("a", 1).set("b", 2))
            .await
            .unwrap();

        let updated = store
            .update(&auth, "notes", &doc.id, DocumentWrite::new().set("b", 3))
            .await
            .unwrap();

        assert_eq!(updated.get("a"), Some(&json!(1)));
        assert_eq!(updated.get("b"), Some(&json!(3)));
        assert_eq!(updated.create_time, doc.create_time);
        assert!(updated.update_time >= doc.update_time);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = open_store();
        let result = store
            .update(&AuthContext::anonymous(), "notes", "nope", DocumentWrite::new())
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = open_store();
        let auth = AuthContext::anonymous();
        let doc = store
            .add(&auth, "notes", DocumentWrite::new().set("a", 1))
            .await
            .unwrap();

        store.delete(&auth, "notes", &doc.id).await.unwrap();
        store.delete(&auth, "notes", &doc.id).await.unwrap();
        store.delete(&auth, "other", "x").await.unwrap();

        assert_eq!(store.get(&auth, "notes", &doc.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rules_are_enforced() {
        let store = MemoryDocumentStore::new(AccessRules::new().owner_scoped("notes", "owner"));
        let alice = AuthContext::user("alice");
        let bob = AuthContext::user("bob");

        let doc = store
            .add(&alice, "notes", DocumentWrite::new().set("owner", "alice"))
            .await
            .unwrap();

        assert!(matches!(
            store.get(&bob, "notes", &doc.id).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(matches!(
            store
                .update(&bob, "notes", &doc.id, DocumentWrite::new().set("x", 1))
                .await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(matches!(
            store.delete(&bob, "notes", &doc.id).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(store.get(&alice, "notes", &doc.id).await.unwrap().is_some());
    }
}
