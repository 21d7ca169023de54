//! Document store trait

use async_trait::async_trait;

use crate::{AuthContext, Document, DocumentWrite, Query, StoreResult};

/// Trait for document storage operations
///
/// Every call carries the caller's [`AuthContext`]; implementations evaluate
/// their [`AccessRules`](crate::AccessRules) before touching data and report
/// violations as [`StoreError::PermissionDenied`](crate::StoreError::PermissionDenied).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with a store-assigned ID and returns it as stored
    async fn add(
        &self,
        auth: &AuthContext,
        collection: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document>;

    /// Gets a document by ID
    async fn get(&self, auth: &AuthContext, collection: &str, id: &str)
        -> StoreResult<Option<Document>>;

    /// Lists matching documents in insertion order
    async fn query(&self, auth: &AuthContext, query: &Query) -> StoreResult<Vec<Document>>;

    /// Merges `write` into an existing document and returns it as stored
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update(
        &self,
        auth: &AuthContext,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document>;

    /// Deletes a document; deleting a missing document succeeds
    async fn delete(&self, auth: &AuthContext, collection: &str, id: &str) -> StoreResult<()>;
}
