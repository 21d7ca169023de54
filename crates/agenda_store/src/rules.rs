//! Access rules evaluated by the store.

use std::collections::HashMap;

use serde_json::Value;

use crate::{DocumentWrite, FieldValue, Fields, Query, StoreError, StoreResult};

/// Identity of the caller of a store operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    uid: Option<String>,
}

impl AuthContext {
    /// A caller with no identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in caller.
    pub fn user(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    /// Returns the caller's user ID.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

/// Rule for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionRule {
    /// Anyone may read and write.
    Open,
    /// Documents belong to the user named by `owner_field`.
    OwnerScoped {
        /// Field holding the owner's user ID.
        owner_field: String,
    },
}

static OPEN: CollectionRule = CollectionRule::Open;

/// Per-collection access rules. Collections without a rule are open.
#[derive(Debug, Clone, Default)]
pub struct AccessRules {
    collections: HashMap<String, CollectionRule>,
}

impl AccessRules {
    /// Creates rules with every collection open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `collection` to owner-only access through `owner_field`.
    ///
    /// Creates must name the caller as owner, queries must filter on the
    /// caller, reads, updates and deletes need the stored owner to be the
    /// caller, and updates cannot change the owner.
    pub fn owner_scoped(
        mut self,
        collection: impl Into<String>,
        owner_field: impl Into<String>,
    ) -> Self {
        self.collections.insert(
            collection.into(),
            CollectionRule::OwnerScoped {
                owner_field: owner_field.into(),
            },
        );
        self
    }

    /// Returns the rule for `collection`.
    pub fn rule(&self, collection: &str) -> &CollectionRule {
        self.collections.get(collection).unwrap_or(&OPEN)
    }

    /// Authorizes creating a document.
    pub fn check_create(
        &self,
        collection: &str,
        auth: &AuthContext,
        write: &DocumentWrite,
    ) -> StoreResult<()> {
        let CollectionRule::OwnerScoped { owner_field } = self.rule(collection) else {
            return Ok(());
        };
        let uid = require_uid(collection, auth)?;

        match write.get(owner_field) {
            Some(FieldValue::Value(Value::String(owner))) if owner == uid => Ok(()),
            _ => Err(deny(
                collection,
                format!("new documents must set {} to the caller", owner_field),
            )),
        }
    }

    /// Authorizes a query.
    pub fn check_query(&self, auth: &AuthContext, query: &Query) -> StoreResult<()> {
        let collection = query.collection.as_str();
        let CollectionRule::OwnerScoped { owner_field } = self.rule(collection) else {
            return Ok(());
        };
        let uid = require_uid(collection, auth)?;

        match query.equality_on(owner_field) {
            Some(Value::String(owner)) if owner == uid => Ok(()),
            _ => Err(deny(
                collection,
                format!("queries must filter {} on the caller", owner_field),
            )),
        }
    }

    /// Authorizes reading a stored document.
    pub fn check_read(
        &self,
        collection: &str,
        auth: &AuthContext,
        stored: &Fields,
    ) -> StoreResult<()> {
        self.check_owner(collection, auth, stored)
    }

    /// Authorizes updating a stored document with `write`.
    pub fn check_update(
        &self,
        collection: &str,
        auth: &AuthContext,
        stored: &Fields,
        write: &DocumentWrite,
    ) -> StoreResult<()> {
        self.check_owner(collection, auth, stored)?;

        if let CollectionRule::OwnerScoped { owner_field } = self.rule(collection) {
            let unchanged = match write.get(owner_field) {
                None => true,
                Some(FieldValue::Value(value)) => stored.get(owner_field) == Some(value),
                Some(FieldValue::ServerTimestamp) => false,
            };
            if !unchanged {
                return Err(deny(collection, format!("{} cannot be changed", owner_field)));
            }
        }

        Ok(())
    }

    /// Authorizes deleting a stored document.
    pub fn check_delete(
        &self,
        collection: &str,
        auth: &AuthContext,
        stored: &Fields,
    ) -> StoreResult<()> {
        self.check_owner(collection, auth, stored)
    }

    fn check_owner(
        &self,
        collection: &str,
        auth: &AuthContext,
        stored: &Fields,
    ) -> StoreResult<()> {
        let CollectionRule::OwnerScoped { owner_field } = self.rule(collection) else {
            return Ok(());
        };
        let uid = require_uid(collection, auth)?;

        match stored.get(owner_field) {
            Some(Value::String(owner)) if owner == uid => Ok(()),
            _ => Err(deny(collection, "document belongs to another user")),
        }
    }
}

fn require_uid<'a>(collection: &str, auth: &'a AuthContext) -> StoreResult<&'a str> {
    auth.uid()
        .ok_or_else(|| deny(collection, "authentication required"))
}

fn deny(collection: &str, reason: impl Into<String>) -> StoreError {
    let reason = reason.into();
    tracing::warn!(collection = %collection, reason = %reason, "Store request denied");
    StoreError::permission_denied(format!("{}: {}", collection, reason))
}
