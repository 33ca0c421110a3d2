//! # Storage Contract
//!
//! The CRUD surface a storage backend must provide, plus the per-type
//! override mechanism. [`Storage`] carries the generic primitives; a
//! [`TypeOverride`] registered for one resource type replaces any subset
//! of them for that type, and each of its methods falls back to the
//! generic primitive by default. The adapter resolves overrides on every
//! CRUD call and relationship fetch; this is the extension point the
//! whole service is built around.
//!
//! Every [`Storage`] method has a default body that fails with an explicit
//! "not implemented" error: a backend that does not supply a primitive
//! fails fatally, never no-ops.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::query::{Context, Query};
use crate::resource::{Resource, ResourceContents};

/// Result of querying a collection: the page of resources after
/// filter/sort/pagination plus the total count after filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult {
    pub resources: Vec<Resource>,
    pub total: usize,
}

/// The storage-backend contract.
///
/// `query` and `context` are forwarded untouched on every call; the core
/// never interprets the context. Implementations must honor the
/// filter → sort → paginate order in `query_resource_collection` and
/// report missing ids through not-found errors.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch one resource; fails not-found when absent.
    async fn get_resource(
        &self,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        let _ = (id, query, context);
        Err(ApiError::not_implemented("get_resource", type_name))
    }

    /// Fetch resources by id list; fails not-found naming every missing id.
    async fn get_resource_collection(
        &self,
        type_name: &str,
        ids: &[String],
        query: &Query,
        context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        let _ = (ids, query, context);
        Err(ApiError::not_implemented("get_resource_collection", type_name))
    }

    /// Apply `filter`, then `sort`, then `page`, in that fixed order.
    async fn query_resource_collection(
        &self,
        type_name: &str,
        query: &Query,
        context: &Context,
    ) -> Result<CollectionResult, ApiError> {
        let _ = (query, context);
        Err(ApiError::not_implemented("query_resource_collection", type_name))
    }

    /// Persist a new resource; the backend assigns the id.
    async fn create_resource(
        &self,
        type_name: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        let _ = (contents, query, context);
        Err(ApiError::not_implemented("create_resource", type_name))
    }

    /// Partial merge: supplied attribute/relationship keys overwrite,
    /// everything else stays untouched.
    async fn update_resource(
        &self,
        type_name: &str,
        id: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        let _ = (id, contents, query, context);
        Err(ApiError::not_implemented("update_resource", type_name))
    }

    /// Remove a resource. The backend is responsible for severing
    /// relationship pointers in other resources that reference it.
    async fn delete_resource(
        &self,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<(), ApiError> {
        let _ = (id, query, context);
        Err(ApiError::not_implemented("delete_resource", type_name))
    }
}

/// Per-type method overrides.
///
/// Register one of these for a resource type to special-case any subset of
/// the CRUD surface without reimplementing the rest: every method defaults
/// to delegating to the generic [`Storage`] primitive it is handed, so an
/// implementation typically overrides one method, calls back into
/// `storage`, and post-processes the result.
#[async_trait]
pub trait TypeOverride: Send + Sync {
    async fn get_resource(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        storage.get_resource(type_name, id, query, context).await
    }

    async fn get_resource_collection(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        ids: &[String],
        query: &Query,
        context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        storage
            .get_resource_collection(type_name, ids, query, context)
            .await
    }

    async fn query_resource_collection(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        query: &Query,
        context: &Context,
    ) -> Result<CollectionResult, ApiError> {
        storage
            .query_resource_collection(type_name, query, context)
            .await
    }

    async fn create_resource(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        storage
            .create_resource(type_name, contents, query, context)
            .await
    }

    async fn update_resource(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        id: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        storage
            .update_resource(type_name, id, contents, query, context)
            .await
    }

    async fn delete_resource(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<(), ApiError> {
        storage.delete_resource(type_name, id, query, context).await
    }
}
