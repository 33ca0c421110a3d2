//! In-memory storage backend.
//!
//! Resources live in a per-type map guarded by one async read/write lock;
//! each type gets an id sequence seeded past the largest numeric id found
//! in its seed dataset. Collection queries apply filter, then sort, then
//! pagination, and report the post-filter total.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use jsonapi_service::{
    ApiError, CollectionResult, Context, Query, Resource, ResourceContents, SchemaRegistry, Sort,
    SortOrder, Storage,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Mutation kinds reported to a [`PersistHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistAction {
    Create,
    Update,
    Delete,
}

/// Notification point for embedders that mirror the in-memory dataset to
/// some durable medium. Called after every successful mutation; the
/// default implementation does nothing.
#[async_trait]
pub trait PersistHook: Send + Sync {
    async fn persist(&self, action: PersistAction, resource: &Resource) -> Result<(), ApiError> {
        let _ = (action, resource);
        Ok(())
    }
}

/// Memory-backed [`Storage`] implementation.
pub struct MemoryStorage {
    schemas: Arc<SchemaRegistry>,
    dataset: RwLock<HashMap<String, BTreeMap<String, Resource>>>,
    sequences: HashMap<String, AtomicU64>,
    persist: Option<Arc<dyn PersistHook>>,
}

impl MemoryStorage {
    /// Build a backend seeded from each schema's dataset supplier.
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        let mut dataset: HashMap<String, BTreeMap<String, Resource>> = HashMap::new();
        let mut sequences = HashMap::new();
        for type_name in schemas.types() {
            let seeded: BTreeMap<String, Resource> = schemas
                .get(type_name)
                .map(|schema| schema.seed_dataset())
                .unwrap_or_default()
                .into_iter()
                .map(|resource| (resource.id.clone(), resource))
                .collect();
            let next_id = seeded
                .keys()
                .filter_map(|id| id.parse::<u64>().ok())
                .max()
                .unwrap_or(0)
                + 1;
            sequences.insert(type_name.to_string(), AtomicU64::new(next_id));
            dataset.insert(type_name.to_string(), seeded);
        }
        Self {
            schemas,
            dataset: RwLock::new(dataset),
            sequences,
            persist: None,
        }
    }

    pub fn with_persist_hook(mut self, hook: Arc<dyn PersistHook>) -> Self {
        self.persist = Some(hook);
        self
    }

    fn next_id(&self, type_name: &str) -> Result<String, ApiError> {
        self.sequences
            .get(type_name)
            .map(|sequence| sequence.fetch_add(1, AtomicOrdering::Relaxed).to_string())
            .ok_or_else(|| {
                ApiError::internal_error()
                    .with_message(format!("No id sequence for resource type \"{type_name}\""))
            })
    }

    async fn notify(&self, action: PersistAction, resource: &Resource) -> Result<(), ApiError> {
        if let Some(hook) = &self.persist {
            hook.persist(action, resource).await?;
        }
        Ok(())
    }
}

fn not_found(type_name: &str, id: &str) -> ApiError {
    ApiError::resource_not_found()
        .with_detail(format!("Cannot find resource \"{type_name}\" with id \"{id}\""))
}

/// Ordering over attribute values: numbers numerically, everything else by
/// its canonical string rendering.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn sort_key<'a>(resource: &'a Resource, field: &str) -> Option<&'a Value> {
    resource.attributes.get(field)
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_resource(
        &self,
        type_name: &str,
        id: &str,
        _query: &Query,
        _context: &Context,
    ) -> Result<Resource, ApiError> {
        let dataset = self.dataset.read().await;
        dataset
            .get(type_name)
            .and_then(|collection| collection.get(id))
            .cloned()
            .ok_or_else(|| not_found(type_name, id))
    }

    async fn get_resource_collection(
        &self,
        type_name: &str,
        ids: &[String],
        _query: &Query,
        _context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        let dataset = self.dataset.read().await;
        let collection = dataset.get(type_name);

        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            match collection.and_then(|collection| collection.get(id)) {
                Some(resource) => found.push(resource.clone()),
                None => missing.push(id.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(ApiError::resource_not_found().with_detail(format!(
                "Cannot find resources of type \"{type_name}\" with references \"{}\"",
                missing.join(", ")
            )));
        }
        Ok(found)
    }

    async fn query_resource_collection(
        &self,
        type_name: &str,
        query: &Query,
        _context: &Context,
    ) -> Result<CollectionResult, ApiError> {
        let dataset = self.dataset.read().await;
        let mut resources: Vec<Resource> = dataset
            .get(type_name)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        drop(dataset);

        let schema = self.schemas.get(type_name);

        for (name, value) in &query.filter {
            if let Some(predicate) = schema.and_then(|schema| schema.find_filter(name)) {
                resources.retain(|resource| predicate(resource, value));
            }
        }
        let total = resources.len();

        if let Some(sort_name) = &query.sort {
            match schema.and_then(|schema| schema.find_sort(sort_name)) {
                Some(Sort::Field { field, order }) => {
                    resources.sort_by(|a, b| {
                        let ordering = if field == "id" {
                            a.id.cmp(&b.id)
                        } else {
                            compare_values(sort_key(a, field), sort_key(b, field))
                        };
                        match order {
                            SortOrder::Ascending => ordering,
                            SortOrder::Descending => ordering.reverse(),
                        }
                    });
                }
                Some(Sort::Comparator(comparator)) => {
                    resources.sort_by(|a, b| comparator(a, b));
                }
                None => {}
            }
        }

        if let Some(page) = &query.page {
            let start = page.offset.min(resources.len());
            // The window bounds come from caller input; saturate.
            let end = page
                .limit
                .map(|limit| start.saturating_add(limit).min(resources.len()))
                .unwrap_or(resources.len());
            resources = resources[start..end].to_vec();
        }
        debug!(resource_type = %type_name, returned = resources.len(), total, "Queried collection");
        Ok(CollectionResult { resources, total })
    }

    async fn create_resource(
        &self,
        type_name: &str,
        contents: ResourceContents,
        _query: &Query,
        _context: &Context,
    ) -> Result<Resource, ApiError> {
        let id = self.next_id(type_name)?;
        let resource = Resource {
            type_name: type_name.to_string(),
            id: id.clone(),
            attributes: contents.attributes,
            relationships: contents.relationships,
        };
        {
            let mut dataset = self.dataset.write().await;
            dataset
                .entry(type_name.to_string())
                .or_default()
                .insert(id, resource.clone());
        }
        self.notify(PersistAction::Create, &resource).await?;
        Ok(resource)
    }

    async fn update_resource(
        &self,
        type_name: &str,
        id: &str,
        contents: ResourceContents,
        _query: &Query,
        _context: &Context,
    ) -> Result<Resource, ApiError> {
        let updated = {
            let mut dataset = self.dataset.write().await;
            let resource = dataset
                .get_mut(type_name)
                .and_then(|collection| collection.get_mut(id))
                .ok_or_else(|| not_found(type_name, id))?;
            resource.attributes.extend(contents.attributes);
            resource.relationships.extend(contents.relationships);
            resource.clone()
        };
        self.notify(PersistAction::Update, &updated).await?;
        Ok(updated)
    }

    async fn delete_resource(
        &self,
        type_name: &str,
        id: &str,
        _query: &Query,
        _context: &Context,
    ) -> Result<(), ApiError> {
        let removed = {
            let mut dataset = self.dataset.write().await;
            let removed = dataset
                .get_mut(type_name)
                .and_then(|collection| collection.remove(id))
                .ok_or_else(|| not_found(type_name, id))?;

            // Sever every relationship pointer at the removed resource.
            for collection in dataset.values_mut() {
                for resource in collection.values_mut() {
                    for relation in resource.relationships.values_mut() {
                        relation.remove_pointer(type_name, id);
                    }
                }
            }
            removed
        };
        self.notify(PersistAction::Delete, &removed).await?;
        Ok(())
    }
}
