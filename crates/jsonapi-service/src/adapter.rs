//! # Resource Adapter
//!
//! Storage-agnostic CRUD orchestration: per-type override resolution,
//! validation and default-field injection on create/update, and response
//! rendering (sparse-field projection plus compound-document building).
//!
//! The adapter owns no resource data; it composes a [`Storage`] backend
//! with the schema registry and an override table built once at
//! construction.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Map;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::query::{Context, Query, Request};
use crate::resource::{Document, Meta, PrimaryData, Resource, ResourceContents};
use crate::schema::{CrudAction, FieldsSchema, ResourceSchema, SchemaRegistry, ValidateArgs};
use crate::storage::{CollectionResult, Storage, TypeOverride};
use crate::validator::FieldValidator;

/// CRUD front end over one storage backend.
pub struct ResourceAdapter {
    storage: Arc<dyn Storage>,
    schemas: Arc<SchemaRegistry>,
    overrides: HashMap<String, Arc<dyn TypeOverride>>,
    validation_error_field: String,
}

impl ResourceAdapter {
    pub fn new(storage: Arc<dyn Storage>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            storage,
            schemas,
            overrides: HashMap::new(),
            validation_error_field: "detail".to_string(),
        }
    }

    /// Register a per-type override set. Later registrations for the same
    /// type replace earlier ones.
    pub fn with_override(
        mut self,
        type_name: impl Into<String>,
        handler: Arc<dyn TypeOverride>,
    ) -> Self {
        self.overrides.insert(type_name.into(), handler);
        self
    }

    /// Message field name used in rendered validation errors.
    pub fn with_validation_error_field(mut self, field: impl Into<String>) -> Self {
        self.validation_error_field = field.into();
        self
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Fetch and render a single resource.
    pub async fn get_one(&self, request: &Request) -> Result<Document, ApiError> {
        let id = required_id(request)?;
        let resource = self
            .call_get_resource(&request.type_name, id, &request.query, &request.context)
            .await?;
        self.present_resource(resource, &request.query, &request.context)
            .await
    }

    /// Fetch and render a filtered/sorted/paginated collection.
    pub async fn get(&self, request: &Request) -> Result<Document, ApiError> {
        let CollectionResult { resources, total } = self
            .call_query_resource_collection(&request.type_name, &request.query, &request.context)
            .await?;
        self.present_collection(resources, total, &request.query, &request.context)
            .await
    }

    /// Create a resource: schema defaults merged under the caller payload
    /// (caller wins), validation, then persistence.
    pub async fn create(&self, request: &Request) -> Result<Document, ApiError> {
        let schema = self.schema_for(&request.type_name)?;
        let fields = schema.resolve_fields(CrudAction::Create, &request.context);

        let (mut attributes, mut relationships) = match &fields {
            Some(fields) => self.validator(fields.clone(), CrudAction::Create).defaults(),
            None => (Map::new(), BTreeMap::new()),
        };
        attributes.extend(request.attributes.clone());
        relationships.extend(request.relationships.clone());

        let blueprint = Resource {
            type_name: request.type_name.clone(),
            id: String::new(),
            attributes,
            relationships,
        };
        self.run_validation(
            schema,
            fields,
            CrudAction::Create,
            &blueprint,
            &blueprint.attributes,
            &blueprint.relationships,
            &request.context,
        )
        .await?;

        let contents = ResourceContents {
            attributes: blueprint.attributes,
            relationships: blueprint.relationships,
        };
        let resource = self
            .call_create_resource(&request.type_name, contents, &request.query, &request.context)
            .await?;
        info!(resource_type = %request.type_name, id = %resource.id, "Created");
        self.present_resource(resource, &request.query, &request.context)
            .await
    }

    /// Update a resource: the patch is validated against the currently
    /// stored resource, then partially merged by the backend.
    pub async fn update(&self, request: &Request) -> Result<Document, ApiError> {
        let id = required_id(request)?;
        let current = self
            .call_get_resource(&request.type_name, id, &request.query, &request.context)
            .await?;

        let schema = self.schema_for(&request.type_name)?;
        let fields = schema.resolve_fields(CrudAction::Update, &request.context);
        self.run_validation(
            schema,
            fields,
            CrudAction::Update,
            &current,
            &request.attributes,
            &request.relationships,
            &request.context,
        )
        .await?;

        let contents = ResourceContents {
            attributes: request.attributes.clone(),
            relationships: request.relationships.clone(),
        };
        let resource = self
            .call_update_resource(&request.type_name, id, contents, &request.query, &request.context)
            .await?;
        info!(resource_type = %request.type_name, %id, "Updated");
        self.present_resource(resource, &request.query, &request.context)
            .await
    }

    pub async fn delete(&self, request: &Request) -> Result<(), ApiError> {
        let id = required_id(request)?;
        self.call_delete_resource(&request.type_name, id, &request.query, &request.context)
            .await?;
        info!(resource_type = %request.type_name, %id, "Deleted");
        Ok(())
    }

    fn schema_for(&self, type_name: &str) -> Result<&ResourceSchema, ApiError> {
        self.schemas.get(type_name).ok_or_else(|| {
            ApiError::bad_request()
                .with_detail(format!("Unknown resource type \"{type_name}\" provided"))
        })
    }

    fn validator(&self, fields: FieldsSchema, action: CrudAction) -> FieldValidator {
        FieldValidator::new(fields, action, &self.validation_error_field)
    }

    /// Custom hook when the schema declares one, generic field validation
    /// otherwise. Either path collapses through a single `report()`.
    #[allow(clippy::too_many_arguments)]
    async fn run_validation(
        &self,
        schema: &ResourceSchema,
        fields: Option<FieldsSchema>,
        action: CrudAction,
        resource: &Resource,
        attributes: &Map<String, serde_json::Value>,
        relationships: &BTreeMap<String, crate::resource::RelationshipData>,
        context: &Context,
    ) -> Result<(), ApiError> {
        if let Some(hook) = schema.validate_hook() {
            let validator = self.validator(fields.unwrap_or_default(), action);
            return hook
                .validate(ValidateArgs {
                    action,
                    resource,
                    attributes,
                    relationships,
                    validator,
                    context,
                })
                .await;
        }
        if let Some(fields) = fields {
            let mut validator = self.validator(fields, action);
            validator.validate(attributes, relationships);
            return validator.report();
        }
        Ok(())
    }

    // --- Override-first dispatch -------------------------------------

    pub(crate) async fn call_get_resource(
        &self,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                debug!(resource_type = %type_name, operation = "get_resource", "Override dispatch");
                handler
                    .get_resource(self.storage.as_ref(), type_name, id, query, context)
                    .await
            }
            None => self.storage.get_resource(type_name, id, query, context).await,
        }
    }

    pub(crate) async fn call_get_resource_collection(
        &self,
        type_name: &str,
        ids: &[String],
        query: &Query,
        context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                handler
                    .get_resource_collection(self.storage.as_ref(), type_name, ids, query, context)
                    .await
            }
            None => {
                self.storage
                    .get_resource_collection(type_name, ids, query, context)
                    .await
            }
        }
    }

    pub(crate) async fn call_query_resource_collection(
        &self,
        type_name: &str,
        query: &Query,
        context: &Context,
    ) -> Result<CollectionResult, ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                handler
                    .query_resource_collection(self.storage.as_ref(), type_name, query, context)
                    .await
            }
            None => {
                self.storage
                    .query_resource_collection(type_name, query, context)
                    .await
            }
        }
    }

    async fn call_create_resource(
        &self,
        type_name: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                handler
                    .create_resource(self.storage.as_ref(), type_name, contents, query, context)
                    .await
            }
            None => {
                self.storage
                    .create_resource(type_name, contents, query, context)
                    .await
            }
        }
    }

    async fn call_update_resource(
        &self,
        type_name: &str,
        id: &str,
        contents: ResourceContents,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                handler
                    .update_resource(self.storage.as_ref(), type_name, id, contents, query, context)
                    .await
            }
            None => {
                self.storage
                    .update_resource(type_name, id, contents, query, context)
                    .await
            }
        }
    }

    async fn call_delete_resource(
        &self,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<(), ApiError> {
        match self.overrides.get(type_name) {
            Some(handler) => {
                handler
                    .delete_resource(self.storage.as_ref(), type_name, id, query, context)
                    .await
            }
            None => self.storage.delete_resource(type_name, id, query, context).await,
        }
    }

    // --- Rendering ----------------------------------------------------

    async fn present_resource(
        &self,
        resource: Resource,
        query: &Query,
        context: &Context,
    ) -> Result<Document, ApiError> {
        let view = resource.project(&query.fields);
        let included = self
            .build_included(std::slice::from_ref(&view), query, context)
            .await?;
        Ok(Document {
            data: PrimaryData::One(view),
            included,
            meta: None,
        })
    }

    async fn present_collection(
        &self,
        resources: Vec<Resource>,
        total: usize,
        query: &Query,
        context: &Context,
    ) -> Result<Document, ApiError> {
        let views: Vec<Resource> = resources
            .iter()
            .map(|resource| resource.project(&query.fields))
            .collect();
        let included = self.build_included(&views, query, context).await?;
        Ok(Document {
            data: PrimaryData::Many(views),
            included,
            meta: Some(Meta { total }),
        })
    }
}

fn required_id(request: &Request) -> Result<&str, ApiError> {
    request
        .id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request().with_detail("Resource id not provided"))
}
