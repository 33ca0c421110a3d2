//! # Service Api
//!
//! The untrusted front door. [`ServiceApi`] accepts raw JSON input,
//! sanitizes it into a [`Request`] and dispatches to the adapter bound to
//! the requested resource type. Nothing below this layer ever sees caller
//! input that has not been normalized here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::instrument;

use crate::adapter::ResourceAdapter;
use crate::error::ApiError;
use crate::query::{Context, Page, Query, Request};
use crate::resource::{Document, Pointer, RelationshipData};
use crate::schema::SchemaRegistry;

/// How the `page` query object is interpreted.
///
/// Both strategies normalize to the same [`Page`] window; key names are
/// configurable so the service can mirror whatever parameter names the
/// transport exposes.
#[derive(Debug, Clone)]
pub enum PaginationStrategy {
    /// `page[offset]` / `page[limit]` style.
    OffsetBased { offset_key: String, limit_key: String },
    /// `page[number]` / `page[size]` style, converted to an offset window.
    /// Without a limit this strategy disables pagination entirely.
    PageBased { number_key: String, limit_key: String },
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        PaginationStrategy::OffsetBased {
            offset_key: "offset".to_string(),
            limit_key: "limit".to_string(),
        }
    }
}

/// The public service facade.
pub struct ServiceApi {
    schemas: Arc<SchemaRegistry>,
    adapter: Arc<ResourceAdapter>,
    type_adapters: HashMap<String, Arc<ResourceAdapter>>,
    pagination: PaginationStrategy,
}

impl ServiceApi {
    pub fn new(adapter: Arc<ResourceAdapter>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            schemas,
            adapter,
            type_adapters: HashMap::new(),
            pagination: PaginationStrategy::default(),
        }
    }

    pub fn with_pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination = strategy;
        self
    }

    /// Pin a resource type to its own adapter instead of the default one.
    pub fn with_type_adapter(
        mut self,
        type_name: impl Into<String>,
        adapter: Arc<ResourceAdapter>,
    ) -> Self {
        self.type_adapters.insert(type_name.into(), adapter);
        self
    }

    /// Fetch one resource (input carries an id) or a collection.
    #[instrument(skip_all, fields(operation = "get"))]
    pub async fn get(&self, input: Value, context: Context) -> Result<Document, ApiError> {
        let request = self.sanitize(input, context, false)?;
        let adapter = self.adapter_for(&request.type_name);
        if request.id.is_some() {
            adapter.get_one(&request).await
        } else {
            adapter.get(&request).await
        }
    }

    #[instrument(skip_all, fields(operation = "create"))]
    pub async fn create(&self, input: Value, context: Context) -> Result<Document, ApiError> {
        let request = self.sanitize(input, context, false)?;
        self.adapter_for(&request.type_name).create(&request).await
    }

    #[instrument(skip_all, fields(operation = "update"))]
    pub async fn update(&self, input: Value, context: Context) -> Result<Document, ApiError> {
        let request = self.sanitize(input, context, true)?;
        self.adapter_for(&request.type_name).update(&request).await
    }

    #[instrument(skip_all, fields(operation = "delete"))]
    pub async fn delete(&self, input: Value, context: Context) -> Result<(), ApiError> {
        let request = self.sanitize(input, context, true)?;
        self.adapter_for(&request.type_name).delete(&request).await
    }

    fn adapter_for(&self, type_name: &str) -> &ResourceAdapter {
        self.type_adapters
            .get(type_name)
            .unwrap_or(&self.adapter)
            .as_ref()
    }

    /// Turn raw caller JSON into a trusted [`Request`].
    ///
    /// Type problems fail immediately; every other malformed section adds
    /// an entry to one shared collector so the caller sees all payload
    /// problems at once.
    fn sanitize(
        &self,
        input: Value,
        context: Context,
        check_id: bool,
    ) -> Result<Request, ApiError> {
        let Value::Object(input) = input else {
            return Err(ApiError::bad_request().with_detail("Invalid input parameters"));
        };

        let type_name = match input.get("type").and_then(Value::as_str) {
            Some(type_name) if !type_name.is_empty() => type_name.to_string(),
            _ => {
                return Err(ApiError::bad_request().with_detail("Resource type not provided"));
            }
        };
        if !self.schemas.contains(&type_name) {
            return Err(ApiError::bad_request()
                .with_detail(format!("Unknown resource type \"{type_name}\" provided")));
        }

        let mut errors = ApiError::bad_request();

        let id = match input.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => {
                if check_id {
                    errors.add_error("Resource id not provided");
                }
                None
            }
        };

        let attributes = self.sanitize_attributes(&input, &mut errors);
        let relationships = self.sanitize_relationships(&input, &mut errors);

        let query = match input.get("query") {
            Some(Value::Object(query)) => Query {
                fields: self.sanitize_fields(query, &mut errors),
                include: self.sanitize_include(query, &mut errors),
                page: self.sanitize_page(query, &mut errors),
                filter: self.sanitize_filter(query, &mut errors),
                sort: self.sanitize_sort(query, &mut errors),
            },
            _ => Query::default(),
        };

        errors.report()?;
        Ok(Request {
            type_name,
            id,
            attributes,
            relationships,
            query,
            context,
        })
    }

    fn sanitize_attributes(
        &self,
        input: &Map<String, Value>,
        errors: &mut ApiError,
    ) -> Map<String, Value> {
        match input.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attributes)) => attributes.clone(),
            Some(_) => {
                errors.add_error("Invalid attributes payload");
                Map::new()
            }
        }
    }

    fn sanitize_relationships(
        &self,
        input: &Map<String, Value>,
        errors: &mut ApiError,
    ) -> BTreeMap<String, RelationshipData> {
        let mut relationships = BTreeMap::new();
        let entries = match input.get("relationships") {
            None | Some(Value::Null) => return relationships,
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                errors.add_error("Invalid relationships payload");
                return relationships;
            }
        };
        for (name, entry) in entries {
            match parse_relationship(entry) {
                Some(data) => {
                    relationships.insert(name.clone(), data);
                }
                None => {
                    errors.add_error(format!("Invalid relationships payload: {name}"));
                }
            }
        }
        relationships
    }

    fn sanitize_fields(
        &self,
        query: &Map<String, Value>,
        errors: &mut ApiError,
    ) -> HashMap<String, Vec<String>> {
        let mut fields = HashMap::new();
        let entries = match query.get("fields") {
            None | Some(Value::Null) => return fields,
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                errors.add_error("Invalid fields payload");
                return fields;
            }
        };
        for (type_name, field_list) in entries {
            match parse_name_list(field_list) {
                Some(list) => {
                    fields.insert(type_name.clone(), list);
                }
                None => {
                    errors.add_error("Invalid fields payload");
                }
            }
        }
        fields
    }

    fn sanitize_include(
        &self,
        query: &Map<String, Value>,
        errors: &mut ApiError,
    ) -> Option<Vec<String>> {
        match query.get("include") {
            None | Some(Value::Null) => None,
            Some(include) => match parse_name_list(include) {
                Some(paths) => Some(paths),
                None => {
                    errors.add_error("Invalid include payload");
                    None
                }
            },
        }
    }

    fn sanitize_page(&self, query: &Map<String, Value>, errors: &mut ApiError) -> Option<Page> {
        let page = match query.get("page") {
            None | Some(Value::Null) => return None,
            Some(Value::Object(page)) => page,
            Some(_) => {
                errors.add_error("Invalid pagination request");
                return None;
            }
        };
        match &self.pagination {
            PaginationStrategy::OffsetBased { offset_key, limit_key } => Some(Page {
                offset: coerce_count(page.get(offset_key)).unwrap_or(0),
                limit: coerce_count(page.get(limit_key)).filter(|limit| *limit != 0),
            }),
            PaginationStrategy::PageBased { number_key, limit_key } => {
                let limit = coerce_count(page.get(limit_key)).filter(|limit| *limit != 0)?;
                let number = coerce_count(page.get(number_key))
                    .filter(|number| *number != 0)
                    .unwrap_or(1);
                // Caller-supplied values; saturate instead of overflowing.
                Some(Page {
                    offset: number.saturating_sub(1).saturating_mul(limit),
                    limit: Some(limit),
                })
            }
        }
    }

    fn sanitize_filter(
        &self,
        query: &Map<String, Value>,
        errors: &mut ApiError,
    ) -> Map<String, Value> {
        match query.get("filter") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(filter)) => filter.clone(),
            Some(_) => {
                errors.add_error("Invalid filter request");
                Map::new()
            }
        }
    }

    fn sanitize_sort(&self, query: &Map<String, Value>, errors: &mut ApiError) -> Option<String> {
        match query.get("sort") {
            None | Some(Value::Null) => None,
            Some(Value::String(sort)) => Some(sort.clone()),
            Some(_) => {
                errors.add_error("Invalid sort request");
                None
            }
        }
    }
}

/// Parse one relationship entry: `{"data": null | pointer | [pointer..]}`.
fn parse_relationship(entry: &Value) -> Option<RelationshipData> {
    let data = entry.as_object()?.get("data")?;
    match data {
        Value::Null => Some(RelationshipData::One(None)),
        Value::Object(_) => Some(RelationshipData::One(Some(parse_pointer(data)?))),
        Value::Array(pointers) => {
            let pointers: Option<Vec<Pointer>> = pointers.iter().map(parse_pointer).collect();
            Some(RelationshipData::Many(pointers?))
        }
        _ => None,
    }
}

fn parse_pointer(value: &Value) -> Option<Pointer> {
    let object = value.as_object()?;
    let type_name = object.get("type")?.as_str()?;
    let id = match object.get("id")? {
        Value::String(id) if !id.is_empty() => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    Some(Pointer::new(type_name, id))
}

/// Accept `"a,b,c"` or `["a", "b", "c"]`.
fn parse_name_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(names) => Some(names.split(',').map(str::to_string).collect()),
        Value::Array(names) => names
            .iter()
            .map(|name| name.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

/// Lenient integer coercion for pagination values: accepts numbers and
/// numeric strings, anything else counts as absent.
fn coerce_count(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(number) => number.as_u64().map(|n| n as usize),
        Value::String(number) => number.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::empty_context;
    use crate::schema::ResourceSchema;
    use crate::storage::Storage;
    use serde_json::json;

    struct NullStorage;

    #[async_trait::async_trait]
    impl Storage for NullStorage {}

    fn service() -> ServiceApi {
        let schemas = Arc::new(
            SchemaRegistry::new()
                .register("article", ResourceSchema::new())
                .register("user", ResourceSchema::new()),
        );
        let adapter = Arc::new(ResourceAdapter::new(Arc::new(NullStorage), schemas.clone()));
        ServiceApi::new(adapter, schemas)
    }

    fn details(error: ApiError) -> Vec<String> {
        error.entries().iter().map(|e| e.detail.clone()).collect()
    }

    #[test]
    fn rejects_non_object_input() {
        let error = service()
            .sanitize(json!([1, 2]), empty_context(), false)
            .unwrap_err();
        assert_eq!(details(error), vec!["Invalid input parameters"]);
    }

    #[test]
    fn rejects_missing_and_unknown_type() {
        let service = service();
        let error = service
            .sanitize(json!({ "id": "1" }), empty_context(), false)
            .unwrap_err();
        assert_eq!(details(error), vec!["Resource type not provided"]);

        let error = service
            .sanitize(json!({ "type": "comment" }), empty_context(), false)
            .unwrap_err();
        assert_eq!(
            details(error),
            vec!["Unknown resource type \"comment\" provided"]
        );
    }

    #[test]
    fn requires_id_when_asked() {
        let error = service()
            .sanitize(json!({ "type": "article" }), empty_context(), true)
            .unwrap_err();
        assert_eq!(details(error), vec!["Resource id not provided"]);
    }

    #[test]
    fn normalizes_numeric_id() {
        let request = service()
            .sanitize(json!({ "type": "article", "id": 7 }), empty_context(), true)
            .unwrap();
        assert_eq!(request.id.as_deref(), Some("7"));
    }

    #[test]
    fn aggregates_payload_errors() {
        let input = json!({
            "type": "article",
            "attributes": "nope",
            "query": { "sort": 5, "filter": [] }
        });
        let error = service()
            .sanitize(input, empty_context(), false)
            .unwrap_err();
        assert_eq!(
            details(error),
            vec![
                "Invalid attributes payload",
                "Invalid filter request",
                "Invalid sort request"
            ]
        );
    }

    #[test]
    fn splits_comma_separated_fields_and_include() {
        let input = json!({
            "type": "article",
            "query": {
                "fields": { "article": "title,author", "user": ["email"] },
                "include": "author.boss,tags"
            }
        });
        let request = service()
            .sanitize(input, empty_context(), false)
            .unwrap();
        assert_eq!(request.query.fields["article"], vec!["title", "author"]);
        assert_eq!(request.query.fields["user"], vec!["email"]);
        assert_eq!(
            request.query.include,
            Some(vec!["author.boss".to_string(), "tags".to_string()])
        );
    }

    #[test]
    fn parses_relationship_payloads() {
        let input = json!({
            "type": "article",
            "relationships": {
                "author": { "data": { "type": "user", "id": 2 } },
                "editor": { "data": null },
                "tags": { "data": [{ "type": "tag", "id": "1" }] },
                "broken": { "data": { "type": "user" } }
            }
        });
        let error = service()
            .sanitize(input.clone(), empty_context(), false)
            .unwrap_err();
        assert_eq!(details(error), vec!["Invalid relationships payload: broken"]);

        let mut input = input;
        input["relationships"]
            .as_object_mut()
            .unwrap()
            .remove("broken");
        let request = service()
            .sanitize(input, empty_context(), false)
            .unwrap();
        assert_eq!(
            request.relationships["author"],
            RelationshipData::One(Some(Pointer::new("user", "2")))
        );
        assert_eq!(request.relationships["editor"], RelationshipData::One(None));
        assert_eq!(
            request.relationships["tags"],
            RelationshipData::Many(vec![Pointer::new("tag", "1")])
        );
    }

    #[test]
    fn offset_pagination_coerces_values() {
        let input = json!({
            "type": "article",
            "query": { "page": { "offset": "3", "limit": 3 } }
        });
        let request = service()
            .sanitize(input, empty_context(), false)
            .unwrap();
        assert_eq!(
            request.query.page,
            Some(Page { offset: 3, limit: Some(3) })
        );

        let input = json!({
            "type": "article",
            "query": { "page": { "offset": "junk" } }
        });
        let request = service()
            .sanitize(input, empty_context(), false)
            .unwrap();
        assert_eq!(request.query.page, Some(Page { offset: 0, limit: None }));
    }

    #[test]
    fn page_based_pagination_computes_offset() {
        let strategy = PaginationStrategy::PageBased {
            number_key: "number".to_string(),
            limit_key: "size".to_string(),
        };
        let service = service().with_pagination(strategy);

        let input = json!({
            "type": "article",
            "query": { "page": { "number": 2, "size": 4 } }
        });
        let request = service.sanitize(input, empty_context(), false).unwrap();
        assert_eq!(
            request.query.page,
            Some(Page { offset: 4, limit: Some(4) })
        );

        // Without a limit the strategy cannot form a window.
        let input = json!({
            "type": "article",
            "query": { "page": { "number": 2 } }
        });
        let request = service.sanitize(input, empty_context(), false).unwrap();
        assert_eq!(request.query.page, None);
    }

    #[test]
    fn page_based_pagination_saturates_on_huge_values() {
        let strategy = PaginationStrategy::PageBased {
            number_key: "number".to_string(),
            limit_key: "size".to_string(),
        };
        let service = service().with_pagination(strategy);

        let input = json!({
            "type": "article",
            "query": { "page": { "number": u64::MAX, "size": u64::MAX } }
        });
        let request = service.sanitize(input, empty_context(), false).unwrap();
        assert_eq!(
            request.query.page,
            Some(Page {
                offset: usize::MAX,
                limit: Some(usize::MAX)
            })
        );
    }

    #[test]
    fn rejects_non_object_page() {
        let input = json!({
            "type": "article",
            "query": { "page": "all" }
        });
        let error = service()
            .sanitize(input, empty_context(), false)
            .unwrap_err();
        assert_eq!(details(error), vec!["Invalid pagination request"]);
    }
}
