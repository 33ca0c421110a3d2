//! Adapter-level integration tests against a small fixture backend:
//! override dispatch, compound-document building and create validation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use jsonapi_service::{
    empty_context, ApiError, AttributeField, CollectionResult, Context, CrudAction, ErrorKind,
    FieldsSchema, Pointer, Query, RelationshipData, Request, Resource, ResourceAdapter,
    ResourceContents, ResourceSchema, SchemaRegistry, Storage, TypeOverride,
};
use serde_json::json;

struct FixtureStorage {
    resources: HashMap<String, BTreeMap<String, Resource>>,
}

impl FixtureStorage {
    /// One article by user 1, whose boss is user 2; the two users point
    /// at each other so relationship traversal sees a cycle.
    fn seeded() -> Self {
        let mut resources: HashMap<String, BTreeMap<String, Resource>> = HashMap::new();
        let articles = resources.entry("article".to_string()).or_default();
        articles.insert(
            "1".to_string(),
            Resource::new("article", "1")
                .attribute("title", json!("Fixture article"))
                .relationship("author", Some(Pointer::new("user", "1")).into()),
        );
        let users = resources.entry("user".to_string()).or_default();
        users.insert(
            "1".to_string(),
            Resource::new("user", "1")
                .attribute("email", json!("one@example.com"))
                .relationship("boss", Some(Pointer::new("user", "2")).into()),
        );
        users.insert(
            "2".to_string(),
            Resource::new("user", "2")
                .attribute("email", json!("two@example.com"))
                .relationship("boss", Some(Pointer::new("user", "1")).into()),
        );
        Self { resources }
    }

    fn find(&self, type_name: &str, id: &str) -> Result<Resource, ApiError> {
        self.resources
            .get(type_name)
            .and_then(|collection| collection.get(id))
            .cloned()
            .ok_or_else(|| {
                ApiError::resource_not_found().with_detail(format!(
                    "Resource \"{type_name}\" with id \"{id}\" not found"
                ))
            })
    }
}

#[async_trait]
impl Storage for FixtureStorage {
    async fn get_resource(
        &self,
        type_name: &str,
        id: &str,
        _query: &Query,
        _context: &Context,
    ) -> Result<Resource, ApiError> {
        self.find(type_name, id)
    }

    async fn get_resource_collection(
        &self,
        type_name: &str,
        ids: &[String],
        _query: &Query,
        _context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        ids.iter().map(|id| self.find(type_name, id)).collect()
    }

    async fn query_resource_collection(
        &self,
        type_name: &str,
        _query: &Query,
        _context: &Context,
    ) -> Result<CollectionResult, ApiError> {
        let resources: Vec<Resource> = self
            .resources
            .get(type_name)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        let total = resources.len();
        Ok(CollectionResult { resources, total })
    }

    async fn create_resource(
        &self,
        type_name: &str,
        contents: ResourceContents,
        _query: &Query,
        _context: &Context,
    ) -> Result<Resource, ApiError> {
        Ok(Resource {
            type_name: type_name.to_string(),
            id: "101".to_string(),
            attributes: contents.attributes,
            relationships: contents.relationships,
        })
    }
}

fn article_fields() -> FieldsSchema {
    FieldsSchema::new()
        .attribute(AttributeField::string("title").required().min_length(2))
        .attribute(AttributeField::boolean("published").default_value(json!(false)))
}

fn schemas() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .register(
                "article",
                ResourceSchema::new().fields(|action, _| match action {
                    CrudAction::Create => article_fields(),
                    CrudAction::Update => article_fields(),
                }),
            )
            .register("user", ResourceSchema::new()),
    )
}

fn adapter() -> ResourceAdapter {
    ResourceAdapter::new(Arc::new(FixtureStorage::seeded()), schemas())
}

fn with_include(paths: Option<Vec<&str>>) -> Query {
    Query {
        include: paths.map(|paths| paths.into_iter().map(str::to_string).collect()),
        ..Query::default()
    }
}

#[tokio::test]
async fn get_one_resolves_full_relationship_closure_by_default() {
    let document = adapter()
        .get_one(&Request::for_type("article").with_id("1"))
        .await
        .unwrap();

    assert_eq!(document.resource().unwrap().id, "1");
    assert_eq!(
        document.resource().unwrap().relationships["author"],
        RelationshipData::One(Some(Pointer::new("user", "1")))
    );
    let mut included: Vec<String> = document.included.iter().map(Resource::key).collect();
    included.sort();
    assert_eq!(included, vec!["1@user", "2@user"]);
}

#[tokio::test]
async fn empty_include_expands_nothing() {
    let request = Request::for_type("article")
        .with_id("1")
        .with_query(with_include(Some(vec![])));
    let document = adapter().get_one(&request).await.unwrap();
    assert!(document.included.is_empty());
}

#[tokio::test]
async fn include_paths_limit_traversal_depth() {
    let request = Request::for_type("article")
        .with_id("1")
        .with_query(with_include(Some(vec!["author"])));
    let document = adapter().get_one(&request).await.unwrap();
    let included: Vec<String> = document.included.iter().map(Resource::key).collect();
    assert_eq!(included, vec!["1@user"]);
}

#[tokio::test]
async fn cyclic_relationship_graphs_terminate() {
    // user 1 and user 2 reference each other as boss.
    let document = adapter()
        .get_one(&Request::for_type("user").with_id("1"))
        .await
        .unwrap();
    let included: Vec<String> = document.included.iter().map(Resource::key).collect();
    assert_eq!(included, vec!["2@user"]);
}

#[tokio::test]
async fn missing_resource_reports_not_found() {
    let error = adapter()
        .get_one(&Request::for_type("article").with_id("99"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn collection_documents_carry_totals() {
    let document = adapter().get(&Request::for_type("user")).await.unwrap();
    assert_eq!(document.resources().len(), 2);
    assert_eq!(document.meta.unwrap().total, 2);
}

struct DecoratedArticles;

#[async_trait]
impl TypeOverride for DecoratedArticles {
    async fn get_resource(
        &self,
        storage: &dyn Storage,
        type_name: &str,
        id: &str,
        query: &Query,
        context: &Context,
    ) -> Result<Resource, ApiError> {
        let mut resource = storage.get_resource(type_name, id, query, context).await?;
        resource.attributes.insert("foo".to_string(), json!("bar"));
        Ok(resource)
    }
}

#[tokio::test]
async fn overrides_decorate_single_primitives_and_delegate_the_rest() {
    let adapter = ResourceAdapter::new(Arc::new(FixtureStorage::seeded()), schemas())
        .with_override("article", Arc::new(DecoratedArticles));

    let document = adapter
        .get_one(&Request::for_type("article").with_id("1"))
        .await
        .unwrap();
    assert_eq!(document.resource().unwrap().attributes["foo"], json!("bar"));

    // Unoverridden primitives still reach the backend.
    let document = adapter.get(&Request::for_type("article")).await.unwrap();
    assert_eq!(document.resources().len(), 1);
    assert!(!document.resources()[0].attributes.contains_key("foo"));
}

#[tokio::test]
async fn create_merges_schema_defaults_under_the_payload() {
    let mut request = Request::for_type("article");
    request
        .attributes
        .insert("title".to_string(), json!("Brand new"));

    let document = adapter().create(&request).await.unwrap();
    let resource = document.resource().unwrap();
    assert_eq!(resource.id, "101");
    assert_eq!(resource.attributes["title"], json!("Brand new"));
    assert_eq!(resource.attributes["published"], json!(false));
}

#[tokio::test]
async fn create_rejects_schema_violations() {
    let mut request = Request::for_type("article");
    request.attributes.insert("title".to_string(), json!("x"));

    let error = adapter().create(&request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ValidationError);
    assert_eq!(error.entries()[0].detail, "Field minimum length is 2");
    assert_eq!(
        error.entries()[0].pointer.as_deref(),
        Some("/data/attributes/title")
    );
}

#[tokio::test]
async fn update_requires_an_id() {
    let error = adapter()
        .update(&Request::for_type("article"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadRequest);
    assert_eq!(error.entries()[0].detail, "Resource id not provided");
}
