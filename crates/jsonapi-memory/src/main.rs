//! Demo binary: wires the in-memory backend into a [`ServiceApi`] and
//! walks through a small article workflow.
//!
//! Run with `RUST_LOG=info cargo run -p jsonapi-memory`.

use std::sync::Arc;

use jsonapi_memory::fixtures::demo_registry;
use jsonapi_memory::MemoryStorage;
use jsonapi_service::tracing::setup_tracing;
use jsonapi_service::{empty_context, ResourceAdapter, ServiceApi};
use serde_json::json;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting demo service with in-memory backend");

    let schemas = Arc::new(demo_registry());
    let storage = Arc::new(MemoryStorage::new(schemas.clone()));
    let adapter = Arc::new(ResourceAdapter::new(storage, schemas.clone()));
    let service = ServiceApi::new(adapter, schemas);

    let span = tracing::info_span!("article_listing");
    let listing = async {
        info!("Listing published articles");
        service
            .get(
                json!({
                    "type": "article",
                    "query": {
                        "sort": "-title",
                        "page": { "offset": 0, "limit": 3 },
                        "include": "author,tags"
                    }
                }),
                empty_context(),
            )
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    info!(
        articles = listing.resources().len(),
        total = listing.meta.as_ref().map(|meta| meta.total).unwrap_or(0),
        included = listing.included.len(),
        "Articles listed"
    );

    let span = tracing::info_span!("article_creation");
    let created = async {
        info!("Creating an article");
        service
            .create(
                json!({
                    "type": "article",
                    "attributes": { "title": "Fresh off the press" },
                    "relationships": {
                        "author": { "data": { "type": "user", "id": "2" } }
                    }
                }),
                empty_context(),
            )
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    let created_id = created
        .resource()
        .ok_or("create returned a collection document")?
        .id
        .clone();
    info!(id = %created_id, "Article created");

    // Validation failures render as JSON:API error documents.
    let invalid = service
        .create(json!({ "type": "article", "attributes": { "title": "x" } }), empty_context())
        .await;
    match invalid {
        Ok(_) => error!("Expected a validation failure"),
        Err(e) => info!(errors = %e.to_json(), "Rejected invalid article"),
    }

    service
        .delete(
            json!({ "type": "article", "id": created_id }),
            empty_context(),
        )
        .await
        .map_err(|e| e.to_string())?;

    info!("Demo completed successfully");
    Ok(())
}
