/// Initializes the tracing/logging infrastructure for an embedding
/// application.
///
/// Structured logging via the `tracing` crate with environment-based
/// filtering controlled through the `RUST_LOG` environment variable:
/// - `RUST_LOG=info` - Show info, warn, and error messages
/// - `RUST_LOG=debug` - Also show per-request dispatch details
/// - `RUST_LOG=jsonapi_service=debug` - Debug only for this crate
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Service started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
