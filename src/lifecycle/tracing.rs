/// Initializes structured logging for the host application.
///
/// Log levels come from `RUST_LOG`. Transaction dumps produced by
/// [`log_transaction`](crate::diagnostics::log_transaction) are emitted at debug level.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Application started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
