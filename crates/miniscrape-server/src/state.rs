use miniscrape_client::DefaultService;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub service: DefaultService,
    /// Admin token protecting cache invalidation (None = admin endpoints disabled).
    pub admin_token: Option<String>,
}
