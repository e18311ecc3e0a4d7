//! Docman form service
//!
//! Drives the document search, upload and OTP login forms against the remote
//! document management service and exposes them as a local JSON API.

mod api;
mod auth;
mod config;
mod errors;
mod login;
mod models;
mod remote;
mod search;
mod session;
mod tags;
mod upload;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use login::LoginFlow;
use models::CategoryTable;
use remote::{DocumentApi, HttpDocumentApi};
use search::SearchForm;
use session::Session;
use upload::UploadForm;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Session,
    pub categories: Arc<CategoryTable>,
    pub login: Arc<Mutex<LoginFlow>>,
    pub search: Arc<Mutex<SearchForm>>,
    pub upload: Arc<Mutex<UploadForm>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every form to the same remote API, session and category table.
    pub fn new(api: Arc<dyn DocumentApi>, categories: CategoryTable, config: Config) -> Self {
        let session = match (&config.token, &config.user_id) {
            (Some(token), Some(user_id)) => Session::with_credentials(token, user_id),
            _ => Session::new(),
        };
        let categories = Arc::new(categories);

        let search = SearchForm::new(api.clone(), session.clone(), categories.clone())
            .with_debounce(config.debounce);
        let upload = UploadForm::new(api.clone(), session.clone(), categories.clone())
            .with_debounce(config.debounce);
        let login = LoginFlow::new(api, session.clone());

        Self {
            session,
            categories,
            login: Arc::new(Mutex::new(login)),
            search: Arc::new(Mutex::new(search)),
            upload: Arc::new(Mutex::new(upload)),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting docman form service");
    tracing::info!("Remote service: {}", config.remote_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (DOCMAN_API_PSK). Form service is unauthenticated!");
    }

    let categories = match &config.categories_path {
        Some(path) => {
            tracing::info!("Loading category table from {:?}", path);
            CategoryTable::load(path)?
        }
        None => CategoryTable::default(),
    };

    let api = Arc::new(HttpDocumentApi::new(
        config.remote_url.clone(),
        config.request_timeout,
    )?);

    let bind_addr = config.bind_addr;
    let state = AppState::new(api, categories, config);
    if state.session.is_authenticated() {
        tracing::info!("Session seeded from configuration");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Session
        .route("/session", get(api::get_session))
        .route("/session", delete(api::logout))
        .route("/session/otp", post(api::request_otp))
        .route("/session/verify", post(api::verify_otp))
        // Categories
        .route("/categories", get(api::list_categories))
        // Search form
        .route("/search", get(api::get_search))
        .route("/search", post(api::submit_search))
        .route("/search", delete(api::clear_search))
        .route("/search/category", put(api::set_search_category))
        .route("/search/sub-category", put(api::set_search_sub_category))
        .route("/search/dates", put(api::set_search_dates))
        // Upload form
        .route("/upload", get(api::get_upload))
        .route("/upload", post(api::submit_upload))
        .route("/upload", delete(api::clear_upload))
        .route("/upload/fields", put(api::set_upload_fields))
        .route("/upload/file", post(api::attach_upload_file))
        // Tag input of either form
        .route("/{form}/tags/input", post(api::tag_input))
        .route("/{form}/tags/key", post(api::tag_key))
        .route("/{form}/tags/commit", post(api::tag_commit))
        .route("/{form}/tags/select", post(api::tag_select))
        .route("/{form}/tags/focus", post(api::tag_focus))
        .route("/{form}/tags/blur", post(api::tag_blur))
        .route("/{form}/tags/{tag}", delete(api::tag_remove))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
