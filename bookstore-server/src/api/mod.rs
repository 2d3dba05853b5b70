//! HTTP routes

pub mod health;
pub mod multipart;
pub mod products;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};
use http::{HeaderValue, Method, header};
use shared::error::AppError;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::auth::user_auth::{require_admin, user_auth_middleware};
use crate::config::Config;
use crate::state::AppState;
use crate::storage::MAX_FILE_SIZE;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Cover + 10 gallery images, plus room for the text fields
const PRODUCT_BODY_LIMIT: usize = 11 * MAX_FILE_SIZE + 1024 * 1024;

const AVATAR_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

fn user_routes(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/register", post(users::register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    let login = Router::new()
        .route("/login", post(users::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let session = Router::new()
        .route("/verify", put(users::verify_account))
        .route("/logout", delete(users::logout))
        .route("/refresh_token", get(users::refresh_token));

    let profile = Router::new()
        .route("/update", put(users::update_profile))
        .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    Router::new()
        .merge(register)
        .merge(login)
        .merge(session)
        .merge(profile)
}

fn product_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(products::list_products))
        .route("/categories", get(products::list_categories))
        .route("/book-genres", get(products::list_book_genres))
        .route("/search", get(products::search_products))
        .route("/trend-products", get(products::trending_products))
        .route("/{id}", get(products::get_product));

    // Layers run bottom-up: authenticate, then check the role
    let admin = Router::new()
        .route("/", post(products::create_product))
        .route(
            "/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        .layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    public.merge(admin)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Create the full application router
pub fn create_router(state: AppState, config: &Config) -> Router {
    let v1 = Router::new()
        .nest("/users", user_routes(&state))
        .nest("/products", product_routes(&state));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
