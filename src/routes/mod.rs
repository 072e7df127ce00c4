use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod configs;
mod environments;
mod flags;
mod health;
mod middleware_auth;
mod projects;
mod sdk;
mod sdk_auth;

pub use health::health;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let projects_router = Router::new()
        .route(
            "/",
            post(projects::routes::create).get(projects::routes::list),
        )
        .route(
            "/{project_id}",
            get(projects::routes::get)
                .put(projects::routes::update)
                .delete(projects::routes::delete),
        )
        .route(
            "/{project_id}/regenerate-key",
            post(projects::routes::regenerate_key),
        );

    let environment_router = Router::new()
        .route(
            "/",
            post(environments::routes::create).get(environments::routes::list),
        )
        .route(
            "/{environment_id}",
            get(environments::routes::get)
                .put(environments::routes::update)
                .delete(environments::routes::delete),
        );

    let flag_router = Router::new()
        .route("/", post(flags::routes::create).get(flags::routes::list))
        .route(
            "/{flag_id}",
            get(flags::routes::get)
                .put(flags::routes::update)
                .delete(flags::routes::delete),
        );

    let config_router = Router::new()
        .route(
            "/",
            get(configs::routes::get).put(configs::routes::update),
        )
        .route("/toggle", post(configs::routes::toggle))
        .route("/gates", post(configs::routes::add_gate))
        .route("/gates/order", put(configs::routes::reorder))
        .route("/gates/{gate_id}", delete(configs::routes::delete_gate));

    let admin = Router::new()
        .nest("/projects", projects_router)
        .nest("/projects/{project_id}/environments", environment_router)
        .nest("/projects/{project_id}/flags", flag_router)
        .nest(
            "/projects/{project_id}/flags/{flag_id}/environments/{environment_id}",
            config_router,
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_auth::require_auth,
        ));

    let sdk_router = Router::new()
        .route("/configs", get(sdk::routes::configs))
        .route("/flags/evaluate", post(sdk::routes::evaluate));

    Router::new()
        .route("/health", get(health))
        .nest("/api", admin.nest("/v1", sdk_router))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
