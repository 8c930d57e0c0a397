//! Route definitions for the form builder API
//!
//! This module maps HTTP routes to their handlers and attaches the identity
//! middleware to the owner routes.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    create_form, delete_form, download_file, get_form, get_form_analytics, list_forms,
    list_submissions, submit_form, toggle_form_status, update_form, view_form,
};
use crate::middleware::identity_middleware;

/// Creates the application router
///
/// # Public routes
///
/// - `GET /forms/{id}` - form page for respondents, counts a view
/// - `POST /forms/{id}/responses` - submit a response
/// - `POST /forms/{id}/download` - count a download, returns the file URL
///
/// # Owner routes (require identity headers)
///
/// - `GET /api/forms` / `POST /api/forms` - dashboard listing, create
/// - `GET|PUT|DELETE /api/forms/{id}` - read, edit, soft delete
/// - `POST /api/forms/{id}/toggle` - active ⇄ suspended
/// - `GET /api/forms/{id}/submissions` - collected responses
/// - `GET /api/forms/{id}/analytics` - analytics report
///
/// ```no_run
/// # use formboard::config::Config;
/// # use formboard::database::{init_db, AppState};
/// # use formboard::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, Config::default());
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/forms", get(list_forms).post(create_form))
        .route(
            "/forms/{id}",
            get(get_form).put(update_form).delete(delete_form),
        )
        .route("/forms/{id}/toggle", post(toggle_form_status))
        .route("/forms/{id}/submissions", get(list_submissions))
        .route("/forms/{id}/analytics", get(get_form_analytics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .route("/forms/{id}", get(view_form))
        .route("/forms/{id}/responses", post(submit_form))
        .route("/forms/{id}/download", post(download_file))
        .nest("/api", api_routes)
        .with_state(state)
}
