//! HTTP request handlers
//!
//! Thin adapters between axum extractors and the data-access functions in
//! [`forms`](crate::forms), [`submissions`](crate::submissions) and
//! [`analytics`](crate::analytics). Errors propagate as [`AppError`] and are
//! rendered as JSON by its `IntoResponse` impl.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use tracing::warn;

use crate::analytics::{self, VisitContext};
use crate::database::AppState;
use crate::error::AppError;
use crate::forms;
use crate::model::{
    CreateFormRequest, CurrentUser, FormStatus, ListParams, PublicForm, SubmissionRequest,
    UpdateFormRequest, VisitParams,
};
use crate::submissions;

/// Creates a form owned by the current user
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Launch waitlist",        // optional, defaults to "New Form"
///   "description": "Get early access", // optional, defaults to "Form Description"
///   "fileUrl": "https://cdn.example.com/guide.pdf" // optional
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - the stored form
pub async fn create_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::create_form(&state.db, &user, payload)?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// Lists the current user's forms, newest first
///
/// # Query Parameters
///
/// - `status` (optional) - `active`, `suspended` or `deleted`
/// - `page` (optional) - page number, starts from 1 (default: 1)
/// - `limit` (optional) - items per page, max 100 (default: 10)
pub async fn list_forms(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let results = forms::list_forms_for_user(&state.db, &user.id, &params)?;

    Ok(Json(json!({
        "page": params.page.unwrap_or(1).max(1),
        "limit": params.limit.unwrap_or(10).clamp(1, 100),
        "total_fetched": results.len(),
        "data": results
    })))
}

pub async fn get_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::get_owned_form(&state.db, &user.id, &id)?;
    Ok(Json(form))
}

/// Edits title and description
///
/// # Response
///
/// - **200 OK** - the updated form
/// - **400 Bad Request** - title or description blank
/// - **403 Forbidden** - not the owner
/// - **404 Not Found** - no such form
pub async fn update_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::update_form(&state.db, &user.id, &id, payload)
        .inspect_err(|e| warn!(form_id = %id, "failed to update form: {e}"))?;
    Ok(Json(form))
}

/// Switches between `active` and `suspended`
///
/// Deleted forms answer **409 Conflict**.
pub async fn toggle_form_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::toggle_form_status(&state.db, &user.id, &id)
        .inspect_err(|e| warn!(form_id = %id, "failed to toggle form status: {e}"))?;
    Ok(Json(form))
}

/// Soft-deletes a form
///
/// Deleting an unknown or already deleted form succeeds as well.
pub async fn delete_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    forms::delete_form(&state.db, &user.id, &id)
        .inspect_err(|e| warn!(form_id = %id, "failed to delete form: {e}"))?;

    Ok(Json(json!({
        "message": "Form deleted successfully",
        "deleted_id": id
    })))
}

/// Lists the responses collected by one of the current user's forms
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    forms::get_owned_form(&state.db, &user.id, &id)?;
    let responses = submissions::list_responses(&state.db, &id)?;

    Ok(Json(json!({
        "form_id": id,
        "total": responses.len(),
        "data": responses
    })))
}

/// Analytics report of one of the current user's forms
///
/// The body is `null` when the form has no analytics document.
pub async fn get_form_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    forms::get_owned_form(&state.db, &user.id, &id)?;
    let report = analytics::get_analytics(&state.db, &id)?;
    Ok(Json(report))
}

/// Public form page
///
/// Counts a view, attributed to the source picked by the configured
/// classifier and to the location found in the configured location header.
///
/// # Response
///
/// - **200 OK** - public fields of the form
/// - **404 Not Found** - no such form, or it was deleted
pub async fn view_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<VisitParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::get_form(&state.db, &id)?;
    if form.status == FormStatus::Deleted {
        return Err(AppError::not_found(format!("Form {id}")));
    }

    // Attribute the visit: campaign parameters first, then the referrer
    let visit = VisitContext {
        referrer: headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok()),
        utm_source: params.utm_source.as_deref(),
        utm_medium: params.utm_medium.as_deref(),
    };
    let source = state.classifier.classify(&visit);
    // Location comes from whatever proxy header the deployment configured
    let location = headers
        .get(state.config.location_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    analytics::record_view(&state.db, &form.id, location, source.as_str())?;

    Ok(Json(PublicForm::from(&form)))
}

/// Public submission endpoint
///
/// # Request Body
///
/// ```json
/// {
///   "email": "jane@example.com",
///   "firstName": "Jane",
///   "lastName": "Doe",
///   "twitterHandle": "@jane"
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - the stored response plus the form's `fileUrl`
/// - **400 Bad Request** - a field is blank
/// - **404 Not Found** - no such form
/// - **409 Conflict** - the form is suspended
pub async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::submit_response(&state.db, &id, payload)
        .inspect_err(|e| warn!(form_id = %id, "failed to submit response: {e}"))?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Counts a download and hands back the file URL
///
/// Serving the file itself is left to whatever hosts `fileUrl`.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = forms::get_form(&state.db, &id)?;
    let file_url = match (form.status, form.file_url) {
        (FormStatus::Deleted, _) => return Err(AppError::not_found(format!("Form {id}"))),
        (_, None) => return Err(AppError::not_found(format!("File for form {id}"))),
        (_, Some(url)) => url,
    };

    analytics::record_download(&state.db, &form.id)?;

    Ok(Json(json!({ "fileUrl": file_url })))
}
