//! Respondent submissions
//!
//! A submission writes the response record and bumps the form's submission
//! counter in the same transaction: either both land or neither does.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::info;

use crate::analytics;
use crate::database::{
    decode, encode, load, prefix_range, TABLE_FORMS, TABLE_FORM_ANALYTICS, TABLE_FORM_RESPONSES,
};
use crate::error::AppError;
use crate::model::{Form, FormResponse, FormStatus, SubmissionRequest, SubmissionResponse};

const RESPONSES_TABLE_NAME: &str = "form_responses";

/// Checks that every field was filled in
///
/// Only presence is checked. The error lists all missing fields at once.
pub fn validate_submission(request: &SubmissionRequest) -> Result<(), AppError> {
    let missing: Vec<&str> = [
        ("email", &request.email),
        ("firstName", &request.first_name),
        ("lastName", &request.last_name),
        ("twitterHandle", &request.twitter_handle),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn response_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Stores a response for `form_id` and counts it in the form's analytics
///
/// # Errors
///
/// - `Validation` when a field is blank
/// - `NotFound` when the form does not exist or was deleted, or has no
///   analytics document
/// - `NotAcceptingSubmissions` when the form is suspended
pub fn submit_response(
    db: &Database,
    form_id: &str,
    request: SubmissionRequest,
) -> Result<SubmissionResponse, AppError> {
    validate_submission(&request)?;

    let write_txn = db.begin_write()?;
    let (response, file_url) = {
        // Only active forms take submissions
        let forms = write_txn.open_table(TABLE_FORMS)?;
        let form: Form = load(&forms, "forms", form_id)?
            .filter(|form: &Form| form.status != FormStatus::Deleted)
            .ok_or_else(|| AppError::not_found(format!("Form {form_id}")))?;

        if form.status != FormStatus::Active {
            return Err(AppError::NotAcceptingSubmissions(form.status));
        }

        let response = FormResponse {
            id: response_id(),
            form_id: form.id.clone(),
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            twitter_handle: request.twitter_handle.trim().to_string(),
            submitted_at: Utc::now(),
            downloaded_file: false,
        };

        // Key groups responses by form, oldest first
        let key = format!(
            "{}:{}:{}",
            form.id,
            response.submitted_at.timestamp_micros(),
            response.id
        );
        let encoded = encode(&response)?;
        let mut responses = write_txn.open_table(TABLE_FORM_RESPONSES)?;
        responses.insert(key.as_str(), encoded.as_str())?;

        // Count the submission in the same transaction
        let mut analytics_table = write_txn.open_table(TABLE_FORM_ANALYTICS)?;
        analytics::apply_submission(&mut analytics_table, &form.id, response.submitted_at)?;

        (response, form.file_url)
    };
    write_txn.commit()?;

    info!(form_id, response_id = %response.id, "submission recorded");
    Ok(SubmissionResponse { response, file_url })
}

/// All responses of a form, oldest first
///
/// A record that fails to decode aborts the listing with `Decode` instead of
/// being skipped.
pub fn list_responses(db: &Database, form_id: &str) -> Result<Vec<FormResponse>, AppError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FORM_RESPONSES)?;

    let (start_key, end_key) = prefix_range(form_id);
    let responses = table
        .range(start_key.as_str()..end_key.as_str())?
        .map(|entry| -> Result<FormResponse, AppError> {
            let (key, value) = entry?;
            decode(RESPONSES_TABLE_NAME, key.value(), value.value())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(responses)
}
