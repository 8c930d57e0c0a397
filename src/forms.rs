//! Form records and their status lifecycle
//!
//! ```text
//!   create ──▶ active ◀──toggle──▶ suspended
//!                 │                    │
//!                 └──── delete ────────┴──▶ deleted
//! ```
//!
//! `deleted` is a soft delete. The record stays in `TABLE_FORMS` and nothing
//! moves a form back out of it.

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{info, warn};

use crate::analytics;
use crate::database::{
    encode, load, prefix_range, TABLE_FORMS, TABLE_FORM_ANALYTICS, TABLE_USER_FORMS,
};
use crate::error::AppError;
use crate::model::{CreateFormRequest, CurrentUser, Form, FormStatus, ListParams, UpdateFormRequest};

const TABLE_NAME: &str = "forms";

pub const DEFAULT_TITLE: &str = "New Form";
pub const DEFAULT_DESCRIPTION: &str = "Form Description";

/// Builds a form ID from the owner's display name and the creation time
///
/// The name is reduced to lowercase ASCII words joined by `-`; an empty or
/// missing name becomes `form`.
///
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use formboard::forms::generate_form_id;
/// let at = Utc.timestamp_millis_opt(1_705_501_234_567).unwrap();
/// assert_eq!(generate_form_id(Some("Jane Doe"), at), "jane-doe-1705501234567");
/// assert_eq!(generate_form_id(None, at), "form-1705501234567");
/// ```
pub fn generate_form_id(display_name: Option<&str>, at: DateTime<Utc>) -> String {
    let slug = display_name
        .unwrap_or_default()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    let slug = if slug.is_empty() { "form".to_string() } else { slug };
    format!("{}-{}", slug, at.timestamp_millis())
}

fn owner_index_key(form: &Form) -> String {
    format!(
        "{}:{}:{}",
        form.user_id,
        form.created_at.timestamp_micros(),
        form.id
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Next status for a toggle
///
/// Deleted forms stay deleted; toggling one is an error rather than a silent
/// resurrection.
pub fn toggled_status(current: FormStatus) -> Result<FormStatus, AppError> {
    match current {
        FormStatus::Active => Ok(FormStatus::Suspended),
        FormStatus::Suspended => Ok(FormStatus::Active),
        FormStatus::Deleted => Err(AppError::InvalidTransition(current)),
    }
}

/// Creates an active form owned by `owner`
///
/// The form, its owner-index entry and an empty analytics document are
/// written in one transaction, so a form is never visible without analytics.
pub fn create_form(
    db: &Database,
    owner: &CurrentUser,
    request: CreateFormRequest,
) -> Result<Form, AppError> {
    let now = Utc::now();
    let mut form = Form {
        id: generate_form_id(owner.display_name.as_deref(), now),
        user_id: owner.id.clone(),
        title: non_blank(request.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: non_blank(request.description)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        status: FormStatus::Active,
        created_at: now,
        updated_at: now,
        file_url: non_blank(request.file_url),
    };

    // Begin a write transaction covering all three tables
    let write_txn = db.begin_write()?;
    {
        let mut forms = write_txn.open_table(TABLE_FORMS)?;

        // Same name within the same millisecond: keep both forms.
        let base_id = form.id.clone();
        while forms.get(form.id.as_str())?.is_some() {
            let suffix: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(4)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            form.id = format!("{base_id}-{suffix}");
        }

        let encoded = encode(&form)?;
        forms.insert(form.id.as_str(), encoded.as_str())?;

        // Owner index entry for the dashboard listing
        let mut index = write_txn.open_table(TABLE_USER_FORMS)?;
        index.insert(owner_index_key(&form).as_str(), form.id.as_str())?;

        // Zeroed analytics document
        let mut analytics_table = write_txn.open_table(TABLE_FORM_ANALYTICS)?;
        analytics::insert_empty(&mut analytics_table, &form.id)?;
    }
    write_txn.commit()?;

    info!(form_id = %form.id, user_id = %form.user_id, "form created");
    Ok(form)
}

/// Loads a form by ID
pub fn get_form(db: &Database, form_id: &str) -> Result<Form, AppError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FORMS)?;

    let form = load(&table, TABLE_NAME, form_id)?;
    form.ok_or_else(|| AppError::not_found(format!("Form {form_id}")))
}

/// Loads a form and checks that `user_id` owns it
pub fn get_owned_form(db: &Database, user_id: &str, form_id: &str) -> Result<Form, AppError> {
    let form = get_form(db, form_id)?;
    ensure_owner(&form, user_id)?;
    Ok(form)
}

fn ensure_owner(form: &Form, user_id: &str) -> Result<(), AppError> {
    if form.user_id != user_id {
        warn!(form_id = %form.id, user_id, "ownership check failed");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Lists the forms of one owner, newest first
///
/// `params.status` filters before pagination, so every page holds up to
/// `limit` matching forms.
pub fn list_forms_for_user(
    db: &Database,
    user_id: &str,
    params: &ListParams,
) -> Result<Vec<Form>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(TABLE_USER_FORMS)?;
    let forms = read_txn.open_table(TABLE_FORMS)?;

    let (start_key, end_key) = prefix_range(user_id);
    let mut results = Vec::new();
    let mut matched = 0;

    for entry in index.range(start_key.as_str()..end_key.as_str())?.rev() {
        let (_, form_id) = entry?;
        let form_id = form_id.value();

        let Some(form) = load::<Form, _>(&forms, TABLE_NAME, form_id)? else {
            warn!(form_id, user_id, "owner index points at a missing form");
            continue;
        };

        // User IDs may contain `:`, so `alice` also scans `alice:42`'s entries.
        if form.user_id != user_id {
            continue;
        }

        if params.status.is_some_and(|status| status != form.status) {
            continue;
        }

        matched += 1;
        if matched <= offset {
            continue;
        }

        results.push(form);
        if results.len() == limit {
            break;
        }
    }

    Ok(results)
}

/// Read-modify-write of one owned form inside a single write transaction
fn modify_owned_form(
    db: &Database,
    user_id: &str,
    form_id: &str,
    apply: impl FnOnce(&mut Form) -> Result<(), AppError>,
) -> Result<Form, AppError> {
    let write_txn = db.begin_write()?;
    let form = {
        let mut table = write_txn.open_table(TABLE_FORMS)?;

        let mut form: Form = load(&table, TABLE_NAME, form_id)?
            .ok_or_else(|| AppError::not_found(format!("Form {form_id}")))?;
        ensure_owner(&form, user_id)?;

        apply(&mut form)?;
        form.updated_at = Utc::now();

        let encoded = encode(&form)?;
        table.insert(form_id, encoded.as_str())?;
        form
    };
    write_txn.commit()?;

    Ok(form)
}

/// Changes title and description
///
/// Both must be non-blank, and so must the form ID; these checks run before
/// the store is touched.
pub fn update_form(
    db: &Database,
    user_id: &str,
    form_id: &str,
    request: UpdateFormRequest,
) -> Result<Form, AppError> {
    if form_id.trim().is_empty() {
        return Err(AppError::validation("Form ID is required"));
    }

    let title = non_blank(request.title);
    let description = non_blank(request.description);
    let (Some(title), Some(description)) = (title, description) else {
        return Err(AppError::validation("Title and description are required"));
    };

    let form = modify_owned_form(db, user_id, form_id, |form| {
        form.title = title;
        form.description = description;
        Ok(())
    })?;

    info!(form_id, "form updated");
    Ok(form)
}

/// Flips an active form to suspended and back
pub fn toggle_form_status(db: &Database, user_id: &str, form_id: &str) -> Result<Form, AppError> {
    if form_id.trim().is_empty() {
        return Err(AppError::validation("Form ID is required"));
    }

    let form = modify_owned_form(db, user_id, form_id, |form| {
        form.status = toggled_status(form.status)?;
        Ok(())
    })?;

    info!(form_id, status = %form.status, "form status toggled");
    Ok(form)
}

/// Soft-deletes a form
///
/// Idempotent: a missing form or one that is already deleted is left alone
/// and reported as success. Returns the form when it exists.
pub fn delete_form(db: &Database, user_id: &str, form_id: &str) -> Result<Option<Form>, AppError> {
    if form_id.trim().is_empty() {
        return Err(AppError::validation("Form ID is required"));
    }

    let write_txn = db.begin_write()?;
    let form = {
        let mut table = write_txn.open_table(TABLE_FORMS)?;

        let Some(mut form) = load::<Form, _>(&table, TABLE_NAME, form_id)? else {
            info!(form_id, "delete of unknown form ignored");
            return Ok(None);
        };
        ensure_owner(&form, user_id)?;

        if form.status == FormStatus::Deleted {
            return Ok(Some(form));
        }

        form.status = FormStatus::Deleted;
        form.updated_at = Utc::now();

        let encoded = encode(&form)?;
        table.insert(form_id, encoded.as_str())?;
        form
    };
    write_txn.commit()?;

    info!(form_id, "form deleted");
    Ok(Some(form))
}
