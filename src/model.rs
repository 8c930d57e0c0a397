//! Data models for the form builder
//!
//! This module defines the records persisted in the store (forms, responses,
//! per-form analytics) together with the request/response bodies of the HTTP
//! API. Stored records use camelCase field names.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a form
///
/// `active` and `suspended` toggle between each other. `deleted` is a soft
/// delete: the record stays in the store and no operation leads out of it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Active,
    Suspended,
    Deleted,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Active => "active",
            FormStatus::Suspended => "suspended",
            FormStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A form record stored in the database
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Generated from the owner display name and creation time, e.g.
    /// `jane-doe-1705501234567`
    pub id: String,

    /// External identity of the owner. Never changes after creation.
    pub user_id: String,

    pub title: String,

    pub description: String,

    pub status: FormStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// File offered to respondents once they have submitted
    pub file_url: Option<String>,
}

/// A single respondent submission
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    /// Random store-generated identifier
    pub id: String,

    /// Form this response belongs to
    pub form_id: String,

    pub email: String,

    pub first_name: String,

    pub last_name: String,

    pub twitter_handle: String,

    pub submitted_at: DateTime<Utc>,

    /// Per-response download flag. Nothing sets it yet; downloads are only
    /// counted on the form's analytics document.
    pub downloaded_file: bool,
}

/// Known traffic source tags
///
/// Sources are stored as plain strings in the analytics histogram so tags
/// written by other classifiers survive a round trip; these are the ones the
/// report always includes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficSource {
    Direct,
    SocialFacebook,
    SocialTwitter,
    SocialLinkedin,
    SocialInstagram,
    Email,
    SearchGoogle,
    SearchBing,
    SearchOther,
    Referral,
}

impl TrafficSource {
    pub const ALL: [TrafficSource; 10] = [
        TrafficSource::Direct,
        TrafficSource::SocialFacebook,
        TrafficSource::SocialTwitter,
        TrafficSource::SocialLinkedin,
        TrafficSource::SocialInstagram,
        TrafficSource::Email,
        TrafficSource::SearchGoogle,
        TrafficSource::SearchBing,
        TrafficSource::SearchOther,
        TrafficSource::Referral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficSource::Direct => "direct",
            TrafficSource::SocialFacebook => "social-facebook",
            TrafficSource::SocialTwitter => "social-twitter",
            TrafficSource::SocialLinkedin => "social-linkedin",
            TrafficSource::SocialInstagram => "social-instagram",
            TrafficSource::Email => "email",
            TrafficSource::SearchGoogle => "search-google",
            TrafficSource::SearchBing => "search-bing",
            TrafficSource::SearchOther => "search-other",
            TrafficSource::Referral => "referral",
        }
    }
}

impl fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-form analytics document
///
/// Counters only ever grow. Rates are not stored; see [`AnalyticsReport`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalytics {
    pub views: u64,
    pub submissions: u64,
    pub downloads: u64,

    /// Distinct visitor locations in first-seen order
    pub locations: Vec<String>,

    /// Source tag to view count
    pub traffic_sources: BTreeMap<String, u64>,

    pub submission_dates: Vec<DateTime<Utc>>,
}

/// Number of submissions on one UTC day
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailySubmissions {
    pub date: NaiveDate,
    pub submissions: u64,
}

/// Analytics as returned to the form owner, with derived rates
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub views: u64,
    pub submissions: u64,
    pub downloads: u64,
    pub locations: Vec<String>,

    /// Every known source tag, zero when never seen
    pub traffic_sources: BTreeMap<String, u64>,

    /// Percentage of views without a submission, two decimals, `"0"` without views
    pub bounce_rate: String,

    /// Percentage of submissions without a download, two decimals, `"0"` without submissions
    pub drop_off_rate: String,

    pub submissions_over_time: Vec<DailySubmissions>,
}

/// Request payload for creating a form
///
/// All fields are optional; title and description fall back to
/// placeholders the owner edits afterwards.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
}

/// Request payload for editing a form
#[derive(Deserialize, Debug, Default)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields a respondent fills in
///
/// Missing fields deserialize as empty strings and are rejected by the
/// submission collector, so the caller gets one consistent validation error.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub twitter_handle: String,
}

/// Returned to the respondent after a successful submission
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub response: FormResponse,
    pub file_url: Option<String>,
}

/// Public view of a form, as shown to respondents
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublicForm {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: FormStatus,
    pub has_file: bool,
}

impl From<&Form> for PublicForm {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id.clone(),
            title: form.title.clone(),
            description: form.description.clone(),
            status: form.status,
            has_file: form.file_url.is_some(),
        }
    }
}

/// Query parameters for listing the owner's forms
///
/// # Example
/// Query string: `?status=active&page=2&limit=20`
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Only return forms in this state
    pub status: Option<FormStatus>,

    /// Page number, starts from 1 (default: 1)
    pub page: Option<usize>,

    /// Items per page, max 100 (default: 10)
    pub limit: Option<usize>,
}

/// Campaign parameters on the public form URL
#[derive(Deserialize, Debug, Default)]
pub struct VisitParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
}

/// The signed-in user, as asserted by the identity provider
///
/// Inserted into request extensions by the identity middleware and passed
/// explicitly into every owner operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Opaque external user ID
    pub id: String,

    pub display_name: Option<String>,
}
