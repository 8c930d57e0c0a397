//! Per-form analytics: counters, traffic sources and derived rates
//!
//! Each form owns one [`FormAnalytics`] document in `TABLE_FORM_ANALYTICS`.
//! Every update is a read-modify-write inside a single redb write
//! transaction. redb runs one writer at a time, so concurrent increments
//! never get lost.
//!
//! Write-side behaviour differs per operation:
//! - [`record_view`] creates the document on first use
//! - [`record_submission`] and [`record_download`] need an existing document
//!   and fail with `NotFound` otherwise
//! - [`get_analytics`] returns `None` for a missing document instead of an error

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, Table};
use tracing::debug;

use crate::database::{encode, load, TABLE_FORM_ANALYTICS};
use crate::error::AppError;
use crate::model::{AnalyticsReport, DailySubmissions, FormAnalytics, TrafficSource};

const TABLE_NAME: &str = "form_analytics";

/// What is known about a visit when a form page is loaded
#[derive(Debug, Default, Clone, Copy)]
pub struct VisitContext<'a> {
    /// Value of the `Referer` header
    pub referrer: Option<&'a str>,
    pub utm_source: Option<&'a str>,
    pub utm_medium: Option<&'a str>,
}

/// Decides which traffic source a visit is attributed to
pub trait TrafficClassifier: Send + Sync {
    fn classify(&self, visit: &VisitContext<'_>) -> TrafficSource;
}

/// Classifies by campaign parameters first, then by referrer host
///
/// A visit without either signal counts as `direct`. Unknown referrers count
/// as `referral`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferrerClassifier;

impl TrafficClassifier for ReferrerClassifier {
    fn classify(&self, visit: &VisitContext<'_>) -> TrafficSource {
        if visit
            .utm_medium
            .is_some_and(|medium| medium.trim().eq_ignore_ascii_case("email"))
        {
            return TrafficSource::Email;
        }

        if let Some(source) = visit.utm_source.map(str::trim).filter(|s| !s.is_empty()) {
            let source = source.to_ascii_lowercase();
            return source_from_labels(source.split(['.', '-', '_']))
                .unwrap_or(TrafficSource::Referral);
        }

        match visit.referrer.and_then(referrer_host) {
            Some(host) => source_from_labels(host.split('.')).unwrap_or(TrafficSource::Referral),
            None => TrafficSource::Direct,
        }
    }
}

/// Lowercased host part of a referrer URL, without a leading `www.`
fn referrer_host(referrer: &str) -> Option<String> {
    let rest = referrer.trim();
    let rest = rest.split_once("://").map_or(rest, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    let host = host.trim_start_matches("www.").to_string();

    (!host.is_empty()).then_some(host)
}

fn source_from_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Option<TrafficSource> {
    let labels: Vec<&str> = labels.filter(|label| !label.is_empty()).collect();
    let has = |names: &[&str]| labels.iter().any(|label| names.contains(label));

    // Mail before search: mail.google.com is a webmail click, not a search.
    if has(&["mail", "email", "gmail", "outlook", "newsletter"]) {
        Some(TrafficSource::Email)
    } else if has(&["facebook", "fb"]) {
        Some(TrafficSource::SocialFacebook)
    } else if has(&["twitter", "x"]) || labels == ["t", "co"] {
        Some(TrafficSource::SocialTwitter)
    } else if has(&["linkedin", "lnkd"]) {
        Some(TrafficSource::SocialLinkedin)
    } else if has(&["instagram"]) {
        Some(TrafficSource::SocialInstagram)
    } else if has(&["google"]) {
        Some(TrafficSource::SearchGoogle)
    } else if has(&["bing"]) {
        Some(TrafficSource::SearchBing)
    } else if has(&["duckduckgo", "yahoo", "yandex", "baidu", "ecosia"]) {
        Some(TrafficSource::SearchOther)
    } else {
        None
    }
}

/// Share of `total` that did not carry on to the next step, as a percentage
/// with two decimals. `"0"` when `total` is zero.
///
/// The result goes negative when `kept > total`; that is reported as is.
fn lost_percentage(total: u64, kept: u64) -> String {
    if total == 0 {
        return "0".to_string();
    }

    let lost = total as f64 - kept as f64;
    format!("{:.2}", lost / total as f64 * 100.0)
}

/// Percentage of views that did not end in a submission
///
/// ```
/// # use formboard::analytics::bounce_rate;
/// assert_eq!(bounce_rate(100, 25), "75.00");
/// assert_eq!(bounce_rate(0, 0), "0");
/// ```
pub fn bounce_rate(views: u64, submissions: u64) -> String {
    lost_percentage(views, submissions)
}

/// Percentage of submissions that did not end in a file download
pub fn drop_off_rate(submissions: u64, downloads: u64) -> String {
    lost_percentage(submissions, downloads)
}

impl From<FormAnalytics> for AnalyticsReport {
    fn from(analytics: FormAnalytics) -> Self {
        let mut traffic_sources: BTreeMap<String, u64> = TrafficSource::ALL
            .iter()
            .map(|source| (source.as_str().to_string(), 0))
            .collect();
        traffic_sources.extend(analytics.traffic_sources);

        let mut per_day: BTreeMap<_, u64> = BTreeMap::new();
        for submitted_at in &analytics.submission_dates {
            *per_day.entry(submitted_at.date_naive()).or_default() += 1;
        }
        let submissions_over_time = per_day
            .into_iter()
            .map(|(date, submissions)| DailySubmissions { date, submissions })
            .collect();

        Self {
            bounce_rate: bounce_rate(analytics.views, analytics.submissions),
            drop_off_rate: drop_off_rate(analytics.submissions, analytics.downloads),
            views: analytics.views,
            submissions: analytics.submissions,
            downloads: analytics.downloads,
            locations: analytics.locations,
            traffic_sources,
            submissions_over_time,
        }
    }
}

/// Writes a zeroed analytics document for a new form
pub(crate) fn insert_empty(
    table: &mut Table<'_, &'static str, &'static str>,
    form_id: &str,
) -> Result<(), AppError> {
    let encoded = encode(&FormAnalytics::default())?;
    table.insert(form_id, encoded.as_str())?;
    Ok(())
}

/// Loads the document for `form_id`, applies `apply` and writes it back
///
/// With `create` set a missing document starts from zero, otherwise the
/// update fails with `NotFound`.
fn modify(
    table: &mut Table<'_, &'static str, &'static str>,
    form_id: &str,
    create: bool,
    apply: impl FnOnce(&mut FormAnalytics),
) -> Result<FormAnalytics, AppError> {
    let mut analytics = match load::<FormAnalytics, _>(&*table, TABLE_NAME, form_id)? {
        Some(analytics) => analytics,
        None if create => FormAnalytics::default(),
        None => return Err(AppError::not_found(format!("Analytics for form {form_id}"))),
    };

    apply(&mut analytics);

    let encoded = encode(&analytics)?;
    table.insert(form_id, encoded.as_str())?;
    Ok(analytics)
}

/// Counts a submission inside a caller-owned transaction
pub(crate) fn apply_submission(
    table: &mut Table<'_, &'static str, &'static str>,
    form_id: &str,
    submitted_at: DateTime<Utc>,
) -> Result<FormAnalytics, AppError> {
    modify(table, form_id, false, |analytics| {
        analytics.submissions += 1;
        analytics.submission_dates.push(submitted_at);
    })
}

fn update(
    db: &Database,
    form_id: &str,
    create: bool,
    apply: impl FnOnce(&mut FormAnalytics),
) -> Result<FormAnalytics, AppError> {
    let write_txn = db.begin_write()?;
    let analytics = {
        let mut table = write_txn.open_table(TABLE_FORM_ANALYTICS)?;
        modify(&mut table, form_id, create, apply)?
    };
    write_txn.commit()?;

    Ok(analytics)
}

/// Counts a page view
///
/// Adds `location` to the location set when given and bumps the counter of
/// `source`. Creates the analytics document if the form has none yet.
pub fn record_view(
    db: &Database,
    form_id: &str,
    location: Option<&str>,
    source: &str,
) -> Result<FormAnalytics, AppError> {
    debug!(form_id, ?location, source, "recording view");

    update(db, form_id, true, |analytics| {
        analytics.views += 1;
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            if !analytics.locations.iter().any(|known| known == location) {
                analytics.locations.push(location.to_string());
            }
        }
        *analytics.traffic_sources.entry(source.to_string()).or_default() += 1;
    })
}

/// Counts a submission. Fails with `NotFound` when the form has no analytics document.
pub fn record_submission(db: &Database, form_id: &str) -> Result<FormAnalytics, AppError> {
    let write_txn = db.begin_write()?;
    let analytics = {
        let mut table = write_txn.open_table(TABLE_FORM_ANALYTICS)?;
        apply_submission(&mut table, form_id, Utc::now())?
    };
    write_txn.commit()?;

    Ok(analytics)
}

/// Counts a file download. Fails with `NotFound` when the form has no analytics document.
pub fn record_download(db: &Database, form_id: &str) -> Result<FormAnalytics, AppError> {
    update(db, form_id, false, |analytics| analytics.downloads += 1)
}

/// Reads the analytics of a form with derived rates filled in
///
/// A form without an analytics document yields `Ok(None)`.
pub fn get_analytics(db: &Database, form_id: &str) -> Result<Option<AnalyticsReport>, AppError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FORM_ANALYTICS)?;

    let analytics = load::<FormAnalytics, _>(&table, TABLE_NAME, form_id)?;
    Ok(analytics.map(AnalyticsReport::from))
}
