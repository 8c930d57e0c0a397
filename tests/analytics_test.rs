//! Analytics aggregator and traffic classification

use chrono::{TimeZone, Utc};
use redb::Database;
use tempfile::NamedTempFile;

use formboard::analytics::{
    bounce_rate, drop_off_rate, get_analytics, record_download, record_submission, record_view,
    ReferrerClassifier, TrafficClassifier, VisitContext,
};
use formboard::database::{init_db, TABLE_FORM_ANALYTICS};
use formboard::error::AppError;
use formboard::forms::create_form;
use formboard::model::{
    AnalyticsReport, CreateFormRequest, CurrentUser, FormAnalytics, TrafficSource,
};

fn setup_db() -> (Database, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    (db, temp_db)
}

fn new_form(db: &Database) -> String {
    let owner = CurrentUser {
        id: "owner_1".to_string(),
        display_name: None,
    };
    create_form(db, &owner, CreateFormRequest::default()).unwrap().id
}

fn classify(
    referrer: Option<&str>,
    utm_source: Option<&str>,
    utm_medium: Option<&str>,
) -> TrafficSource {
    ReferrerClassifier.classify(&VisitContext {
        referrer,
        utm_source,
        utm_medium,
    })
}

#[test]
fn test_bounce_rate() {
    assert_eq!(bounce_rate(0, 0), "0");
    assert_eq!(bounce_rate(100, 25), "75.00");
    assert_eq!(bounce_rate(3, 1), "66.67");
    assert_eq!(bounce_rate(10, 10), "0.00");
}

#[test]
fn test_drop_off_rate() {
    assert_eq!(drop_off_rate(0, 0), "0");
    assert_eq!(drop_off_rate(0, 5), "0");
    assert_eq!(drop_off_rate(10, 4), "60.00");
}

#[test]
fn test_rates_go_negative_when_counters_disagree() {
    assert_eq!(drop_off_rate(2, 3), "-50.00");
    assert_eq!(bounce_rate(1, 2), "-100.00");
}

#[test]
fn test_record_view_is_additive() {
    let (db, _temp_db) = setup_db();
    let form_id = new_form(&db);

    record_view(&db, &form_id, Some("Berlin"), "direct").unwrap();
    let analytics = record_view(&db, &form_id, Some("Berlin"), "email").unwrap();

    assert_eq!(analytics.views, 2);
    assert_eq!(analytics.traffic_sources.len(), 2);
    assert_eq!(analytics.traffic_sources["direct"], 1);
    assert_eq!(analytics.traffic_sources["email"], 1);
    assert_eq!(analytics.locations, vec!["Berlin".to_string()]);
}

#[test]
fn test_record_view_creates_missing_document() {
    let (db, _temp_db) = setup_db();

    assert!(get_analytics(&db, "legacy-form").unwrap().is_none());

    let analytics = record_view(&db, "legacy-form", None, "referral").unwrap();
    assert_eq!(analytics.views, 1);
    assert!(analytics.locations.is_empty());

    let report = get_analytics(&db, "legacy-form").unwrap().unwrap();
    assert_eq!(report.traffic_sources["referral"], 1);
}

#[test]
fn test_locations_keep_first_seen_order() {
    let (db, _temp_db) = setup_db();
    let form_id = new_form(&db);

    for location in ["Lagos", "Oslo", "Lagos", "", "Lima"] {
        record_view(&db, &form_id, Some(location), "direct").unwrap();
    }

    let report = get_analytics(&db, &form_id).unwrap().unwrap();
    assert_eq!(report.views, 5);
    assert_eq!(report.locations, vec!["Lagos", "Oslo", "Lima"]);
}

#[test]
fn test_submission_and_download_need_a_document() {
    let (db, _temp_db) = setup_db();

    assert!(matches!(
        record_submission(&db, "unknown"),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        record_download(&db, "unknown"),
        Err(AppError::NotFound(_))
    ));
    assert!(get_analytics(&db, "unknown").unwrap().is_none());
}

#[test]
fn test_counters_and_derived_rates() {
    let (db, _temp_db) = setup_db();
    let form_id = new_form(&db);

    for _ in 0..10 {
        record_view(&db, &form_id, None, "direct").unwrap();
    }
    for _ in 0..5 {
        record_submission(&db, &form_id).unwrap();
    }
    for _ in 0..2 {
        record_download(&db, &form_id).unwrap();
    }

    let report = get_analytics(&db, &form_id).unwrap().unwrap();
    assert_eq!(report.views, 10);
    assert_eq!(report.submissions, 5);
    assert_eq!(report.downloads, 2);
    assert_eq!(report.bounce_rate, "50.00");
    assert_eq!(report.drop_off_rate, "60.00");
    assert_eq!(report.submissions_over_time.len(), 1);
    assert_eq!(report.submissions_over_time[0].submissions, 5);
    assert_eq!(report.submissions_over_time[0].date, Utc::now().date_naive());
}

#[test]
fn test_new_form_report_is_zero_filled() {
    let (db, _temp_db) = setup_db();
    let form_id = new_form(&db);

    let report = get_analytics(&db, &form_id).unwrap().unwrap();

    assert_eq!(report.traffic_sources.len(), TrafficSource::ALL.len());
    for source in TrafficSource::ALL {
        assert_eq!(report.traffic_sources[source.as_str()], 0, "{source}");
    }
    assert_eq!(report.bounce_rate, "0");
    assert_eq!(report.drop_off_rate, "0");
}

#[test]
fn test_report_keeps_unknown_source_tags() {
    let analytics = FormAnalytics {
        views: 3,
        traffic_sources: [("newsletter-q3".to_string(), 2), ("direct".to_string(), 1)]
            .into_iter()
            .collect(),
        ..FormAnalytics::default()
    };

    let report = AnalyticsReport::from(analytics);

    assert_eq!(report.traffic_sources.len(), TrafficSource::ALL.len() + 1);
    assert_eq!(report.traffic_sources["newsletter-q3"], 2);
    assert_eq!(report.traffic_sources["direct"], 1);
    assert_eq!(report.traffic_sources["email"], 0);
    assert_eq!(report.bounce_rate, "100.00");
}

#[test]
fn test_submissions_bucketed_per_day() {
    let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();
    let analytics = FormAnalytics {
        submissions: 4,
        submission_dates: vec![day(2, 9), day(1, 23), day(2, 10), day(1, 0)],
        ..FormAnalytics::default()
    };

    let report = AnalyticsReport::from(analytics);
    let buckets: Vec<(String, u64)> = report
        .submissions_over_time
        .iter()
        .map(|bucket| (bucket.date.to_string(), bucket.submissions))
        .collect();

    assert_eq!(
        buckets,
        vec![("2024-03-01".to_string(), 2), ("2024-03-02".to_string(), 2)]
    );
}

#[test]
fn test_classifier_without_signal_is_direct() {
    assert_eq!(classify(None, None, None), TrafficSource::Direct);
    assert_eq!(classify(Some(""), Some("  "), None), TrafficSource::Direct);
}

#[test]
fn test_classifier_by_referrer() {
    let cases = [
        ("https://www.facebook.com/", TrafficSource::SocialFacebook),
        ("https://l.facebook.com/l.php?u=x", TrafficSource::SocialFacebook),
        ("https://t.co/abc", TrafficSource::SocialTwitter),
        ("https://x.com/someone/status/1", TrafficSource::SocialTwitter),
        ("https://www.linkedin.com/feed/", TrafficSource::SocialLinkedin),
        ("https://instagram.com", TrafficSource::SocialInstagram),
        ("https://www.google.co.uk/", TrafficSource::SearchGoogle),
        ("https://mail.google.com/mail/u/0/", TrafficSource::Email),
        ("https://www.bing.com/search?q=forms", TrafficSource::SearchBing),
        ("https://duckduckgo.com/", TrafficSource::SearchOther),
        ("https://blog.example.org/post", TrafficSource::Referral),
        ("https://about.com/", TrafficSource::Referral),
    ];

    for (referrer, expected) in cases {
        assert_eq!(classify(Some(referrer), None, None), expected, "{referrer}");
    }
}

#[test]
fn test_classifier_prefers_campaign_parameters() {
    assert_eq!(
        classify(Some("https://www.google.com/"), None, Some("email")),
        TrafficSource::Email
    );
    assert_eq!(
        classify(Some("https://www.google.com/"), Some("twitter"), None),
        TrafficSource::SocialTwitter
    );
    assert_eq!(classify(None, Some("Newsletter"), None), TrafficSource::Email);
    assert_eq!(classify(None, Some("partner_site"), None), TrafficSource::Referral);
}

struct Constant(TrafficSource);

impl TrafficClassifier for Constant {
    fn classify(&self, _visit: &VisitContext<'_>) -> TrafficSource {
        self.0
    }
}

#[test]
fn test_classifier_is_pluggable() {
    let classifier: Box<dyn TrafficClassifier> = Box::new(Constant(TrafficSource::SearchBing));

    assert_eq!(
        classifier.classify(&VisitContext::default()),
        TrafficSource::SearchBing
    );
}

#[test]
fn test_corrupt_analytics_document_is_reported() {
    let (db, _temp_db) = setup_db();
    let form_id = new_form(&db);

    let write_txn = db.begin_write().unwrap();
    {
        let mut table = write_txn.open_table(TABLE_FORM_ANALYTICS).unwrap();
        table.insert(form_id.as_str(), "{\"views\": \"many\"}").unwrap();
    }
    write_txn.commit().unwrap();

    assert!(matches!(
        get_analytics(&db, &form_id),
        Err(AppError::Decode { .. })
    ));
    // Counters are not reset on top of a corrupt document either.
    assert!(matches!(
        record_view(&db, &form_id, None, "direct"),
        Err(AppError::Decode { .. })
    ));
}
