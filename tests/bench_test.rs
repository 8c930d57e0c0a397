//! Benchmark tests for the hot write paths
//!
//! Run with: cargo test --release bench -- --ignored --nocapture

use std::time::Instant;

use tempfile::NamedTempFile;

use formboard::analytics::{get_analytics, record_view};
use formboard::database::init_db;
use formboard::forms::{create_form, list_forms_for_user};
use formboard::model::{CreateFormRequest, CurrentUser, ListParams, SubmissionRequest};
use formboard::submissions::submit_response;

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn bench_owner() -> CurrentUser {
    CurrentUser {
        id: "bench_user".to_string(),
        display_name: Some("Bench".to_string()),
    }
}

#[test]
#[ignore]
fn bench_create_forms() {
    println!("\n=== Benchmark: Create forms ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let owner = bench_owner();

    benchmark("Create form", 1000, || {
        create_form(&db, &owner, CreateFormRequest::default()).unwrap();
    });

    let params = ListParams {
        limit: Some(100),
        ..ListParams::default()
    };
    benchmark("List newest 100 forms", 100, || {
        let forms = list_forms_for_user(&db, "bench_user", &params).unwrap();
        assert_eq!(forms.len(), 100);
    });
}

#[test]
#[ignore]
fn bench_record_activity() {
    println!("\n=== Benchmark: Record activity ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let form_id = create_form(&db, &bench_owner(), CreateFormRequest::default())
        .unwrap()
        .id;

    benchmark("Record view", 1000, || {
        record_view(&db, &form_id, Some("Bench City"), "direct").unwrap();
    });

    let submission = SubmissionRequest {
        email: "bench@example.com".to_string(),
        first_name: "Bench".to_string(),
        last_name: "Mark".to_string(),
        twitter_handle: "@bench".to_string(),
    };
    benchmark("Submit response", 1000, || {
        submit_response(&db, &form_id, submission.clone()).unwrap();
    });

    benchmark("Read analytics report", 1000, || {
        get_analytics(&db, &form_id).unwrap().unwrap();
    });
}
