//! Integration tests for nber-harvest
//!
//! These tests drive the full pipeline over a scripted fetch backend, so
//! they run without network access and without touching the real publisher.

use std::sync::Arc;

use nber_harvest::config::Config;
use nber_harvest::fetch::{Fetcher, MockFetcher};
use nber_harvest::models::{split_title, DownloadStatus};
use nber_harvest::pipeline::{Pipeline, PipelineError, PipelineJob, PipelineState};
use nber_harvest::progress::{CollectingObserver, ProgressItem};

fn pdf_url(identifier: u32) -> String {
    Config::default().source.pdf_url(identifier)
}

fn listing_page(entries: &str) -> String {
    format!(r#"<html><body><div class="promo-grid__promos">{entries}</div></body></html>"#)
}

fn listing_entry(title: &str, label: &str, wpno: &str, authors: &str) -> String {
    format!(
        r#"<div class="digest-card">
            <div class="digest-card__title">{title}</div>
            <span class="digest-card__label">{label}</span>
            <a class="paper-card__paper_number" href="/papers/w{wpno}">w{wpno}</a>
            <div class="digest-card__items">{authors}</div>
        </div>"#
    )
}

#[tokio::test]
async fn full_run_produces_table_archive_and_counts() {
    let listing_url = "https://www.nber.org/papers?page=1&perPage=50&sortBy=public_date";
    let html = listing_page(&format!(
        "{}{}",
        listing_entry("Trade Wars: Evidence", "May 2025", "33405", "Author(s) - Jane Smith, John Doe"),
        listing_entry("Second Paper", "April 2025", "33406", "Author(s) - Ada Lovelace"),
    ));

    let fetcher = Arc::new(MockFetcher::new());
    fetcher.script_success(listing_url, html.into_bytes());
    fetcher.script_success(&pdf_url(33405), b"%PDF-1.4 first".to_vec());
    fetcher.script_success(&pdf_url(33406), b"%PDF-1.4 second".to_vec());
    fetcher.script_status(&pdf_url(33407), 404);

    let observer = Arc::new(CollectingObserver::new());
    let pipeline = Pipeline::with_fetcher(Config::default(), fetcher)
        .with_observer(Arc::clone(&observer) as _);

    let output = pipeline
        .run(PipelineJob::full(listing_url, 33405, 33407))
        .await
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);

    // metadata records in discovery order
    let result = &output.result;
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].identifier, "33405");
    assert_eq!(result.records[0].title, "Trade Wars");
    assert_eq!(result.records[1].identifier, "33406");

    // one outcome per requested identifier, requested order
    assert_eq!(result.outcomes.len(), 3);
    let ids: Vec<u32> = result.outcomes.iter().map(|o| o.identifier).collect();
    assert_eq!(ids, vec![33405, 33406, 33407]);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.outcomes[2].status, DownloadStatus::Failed);
    assert_eq!(result.outcomes[2].byte_size, None);

    // archive contains exactly the downloaded artifacts
    let archive_bytes = output.bundle.archive_bytes.clone().unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    assert!(archive.by_name("w33405.pdf").is_ok());
    assert!(archive.by_name("w33406.pdf").is_ok());

    // spreadsheet carries the constant columns and split titles
    let table = String::from_utf8(output.bundle.tabular_bytes.clone()).unwrap();
    assert!(table.starts_with("Source,Title1,Subtitle,Year,WP_NO,Author,Place,Publisher,Series,wpno"));
    assert!(table.contains("National Bureau of Economic Research,Trade Wars, Evidence,2025,33405"));
    assert!(table.contains("NBERWP 33406"));

    // progress: one page event plus one event per identifier
    let events = observer.events();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0].item, ProgressItem::Page(_)));
}

#[tokio::test]
async fn validation_errors_issue_no_network_calls() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline =
        Pipeline::with_fetcher(Config::default(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

    for (start, end) in [(0u32, 5u32), (9, 3)] {
        let err = pipeline.run(PipelineJob::range(start, end)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)), "range {start}..{end}");
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }
    assert_eq!(fetcher.call_count(), 0);

    let err = pipeline
        .run(PipelineJob::listing("not a url"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn outcome_count_matches_range_length() {
    for (start, end) in [(1u32, 1u32), (5, 8), (33405, 33410)] {
        let fetcher = Arc::new(MockFetcher::new());
        let pipeline = Pipeline::with_fetcher(Config::default(), fetcher);
        let output = pipeline.run(PipelineJob::range(start, end)).await.unwrap();

        let expected = (end - start + 1) as usize;
        assert_eq!(output.result.outcomes.len(), expected);

        let mut seen: Vec<u32> = output.result.outcomes.iter().map(|o| o.identifier).collect();
        let sorted = seen.clone();
        seen.dedup();
        assert_eq!(seen.len(), expected, "identifiers must be unique");
        assert_eq!(sorted, (start..=end).collect::<Vec<u32>>());
    }
}

#[tokio::test]
async fn rerun_against_unchanged_source_is_byte_identical() {
    let listing_url = "https://www.nber.org/papers?page=1";
    let html = listing_page(&listing_entry(
        "Idempotent: Output",
        "2024",
        "77",
        "Author(s) - Same Every Time",
    ));

    let fetcher = Arc::new(MockFetcher::new());
    fetcher.script_success(listing_url, html.into_bytes());
    fetcher.script_success(&pdf_url(77), b"%PDF-1.4 same".to_vec());

    let pipeline = Pipeline::with_fetcher(Config::default(), fetcher);

    let first = pipeline.run(PipelineJob::full(listing_url, 77, 77)).await.unwrap();
    let second = pipeline.run(PipelineJob::full(listing_url, 77, 77)).await.unwrap();

    assert_eq!(first.bundle.tabular_bytes, second.bundle.tabular_bytes);
    assert_eq!(
        first.bundle.page_report_bytes,
        second.bundle.page_report_bytes
    );
}

#[test]
fn title_split_is_total_and_lossless_for_one_colon() {
    let cases = [
        "Plain title with no colon",
        "Main: Subtitle",
        "A: B: C: D",
        "",
        ":",
        "trailing:",
    ];
    for title in cases {
        let (main, subtitle) = split_title(title);
        match subtitle {
            Some(sub) => {
                if title.matches(':').count() == 1 {
                    assert_eq!(format!("{main}:{sub}"), title);
                }
            }
            None => assert_eq!(main, title),
        }
    }
}

#[tokio::test]
async fn cancellation_completes_with_every_identifier_recorded() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline =
        Pipeline::with_fetcher(Config::default(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);
    pipeline.cancellation_token().cancel();

    let output = pipeline.run(PipelineJob::range(1, 5)).await.unwrap();

    assert_eq!(output.result.outcomes.len(), 5);
    assert_eq!(output.result.failed, 5);
    assert_eq!(fetcher.call_count(), 0);
    assert!(output
        .result
        .outcomes
        .iter()
        .all(|o| o.error_detail.as_deref() == Some("cancelled")));
}
