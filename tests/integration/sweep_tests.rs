//! Integration tests for the page walk
//!
//! Most tests drive the coordinator through a scripted in-process session so every page
//! outcome can be chosen. The end-to-end tests use wiremock behind the real HTTP session.

use async_trait::async_trait;
use pagesweep::config::{parse_config, Config};
use pagesweep::crawler::{run_once, Coordinator};
use pagesweep::session::{BrowserSession, SessionError, SessionLauncher};
use pagesweep::storage::{ReportStore, SqliteStorage};
use pagesweep::RunReport;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_URL: &str = "https://listings.test/search?type=flat";

/// What the scripted session does when a page is loaded
#[derive(Debug, Clone)]
enum PageScript {
    Markup(String),
    Timeout,
    Empty,
    Lost,
}

/// Shared view of what a scripted session did
#[derive(Default)]
struct SessionRecorder {
    visits: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl SessionRecorder {
    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    pages: HashMap<String, PageScript>,
    current: Option<String>,
    recorder: Arc<SessionRecorder>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), SessionError> {
        self.recorder.visits.lock().unwrap().push(url.to_string());
        self.current = None;

        match self.pages.get(url.as_str()) {
            Some(PageScript::Markup(markup)) => {
                self.current = Some(markup.clone());
                Ok(())
            }
            Some(PageScript::Empty) => {
                self.current = Some(String::new());
                Ok(())
            }
            Some(PageScript::Timeout) => Err(SessionError::Timeout {
                what: format!("navigation to {}", url),
                after: timeout,
            }),
            Some(PageScript::Lost) => Err(SessionError::Lost("chrome not reachable".to_string())),
            None => Err(SessionError::Navigation {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            }),
        }
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<(), SessionError> {
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        self.recorder.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedLauncher {
    pages: HashMap<String, PageScript>,
    fail_launch: bool,
    recorder: Arc<SessionRecorder>,
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        if self.fail_launch {
            return Err(SessionError::Launch("chromedriver not running".to_string()));
        }

        Ok(Box::new(ScriptedSession {
            pages: self.pages.clone(),
            current: None,
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

/// Creates a test configuration for the given base URL
fn create_test_config(base_url: &str, extra: &str) -> Config {
    parse_config(&format!(
        r#"
[target]
base-url = "{}"
card-selector = "div.card"
row-selector = "div.row"
counter-selector = "span.counter"

[session]
load-timeout-secs = 5
settle-delay-ms = 0

[output]
database-path = "unused.db"

{}
"#,
        base_url, extra
    ))
    .unwrap()
}

fn page_url(page: u32) -> String {
    if page == 1 {
        BASE_URL.to_string()
    } else {
        format!("{}&page={}", BASE_URL, page)
    }
}

/// Builds a listing page with an optional counter and the given cards
fn listing_page(counter: Option<&str>, cards: &[&[&str]]) -> String {
    let mut html = String::from("<html><body><main>");

    if let Some(counter) = counter {
        html.push_str(&format!(r#"<span class="counter">{}</span>"#, counter));
    }

    for card in cards {
        html.push_str(r#"<div class="card">"#);
        for field in card.iter() {
            html.push_str(&format!(r#"<div class="row"><span>{}</span></div>"#, field));
        }
        html.push_str("</div>");
    }

    html.push_str("</main></body></html>");
    html
}

async fn run_scripted(
    pages: Vec<(u32, PageScript)>,
    extra_config: &str,
) -> (RunReport, Arc<SessionRecorder>) {
    let recorder = Arc::new(SessionRecorder::default());
    let launcher = ScriptedLauncher {
        pages: pages
            .into_iter()
            .map(|(page, script)| (page_url(page), script))
            .collect(),
        fail_launch: false,
        recorder: Arc::clone(&recorder),
    };

    let config = create_test_config(BASE_URL, extra_config);
    let coordinator = Coordinator::with_launcher(&config, Box::new(launcher)).unwrap();
    let report = coordinator.run().await;

    (report, recorder)
}

fn all_fields(report: &RunReport) -> Vec<String> {
    report
        .records
        .as_ref()
        .unwrap()
        .iter()
        .flat_map(|record| record.fields.clone())
        .collect()
}

#[tokio::test]
async fn test_three_pages_all_succeed() {
    let pages = vec![
        (
            1,
            PageScript::Markup(listing_page(Some("1 / 3"), &[&["a1"], &["a2"]])),
        ),
        (
            2,
            PageScript::Markup(listing_page(Some("2 / 3"), &[&["b1"], &["b2"], &["b3"]])),
        ),
        (3, PageScript::Markup(listing_page(Some("3 / 3"), &[&["c1"]]))),
    ];

    let (report, recorder) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 3);
    assert_eq!(report.record_count, 6);
    assert_eq!(report.error_summary, "");
    assert_eq!(all_fields(&report), vec!["a1", "a2", "b1", "b2", "b3", "c1"]);
    assert_eq!(recorder.visits(), vec![page_url(1), page_url(2), page_url(3)]);
    assert!(recorder.closed());
}

#[tokio::test]
async fn test_first_page_timeout() {
    let (report, recorder) = run_scripted(vec![(1, PageScript::Timeout)], "").await;

    assert_eq!(report.page_count, 1);
    assert_eq!(report.record_count, 0);
    assert!(report.error_summary.contains("first_page_load"));
    assert_eq!(recorder.visits(), vec![page_url(1)]);
    assert!(recorder.closed());
}

#[tokio::test]
async fn test_middle_page_failure_does_not_stop_walk() {
    let mut pages = vec![(
        1,
        PageScript::Markup(listing_page(Some("1 / 5"), &[&["page 1"]])),
    )];
    for page in 2..=5 {
        let script = if page == 3 {
            PageScript::Timeout
        } else {
            PageScript::Markup(listing_page(None, &[&[&format!("page {}", page)]]))
        };
        pages.push((page, script));
    }

    let (report, recorder) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 5);
    assert_eq!(report.record_count, 4);
    assert_eq!(all_fields(&report), vec!["page 1", "page 2", "page 4", "page 5"]);
    assert_eq!(report.error_summary.matches("[page_3_load]").count(), 1);
    assert_eq!(report.error_summary.lines().count(), 1);
    assert_eq!(recorder.visits().len(), 5);
}

#[tokio::test]
async fn test_session_lost_stops_walk() {
    let pages = vec![
        (
            1,
            PageScript::Markup(listing_page(Some("1 / 4"), &[&["first"]])),
        ),
        (2, PageScript::Lost),
        (3, PageScript::Markup(listing_page(None, &[&["never"]]))),
    ];

    let (report, recorder) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 4);
    assert_eq!(report.record_count, 1);
    assert!(report.error_summary.contains("[browser_session] session"));
    assert_eq!(recorder.visits(), vec![page_url(1), page_url(2)]);
    assert!(recorder.closed());
}

#[tokio::test]
async fn test_launch_failure_still_reports() {
    let recorder = Arc::new(SessionRecorder::default());
    let launcher = ScriptedLauncher {
        pages: HashMap::new(),
        fail_launch: true,
        recorder: Arc::clone(&recorder),
    };
    let config = create_test_config(BASE_URL, "");
    let coordinator = Coordinator::with_launcher(&config, Box::new(launcher)).unwrap();

    let report = coordinator.run().await;

    assert_eq!(report.page_count, 1);
    assert_eq!(report.record_count, 0);
    assert!(report.error_summary.starts_with("[browser_session] session:"));
    assert!(recorder.visits().is_empty());
}

#[tokio::test]
async fn test_first_page_not_markup() {
    let pages = vec![(1, PageScript::Markup("Access denied".to_string()))];

    let (report, _) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 1);
    assert_eq!(report.record_count, 0);
    assert!(report.error_summary.contains("[first_page_parse] malformed_markup"));
    assert!(!report.error_summary.contains("no_items"));
}

#[tokio::test]
async fn test_later_page_not_markup() {
    let pages = vec![
        (1, PageScript::Markup(listing_page(Some("1 / 3"), &[&["first"]]))),
        (2, PageScript::Markup("Access denied".to_string())),
        (3, PageScript::Markup(listing_page(None, &[&["third"]]))),
    ];

    let (report, recorder) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 3);
    assert_eq!(all_fields(&report), vec!["first", "third"]);
    assert!(report
        .error_summary
        .starts_with("[page_2_parse] malformed_markup"));
    assert_eq!(report.error_summary.lines().count(), 1);
    assert!(!report.error_summary.contains("no_items"));
    assert_eq!(recorder.visits().len(), 3);
}

#[tokio::test]
async fn test_empty_and_cardless_pages() {
    let pages = vec![
        (1, PageScript::Markup(listing_page(Some("1 / 3"), &[&["x"]]))),
        (2, PageScript::Empty),
        (3, PageScript::Markup(listing_page(None, &[]))),
    ];

    let (report, _) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 3);
    assert_eq!(report.record_count, 1);

    let lines: Vec<&str> = report.error_summary.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[page_2_html] empty_markup"));
    assert!(lines[1].starts_with("[page_3_no_items] no_items"));
}

#[tokio::test]
async fn test_first_page_without_cards_flags_no_items() {
    let pages = vec![(1, PageScript::Markup(listing_page(None, &[])))];

    let (report, _) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 1);
    assert!(report.error_summary.starts_with("[page_1_no_items]"));
}

#[tokio::test]
async fn test_page_count_from_links() {
    let first = format!(
        "{}{}",
        listing_page(None, &[&["one"]]),
        r#"<a href="?type=flat&page=2">2</a><a href="?type=flat&page=next">next</a>"#
    );
    let pages = vec![
        (1, PageScript::Markup(first)),
        (2, PageScript::Markup(listing_page(None, &[&["two"]]))),
    ];

    let (report, _) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 2);
    assert_eq!(all_fields(&report), vec!["one", "two"]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_invalid_page_count_falls_back_to_one() {
    let pages = vec![(
        1,
        PageScript::Markup(listing_page(Some("1 / 99999999999"), &[&["only"]])),
    )];

    let (report, recorder) = run_scripted(pages, "").await;

    assert_eq!(report.page_count, 1);
    assert_eq!(report.record_count, 1);
    assert!(report.error_summary.starts_with("[get_page_count] invalid_count"));
    assert_eq!(recorder.visits().len(), 1);
}

#[tokio::test]
async fn test_error_summary_is_bounded() {
    let mut pages = vec![(
        1,
        PageScript::Markup(listing_page(Some("1 / 16"), &[&["x"]])),
    )];
    for page in 2..=16 {
        pages.push((page, PageScript::Timeout));
    }

    let (report, _) = run_scripted(pages, "").await;

    let lines: Vec<&str> = report.error_summary.lines().collect();
    assert_eq!(report.page_count, 16);
    assert_eq!(lines.len(), 11);
    assert!(lines[0].starts_with("[page_2_load]"));
    assert_eq!(lines[10], "+5 additional");
}

#[tokio::test]
async fn test_report_policy_from_config() {
    let pages = vec![(1, PageScript::Markup(listing_page(None, &[&["a"], &["b"]])))];

    let (report, _) = run_scripted(pages, "[report]\ninclude-records = false").await;

    assert_eq!(report.record_count, 2);
    assert!(report.records.is_none());
}

#[tokio::test]
async fn test_every_outcome_combination_produces_report() {
    let first_pages = vec![
        PageScript::Markup(listing_page(Some("1 / 2"), &[&["a"]])),
        PageScript::Markup("garbage".to_string()),
        PageScript::Timeout,
        PageScript::Empty,
        PageScript::Lost,
    ];
    let second_pages = vec![
        PageScript::Markup(listing_page(None, &[&["b"]])),
        PageScript::Markup(listing_page(None, &[])),
        PageScript::Timeout,
        PageScript::Empty,
        PageScript::Lost,
    ];

    for first in &first_pages {
        for second in &second_pages {
            let (report, recorder) =
                run_scripted(vec![(1, first.clone()), (2, second.clone())], "").await;

            assert!(report.page_count >= 1);
            assert_eq!(
                report.records.as_ref().map(Vec::len),
                Some(report.record_count)
            );
            assert!(report.record_count <= 2);
            assert!(recorder.closed(), "session not closed for {:?}/{:?}", first, second);
        }
    }
}

#[tokio::test]
async fn test_http_session_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/listing?city=szeged", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/listing"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(Some("1 / 3"), &[&["Szeged", "45 m2"]]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/listing"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/listing"))
        .and(query_param("city", "szeged"))
        .and(query_param("page", "3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(None, &[&["Makó"], &["Hódmezővásárhely"]]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, "");
    let report = run_once(&config).await.unwrap();

    assert_eq!(report.page_count, 3);
    assert_eq!(report.record_count, 3);
    assert_eq!(
        report.records.as_ref().unwrap()[0].fields,
        vec!["Szeged", "45 m2"]
    );
    assert_eq!(report.records.as_ref().unwrap()[2].index, 2);

    let lines: Vec<&str> = report.error_summary.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[page_2_load] navigation: "));
    assert!(lines[0].contains("503"));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_http_session_missing_cards_is_load_failure() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/listing", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Please enable JavaScript</p></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, "");
    let report = run_once(&config).await.unwrap();

    assert_eq!(report.page_count, 1);
    assert_eq!(report.record_count, 0);
    assert!(report.error_summary.starts_with("[first_page_load] timeout"));
}

#[tokio::test]
async fn test_reports_persist_across_runs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("reports.db");

    let pages = vec![(
        1,
        PageScript::Markup(listing_page(Some("1 / 1"), &[&["kept"]])),
    )];
    let (first, _) = run_scripted(pages, "").await;
    let (second, _) = run_scripted(vec![(1, PageScript::Timeout)], "").await;

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage.save_report(&first, "hash-a").unwrap();
        storage.save_report(&second, "hash-a").unwrap();
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let stored = storage.list_reports().unwrap();

    assert_eq!(storage.count_reports().unwrap(), 2);
    assert_eq!(stored[0].report, first);
    assert_eq!(stored[1].report, second);
    assert!(stored[0].created_at_utc().ends_with('Z'));
    assert_eq!(storage.get_report(stored[1].id).unwrap().report, second);
}
