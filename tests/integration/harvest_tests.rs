use food_event_harvester::config::{ApiKey, Config};
use food_event_harvester::{harvest, HarvestError};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/food/event.json";

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, start: &str, end: &str, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.harvest.start_date = start.to_string();
    config.harvest.end_date = end.to_string();
    config.harvest.concurrency = 1;
    config.harvest.pacing_ms = 0;
    config.api.base_url = format!("{}{}", server.uri(), ENDPOINT);
    config.api.user_agent = "harvest-tests/1.0".to_string();
    config.api.timeout_secs = 5;
    config.api.api_key = Some(ApiKey::new("test-key"));
    config.output.data_dir = data_dir.to_string_lossy().into_owned();
    config
}

fn search(start: &str, end: &str) -> String {
    format!("date_started:[{} TO {}]", start, end)
}

fn results_body(count: usize) -> String {
    let results: Vec<String> = (0..count).map(|i| format!(r#"{{"id":{}}}"#, i)).collect();
    format!(r#"{{"meta":{{}},"results":[{}]}}"#, results.join(","))
}

fn next_link(server: &MockServer, next_path: &str) -> String {
    format!("<{}{}>; rel=\"next\"", server.uri(), next_path)
}

/// Serves a single-page bucket
async fn mount_bucket(server: &MockServer, start: &str, end: &str, records: usize) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("search", search(start, end).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_body(records)))
        .mount(server)
        .await;
}

fn artifact(dir: &Path, start: &str, end: &str, page: u32) -> std::path::PathBuf {
    dir.join(format!("food_event_{}_{}_p{}.json", start, end, page))
}

#[tokio::test]
async fn test_full_harvest_two_buckets() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // January: two pages, linked
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("search", search("20000101", "20000131").as_str()))
        .and(query_param("limit", "100"))
        .and(query_param("sort", "date_started:asc"))
        .and(query_param("api_key", "test-key"))
        .and(header("user-agent", "harvest-tests/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_body(3))
                .insert_header("link", next_link(&server, "/next/jan/2").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Pagination links carry no key; the transport adds it
    Mock::given(method("GET"))
        .and(path("/next/jan/2"))
        .and(query_param("api_key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_body(2)))
        .expect(1)
        .mount(&server)
        .await;

    // February is partial
    mount_bucket(&server, "20000201", "20000215", 1).await;

    let config = create_test_config(&server, "20000101", "20000215", dir.path());
    let summary = harvest(&config).await.expect("Harvest failed");

    assert_eq!(summary.buckets_total, 2);
    assert_eq!(summary.buckets_completed, 2);
    assert_eq!(summary.pages_written, 3);
    assert_eq!(summary.total_records, 6);

    let jan_p1 = std::fs::read_to_string(artifact(dir.path(), "20000101", "20000131", 1)).unwrap();
    assert_eq!(jan_p1, results_body(3));
    assert!(artifact(dir.path(), "20000101", "20000131", 2).exists());
    assert!(artifact(dir.path(), "20000201", "20000215", 1).exists());
    assert!(!artifact(dir.path(), "20000201", "20000215", 2).exists());

    // Buckets are claimed in partition order with one worker
    let requests = server.received_requests().await.unwrap();
    let searches: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "search")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(
        searches,
        vec![search("20000101", "20000131"), search("20000201", "20000215")]
    );
}

#[tokio::test]
async fn test_link_with_other_relations_only_ends_bucket() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_body(1))
                .insert_header(
                    "link",
                    format!("<{}/prev>; rel=\"prev\"", server.uri()).as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "20000101", "20000131", dir.path());
    let summary = harvest(&config).await.unwrap();

    assert_eq!(summary.pages_written, 1);
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_bucket(&server, "20000101", "20000131", 4).await;

    let config = create_test_config(&server, "20000101", "20000131", dir.path());
    let started = Instant::now();
    let summary = harvest(&config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.total_records, 4);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(elapsed >= Duration::from_millis(500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "elapsed {:?}", elapsed);

    // The 429 body is never persisted
    let saved = std::fs::read_to_string(artifact(dir.path(), "20000101", "20000131", 1)).unwrap();
    assert_eq!(saved, results_body(4));
}

#[tokio::test]
async fn test_server_error_honours_retry_after() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_bucket(&server, "20000101", "20000131", 1).await;

    let config = create_test_config(&server, "20000101", "20000131", dir.path());
    let started = Instant::now();
    harvest(&config).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_error_is_fatal_and_stops_claims() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_bucket(&server, "20000101", "20000131", 2).await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("search", search("20000201", "20000229").as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":{"code":"NOT_FOUND"}}"#))
        .mount(&server)
        .await;
    mount_bucket(&server, "20000301", "20000331", 2).await;

    let config = create_test_config(&server, "20000101", "20000331", dir.path());
    let err = harvest(&config).await.unwrap_err();

    match &err {
        HarvestError::Http { status, excerpt } => {
            assert_eq!(*status, 404);
            assert!(excerpt.contains("NOT_FOUND"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert!(err.to_string().starts_with("HTTP 404: "));

    // Not retried, and March is never claimed
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(artifact(dir.path(), "20000101", "20000131", 1).exists());
    assert!(!artifact(dir.path(), "20000301", "20000331", 1).exists());
}

#[tokio::test]
async fn test_client_error_with_sibling_in_flight() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // January answers slowly and has a second page
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("search", search("20000101", "20000131").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_body(3))
                .insert_header("link", next_link(&server, "/next/jan/2").as_str())
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next/jan/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    // February fails while January's first page is outstanding
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("search", search("20000201", "20000229").as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":{"code":"NOT_FOUND"}}"#))
        .expect(1)
        .mount(&server)
        .await;

    for (start, end) in [
        ("20000301", "20000331"),
        ("20000401", "20000430"),
        ("20000501", "20000531"),
        ("20000601", "20000630"),
    ] {
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .and(query_param("search", search(start, end).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_body(1)))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, "20000101", "20000630", dir.path());
    config.harvest.concurrency = 2;
    let err = harvest(&config).await.unwrap_err();

    assert!(matches!(err, HarvestError::Http { status: 404, .. }));

    // January ran to its last page after the failure
    assert!(artifact(dir.path(), "20000101", "20000131", 1).exists());
    assert!(artifact(dir.path(), "20000101", "20000131", 2).exists());
    assert!(!artifact(dir.path(), "20000201", "20000229", 1).exists());

    // Only the two in-flight buckets were ever requested
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    for (start, end) in [("20000301", "20000331"), ("20000601", "20000630")] {
        assert!(!artifact(dir.path(), start, end, 1).exists());
    }
}

#[tokio::test]
async fn test_malformed_body_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let config = create_test_config(&server, "20000101", "20000131", dir.path());
    let err = harvest(&config).await.unwrap_err();

    assert!(matches!(err, HarvestError::Parse { .. }));
    assert!(!artifact(dir.path(), "20000101", "20000131", 1).exists());
}

#[tokio::test]
async fn test_request_timeout_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_body(1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "20000101", "20000131", dir.path());
    config.api.timeout_secs = 1;
    let err = harvest(&config).await.unwrap_err();

    match err {
        HarvestError::Network { url, message } => {
            assert!(message.contains("timed out"), "message: {}", message);
            assert!(!url.contains("test-key"), "key leaked: {}", url);
        }
        other => panic!("expected Network error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_fatal() {
    let dir = TempDir::new().unwrap();

    // Reserve a port, then free it so nothing is listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = Config::default();
    config.harvest.start_date = "20000101".to_string();
    config.harvest.end_date = "20000131".to_string();
    config.api.base_url = format!("http://127.0.0.1:{}{}", port, ENDPOINT);
    config.output.data_dir = dir.path().to_string_lossy().into_owned();

    let err = harvest(&config).await.unwrap_err();
    assert!(matches!(err, HarvestError::Network { .. }));
}

#[tokio::test]
async fn test_each_bucket_fetched_once_with_many_workers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let months = [
        ("20010101", "20010131"),
        ("20010201", "20010228"),
        ("20010301", "20010331"),
        ("20010401", "20010430"),
        ("20010501", "20010531"),
        ("20010601", "20010630"),
        ("20010701", "20010731"),
        ("20010801", "20010831"),
        ("20010901", "20010930"),
        ("20011001", "20011031"),
        ("20011101", "20011130"),
        ("20011201", "20011231"),
    ];
    for (i, (start, end)) in months.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .and(query_param("search", search(start, end).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(results_body(i + 1))
                    .set_delay(Duration::from_millis(20)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, "20010101", "20011231", dir.path());
    config.harvest.concurrency = 4;
    let summary = harvest(&config).await.unwrap();

    assert_eq!(summary.buckets_completed, 12);
    assert_eq!(summary.pages_written, 12);
    assert_eq!(summary.total_records, (1..=12).sum::<u64>());

    let requests = server.received_requests().await.unwrap();
    let unique: HashSet<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "search")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(requests.len(), 12);
    assert_eq!(unique.len(), 12);

    for (start, end) in months {
        assert!(artifact(dir.path(), start, end, 1).exists());
    }
}

#[tokio::test]
async fn test_inverted_range_issues_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server, "20000301", "20000101", dir.path());
    let err = harvest(&config).await.unwrap_err();

    assert!(matches!(err, HarvestError::InvalidRange { .. }));
    assert!(err.is_configuration());
    assert!(server.received_requests().await.unwrap().is_empty());
}
