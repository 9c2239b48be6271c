//! Integration tests for the Akka cluster exporter.
//!
//! These tests run a fake Akka Management endpoint on a local port and verify
//! the full flow from fetching `/members` to exposing counts via `/metrics`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use akka_cluster_common::MemberStatus;
use akka_cluster_exporter::{
    ClusterCollector, ExporterConfig, FetchError, HttpFetcher, HttpServer, SharedCollector,
};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;

const SAMPLE: &str =
    r#"{"members":[{"status":"Up"},{"status":"Up"},{"status":"Down"},{"status":"Bogus"}]}"#;

/// Serve `router` on a random local port and return its address.
async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Upstream answering `/members` with a fixed status and body.
async fn spawn_members(status: StatusCode, body: &'static str) -> SocketAddr {
    spawn_upstream(Router::new().route("/members", get(move || async move { (status, body) })))
        .await
}

/// An address nothing listens on.
async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn create_collector(addr: SocketAddr, timeout: Duration) -> SharedCollector {
    let fetcher = HttpFetcher::new(&format!("http://{}/members", addr), timeout).unwrap();
    Arc::new(ClusterCollector::new(fetcher, "akka"))
}

/// Helper to parse a Prometheus sample line into (series, value).
fn parse_sample(line: &str) -> Option<(&str, f64)> {
    if line.starts_with('#') || line.trim().is_empty() {
        return None;
    }
    let (series, value) = line.rsplit_once(' ')?;
    value.parse::<f64>().ok().map(|v| (series, v))
}

fn sample_value(output: &str, series: &str) -> Option<f64> {
    output
        .lines()
        .filter_map(parse_sample)
        .find(|(s, _)| *s == series)
        .map(|(_, v)| v)
}

fn member_series(status: MemberStatus) -> String {
    format!("akka_current_members{{status=\"{}\"}}", status)
}

#[tokio::test]
async fn test_full_flow_counts_members() {
    let addr = spawn_members(StatusCode::OK, SAMPLE).await;
    let collector = create_collector(addr, Duration::from_secs(5));

    let scrape = collector.collect().await;

    assert!(scrape.up);
    assert_eq!(sample_value(&scrape.body, "akka_up"), Some(1.0));
    let expected = [
        (MemberStatus::Up, 2.0),
        (MemberStatus::Down, 1.0),
        (MemberStatus::Joining, 0.0),
        (MemberStatus::Leaving, 0.0),
        (MemberStatus::Exiting, 0.0),
        (MemberStatus::Removed, 0.0),
    ];
    for (status, value) in expected {
        assert_eq!(
            sample_value(&scrape.body, &member_series(status)),
            Some(value),
            "Unexpected value for {}. Output: {}",
            status,
            scrape.body
        );
    }
}

#[tokio::test]
async fn test_connection_refused_reports_down() {
    let addr = closed_addr().await;
    let collector = create_collector(addr, Duration::from_secs(2));

    let scrape = collector.collect().await;

    assert!(!scrape.up);
    assert_eq!(sample_value(&scrape.body, "akka_up"), Some(0.0));
    for status in MemberStatus::ALL {
        assert_eq!(
            sample_value(&scrape.body, &member_series(status)),
            Some(0.0)
        );
    }
}

#[tokio::test]
async fn test_non_2xx_reports_down() {
    let addr = spawn_members(StatusCode::SERVICE_UNAVAILABLE, SAMPLE).await;
    let collector = create_collector(addr, Duration::from_secs(5));

    let scrape = collector.collect().await;

    assert!(!scrape.up);
    assert_eq!(scrape.counts.total(), 0);
    assert_eq!(collector.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_timeout_reports_down() {
    let router = Router::new().route(
        "/members",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            SAMPLE
        }),
    );
    let addr = spawn_upstream(router).await;
    let collector = create_collector(addr, Duration::from_millis(100));

    let scrape = collector.collect().await;

    assert!(!scrape.up);
    assert_eq!(scrape.counts.total(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_up_with_zero_counts() {
    let addr = spawn_members(StatusCode::OK, "this is not json").await;
    let collector = create_collector(addr, Duration::from_secs(5));

    let scrape = collector.collect().await;

    assert!(scrape.up);
    assert_eq!(sample_value(&scrape.body, "akka_up"), Some(1.0));
    for status in MemberStatus::ALL {
        assert_eq!(
            sample_value(&scrape.body, &member_series(status)),
            Some(0.0)
        );
    }
    assert_eq!(collector.stats().parse_failures, 1);
}

#[tokio::test]
async fn test_truncated_body_is_up_with_zero_counts() {
    // Upstream that promises more body than it sends, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"members\"")
            .await;
        let _ = socket.shutdown().await;
    });
    let collector = create_collector(addr, Duration::from_secs(5));

    let scrape = collector.collect().await;

    assert!(scrape.up);
    assert_eq!(sample_value(&scrape.body, "akka_up"), Some(1.0));
    assert_eq!(scrape.counts.total(), 0);
    let stats = collector.stats();
    assert_eq!(stats.fetch_failures, 0);
    assert_eq!(stats.parse_failures, 1);
}

#[test]
fn test_unsupported_scheme_fails_at_startup() {
    let config = ExporterConfig::parse(r#"{ akka: { scrape_uri: "ftp://localhost/members" } }"#)
        .expect("config itself is well formed");

    let result = ClusterCollector::from_config(&config);
    assert!(matches!(result, Err(FetchError::UnsupportedScheme(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scrapes_are_identical() {
    let addr = spawn_members(StatusCode::OK, SAMPLE).await;
    let collector = create_collector(addr, Duration::from_secs(5));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let collector = collector.clone();
            tokio::spawn(async move { collector.collect().await })
        })
        .collect();

    let mut scrapes = Vec::new();
    for handle in handles {
        scrapes.push(handle.await.unwrap());
    }

    for scrape in &scrapes {
        assert!(scrape.up);
        assert_eq!(scrape.counts, scrapes[0].counts);
        for status in MemberStatus::ALL {
            assert_eq!(
                sample_value(&scrape.body, &member_series(status)),
                Some(scrapes[0].counts.get(status) as f64)
            );
        }
    }
    assert_eq!(collector.stats().scrapes, 16);
}

#[tokio::test]
async fn test_http_server_metrics_endpoint() {
    let upstream = spawn_members(StatusCode::OK, SAMPLE).await;
    let collector = create_collector(upstream, Duration::from_secs(5));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(collector, addr, "/metrics".to_string());
    let server_handle = tokio::spawn(async move { server.serve(listener, shutdown_rx).await });

    let response = reqwest::Client::new()
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert_eq!(sample_value(&body, "akka_up"), Some(1.0));
    assert_eq!(sample_value(&body, &member_series(MemberStatus::Up)), Some(2.0));

    let _ = shutdown_tx.send(true);
    let result = tokio::time::timeout(Duration::from_secs(2), server_handle)
        .await
        .expect("server did not shut down");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_upstream_recovery_is_reflected() {
    // Upstream that fails first and then recovers
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let router = Router::new().route(
        "/members",
        get({
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                        (StatusCode::INTERNAL_SERVER_ERROR, "")
                    } else {
                        (StatusCode::OK, SAMPLE)
                    }
                }
            }
        }),
    );
    let addr = spawn_upstream(router).await;
    let collector = create_collector(addr, Duration::from_secs(5));

    let first = collector.collect().await;
    assert!(!first.up);

    let second = collector.collect().await;
    assert!(second.up);
    assert_eq!(second.counts.get(MemberStatus::Up), 2);
}
