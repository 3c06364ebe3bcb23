//! Bridge regression tests.
//!
//! Drives the assembled router the way a Prometheus scrape would: messages
//! go in through the ingestion adapter, queries come out of `/mqtt`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use promqtt_api::build_router;
use promqtt_ingest::IngestAdapter;
use promqtt_metrics::BridgeMetrics;
use promqtt_state::RetainedStore;

struct Bridge {
    adapter: IngestAdapter,
    metrics: BridgeMetrics,
    router: Router,
}

fn test_bridge() -> Bridge {
    let store = RetainedStore::new();
    let metrics = BridgeMetrics::new().unwrap();
    let adapter = IngestAdapter::new(store.clone()).with_metrics(metrics.clone());
    let router = build_router(store, metrics.clone());
    Bridge {
        adapter,
        metrics,
        router,
    }
}

/// Percent-encode everything except ASCII alphanumerics.
fn enc(s: &str) -> String {
    s.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn sample_lines(body: &str) -> Vec<&str> {
    body.lines().filter(|l| !l.starts_with('#') && !l.is_empty()).collect()
}

#[tokio::test]
async fn filter_and_value_pattern() {
    let bridge = test_bridge();
    bridge.adapter.on_message("sensors/a", b"21.5");
    bridge.adapter.on_message("other/b", b"99");
    bridge.adapter.on_message("sensors/c", b"abc");

    let uri = format!(
        "/mqtt?topic={}&regex={}",
        enc("^sensors/"),
        enc(r"(?P<c>\d+(\.\d+)?)")
    );
    let (status, body) = get(&bridge.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let lines = sample_lines(&body);
    assert_eq!(lines.len(), 2, "{body}");
    assert!(lines.iter().all(|l| l.contains("{topic=\"sensors/a\"}")));
    assert!(body.contains("sensors_ac{topic=\"sensors/a\"} 21.5"));
}

#[tokio::test]
async fn empty_regex_means_whole_payload() {
    let bridge = test_bridge();
    bridge.adapter.on_message("x/y", b"42");

    let (status, with_empty) = get(&bridge.router, "/mqtt?topic=x%2Fy&regex=").await;
    assert_eq!(status, StatusCode::OK);
    let (_, with_default) = get(&bridge.router, &format!("/mqtt?topic=x%2Fy&regex={}", enc("(.*)"))).await;
    let (_, without) = get(&bridge.router, "/mqtt?topic=x%2Fy").await;

    assert_eq!(with_empty, with_default);
    assert_eq!(with_empty, without);
    assert_eq!(sample_lines(&with_empty), vec!["x_y1{topic=\"x/y\"} 42"]);
}

#[tokio::test]
async fn no_match_is_empty_success() {
    let bridge = test_bridge();
    bridge.adapter.on_message("a/b", b"1");

    let (status, body) = get(&bridge.router, "/mqtt?topic=nomatch").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn invalid_topic_pattern_is_client_error() {
    let bridge = test_bridge();
    bridge.adapter.on_message("a", b"1");

    let (status, body) = get(&bridge.router, "/mqtt?topic=%5B").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("invalid topic pattern"));

    // The bridge keeps serving afterwards.
    let (status, _) = get(&bridge.router, "/mqtt?topic=a").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_value_pattern_is_client_error() {
    let bridge = test_bridge();
    let (status, body) = get(&bridge.router, &format!("/mqtt?topic=a&regex={}", enc("(x"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("invalid regex pattern"));
}

#[tokio::test]
async fn missing_topic_is_client_error() {
    let bridge = test_bridge();
    for uri in ["/mqtt", "/mqtt?topic=", "/mqtt?regex=%28.%2A%29"] {
        let (status, body) = get(&bridge.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, "must pass topic\n");
    }
    assert_eq!(bridge.metrics.query_errors(), 3);
}

#[tokio::test]
async fn latest_value_wins() {
    let bridge = test_bridge();
    bridge.adapter.on_message("meter/power", b"100");
    bridge.adapter.on_message("meter/power", b"250");

    let (_, body) = get(&bridge.router, "/mqtt?topic=meter").await;
    assert_eq!(sample_lines(&body), vec!["meter_power1{topic=\"meter/power\"} 250"]);
}

#[tokio::test]
async fn json_payload_with_named_groups() {
    let bridge = test_bridge();
    bridge
        .adapter
        .on_message("zigbee/livingroom", br#"{"temperature":22.4,"humidity":48,"battery":"ok"}"#);

    let regex = r#""temperature":(?P<_temperature>[-0-9.]+).*"humidity":(?P<_humidity>[-0-9.]+).*"battery":"(?P<_battery>[^"]*)""#;
    let (status, body) = get(&bridge.router, &format!("/mqtt?topic=zigbee&regex={}", enc(regex))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("zigbee_livingroom_temperature{topic=\"zigbee/livingroom\"} 22.4"));
    assert!(body.contains("zigbee_livingroom_humidity{topic=\"zigbee/livingroom\"} 48"));
    assert!(!body.contains("battery"));
}

#[tokio::test]
async fn metrics_endpoint_reports_bridge_activity() {
    let bridge = test_bridge();
    bridge.adapter.on_message("a", b"1");
    bridge.adapter.on_message("b", b"x");
    get(&bridge.router, "/mqtt?topic=.").await;

    let (status, body) = get(&bridge.router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("promqtt_messages_received_total 2"));
    assert!(body.contains("promqtt_retained_topics 2"));
    assert!(body.contains("promqtt_queries_total 1"));
    assert!(body.contains("promqtt_samples_extracted_total 1"));
    assert!(body.contains("promqtt_parse_failures_total 1"));
    // Retained topics never leak into the operational endpoint.
    assert!(!body.contains("topic=\"a\""));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let bridge = test_bridge();
    let (status, _) = get(&bridge.router, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queries_during_ingestion() {
    let bridge = test_bridge();
    let adapter = bridge.adapter.clone();

    let writer = tokio::task::spawn_blocking(move || {
        for n in 0..2_000 {
            adapter.on_message(&format!("load/{}", n % 16), n.to_string().as_bytes());
        }
    });

    for _ in 0..20 {
        let (status, body) = get(&bridge.router, "/mqtt?topic=%5Eload%2F").await;
        assert_eq!(status, StatusCode::OK);
        for line in sample_lines(&body) {
            let value: f64 = line.rsplit(' ').next().unwrap().parse().unwrap();
            assert!((0.0..2_000.0).contains(&value), "{line}");
        }
    }

    writer.await.unwrap();
    let (_, body) = get(&bridge.router, "/mqtt?topic=%5Eload%2F").await;
    assert_eq!(sample_lines(&body).len(), 16);
}
