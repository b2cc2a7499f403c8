//! Push center tests against a mock events endpoint.

mod common;

use std::time::Duration;

use common::{session, Enterprise, ENTERPRISE};
use nuagerest::{Event, Identity, PushCenter};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn notification(uuid: &str, events: &[(&str, &str)]) -> Value {
    let events: Vec<Value> = events
        .iter()
        .map(|(entity_type, id)| {
            json!({
                "entityType": entity_type,
                "type": "CREATE",
                "updateMechanism": "DEFAULT",
                "entities": [{"ID": id}]
            })
        })
        .collect();
    json!({"uuid": uuid, "events": events})
}

/// First poll, sent without a cursor.
async fn mount_first(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .with_priority(5)
        .mount(server)
        .await;
}

async fn mount_after(server: &MockServer, cursor: &str, template: ResponseTemplate, priority: u8) {
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("uuid", cursor))
        .respond_with(template)
        .with_priority(priority)
        .mount(server)
        .await;
}

/// A poll that does not answer within the test.
fn hanging() -> ResponseTemplate {
    ResponseTemplate::new(200).set_delay(Duration::from_secs(600))
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("event in time")
        .expect("channel open")
}

fn entity_id(event: &Event) -> String {
    event
        .entity::<Enterprise>()
        .ok()
        .flatten()
        .and_then(|e| e.base.id)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_events_dispatched_in_order() {
    let server = MockServer::start().await;
    mount_first(&server, notification("x", &[("enterprise", "1")])).await;
    mount_after(
        &server,
        "x",
        ResponseTemplate::new(200).set_body_json(notification("y", &[("enterprise", "2")])),
        1,
    )
    .await;
    mount_after(
        &server,
        "y",
        ResponseTemplate::new(200).set_body_json(notification("z", &[("enterprise", "3")])),
        1,
    )
    .await;
    mount_after(&server, "z", hanging(), 1).await;

    let push_center = PushCenter::new(session(&server));
    let (tx, mut rx) = mpsc::unbounded_channel();
    push_center.register_handler(Identity::ALL, move |event| {
        let _ = tx.send(entity_id(event));
    });

    push_center.start().unwrap();
    assert!(push_center.is_running());

    assert_eq!(recv(&mut rx).await, "1");
    assert_eq!(recv(&mut rx).await, "2");
    assert_eq!(recv(&mut rx).await, "3");
    assert_eq!(push_center.last_event_id().as_deref(), Some("z"));

    push_center.shutdown().await;
    assert!(!push_center.is_running());
    assert_eq!(push_center.last_event_id(), None);
}

#[tokio::test]
async fn test_failed_poll_keeps_cursor_and_continues() {
    let server = MockServer::start().await;
    mount_first(&server, notification("x", &[("enterprise", "1")])).await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("uuid", "x"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_after(
        &server,
        "x",
        ResponseTemplate::new(200).set_body_json(notification("y", &[("enterprise", "2")])),
        2,
    )
    .await;
    mount_after(&server, "y", hanging(), 1).await;

    let push_center =
        PushCenter::new(session(&server)).with_retry_delay(Duration::from_millis(10));
    let (tx, mut rx) = mpsc::unbounded_channel();
    push_center.register_handler(Identity::ALL, move |event| {
        let _ = tx.send(entity_id(event));
    });

    push_center.start().unwrap();

    assert_eq!(recv(&mut rx).await, "1");
    assert_eq!(recv(&mut rx).await, "2");

    let requests = server.received_requests().await.unwrap();
    let retried = requests
        .iter()
        .filter(|r| r.url.query() == Some("uuid=x"))
        .count();
    assert_eq!(retried, 2);

    push_center.shutdown().await;
}

#[tokio::test]
async fn test_default_and_type_handlers() {
    let server = MockServer::start().await;
    mount_first(
        &server,
        notification("x", &[("enterprise", "1"), ("user", "2")]),
    )
    .await;
    mount_after(&server, "x", hanging(), 1).await;

    let push_center = PushCenter::new(session(&server));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let default_tx = tx.clone();
    push_center.register_handler(Identity::ALL, move |event| {
        let _ = default_tx.send(format!("default:{}", event.entity_type));
    });
    push_center.register_handler(ENTERPRISE, move |event| {
        let _ = tx.send(format!("enterprise:{}", entity_id(event)));
    });

    push_center.start().unwrap();

    assert_eq!(recv(&mut rx).await, "default:enterprise");
    assert_eq!(recv(&mut rx).await, "enterprise:1");
    assert_eq!(recv(&mut rx).await, "default:user");

    push_center.shutdown().await;
}

#[tokio::test]
async fn test_restart_polls_without_cursor() {
    let server = MockServer::start().await;
    mount_first(&server, notification("x", &[("enterprise", "1")])).await;
    mount_first(&server, notification("w", &[("enterprise", "9")])).await;
    mount_after(&server, "x", hanging(), 1).await;
    mount_after(&server, "w", hanging(), 1).await;

    let push_center = PushCenter::new(session(&server));
    let (tx, mut rx) = mpsc::unbounded_channel();
    push_center.register_handler(Identity::ALL, move |event| {
        let _ = tx.send(entity_id(event));
    });

    push_center.start().unwrap();
    assert_eq!(recv(&mut rx).await, "1");

    push_center.shutdown().await;
    push_center.start().unwrap();
    assert_eq!(recv(&mut rx).await, "9");
    assert_eq!(push_center.last_event_id().as_deref(), Some("w"));

    push_center.shutdown().await;
}

#[tokio::test]
async fn test_stop_ends_polling_and_dispatch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(notification("x", &[("enterprise", "1")])),
        )
        .mount(&server)
        .await;

    let push_center = PushCenter::new(session(&server));
    let (tx, mut rx) = mpsc::unbounded_channel();
    push_center.register_handler(Identity::ALL, move |event| {
        let _ = tx.send(entity_id(event));
    });

    push_center.start().unwrap();
    assert_eq!(recv(&mut rx).await, "1");

    push_center.stop();
    assert!(!push_center.is_running());

    // Let a poll in flight complete.
    tokio::time::sleep(Duration::from_millis(300)).await;
    while rx.try_recv().is_ok() {}
    let polls = server.received_requests().await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(server.received_requests().await.unwrap().len(), polls);
    assert!(rx.try_recv().is_err());
    assert_eq!(push_center.last_event_id(), None);
}
