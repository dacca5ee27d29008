#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use serde_json::json;

use wirecall_core::{Envelope, ErrorKind, Payload, RpcError, Status};
use wirecall_server::dispatch::{from_fn, ActionOutput};
use wirecall_server::services::NOTIFY;

use support::{builtin_registry, settings, Peer};

fn ping(id: &str) -> Envelope {
    Envelope::call(id, "ping_client", Payload::Json(json!({ "msg": "hi" })))
}

#[tokio::test]
async fn client_action_round_trip() {
    let mut peer = Peer::start(builtin_registry(), settings());
    peer.send(&ping("p1"));

    let outbound = peer.expect().await;
    assert_eq!(outbound.action, "notify");
    assert_eq!(outbound.id, "p1");
    assert_eq!(outbound.client_id.as_deref(), Some("c-notify"));
    assert!(outbound.status.is_none());
    assert_eq!(outbound.data, Some(json!({ "msg": "hi" })));
    assert_eq!(peer.engine.pending_calls(), 1);

    peer.send(&outbound.ok_chunk(Some(Payload::Json(json!({ "ack": true }))), true));

    let resp = peer.expect().await;
    assert_eq!(resp.id, "p1");
    assert_eq!(resp.action, "ping_client");
    assert_eq!(resp.data, Some(json!({ "status": "ok", "data": { "ack": true } })));
    assert_eq!(peer.engine.pending_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unanswered_client_call_expires() {
    let mut peer = Peer::start(builtin_registry(), settings());
    peer.send(&ping("p2"));

    let outbound = peer.expect().await;
    assert_eq!(outbound.action, "notify");

    let resp = peer.expect().await;
    assert_eq!(resp.id, "p2");
    let data = resp.data.unwrap();
    assert_eq!(data["status"], json!("error"));
    assert_eq!(data["error"]["kind"], json!("timeout"));
    assert_eq!(peer.engine.pending_calls(), 0);
}

#[tokio::test]
async fn late_or_unknown_response_gets_timeout_error() {
    let mut peer = Peer::start(builtin_registry(), settings());
    let ghost = Envelope::call("ghost", "notify", Payload::Json(json!(null))).with_client_id("c-notify");
    peer.send(&ghost.ok_chunk(Some(Payload::Json(json!({ "ack": true }))), true));

    let resp = peer.expect().await;
    assert_eq!(resp.id, "ghost");
    assert_eq!(resp.action, "notify");
    assert_eq!(resp.client_id.as_deref(), Some("c-notify"));
    assert_eq!(resp.status, Some(Status::Error));
    assert_eq!(resp.error.unwrap().kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn mismatched_return_value_is_a_validation_error() {
    let mut peer = Peer::start(builtin_registry(), settings());
    peer.send(&ping("p3"));
    let outbound = peer.expect().await;
    peer.send(&outbound.ok_chunk(Some(Payload::Json(json!({ "ack": "yes" }))), true));

    let data = peer.expect().await.data.unwrap();
    assert_eq!(data["status"], json!("error"));
    assert_eq!(data["error"]["kind"], json!("validation"));
    assert_eq!(data["error"]["issues"][0]["path"], json!("/ack"));
}

#[tokio::test]
async fn client_error_is_passed_through() {
    let mut peer = Peer::start(builtin_registry(), settings());
    peer.send(&ping("p4"));
    let outbound = peer.expect().await;
    peer.send(&outbound.error_reply(RpcError::with_code(403, "denied")));

    let data = peer.expect().await.data.unwrap();
    assert_eq!(data["status"], json!("error"));
    assert_eq!(data["error"]["code"], json!(403));
    assert_eq!(data["error"]["message"], json!("denied"));
}

#[tokio::test]
async fn second_call_with_same_key_is_refused() {
    let registry = builtin_registry();
    registry.register(from_fn("double", None, |c| async move {
        let (a, b) = tokio::join!(
            c.client.call(NOTIFY, json!(1)),
            c.client.call(NOTIFY, json!(2)),
        );
        ActionOutput::json(json!([a.to_json(), b.to_json()]))
    }));
    let mut peer = Peer::start(registry, settings());
    peer.send(&Envelope::call("d", "double", Payload::Json(json!(null))));

    let outbound = peer.expect().await;
    assert_eq!(outbound.data, Some(json!(1)));
    peer.send(&outbound.ok_chunk(Some(Payload::Json(json!({ "ack": true }))), true));

    let data = peer.expect().await.data.unwrap();
    assert_eq!(data[0]["status"], json!("ok"));
    assert_eq!(data[1]["status"], json!("error"));
}

#[tokio::test]
async fn undeclared_client_action_is_not_found() {
    let registry = builtin_registry();
    registry.register(from_fn("stray", None, |c| async move {
        assert!(c.client.bind("missing").is_none());
        assert_eq!(c.client.bind(NOTIFY).map(|a| a.name().to_string()).as_deref(), Some(NOTIFY));
        ActionOutput::json(c.client.call("missing", json!(null)).await.to_json())
    }));
    let mut peer = Peer::start(registry, settings());
    peer.send(&Envelope::call("s", "stray", Payload::Json(json!(null))));

    let data = peer.expect().await.data.unwrap();
    assert_eq!(data["error"]["kind"], json!("not_found"));
}

#[tokio::test]
async fn answers_in_reverse_order_reach_their_own_callers() {
    let mut peer = Peer::start(builtin_registry(), settings());
    peer.send(&ping("A"));
    peer.send(&ping("B"));

    let mut outbound = peer.take(2).await;
    assert!(outbound.iter().all(|e| e.action == "notify" && e.client_id.as_deref() == Some("c-notify")));
    outbound.sort_by(|a, b| b.id.cmp(&a.id));
    assert_eq!(peer.engine.pending_calls(), 2);

    // B is answered first
    for env in &outbound {
        let answer = json!({ "ack": true, "tag": env.id });
        peer.send(&env.ok_chunk(Some(Payload::Json(answer)), true));
    }

    for resp in peer.take(2).await {
        assert_eq!(resp.action, "ping_client");
        let data = resp.data.unwrap();
        assert_eq!(data["status"], json!("ok"));
        assert_eq!(data["data"]["tag"], json!(resp.id));
    }
    assert_eq!(peer.engine.pending_calls(), 0);
}
