use actix_web::{http::StatusCode, test, App};
use serde_json::{json, Value};

use crate::api::success::Envelope;
use crate::modules;
use crate::test::{TestHarness, TEST_PASSWORD};

macro_rules! init_app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .configure(|cfg| $h.services.register(cfg))
                .configure(modules::configure),
        )
        .await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_signup_signin_and_profile() {
    let h = TestHarness::new().await;
    let app = init_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({ "name": "Alice", "email": "Alice@x.io", "password": TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "alice@x.io", "password": TEST_PASSWORD }))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(body.success);
    let token = body.data.unwrap()["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/users/profile")
        .insert_header(bearer(&token))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.data.unwrap()["email"], "alice@x.io");

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({ "name": "Again", "email": "alice@x.io", "password": TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_missing_token_is_unauthorized_envelope() {
    let h = TestHarness::new().await;
    let app = init_app!(h);

    let req = test::TestRequest::get().uri("/api/conversations").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    assert!(!body.success);
    assert!(body.error.is_some());

    let req = test::TestRequest::post().uri("/api/auth/signout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_message_flow_over_http() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    h.sign_up("b@x.io", "Bob").await;
    let (alice, bob) = (h.token_for("a@x.io"), h.token_for("b@x.io"));
    let app = init_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/conversations/direct")
        .insert_header(bearer(&alice))
        .set_json(json!({ "identity": "b@x.io" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    let conversation_id = body.data.unwrap()["conversation"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/conversations/{}/typing", conversation_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "is_typing": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/conversations/{}/messages", conversation_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "text": "hi" }))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    let message_id = body.data.unwrap()["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/conversations/{}/messages", conversation_id))
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Cache-Control").unwrap(), "no-store");
    let body: Envelope<Value> = test::read_body_json(resp).await;
    let snapshot = body.data.unwrap();
    assert_eq!(snapshot["messages"][0]["text"], "hi");
    assert_eq!(snapshot["messages"][0]["sender"], "them");
    assert_eq!(snapshot["messages"][0]["status"], "seen");
    assert_eq!(snapshot["typing"], json!([]));

    let req = test::TestRequest::post()
        .uri(&format!("/api/conversations/{}/messages/{}/reactions", conversation_id, message_id))
        .insert_header(bearer(&bob))
        .set_json(json!({ "emoji": "👍" }))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.data.unwrap()[0]["count"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/conversations/{}/messages/{}", conversation_id, message_id))
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    assert!(!body.success);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/conversations/{}/messages/{}", conversation_id, message_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/conversations")
        .insert_header(bearer(&bob))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    let list = body.data.unwrap();
    assert_eq!(list[0]["name"], "Alice");
    assert_eq!(list[0]["last_message_preview"], Value::Null);
}

#[actix_web::test]
async fn test_empty_message_is_bad_request() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    let group = h.services.conversation.create_group("a@x.io", "Solo").await.unwrap();
    let app = init_app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/api/conversations/{}/messages", group.id))
        .insert_header(bearer(&h.token_for("a@x.io")))
        .set_json(json!({ "text": "   " }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_presence_heartbeat_and_signout() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    let token = h.token_for("a@x.io");
    let app = init_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/presence/heartbeat")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/presence/A@x.io")
        .insert_header(bearer(&token))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.data.unwrap()["online"], true);

    let req = test::TestRequest::post()
        .uri("/api/auth/signout")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/presence/a@x.io")
        .insert_header(bearer(&token))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    let data = body.data.unwrap();
    assert_eq!(data["online"], false);
    assert_eq!(data["label"]["state"], "offline");
}

#[actix_web::test]
async fn test_calls_over_http() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    h.sign_up("b@x.io", "Bob").await;
    let token = h.token_for("a@x.io");
    let app = init_app!(h);

    let req = test::TestRequest::get()
        .uri("/api/calls/peer/b@x.io")
        .insert_header(bearer(&token))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(body.data.unwrap()["peer_id"].as_str().unwrap().starts_with("b-x-io-"));

    let req = test::TestRequest::post()
        .uri("/api/calls")
        .insert_header(bearer(&token))
        .set_json(json!({
            "caller": "a@x.io",
            "receiver": "b@x.io",
            "kind": "audio",
            "outcome": "completed",
            "start_time": "2024-01-01T10:00:00Z",
            "end_time": "2024-01-01T10:01:35Z",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    assert_eq!(body.data.unwrap()["duration"], "1m");

    let req = test::TestRequest::get()
        .uri("/api/calls?limit=10")
        .insert_header(bearer(&token))
        .to_request();
    let body: Envelope<Value> = test::call_and_read_body_json(&app, req).await;
    let history = body.data.unwrap();
    assert_eq!(history[0]["direction"], "outgoing");
    assert_eq!(history[0]["other_display"]["name"], "Bob");

    let req = test::TestRequest::get()
        .uri("/api/calls?limit=0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_attachment_upload_multipart() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    let token = h.token_for("a@x.io");
    let app = init_app!(h);

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\n\
         Content-Type: image/png\r\n\r\npngbytes\r\n--{b}--\r\n",
        b = boundary
    );
    let req = test::TestRequest::post()
        .uri("/api/attachments")
        .insert_header(bearer(&token))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", boundary)))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    let data = body.data.unwrap();
    assert_eq!(data["kind"], "image");
    assert_eq!(data["original_name"], "cat.png");
    assert!(data["url"].as_str().unwrap().starts_with("/uploads/"));
}

#[actix_web::test]
async fn test_malformed_ids_get_failure_envelope() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    let token = h.token_for("a@x.io");
    let group = h.services.conversation.create_group("a@x.io", "Solo").await.unwrap();
    let app = init_app!(h);

    let uris = [
        ("GET", "/api/conversations/not-a-uuid/messages".to_string()),
        ("DELETE", format!("/api/conversations/{}/messages/not-a-uuid", group.id)),
        ("PUT", "/api/conversations/not-a-uuid/typing".to_string()),
    ];
    for (method, uri) in uris {
        let req = match method {
            "GET" => test::TestRequest::get(),
            "DELETE" => test::TestRequest::delete(),
            _ => test::TestRequest::put().set_json(json!({ "is_typing": true })),
        }
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        let body: Envelope<Value> = test::read_body_json(resp).await;
        assert!(!body.success);
        assert!(body.error.is_some());
    }
}

#[actix_web::test]
async fn test_oversized_upload_is_rejected() {
    let h = TestHarness::new().await;
    h.sign_up("a@x.io", "Alice").await;
    let token = h.token_for("a@x.io");
    let app = init_app!(h);

    let boundary = "XBOUNDARYX";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    body.extend(std::iter::repeat(b'a').take(1024 * 1024 + 1));
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let req = test::TestRequest::post()
        .uri("/api/attachments")
        .insert_header(bearer(&token))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", boundary)))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Envelope<Value> = test::read_body_json(resp).await;
    assert!(!body.success);
    assert_eq!(std::fs::read_dir(h.upload_dir.path()).unwrap().count(), 0);
}
