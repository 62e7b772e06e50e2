use crate::{
    server::{ServerState, routes},
    session::WalletSession,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use postboard_common::wallet::{
    ConfiguredWallet, ConnectionOutcome, NoWallet, Wallet, WalletAddress, WalletConnection,
    WalletError,
};
use postboard_store::{
    repository::PostRepository,
    store::{MemoryStore, PostStore},
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

struct StuckWallet;

#[async_trait]
impl Wallet for StuckWallet {
    async fn request_connection(&self) -> Result<ConnectionOutcome, WalletError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ConnectionOutcome::Unavailable)
    }

    async fn resolve_display_name(
        &self,
        _address: &WalletAddress,
    ) -> Result<Option<String>, WalletError> {
        Ok(None)
    }
}

fn configured_wallet(display_name: Option<&str>) -> Box<dyn Wallet> {
    Box::new(ConfiguredWallet {
        connection: WalletConnection {
            address: WalletAddress::new(ADDRESS.to_owned()).unwrap(),
            network: Some("mainnet".to_owned()),
        },
        display_name: display_name.map(ToOwned::to_owned),
    })
}

fn app_with(wallet: Box<dyn Wallet>, timeout: Duration) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let boxed: Box<dyn PostStore + Send> = Box::new(Arc::clone(&store));
    let repository = PostRepository::initialize(boxed).unwrap();

    let state = ServerState::new(repository, WalletSession::new(wallet, timeout));
    (routes().with_state(state), store)
}

fn app() -> (Router, Arc<MemoryStore>) {
    app_with(Box::new(NoWallet), Duration::from_secs(1))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_with_headers(app, method, uri, body, &[]).await
}

async fn send_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

fn titles(timeline: &Value) -> Vec<&str> {
    timeline
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap())
        .collect()
}

fn id_at(timeline: &Value, index: usize) -> String {
    timeline[index]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn lists_seeded_timeline() {
    let (app, store) = app();

    let (status, timeline) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        titles(&timeline),
        ["Welcome to the Community!", "React is Awesome!"]
    );
    assert_eq!(timeline[0]["likes"], 0);
    assert_eq!(timeline[1]["image"], "https://via.placeholder.com/150");
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn anonymous_post_is_prepended() {
    let (app, store) = app();

    let (status, timeline) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "Hi", "content": "World" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(titles(&timeline).len(), 3);
    assert_eq!(timeline[0]["title"], "Hi");
    assert_eq!(timeline[0]["author"], "Anonymous");
    assert_eq!(timeline[0]["likes"], 0);
    assert_eq!(timeline[0]["image"], Value::Null);
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn blank_draft_is_unprocessable() {
    let (app, store) = app();
    let raw = store.raw();

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "  ", "content": "text" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert_eq!(store.raw(), raw);
    assert_eq!(store.writes(), 1);

    let (_, timeline) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(titles(&timeline).len(), 2);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, _) = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "missing content" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn like_and_delete_by_id() {
    let (app, store) = app();
    let (_, timeline) = send(&app, Method::GET, "/posts", None).await;
    let second = id_at(&timeline, 1);

    let like = format!("/posts/{second}/like");
    let (status, timeline) = send(&app, Method::POST, &like, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline[0]["likes"], 0);
    assert_eq!(timeline[1]["likes"], 1);

    let post_uri = format!("/posts/{second}");
    let (status, post) = send(&app, Method::GET, &post_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["likes"], 1);

    let (status, timeline) = send(&app, Method::DELETE, &post_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&timeline), ["Welcome to the Community!"]);
    assert_eq!(store.writes(), 3);

    let (status, _) = send(&app, Method::GET, &post_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_ids_leave_timeline_alone() {
    let (app, store) = app();

    let (status, timeline) = send(&app, Method::POST, "/posts/12345/like", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&timeline).len(), 2);

    let (status, timeline) = send(&app, Method::DELETE, "/posts/12345", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&timeline).len(), 2);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn edit_is_not_implemented() {
    let (app, _) = app();
    let (_, timeline) = send(&app, Method::GET, "/posts", None).await;
    let first = id_at(&timeline, 0);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/posts/{first}"),
        Some(json!({ "title": "new", "content": "text" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["status"], 501);

    let (status, _) = send(&app, Method::PATCH, &format!("/posts/{first}"), None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("/posts/{first}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn unknown_routes_and_bad_ids_are_not_found() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, _) = send(&app, Method::GET, "/posts/not-a-number", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_wallet_on_mobile_gets_deep_link() {
    let (app, _) = app();

    let (status, body) = send_with_headers(
        &app,
        Method::POST,
        "/wallet/connect",
        None,
        &[
            ("user-agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"),
            ("host", "postboard.local:3000"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["notice"]["kind"], "deep_link");
    assert_eq!(
        body["notice"]["url"],
        "https://metamask.app.link/dapp/postboard.local"
    );
}

#[tokio::test]
async fn deep_link_falls_back_to_localhost() {
    let (app, _) = app();

    let (_, body) = send_with_headers(
        &app,
        Method::POST,
        "/wallet/connect",
        None,
        &[("user-agent", "Mozilla/5.0 (Linux; Android 14) Mobile")],
    )
    .await;

    assert_eq!(
        body["notice"]["url"],
        "https://metamask.app.link/dapp/localhost"
    );
}

#[tokio::test]
async fn missing_wallet_on_desktop_gets_install_prompt() {
    let (app, _) = app();

    let (status, body) = send_with_headers(
        &app,
        Method::POST,
        "/wallet/connect",
        None,
        &[("user-agent", "Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["kind"], "install_prompt");
    assert_eq!(body["notice"]["message"], "Please install MetaMask!");

    let (_, wallet) = send(&app, Method::GET, "/wallet", None).await;
    assert_eq!(wallet["connected"], Value::Null);
    assert_eq!(wallet["author"], "Anonymous");
}

#[tokio::test]
async fn connected_wallet_signs_new_posts() {
    let (app, _) = app_with(configured_wallet(Some("alice.eth")), Duration::from_secs(1));

    let (status, body) = send(&app, Method::POST, "/wallet/connect", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "connected");
    assert_eq!(body["wallet"]["address"], ADDRESS);
    assert_eq!(body["wallet"]["short_address"], "0x5290...9EE7");
    assert_eq!(body["wallet"]["network"], "mainnet");
    assert_eq!(body["wallet"]["display_name"], "alice.eth");

    let (_, timeline) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "gm", "content": "hello" })),
    )
    .await;
    assert_eq!(timeline[0]["author"], "alice.eth");

    let (status, users) = send(&app, Method::GET, "/users/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["connected_wallet"]["label"], "alice.eth");
    assert_eq!(users["connected_wallet"]["initial"], "A");
    assert_eq!(users["authors"][0]["author"], "alice.eth");
    assert_eq!(users["authors"][0]["post_count"], 1);
}

#[tokio::test]
async fn unnamed_wallet_posts_as_address() {
    let (app, _) = app_with(configured_wallet(None), Duration::from_secs(1));
    send(&app, Method::POST, "/wallet/connect", None).await;

    let (_, timeline) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "gm", "content": "hello" })),
    )
    .await;
    assert_eq!(timeline[0]["author"], ADDRESS);

    let (_, users) = send(&app, Method::GET, "/users/active", None).await;
    assert_eq!(users["connected_wallet"]["label"], "0x5290...9EE7");
    assert_eq!(users["connected_wallet"]["initial"], "W");
}

#[tokio::test]
async fn stuck_wallet_times_out() {
    let (app, _) = app_with(Box::new(StuckWallet), Duration::from_millis(20));

    let (status, body) = send(&app, Method::POST, "/wallet/connect", None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["status"], 504);

    let (_, timeline) = send(
        &app,
        Method::POST,
        "/posts",
        Some(json!({ "title": "still", "content": "works" })),
    )
    .await;
    assert_eq!(timeline[0]["author"], "Anonymous");
}
