use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;

#[derive(Default)]
struct Server {
	next_id: AtomicUsize,
	sessions: Mutex<HashSet<String>>,
	authenticated: AtomicBool,
}

type Shared = Arc<Server>;

impl Server {
	fn knows(&self, id: &str) -> bool {
		self.sessions.lock().unwrap().contains(id)
	}
}

fn not_found() -> Response {
	(StatusCode::NOT_FOUND, Json(json!({ "detail": "Session not found" }))).into_response()
}

async fn create(State(s): State<Shared>) -> Response {
	let id = format!("srv-{}", s.next_id.fetch_add(1, Ordering::SeqCst) + 1);
	s.sessions.lock().unwrap().insert(id.clone());
	Json(json!({ "session_id": id, "status": "created" })).into_response()
}

async fn remove(State(s): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
	if !s.sessions.lock().unwrap().remove(&id) {
		return not_found();
	}
	Json(json!({ "session_id": id, "status": "deleted" })).into_response()
}

async fn status(State(s): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
	if !s.knows(&id) {
		return not_found();
	}
	Json(json!({ "session_id": id, "authenticated": s.authenticated.load(Ordering::SeqCst) })).into_response()
}

async fn auth_url(State(s): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
	if !s.knows(&id) {
		return not_found();
	}
	Json(json!({ "session_id": id, "auth_url": "https://auth.example/link" })).into_response()
}

async fn chat(State(s): State<Shared>, UrlPath(id): UrlPath<String>, Json(body): Json<Value>) -> Response {
	if !s.knows(&id) {
		return not_found();
	}
	if !s.authenticated.load(Ordering::SeqCst) {
		return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Session not authenticated" }))).into_response();
	}
	let message = body["message"].as_str().unwrap_or_default();
	Json(json!({ "session_id": id, "response": format!("echo: {message}"), "tools_used": ["fetch_net_worth"] })).into_response()
}

async fn dashboard(State(s): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
	if !s.knows(&id) {
		return not_found();
	}
	if !s.authenticated.load(Ordering::SeqCst) {
		return (StatusCode::LOCKED, Json(json!({ "detail": "Authentication required" }))).into_response();
	}
	Json(json!({ "net_worth": { "total": 1_250_000 } })).into_response()
}

async fn health() -> Response {
	Json(json!({ "status": "healthy" })).into_response()
}

async fn spawn_server() -> (String, Shared) {
	let state: Shared = Arc::default();
	let app = Router::new()
		.route("/session/create", post(create))
		.route("/session/{id}", delete(remove))
		.route("/session/{id}/status", get(status))
		.route("/session/{id}/auth-url", get(auth_url))
		.route("/session/{id}/chat", post(chat))
		.route("/session/{id}/dashboard", get(dashboard))
		.route("/health", get(health))
		.with_state(Arc::clone(&state));

	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	(format!("http://{addr}"), state)
}

struct Run {
	code: Option<i32>,
	json: Value,
}

fn session_file(home: &Path) -> PathBuf {
	home.join("state").join("session.json")
}

/// Points the session file and history at `home` so runs never touch the
/// platform config directory.
fn write_config(home: &Path) -> PathBuf {
	let path = home.join("config.json");
	let config = json!({
		"sessionFile": session_file(home),
		"historyDir": home.join("state").join("history"),
	});
	std::fs::write(&path, config.to_string()).unwrap();
	path
}

async fn fi(home: &Path, api_url: &str, args: &[&str]) -> Run {
	let config = write_config(home);
	let output = Command::new(env!("CARGO_BIN_EXE_fi"))
		.arg("--config")
		.arg(&config)
		.args(["--format", "json", "--surface", "print", "--api-url", api_url])
		.args(args)
		.env("XDG_CONFIG_HOME", home)
		.env("HOME", home)
		.env_remove("FI_API_URL")
		.env_remove("FI_POLL_INTERVAL_MS")
		.env_remove("FI_AUTH_TIMEOUT_SECS")
		.env_remove("RUST_LOG")
		.output()
		.await
		.unwrap();
	let json = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
		panic!(
			"stdout is not JSON ({err}):\n{}\nstderr:\n{}",
			String::from_utf8_lossy(&output.stdout),
			String::from_utf8_lossy(&output.stderr)
		)
	});
	Run { code: output.status.code(), json }
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_backend_status() {
	let (url, _state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), &url, &["health"]).await;
	assert_eq!(run.code, Some(0));
	assert_eq!(run.json["ok"], true);
	assert_eq!(run.json["command"], "health");
	assert_eq!(run.json["data"]["status"], "healthy");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_is_reported() {
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), "http://127.0.0.1:1", &["health"]).await;
	assert_eq!(run.code, Some(1));
	assert_eq!(run.json["ok"], false);
	assert_eq!(run.json["error"]["code"], "BACKEND_UNREACHABLE");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_api_url_is_rejected_before_any_request() {
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), "ftp://example.com", &["session", "status"]).await;
	assert_eq!(run.code, Some(1));
	assert_eq!(run.json["error"]["code"], "INVALID_INPUT");
	assert!(!session_file(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn session_is_created_then_restored() {
	let (url, state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let first = fi(home.path(), &url, &["session", "status"]).await;
	assert_eq!(first.code, Some(0));
	assert_eq!(first.json["data"]["sessionId"], "srv-1");
	assert_eq!(first.json["data"]["origin"], "created");
	assert_eq!(first.json["data"]["authenticated"], false);
	assert!(session_file(home.path()).exists());

	let second = fi(home.path(), &url, &["session", "status"]).await;
	assert_eq!(second.json["data"]["sessionId"], "srv-1");
	assert_eq!(second.json["data"]["origin"], "restored");

	state.sessions.lock().unwrap().clear();
	let third = fi(home.path(), &url, &["session", "status"]).await;
	assert_eq!(third.json["data"]["sessionId"], "srv-2");
	assert_eq!(third.json["data"]["origin"], "replaced");
	assert_eq!(third.json["data"]["previous"], "srv-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn session_new_and_clear_release_the_old_session() {
	let (url, state) = spawn_server().await;
	let home = TempDir::new().unwrap();
	let stored = session_file(home.path());

	fi(home.path(), &url, &["session", "status"]).await;
	let renewed = fi(home.path(), &url, &["session", "new"]).await;
	assert_eq!(renewed.json["data"]["sessionId"], "srv-2");
	assert_eq!(renewed.json["data"]["previous"], "srv-1");
	assert!(!state.knows("srv-1"));

	let cleared = fi(home.path(), &url, &["session", "clear"]).await;
	assert_eq!(cleared.code, Some(0));
	assert_eq!(cleared.json["data"]["cleared"], "srv-2");
	assert!(!stored.exists());
	assert!(!state.knows("srv-2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_without_waiting_returns_the_link() {
	let (url, _state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), &url, &["chat", "what is my net worth?", "--no-wait"]).await;
	assert_eq!(run.code, Some(0));
	assert_eq!(run.json["data"]["status"], "awaiting_auth");
	assert_eq!(run.json["data"]["operation"], "chat");
	assert_eq!(run.json["data"]["authUrl"], "https://auth.example/link");
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_is_replayed_after_authentication_and_recorded() {
	let (url, state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let flip = Arc::clone(&state);
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(500)).await;
		flip.authenticated.store(true, Ordering::SeqCst);
	});

	let run = fi(home.path(), &url, &["--poll-interval-ms", "50", "chat", "hello"]).await;
	assert_eq!(run.code, Some(0), "{}", run.json);
	assert_eq!(run.json["data"]["response"], "echo: hello");
	assert_eq!(run.json["data"]["replayed"], true);
	assert_eq!(run.json["data"]["toolsUsed"][0], "fetch_net_worth");

	let history = fi(home.path(), &url, &["history"]).await;
	let entries = history.json["data"]["entries"].as_array().unwrap();
	assert_eq!(entries.len(), 2);
	assert_eq!(entries[0]["role"], "user");
	assert_eq!(entries[0]["content"], "hello");
	assert_eq!(entries[1]["role"], "assistant");
}

#[tokio::test(flavor = "multi_thread")]
async fn dashboard_runs_directly_once_linked() {
	let (url, state) = spawn_server().await;
	let home = TempDir::new().unwrap();
	state.authenticated.store(true, Ordering::SeqCst);

	let run = fi(home.path(), &url, &["dashboard"]).await;
	assert_eq!(run.code, Some(0));
	assert_eq!(run.json["data"]["operation"], "dashboard");
	assert_eq!(run.json["data"]["replayed"], false);
	assert_eq!(run.json["data"]["body"]["net_worth"]["total"], 1_250_000);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_gives_up_at_the_deadline() {
	let (url, _state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), &url, &["--auth-timeout-secs", "1", "--poll-interval-ms", "100", "auth", "login"]).await;
	assert_eq!(run.code, Some(1));
	assert_eq!(run.json["ok"], false);
	assert_eq!(run.json["error"]["code"], "AUTH_TIMEOUT");
	assert!(run.json["error"]["details"]["waitedSecs"].is_u64());
}

#[tokio::test(flavor = "multi_thread")]
async fn history_without_a_session_fails() {
	let (url, _state) = spawn_server().await;
	let home = TempDir::new().unwrap();

	let run = fi(home.path(), &url, &["history"]).await;
	assert_eq!(run.code, Some(1));
	assert_eq!(run.json["error"]["code"], "NO_SESSION");
}
