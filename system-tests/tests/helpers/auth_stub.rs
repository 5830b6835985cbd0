// system-tests/tests/helpers/auth_stub.rs
// ============================================================================
// Module: Auth Service Stub
// Description: In-memory authentication service with injectable faults.
// Purpose: Give the harness a conforming target, and targets that break it.
// Dependencies: axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! The stub serves the register/login/profile/password/admin routes over
//! loopback HTTP.
//! Users and tokens live in memory; the administrator is seeded at start-up
//! unless a fault disables it. Every request is recorded with its raw
//! `Authorization` header so suites can assert what the harness sent.

use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Seeded administrator email.
pub const ADMIN_EMAIL: &str = "admin@example.com";
/// Seeded administrator username.
pub const ADMIN_USERNAME: &str = "admin";
/// Seeded administrator password.
pub const ADMIN_PASSWORD: &str = "adminpass";

/// Deviations from the contract the stub can be asked to exhibit.
#[derive(Clone, Debug)]
pub struct StubFaults {
    /// Ordinary users may list `/users`.
    pub user_may_list_users: bool,
    /// Status returned when a non-admin hits an admin route.
    pub denial_status: StatusCode,
    /// Username reported by `/user/profile` instead of the caller's.
    pub profile_username: Option<String>,
    /// Do not seed the administrator account.
    pub skip_admin_seed: bool,
    /// Delay applied before every response.
    pub response_delay: Duration,
    /// Successful logins return a body without a `token` field.
    pub malformed_login_body: bool,
    /// Re-registering an existing email succeeds.
    pub accept_duplicate_registration: bool,
    /// `PUT /user/profile` answers 200 without storing the new username.
    pub profile_update_ignored: bool,
    /// `POST /user/change-password` answers 200 without storing the new password.
    pub password_change_ignored: bool,
    /// `POST /user/change-password` does not verify the current password.
    pub change_password_skips_old_check: bool,
    /// Ordinary users may `PUT /users/{id}`.
    pub user_may_update_users: bool,
}

impl Default for StubFaults {
    fn default() -> Self {
        Self {
            user_may_list_users: false,
            denial_status: StatusCode::FORBIDDEN,
            profile_username: None,
            skip_admin_seed: false,
            response_delay: Duration::ZERO,
            malformed_login_body: false,
            accept_duplicate_registration: false,
            profile_update_ignored: false,
            password_change_ignored: false,
            change_password_skips_old_check: false,
            user_may_update_users: false,
        }
    }
}

/// One request observed by the stub.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Role {
    Admin,
    User,
}

#[derive(Clone, Debug)]
struct StubUser {
    id: u64,
    email: String,
    username: String,
    password: String,
    role: Role,
}

impl StubUser {
    fn public(&self) -> Value {
        json!({ "ID": self.id, "Email": self.email, "Username": self.username })
    }
}

#[derive(Default)]
struct StubStore {
    users: Vec<StubUser>,
    tokens: HashMap<String, u64>,
    issued: u64,
}

impl StubStore {
    fn add_user(&mut self, email: &str, username: &str, password: &str, role: Role) -> StubUser {
        let user = StubUser {
            id: u64::try_from(self.users.len()).unwrap_or(u64::MAX).saturating_add(1),
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role,
        };
        self.users.push(user.clone());
        user
    }

    fn issue_token(&mut self, user_id: u64) -> String {
        self.issued += 1;
        let token = format!("tok-{}", self.issued);
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn user_for_token(&self, token: &str) -> Option<StubUser> {
        let id = self.tokens.get(token)?;
        self.users.iter().find(|user| user.id == *id).cloned()
    }

    fn user_mut(&mut self, id: u64) -> Option<&mut StubUser> {
        self.users.iter_mut().find(|user| user.id == id)
    }
}

#[derive(Clone)]
struct StubState {
    faults: StubFaults,
    store: Arc<Mutex<StubStore>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle for the stub auth server; shuts the server down on drop.
pub struct AuthStubHandle {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AuthStubHandle {
    /// Returns the stub base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns captured requests in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }
}

impl Drop for AuthStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a conforming stub.
pub fn spawn_auth_stub() -> Result<AuthStubHandle, String> {
    spawn_auth_stub_with_faults(StubFaults::default())
}

/// Spawns a stub exhibiting `faults`.
pub fn spawn_auth_stub_with_faults(faults: StubFaults) -> Result<AuthStubHandle, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("auth stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("auth stub listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("auth stub local addr failed: {err}"))?;
    let base_url = format!("http://{addr}");

    let mut store = StubStore::default();
    if !faults.skip_admin_seed {
        store.add_user(ADMIN_EMAIL, ADMIN_USERNAME, ADMIN_PASSWORD, Role::Admin);
    }
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        faults,
        store: Arc::new(Mutex::new(store)),
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/users", get(handle_list_users))
        .route("/users/{id}", delete(handle_admin_action).put(handle_update_user))
        .route("/users/{id}/assign-role", post(handle_admin_action))
        .route("/users/{id}/reset-password", post(handle_admin_action))
        .route("/user/profile", get(handle_profile).put(handle_update_profile))
        .route("/user/change-password", post(handle_change_password))
        .route("/roles", get(handle_roles))
        .with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(AuthStubHandle {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        requests,
    })
}

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------

async fn handle_register(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "invalid json");
    };
    let field = |name: &str| payload.get(name).and_then(Value::as_str).unwrap_or("").to_string();
    let (email, username, password) = (field("email"), field("username"), field("password"));
    if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return error(StatusCode::BAD_REQUEST, "email, username and password are required");
    }
    let Ok(mut store) = state.store.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned");
    };
    let exists = store.users.iter().any(|user| user.email == email);
    if exists && !state.faults.accept_duplicate_registration {
        return error(StatusCode::CONFLICT, "email already registered");
    }
    let user = store.add_user(&email, &username, &password, Role::User);
    (StatusCode::CREATED, Json(user.public())).into_response()
}

async fn handle_login(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "invalid json");
    };
    let email = payload.get("email").and_then(Value::as_str).unwrap_or("");
    let password = payload.get("password").and_then(Value::as_str).unwrap_or("");
    let Ok(mut store) = state.store.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned");
    };
    let matched = store
        .users
        .iter()
        .find(|user| user.email == email && user.password == password)
        .map(|user| user.id);
    let Some(user_id) = matched else {
        return error(StatusCode::UNAUTHORIZED, "invalid credentials");
    };
    let token = store.issue_token(user_id);
    if state.faults.malformed_login_body {
        return (StatusCode::OK, Json(json!({ "access": token }))).into_response();
    }
    (StatusCode::OK, Json(json!({ "token": token }))).into_response()
}

async fn handle_list_users(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.observe(&method, &uri, &headers, &[]).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller.role != Role::Admin && !state.faults.user_may_list_users {
        return error(state.faults.denial_status, "admin role required");
    }
    let Ok(store) = state.store.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned");
    };
    let users: Vec<Value> = store.users.iter().map(StubUser::public).collect();
    (StatusCode::OK, Json(Value::Array(users))).into_response()
}

async fn handle_profile(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.observe(&method, &uri, &headers, &[]).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let mut profile = caller.public();
    if let Some(username) = &state.faults.profile_username {
        profile["Username"] = Value::String(username.clone());
    }
    (StatusCode::OK, Json(profile)).into_response()
}

async fn handle_update_profile(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Some(username) = json_field(&body, "username").filter(|name| !name.trim().is_empty())
    else {
        return error(StatusCode::BAD_REQUEST, "username is required");
    };
    if state.faults.profile_update_ignored {
        return (StatusCode::OK, Json(caller.public())).into_response();
    }
    let Ok(mut store) = state.store.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned");
    };
    let Some(user) = store.user_mut(caller.id) else {
        return error(StatusCode::NOT_FOUND, "user not found");
    };
    user.username = username;
    (StatusCode::OK, Json(user.public())).into_response()
}

async fn handle_change_password(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let old_password = json_field(&body, "old_password").unwrap_or_default();
    let Some(new_password) = json_field(&body, "new_password").filter(|pw| !pw.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "new_password is required");
    };
    if old_password != caller.password && !state.faults.change_password_skips_old_check {
        return error(StatusCode::UNAUTHORIZED, "old password is incorrect");
    }
    if state.faults.password_change_ignored {
        return (StatusCode::OK, Json(json!({ "message": "password updated" }))).into_response();
    }
    let Ok(mut store) = state.store.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned");
    };
    let Some(user) = store.user_mut(caller.id) else {
        return error(StatusCode::NOT_FOUND, "user not found");
    };
    user.password = new_password;
    (StatusCode::OK, Json(json!({ "message": "password updated" }))).into_response()
}

async fn handle_roles(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.observe(&method, &uri, &headers, &[]).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller.role != Role::Admin {
        return error(state.faults.denial_status, "admin role required");
    }
    let roles = json!([{ "ID": 1, "Name": "admin" }, { "ID": 2, "Name": "user" }]);
    (StatusCode::OK, Json(roles)).into_response()
}

async fn handle_admin_action(
    State(state): State<StubState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller.role != Role::Admin {
        return error(state.faults.denial_status, "admin role required");
    }
    (StatusCode::OK, Json(json!({ "ID": id }))).into_response()
}

async fn handle_update_user(
    State(state): State<StubState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observe(&method, &uri, &headers, &body).await;
    let caller = match state.caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller.role != Role::Admin && !state.faults.user_may_update_users {
        return error(state.faults.denial_status, "admin role required");
    }
    (StatusCode::OK, Json(json!({ "ID": id }))).into_response()
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn json_field(body: &[u8], name: &str) -> Option<String> {
    let payload = serde_json::from_slice::<Value>(body).ok()?;
    payload.get(name).and_then(Value::as_str).map(str::to_string)
}

impl StubState {
    async fn observe(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method: method.to_string(),
                path: uri.path().to_string(),
                authorization: headers
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string),
                body: String::from_utf8_lossy(body).into_owned(),
            });
        }
        if !self.faults.response_delay.is_zero() {
            sleep(self.faults.response_delay).await;
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Result<StubUser, Response> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
        let Ok(store) = self.store.lock() else {
            return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "store poisoned"));
        };
        store.user_for_token(token).ok_or_else(|| error(StatusCode::UNAUTHORIZED, "invalid token"))
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
