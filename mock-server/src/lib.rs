//! In-memory stand-in for the Solus cloud management API.
//!
//! # Design
//! One `Store` behind a tokio `RwLock` holds every resource. Everything is
//! served under `/api/v1` and, apart from `auth/login`, requires
//! `Authorization: Bearer <TOKEN>`.
//!
//! Long-running behaviour is driven by reads rather than wall time so tests
//! stay deterministic: a new server reports `processing` for
//! `MockConfig::processing_polls` reads, and a task reports `running` for
//! `MockConfig::task_polls` reads before reaching its final status. Deleting
//! a server whose name starts with `doomed` yields a task that ends `failed`.
//! `GET /flaky/{key}?failures=N` answers 503 for the first `N` calls per key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{
        header::{AUTHORIZATION, HOST},
        HeaderMap, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "mock-token";

const DEFAULT_PER_PAGE: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockConfig {
    /// Reads of a new server that still report `processing`.
    pub processing_polls: u32,
    /// Reads of a new task that still report `running`.
    pub task_polls: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            processing_polls: 2,
            task_polls: 2,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub is_default: bool,
    pub is_visible: bool,
}

#[derive(Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub members: u32,
    pub is_owner: bool,
    pub is_default: bool,
    pub owner: User,
    pub servers: u32,
}

#[derive(Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SshKeyInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanParams {
    pub disk: u64,
    pub ram: u64,
    pub vcpu: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    pub params: PlanParams,
    pub virtualization_type: String,
    pub storage_type: String,
    pub image_format: String,
    pub is_default: bool,
    pub is_visible: bool,
}

#[derive(Deserialize)]
pub struct PlanInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: PlanParams,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub image_format: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsImageVersion {
    pub id: u64,
    pub os_image_id: u64,
    pub version: String,
    pub url: String,
    pub virtualization_type: String,
    pub cloud_init_version: Option<String>,
    pub is_visible: bool,
}

#[derive(Deserialize)]
pub struct OsImageVersionInput {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cloud_init_version: Option<String>,
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsImage {
    pub id: u64,
    pub name: String,
    pub is_visible: bool,
    pub versions: Vec<OsImageVersion>,
}

#[derive(Deserialize)]
pub struct OsImageInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifications {
    pub disk: u64,
    pub ram: u64,
    pub vcpu: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub uuid: String,
    pub specifications: Specifications,
    pub status: String,
    pub location: Location,
    pub fqdns: Vec<String>,
    pub boot_mode: String,
    pub is_suspended: bool,
    pub is_processing: bool,
    pub project: Project,
    pub ssh_keys: Vec<SshKey>,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct ServerInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub boot_mode: Option<String>,
    #[serde(default)]
    pub fqdns: Vec<String>,
    #[serde(default)]
    pub ssh_keys: Vec<u64>,
    #[serde(default)]
    pub plan: u64,
    #[serde(default)]
    pub os: Option<u64>,
    #[serde(default)]
    pub project: u64,
    #[serde(default)]
    pub location: u64,
}

#[derive(Deserialize)]
pub struct ServerPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub boot_mode: Option<String>,
    pub fqdns: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub compute_resource_id: u64,
    pub queue: String,
    pub action: String,
    pub status: String,
    pub output: String,
    pub progress: u32,
    pub duration: u64,
}

#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Error envelope the real API answers with.
#[derive(Debug)]
pub enum Failure {
    NotFound,
    Unauthenticated,
    Unavailable,
    Invalid(BTreeMap<String, Vec<String>>),
    BadRequest(String),
}

impl Failure {
    fn invalid(field: &str, message: &str) -> Self {
        Failure::Invalid(BTreeMap::from([(field.to_string(), vec![message.to_string()])]))
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            Failure::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string(), None),
            Failure::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthenticated.".to_string(), None),
            Failure::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable".to_string(),
                None,
            ),
            Failure::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.".to_string(),
                Some(errors),
            ),
            Failure::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
        };
        let mut body = json!({ "http_code": status.as_u16(), "message": message });
        if let Some(errors) = errors {
            body["errors"] = json!(errors);
        }
        (status, Json(body)).into_response()
    }
}

struct ServerRecord {
    server: Server,
    polls_left: u32,
}

struct TaskRecord {
    task: Task,
    polls_left: u32,
    outcome: &'static str,
    output: String,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    locations: BTreeMap<u64, Location>,
    projects: BTreeMap<u64, Project>,
    ssh_keys: BTreeMap<u64, SshKey>,
    plans: BTreeMap<u64, Plan>,
    os_images: BTreeMap<u64, OsImage>,
    os_image_versions: BTreeMap<u64, OsImageVersion>,
    servers: BTreeMap<u64, ServerRecord>,
    tasks: BTreeMap<u64, TaskRecord>,
    flaky: HashMap<String, u32>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn start_task(&mut self, action: &str, polls: u32, outcome: &'static str, output: &str) -> Task {
        let id = self.next_id();
        let task = Task {
            id,
            compute_resource_id: 1,
            queue: "default".to_string(),
            action: action.to_string(),
            status: "pending".to_string(),
            ..Task::default()
        };
        self.tasks.insert(
            id,
            TaskRecord {
                task: task.clone(),
                polls_left: polls,
                outcome,
                output: output.to_string(),
            },
        );
        task
    }

    /// An image with its versions attached.
    fn os_image(&self, id: u64) -> Option<OsImage> {
        let mut image = self.os_images.get(&id)?.clone();
        image.versions = self
            .os_image_versions
            .values()
            .filter(|version| version.os_image_id == id)
            .cloned()
            .collect();
        Some(image)
    }

    /// Read a task, advancing it one step towards its outcome.
    fn poll_task(&mut self, id: u64) -> Option<Task> {
        let record = self.tasks.get_mut(&id)?;
        record.polls_left = record.polls_left.saturating_sub(1);
        let task = &mut record.task;
        task.duration += 1;
        if record.polls_left == 0 {
            task.status = record.outcome.to_string();
            task.progress = 100;
            task.output = record.output.clone();
        } else {
            task.status = "running".to_string();
            task.progress = 50;
        }
        Some(task.clone())
    }

    /// Read a server, advancing it one step out of `processing`.
    fn poll_server(&mut self, id: u64) -> Option<Server> {
        let record = self.servers.get_mut(&id)?;
        if record.polls_left > 0 {
            record.polls_left -= 1;
            if record.polls_left == 0 {
                record.server.status = "started".to_string();
                record.server.is_processing = false;
            }
        }
        Some(record.server.clone())
    }

    /// Count a call to a flaky endpoint; `true` while it should still fail.
    fn flaky_call(&mut self, key: &str, failures: u32) -> (bool, u32) {
        let calls = self.flaky.entry(key.to_string()).or_default();
        *calls += 1;
        (*calls <= failures, *calls)
    }
}

#[derive(Clone)]
struct AppState {
    db: Arc<RwLock<Store>>,
    config: MockConfig,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        db: Arc::default(),
        config,
    };
    let api = Router::new()
        .route("/account", get(get_account))
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location).put(update_location).delete(delete_location),
        )
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", get(get_project).delete(delete_project))
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/{id}", get(get_plan))
        .route("/os_images", get(list_os_images).post(create_os_image))
        .route("/os_images/{id}", get(get_os_image))
        .route(
            "/os_images/{id}/versions",
            get(list_os_image_versions).post(create_os_image_version),
        )
        .route("/os_image_versions/{id}", get(get_os_image_version))
        .route("/ssh_keys", get(list_ssh_keys).post(create_ssh_key))
        .route("/ssh_keys/{id}", get(get_ssh_key).delete(delete_ssh_key))
        .route("/servers", get(list_servers).post(create_server))
        .route(
            "/servers/{id}",
            get(get_server).patch(patch_server).delete(delete_server),
        )
        .route("/servers/{id}/{action}", post(server_action))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", get(get_task))
        .route("/flaky/{key}", get(flaky))
        .route_layer(middleware::from_fn(require_token))
        .route("/auth/login", post(login));
    Router::new().nest("/api/v1", api).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn require_token(request: Request, next: Next) -> Result<Response, Failure> {
    let expected = format!("Bearer {TOKEN}");
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        return Err(Failure::Unauthenticated);
    }
    Ok(next.run(request).await)
}

fn account_user() -> User {
    User {
        id: 1,
        email: EMAIL.to_string(),
        status: "active".to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "data": value }))
}

fn api_base(headers: &HeaderMap) -> String {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}/api/v1")
}

fn filter<'q>(query: &'q BTreeMap<String, String>, field: &str) -> Option<&'q str> {
    query.get(&format!("filter[{field}]")).map(String::as_str)
}

fn encode(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn page_url(path: &str, query: &BTreeMap<String, String>, page: usize, per_page: usize) -> String {
    let mut pairs: Vec<String> = query
        .iter()
        .filter(|(key, _)| key.as_str() != "page" && key.as_str() != "per_page")
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect();
    pairs.push(format!("page={page}"));
    pairs.push(format!("per_page={per_page}"));
    format!("{path}?{}", pairs.join("&"))
}

/// Render `items` as one page of a list response with absolute links that
/// carry the request filters.
pub fn paginate<T: Serialize>(
    base: &str,
    resource: &str,
    query: &BTreeMap<String, String>,
    items: Vec<T>,
) -> Value {
    let number = |key: &str, default: usize| {
        query
            .get(key)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    };
    let per_page = number("per_page", DEFAULT_PER_PAGE);
    let page = number("page", 1);

    let total = items.len();
    let last_page = total.div_ceil(per_page).max(1);
    let start = (page - 1).saturating_mul(per_page).min(total);
    let data: Vec<T> = items.into_iter().skip(start).take(per_page).collect();
    let (from, to) = if data.is_empty() {
        (None, None)
    } else {
        (Some(start + 1), Some(start + data.len()))
    };

    let path = format!("{base}/{resource}");
    let link = |n: usize| page_url(&path, query, n, per_page);
    json!({
        "data": data,
        "links": {
            "first": link(1),
            "last": link(last_page),
            "prev": (page > 1).then(|| link(page - 1)),
            "next": (page < last_page).then(|| link(page + 1)),
        },
        "meta": {
            "current_page": page,
            "from": from,
            "last_page": last_page,
            "path": path,
            "per_page": per_page,
            "to": to,
            "total": total,
        },
    })
}

async fn login(Json(input): Json<LoginInput>) -> Result<Json<Value>, Failure> {
    if input.email.is_empty() {
        return Err(Failure::invalid("email", "The email field is required."));
    }
    if input.email != EMAIL || input.password != PASSWORD {
        return Err(Failure::Unauthenticated);
    }
    info!(email = %input.email, "login");
    Ok(data(json!({
        "credentials": {
            "access_token": TOKEN,
            "token_type": "Bearer",
            "expires_at": "2030-01-01T00:00:00Z",
        }
    })))
}

async fn get_account() -> Json<Value> {
    data(account_user())
}

// --- locations ---

async fn list_locations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let name = filter(&query, "name");
    let items: Vec<Location> = db
        .locations
        .values()
        .filter(|location| name.map_or(true, |name| location.name == name))
        .cloned()
        .collect();
    Json(paginate(&api_base(&headers), "locations", &query, items))
}

async fn create_location(
    State(state): State<AppState>,
    Json(input): Json<LocationInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.is_empty() {
        return Err(Failure::invalid("name", "The name field is required."));
    }
    let mut db = state.db.write().await;
    let location = Location {
        id: db.next_id(),
        name: input.name,
        description: input.description,
        is_default: input.is_default,
        is_visible: input.is_visible,
    };
    db.locations.insert(location.id, location.clone());
    debug!(id = location.id, "location created");
    Ok((StatusCode::CREATED, data(location)))
}

async fn get_location(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.locations.get(&id).cloned().map(data).ok_or(Failure::NotFound)
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<LocationInput>,
) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    let location = db.locations.get_mut(&id).ok_or(Failure::NotFound)?;
    if !input.name.is_empty() {
        location.name = input.name;
    }
    location.description = input.description;
    location.is_default = input.is_default;
    location.is_visible = input.is_visible;
    Ok(data(location.clone()))
}

async fn delete_location(State(state): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.locations
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(Failure::NotFound)
}

// --- plans ---

async fn list_plans(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let search = filter(&query, "search");
    let items: Vec<Plan> = db
        .plans
        .values()
        .filter(|plan| search.map_or(true, |search| plan.name.contains(search)))
        .cloned()
        .collect();
    Json(paginate(&api_base(&headers), "plans", &query, items))
}

async fn create_plan(
    State(state): State<AppState>,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.is_empty() {
        return Err(Failure::invalid("name", "The name field is required."));
    }
    let mut db = state.db.write().await;
    let plan = Plan {
        id: db.next_id(),
        name: input.name,
        params: input.params,
        virtualization_type: "kvm".to_string(),
        storage_type: input.storage_type.unwrap_or_else(|| "fb".to_string()),
        image_format: input.image_format.unwrap_or_else(|| "qcow2".to_string()),
        is_default: input.is_default,
        is_visible: input.is_visible,
    };
    db.plans.insert(plan.id, plan.clone());
    debug!(id = plan.id, "plan created");
    Ok((StatusCode::CREATED, data(plan)))
}

async fn get_plan(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.plans.get(&id).cloned().map(data).ok_or(Failure::NotFound)
}

// --- os images ---

async fn list_os_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let search = filter(&query, "search");
    let items: Vec<OsImage> = db
        .os_images
        .keys()
        .filter_map(|id| db.os_image(*id))
        .filter(|image| search.map_or(true, |search| image.name.contains(search)))
        .collect();
    Json(paginate(&api_base(&headers), "os_images", &query, items))
}

async fn create_os_image(
    State(state): State<AppState>,
    Json(input): Json<OsImageInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.is_empty() {
        return Err(Failure::invalid("name", "The name field is required."));
    }
    let mut db = state.db.write().await;
    let image = OsImage {
        id: db.next_id(),
        name: input.name,
        is_visible: input.is_visible,
        versions: Vec::new(),
    };
    db.os_images.insert(image.id, image.clone());
    Ok((StatusCode::CREATED, data(image)))
}

async fn get_os_image(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.os_image(id).map(data).ok_or(Failure::NotFound)
}

async fn list_os_image_versions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    let image = db.os_image(id).ok_or(Failure::NotFound)?;
    let resource = format!("os_images/{id}/versions");
    Ok(Json(paginate(&api_base(&headers), &resource, &query, image.versions)))
}

async fn create_os_image_version(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<OsImageVersionInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.version.is_empty() {
        return Err(Failure::invalid("version", "The version field is required."));
    }
    let mut db = state.db.write().await;
    if !db.os_images.contains_key(&id) {
        return Err(Failure::NotFound);
    }
    let version = OsImageVersion {
        id: db.next_id(),
        os_image_id: id,
        version: input.version,
        url: input.url,
        virtualization_type: "kvm".to_string(),
        cloud_init_version: input.cloud_init_version,
        is_visible: input.is_visible,
    };
    db.os_image_versions.insert(version.id, version.clone());
    Ok((StatusCode::CREATED, data(version)))
}

async fn get_os_image_version(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.os_image_versions.get(&id).cloned().map(data).ok_or(Failure::NotFound)
}

// --- projects ---

async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let items: Vec<Project> = db.projects.values().cloned().collect();
    Json(paginate(&api_base(&headers), "projects", &query, items))
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.is_empty() {
        return Err(Failure::invalid("name", "The name field is required."));
    }
    let mut db = state.db.write().await;
    let project = Project {
        id: db.next_id(),
        name: input.name,
        description: input.description,
        members: 1,
        is_owner: true,
        is_default: db.projects.is_empty(),
        owner: account_user(),
        servers: 0,
    };
    db.projects.insert(project.id, project.clone());
    Ok((StatusCode::CREATED, data(project)))
}

async fn get_project(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.projects.get(&id).cloned().map(data).ok_or(Failure::NotFound)
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.projects
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(Failure::NotFound)
}

// --- ssh keys ---

async fn list_ssh_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let items: Vec<SshKey> = db.ssh_keys.values().cloned().collect();
    Json(paginate(&api_base(&headers), "ssh_keys", &query, items))
}

async fn create_ssh_key(
    State(state): State<AppState>,
    Json(input): Json<SshKeyInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut errors = BTreeMap::new();
    if input.name.is_empty() {
        errors.insert("name".to_string(), vec!["The name field is required.".to_string()]);
    }
    if !input.body.starts_with("ssh-") {
        errors.insert(
            "body".to_string(),
            vec![
                "The body field is required.".to_string(),
                "The body must be a valid public key.".to_string(),
            ],
        );
    }
    if !errors.is_empty() {
        return Err(Failure::Invalid(errors));
    }
    let mut db = state.db.write().await;
    let key = SshKey {
        id: db.next_id(),
        name: input.name,
        body: input.body,
    };
    db.ssh_keys.insert(key.id, key.clone());
    Ok((StatusCode::CREATED, data(key)))
}

async fn get_ssh_key(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.ssh_keys.get(&id).cloned().map(data).ok_or(Failure::NotFound)
}

async fn delete_ssh_key(State(state): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.ssh_keys
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(Failure::NotFound)
}

// --- servers ---

async fn list_servers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let status = filter(&query, "status");
    let items: Vec<Server> = db
        .servers
        .values()
        .map(|record| &record.server)
        .filter(|server| status.map_or(true, |status| server.status == status))
        .cloned()
        .collect();
    Json(paginate(&api_base(&headers), "servers", &query, items))
}

async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<ServerInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.is_empty() {
        return Err(Failure::invalid("name", "The name field is required."));
    }
    let mut db = state.db.write().await;
    let location = db
        .locations
        .get(&input.location)
        .cloned()
        .ok_or_else(|| Failure::invalid("location", "The selected location is invalid."))?;
    let project = db
        .projects
        .get(&input.project)
        .cloned()
        .ok_or_else(|| Failure::invalid("project", "The selected project is invalid."))?;
    if let Some(os) = input.os {
        if !db.os_image_versions.contains_key(&os) {
            return Err(Failure::invalid("os", "The selected os is invalid."));
        }
    }
    let specifications = match db.plans.get(&input.plan) {
        Some(plan) => Specifications {
            disk: plan.params.disk,
            ram: plan.params.ram,
            vcpu: plan.params.vcpu,
        },
        None => Specifications {
            disk: 10 * input.plan.max(1),
            ram: 1024 * 1024 * 1024,
            vcpu: 1,
        },
    };
    let ssh_keys: Vec<SshKey> = input
        .ssh_keys
        .iter()
        .filter_map(|id| db.ssh_keys.get(id).cloned())
        .collect();

    let id = db.next_id();
    let processing = state.config.processing_polls > 0;
    let server = Server {
        id,
        name: input.name,
        description: input.description,
        uuid: format!("00000000-0000-4000-8000-{id:012}"),
        specifications,
        status: if processing { "processing" } else { "started" }.to_string(),
        location,
        fqdns: input.fqdns,
        boot_mode: input.boot_mode.unwrap_or_else(|| "disk".to_string()),
        is_suspended: false,
        is_processing: processing,
        project,
        ssh_keys,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    };
    db.servers.insert(
        id,
        ServerRecord {
            server: server.clone(),
            polls_left: state.config.processing_polls,
        },
    );
    info!(id, name = %server.name, "server created");
    Ok((StatusCode::CREATED, data(server)))
}

async fn get_server(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    db.poll_server(id).map(data).ok_or(Failure::NotFound)
}

async fn patch_server(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<ServerPatch>,
) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    let server = &mut db.servers.get_mut(&id).ok_or(Failure::NotFound)?.server;
    if let Some(name) = input.name {
        server.name = name;
    }
    if let Some(description) = input.description {
        server.description = description;
    }
    if let Some(boot_mode) = input.boot_mode {
        server.boot_mode = boot_mode;
    }
    if let Some(fqdns) = input.fqdns {
        server.fqdns = fqdns;
    }
    Ok(data(server.clone()))
}

async fn server_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(u64, String)>,
    body: String,
) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    let server = &mut db.servers.get_mut(&id).ok_or(Failure::NotFound)?.server;
    let task_action = match action.as_str() {
        "start" | "restart" => {
            server.status = "started".to_string();
            format!("vm-{action}")
        }
        "stop" => {
            server.status = "stopped".to_string();
            "vm-stop".to_string()
        }
        "resize" => {
            let input: Value = serde_json::from_str(&body)
                .map_err(|e| Failure::BadRequest(format!("invalid resize body: {e}")))?;
            if input.get("plan_id").and_then(Value::as_u64).is_none() {
                return Err(Failure::invalid("plan_id", "The plan id field is required."));
            }
            "vm-resize".to_string()
        }
        _ => return Err(Failure::NotFound),
    };
    let polls = state.config.task_polls;
    let task = db.start_task(&task_action, polls, "done", "");
    Ok(data(task))
}

async fn delete_server(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    let record = db.servers.remove(&id).ok_or(Failure::NotFound)?;
    let (outcome, output) = if record.server.name.starts_with("doomed") {
        ("failed", "unable to remove disk: device busy")
    } else {
        ("done", "")
    };
    let polls = state.config.task_polls;
    let task = db.start_task("vm-delete", polls, outcome, output);
    info!(id, task = task.id, "server deletion scheduled");
    Ok(data(task))
}

// --- tasks ---

async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let db = state.db.read().await;
    let status = filter(&query, "status");
    let action = filter(&query, "action");
    let items: Vec<Task> = db
        .tasks
        .values()
        .map(|record| &record.task)
        .filter(|task| status.map_or(true, |status| task.status == status))
        .filter(|task| action.map_or(true, |action| task.action == action))
        .cloned()
        .collect();
    Json(paginate(&api_base(&headers), "tasks", &query, items))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, Failure> {
    let mut db = state.db.write().await;
    db.poll_task(id).map(data).ok_or(Failure::NotFound)
}

// --- failure injection ---

async fn flaky(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, Failure> {
    let failures = query
        .get("failures")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let mut db = state.db.write().await;
    let (failing, calls) = db.flaky_call(&key, failures);
    debug!(key = %key, calls, failing, "flaky call");
    if failing {
        return Err(Failure::Unavailable);
    }
    Ok(data(json!({ "key": key, "attempts": calls })))
}
