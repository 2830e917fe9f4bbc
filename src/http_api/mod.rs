use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AccessError, AccessPolicy, Activity, ActivityCatalog, ActivityFilter, ActivityId,
    ActivityLookup, AgeGroup, BuilderSession, EffortLevel, GroupSize, Identity, Language,
    LocalizedActivity, Location, Page, PageRequest, PersistenceError, Program,
    ProgramDetails, ProgramEntry, ProgramId, ProgramStore, ProgramSummary, SaveError, Timeline,
    ValidationError, write_schedule_csv,
};

/// Header carrying the email address verified by the identity provider.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<RwLock<ActivityCatalog>>,
    store: Arc<dyn ProgramStore + Send + Sync>,
    policy: Arc<AccessPolicy>,
    default_language: Language,
}

impl AppState {
    pub fn new<S>(catalog: ActivityCatalog, store: S, policy: AccessPolicy) -> Self
    where
        S: ProgramStore + Send + Sync + 'static,
    {
        Self::with_shared(
            Arc::new(RwLock::new(catalog)),
            Arc::new(store),
            Arc::new(policy),
        )
    }

    pub fn with_shared(
        catalog: Arc<RwLock<ActivityCatalog>>,
        store: Arc<dyn ProgramStore + Send + Sync>,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
            default_language: Language::FALLBACK,
        }
    }

    pub fn with_default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    fn catalog(&self) -> Arc<RwLock<ActivityCatalog>> {
        self.catalog.clone()
    }

    fn language(&self, requested: Option<Language>) -> Language {
        requested.unwrap_or(self.default_language)
    }

    /// Signs in the caller named by the email header.
    fn identify(&self, headers: &HeaderMap) -> Result<Identity, ApiError> {
        let email = headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("sign in required".into()))?;
        Ok(self.policy.sign_in(email)?)
    }

    fn viewable_program(&self, identity: &Identity, id: ProgramId) -> Result<Program, ApiError> {
        let program = self
            .store
            .load_program(id)?
            .ok_or_else(|| ApiError::not_found(format!("program {id} not found")))?;
        if !self.policy.can_view(identity, &program) {
            return Err(ApiError::Forbidden(format!("program {id} is private")));
        }
        Ok(program)
    }

    fn editable_program(&self, identity: &Identity, id: ProgramId) -> Result<Program, ApiError> {
        let program = self.viewable_program(identity, id)?;
        if !self.policy.can_edit(identity, &program) {
            return Err(ApiError::Forbidden(format!(
                "program {id} can only be changed by its owner"
            )));
        }
        Ok(program)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Invalid(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::Invalid(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::Invalid(value.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl From<AccessError> for ApiError {
    fn from(value: AccessError) -> Self {
        ApiError::Forbidden(value.to_string())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Validation(err) => ApiError::Invalid(err.to_string()),
            PersistenceError::ProgramNotFound(id) => {
                ApiError::NotFound(format!("program {id} not found"))
            }
            other => {
                tracing::error!(error = %other, "store error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<SaveError> for ApiError {
    fn from(value: SaveError) -> Self {
        match value {
            SaveError::Rejected(err) => ApiError::Invalid(err.to_string()),
            SaveError::Failed(failure) => {
                tracing::error!(reason = %failure.reason, "save failed");
                ApiError::Internal(failure.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "unauthorized", message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// Query string of `GET /activities`.
#[derive(Debug, Default, Deserialize)]
struct ActivitiesQuery {
    search: Option<String>,
    group_size: Option<GroupSize>,
    effort_level: Option<EffortLevel>,
    location: Option<Location>,
    age_group: Option<AgeGroup>,
    max_duration_minutes: Option<u32>,
    educational_goal: Option<i64>,
    sdg: Option<i64>,
    lang: Option<Language>,
    page: Option<u32>,
    per_page: Option<u32>,
}

impl ActivitiesQuery {
    fn filter(&self) -> ActivityFilter {
        ActivityFilter {
            search: self.search.clone(),
            group_size: self.group_size,
            effort_level: self.effort_level,
            location: self.location,
            age_group: self.age_group,
            max_duration_minutes: self.max_duration_minutes,
            educational_goal: self.educational_goal,
            sdg: self.sdg,
        }
    }

    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page()),
            self.per_page.unwrap_or(defaults.per_page()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct LangQuery {
    lang: Option<Language>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/activities", get(list_activities))
        .route(
            "/activities/:id",
            get(get_activity).put(put_activity).delete(delete_activity),
        )
        .route("/programs", get(list_programs).post(create_program))
        .route(
            "/programs/:id",
            get(get_program).put(update_program).delete(delete_program),
        )
        .route(
            "/programs/:id/entries",
            get(get_entries).put(replace_entries),
        )
        .route("/programs/:id/schedule", get(get_schedule))
        .route("/programs/:id/summary", get(get_summary))
        .route("/programs/:id/export.csv", get(export_csv))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_activities(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ActivitiesQuery>, QueryRejection>,
) -> Result<Json<Page<LocalizedActivity>>, ApiError> {
    state.identify(&headers)?;
    let Query(query) = query?;
    let language = state.language(query.lang);
    let catalog = state.catalog();
    let page = {
        let guard = catalog.read();
        guard
            .query(&query.filter(), query.page_request())
            .map(|activity| activity.localized(language))
    };
    Ok(Json(page))
}

async fn get_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ActivityId>, PathRejection>,
    query: Result<Query<LangQuery>, QueryRejection>,
) -> Result<Json<LocalizedActivity>, ApiError> {
    state.identify(&headers)?;
    let Path(activity_id) = path?;
    let Query(query) = query?;
    let language = state.language(query.lang);
    let catalog = state.catalog();
    let found = {
        let guard = catalog.read();
        guard.get_activity(activity_id).map(|activity| activity.localized(language))
    };
    found
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("activity {activity_id} not found")))
}

async fn put_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ActivityId>, PathRejection>,
    payload: Result<Json<Activity>, JsonRejection>,
) -> Result<Json<Activity>, ApiError> {
    let identity = state.identify(&headers)?;
    if !identity.is_admin() {
        return Err(ApiError::Forbidden("catalogue changes require an admin".into()));
    }
    let Path(activity_id) = path?;
    let Json(activity) = payload?;
    if activity.id != activity_id {
        return Err(ApiError::invalid(
            "activity id in payload does not match path parameter",
        ));
    }
    if activity.name.is_empty() {
        return Err(ApiError::invalid("activity name must not be empty"));
    }
    let catalog = state.catalog();
    {
        let mut guard = catalog.write();
        guard.upsert(activity.clone());
    }
    tracing::info!(activity_id, admin = %identity.email, "activity saved");
    Ok(Json(activity))
}

async fn delete_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ActivityId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(activity_id) = path?;
    if !identity.is_admin() {
        return Err(ApiError::Forbidden("catalogue changes require an admin".into()));
    }
    let catalog = state.catalog();
    let removed = {
        let mut guard = catalog.write();
        guard.remove(activity_id)
    };
    if removed.is_none() {
        return Err(ApiError::not_found(format!("activity {activity_id} not found")));
    }
    tracing::info!(activity_id, admin = %identity.email, "activity removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_programs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Program>>, ApiError> {
    let identity = state.identify(&headers)?;
    let programs = state
        .store
        .list_programs()?
        .into_iter()
        .filter(|program| state.policy.can_view(&identity, program))
        .collect();
    Ok(Json(programs))
}

async fn create_program(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProgramDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<Program>), ApiError> {
    let identity = state.identify(&headers)?;
    let Json(details) = payload?;
    details.validate()?;
    let program = state.store.create_program(&identity.email, details)?;
    Ok((StatusCode::CREATED, Json(program)))
}

async fn get_program(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
) -> Result<Json<Program>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    Ok(Json(state.viewable_program(&identity, program_id)?))
}

async fn update_program(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
    payload: Result<Json<ProgramDetails>, JsonRejection>,
) -> Result<Json<Program>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    let Json(details) = payload?;
    let mut program = state.editable_program(&identity, program_id)?;
    program.apply_details(details, Utc::now())?;
    state.store.update_program(&program)?;
    Ok(Json(program))
}

async fn delete_program(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    state.editable_program(&identity, program_id)?;
    if !state.store.delete_program(program_id)? {
        return Err(ApiError::not_found(format!("program {program_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
) -> Result<Json<Vec<ProgramEntry>>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    state.viewable_program(&identity, program_id)?;
    Ok(Json(state.store.load_program_entries(program_id)?))
}

/// Replaces the whole entry list, as the builder does on save.
async fn replace_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
    payload: Result<Json<Vec<ProgramEntry>>, JsonRejection>,
) -> Result<Json<Vec<ProgramEntry>>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    let Json(entries) = payload?;
    let program = state.editable_program(&identity, program_id)?;
    let catalog = state.catalog();
    let saved = {
        let guard = catalog.read();
        let mut session = BuilderSession::with_entries(program, entries, &*guard)?;
        session.save(state.store.as_ref())?;
        session.entries().to_vec()
    };
    Ok(Json(saved))
}

async fn get_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
) -> Result<Json<Timeline>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    let program = state.viewable_program(&identity, program_id)?;
    let entries = state.store.load_program_entries(program_id)?;
    let catalog = state.catalog();
    let timeline = {
        let guard = catalog.read();
        BuilderSession::with_entries(program, entries, &*guard)?
            .timeline()
            .clone()
    };
    Ok(Json(timeline))
}

async fn get_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
) -> Result<Json<ProgramSummary>, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    let program = state.viewable_program(&identity, program_id)?;
    let entries = state.store.load_program_entries(program_id)?;
    let catalog = state.catalog();
    let summary = {
        let guard = catalog.read();
        BuilderSession::with_entries(program, entries, &*guard)?
            .summary()
            .clone()
    };
    Ok(Json(summary))
}

async fn export_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<ProgramId>, PathRejection>,
    query: Result<Query<LangQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let identity = state.identify(&headers)?;
    let Path(program_id) = path?;
    let Query(query) = query?;
    let program = state.viewable_program(&identity, program_id)?;
    let entries = state.store.load_program_entries(program_id)?;
    let language = state.language(query.lang);
    let catalog = state.catalog();
    let mut buffer = Vec::new();
    {
        let guard = catalog.read();
        write_schedule_csv(&mut buffer, &entries, &*guard, program.start_time, language)?;
    }
    let body = String::from_utf8(buffer).map_err(|err| ApiError::internal(err.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response())
}
