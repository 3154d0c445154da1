use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::catalog::{self, CatalogEntry, CatalogProvider};
use crate::custom::CustomWord;
use crate::error::{CatalogError, Error, StoreError};
use crate::record::WordRecord;
use crate::scheduler::Grade;
use crate::session::{ReviewSession, SessionSummary, Step};
use crate::stats::{self, LevelSummary, Statistics};
use crate::store::{self, Library, Persistence};

// -- Errors --

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Core(Error::DuplicateWord(_)) => (StatusCode::CONFLICT, "duplicate_word"),
            ApiError::Core(Error::InvalidState(_)) => (StatusCode::CONFLICT, "invalid_state"),
            ApiError::Core(Error::InvalidGrade(_)) => (StatusCode::BAD_REQUEST, "invalid_grade"),
            ApiError::Core(Error::EmptyField(_)) => (StatusCode::BAD_REQUEST, "empty_field"),
            ApiError::Core(Error::WordNotFound(_)) | ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Catalog(CatalogError::UnknownLevel(_)) => {
                (StatusCode::BAD_REQUEST, "unknown_level")
            }
            ApiError::Catalog(_) => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };
        if status.is_server_error() {
            error!("{self}");
        }
        let body = Json(ErrorBody {
            error: kind,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// -- App state --

struct ActiveSession {
    id: String,
    session: ReviewSession,
}

struct ServerState {
    library: Library,
    session: Option<ActiveSession>,
}

/// Shared handler state. The mutex serializes every access to the library, so
/// at most one review session runs against it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<ServerState>>,
    store: Arc<dyn Persistence + Send + Sync>,
    catalog: Arc<dyn CatalogProvider + Send + Sync>,
    clock: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(
        library: Library,
        store: Arc<dyn Persistence + Send + Sync>,
        catalog: Arc<dyn CatalogProvider + Send + Sync>,
        clock: fn() -> DateTime<Utc>,
    ) -> AppState {
        AppState {
            inner: Arc::new(Mutex::new(ServerState {
                library,
                session: None,
            })),
            store,
            catalog,
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Runs `change` on a copy of `library` and keeps the copy only once it
    /// has been saved. A failed save leaves `library` as it was.
    fn commit<T>(
        &self,
        library: &mut Library,
        change: impl FnOnce(&mut Library) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut next = library.clone();
        let out = change(&mut next)?;
        store::save_library(self.store.as_ref(), &next, self.now())?;
        *library = next;
        Ok(out)
    }
}

// -- Payloads --

#[derive(Deserialize)]
pub struct NewWord {
    pub word: String,
    pub translation: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Deserialize)]
pub struct GradeRequest {
    pub grade: u8,
}

#[derive(Serialize)]
struct SessionStarted {
    id: String,
    total: usize,
    current: Option<WordRecord>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StepResponse {
    Next { word: WordRecord, position: usize, total: usize },
    Complete { summary: SessionSummary },
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    totals: Statistics,
    custom_words: usize,
    levels: Vec<LevelSummary>,
}

// -- Words --

async fn list_words(State(state): State<AppState>) -> Json<Vec<WordRecord>> {
    let st = state.inner.lock().await;
    Json(st.library.book.records().to_vec())
}

async fn add_word(
    State(state): State<AppState>,
    Json(new): Json<NewWord>,
) -> ApiResult<(StatusCode, Json<WordRecord>)> {
    let now = state.now();
    let mut st = state.inner.lock().await;
    let record = state.commit(&mut st.library, |lib| {
        Ok(lib.book.add(&new.word, &new.translation, &new.level, now)?.clone())
    })?;
    info!(word = %record.word(), "added word");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Starts learning a word from the catalog, or from the custom dictionary
/// when the catalog does not have it.
async fn study_catalog_word(
    State(state): State<AppState>,
    Path((level, word)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<WordRecord>)> {
    let now = state.now();
    let mut st = state.inner.lock().await;
    let providers: [&dyn CatalogProvider; 2] = [state.catalog.as_ref(), &st.library.custom];
    let entry = catalog::lookup_any(&providers, &level, &word)?
        .ok_or_else(|| ApiError::NotFound(format!("{word} in level {level}")))?;
    let record = state.commit(&mut st.library, |lib| {
        Ok(lib.book.add(&entry.word, &entry.translation, &level, now)?.clone())
    })?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_word(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> ApiResult<Json<WordRecord>> {
    let mut st = state.inner.lock().await;
    let record = state.commit(&mut st.library, |lib| Ok(lib.book.remove(&word)?))?;
    Ok(Json(record))
}

async fn mark_learned(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> ApiResult<Json<WordRecord>> {
    let now = state.now();
    let mut st = state.inner.lock().await;
    let record = state.commit(&mut st.library, |lib| {
        Ok(lib.book.mark_learned(&word, now)?.clone())
    })?;
    Ok(Json(record))
}

async fn due_words(State(state): State<AppState>) -> Json<Vec<WordRecord>> {
    let now = state.now();
    let st = state.inner.lock().await;
    Json(st.library.book.due(now).into_iter().cloned().collect())
}

// -- Custom dictionary --

async fn list_custom(State(state): State<AppState>) -> Json<Vec<CustomWord>> {
    let st = state.inner.lock().await;
    Json(st.library.custom.words().to_vec())
}

async fn add_custom(
    State(state): State<AppState>,
    Json(new): Json<NewWord>,
) -> ApiResult<(StatusCode, Json<CustomWord>)> {
    let now = state.now();
    let mut st = state.inner.lock().await;
    let word = state.commit(&mut st.library, |lib| {
        Ok(lib.custom.add(&new.word, &new.translation, &new.level, now)?.clone())
    })?;
    info!(word = %word.word(), "added custom word");
    Ok((StatusCode::CREATED, Json(word)))
}

async fn remove_custom(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CustomWord>> {
    let mut st = state.inner.lock().await;
    let word = state.commit(&mut st.library, |lib| Ok(lib.custom.remove(&id)?))?;
    Ok(Json(word))
}

/// Deletes every record and custom word, and drops the active session.
async fn clear_data(State(state): State<AppState>) -> ApiResult<StatusCode> {
    let mut guard = state.inner.lock().await;
    let st = &mut *guard;
    store::clear_all(state.store.as_ref(), &mut st.library)?;
    if let Some(old) = st.session.take() {
        old.session.cancel();
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Catalog --

async fn levels(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog.levels())
}

async fn catalog_words(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog.words_for_level(&level)?))
}

// -- Review sessions --

async fn start_session(State(state): State<AppState>) -> Json<SessionStarted> {
    let now = state.now();
    let mut st = state.inner.lock().await;
    if let Some(old) = st.session.take() {
        old.session.cancel();
    }
    let book = &st.library.book;
    let session = ReviewSession::start(book, now);
    let id = uuid::Uuid::new_v4().to_string();
    let current = session
        .current()
        .and_then(|cur| book.get_by_id(cur))
        .cloned();
    let started = SessionStarted {
        id: id.clone(),
        total: session.len(),
        current,
    };
    if !session.is_complete() {
        st.session = Some(ActiveSession { id, session });
    }
    Json(started)
}

async fn submit_grade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<GradeRequest>,
) -> ApiResult<Json<StepResponse>> {
    let grade = Grade::new(req.grade)?;
    let now = state.now();
    let mut guard = state.inner.lock().await;
    let st = &mut *guard;

    let active = st
        .session
        .as_mut()
        .filter(|a| a.id == id)
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
    // The session moves on only if the graded library was saved.
    let mut session = active.session.clone();
    let step = state.commit(&mut st.library, |lib| {
        Ok(session.submit(&mut lib.book, grade, now)?)
    })?;
    let total = session.len();
    let position = session.position();
    active.session = session;

    let response = match step {
        Step::Next(next) => {
            let word = st
                .library
                .book
                .get_by_id(&next)
                .cloned()
                .ok_or_else(|| Error::InvalidState(format!("no record with id {next}")))?;
            StepResponse::Next {
                word,
                position,
                total,
            }
        }
        Step::Complete(summary) => {
            st.session = None;
            StepResponse::Complete { summary }
        }
    };
    Ok(Json(response))
}

async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    let mut st = state.inner.lock().await;
    match st.session.take() {
        Some(active) if active.id == id => Ok(Json(active.session.cancel())),
        other => {
            st.session = other;
            Err(ApiError::NotFound(format!("session {id}")))
        }
    }
}

// -- Stats --

async fn statistics(State(state): State<AppState>) -> Json<StatsResponse> {
    let now = state.now();
    let st = state.inner.lock().await;
    let records = st.library.book.records();
    Json(StatsResponse {
        totals: stats::statistics(records, now),
        custom_words: st.library.custom.len(),
        levels: stats::level_summaries(records, now),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/words", get(list_words).post(add_word))
        .route("/api/words/{word}", delete(remove_word))
        .route("/api/words/{word}/learned", post(mark_learned))
        .route("/api/due", get(due_words))
        .route("/api/custom", get(list_custom).post(add_custom))
        .route("/api/custom/{id}", delete(remove_custom))
        .route("/api/data", delete(clear_data))
        .route("/api/levels", get(levels))
        .route("/api/catalog/{level}", get(catalog_words))
        .route("/api/catalog/{level}/{word}", post(study_catalog_word))
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{id}", delete(cancel_session))
        .route("/api/sessions/{id}/grade", post(submit_grade))
        .route("/api/stats", get(statistics))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("serving at http://localhost:{port}");
    axum::serve(listener, app).await
}
