use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use mealbook_core::MealError;
use mealbook_core::models::{MealEntry, MealRef, Template, TemplateRecord, WeekBucket};
use mealbook_core::service::{MealInput, MealService};
use mealbook_core::week::parse_date;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MiB

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<MealService>>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, MealService> {
        self.service
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateMealRequest {
    date: Option<String>,
    time: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMealRequest {
    new_date: Option<String>,
    time: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct WeekQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct CreateTemplateRequest {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct MealResponse {
    success: bool,
    meal: MealRef,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

#[derive(Serialize)]
struct TemplateResponse {
    success: bool,
    template: Template,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Body(JsonRejection),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Body(rejection) => (rejection.status(), rejection.body_text()),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<MealError> for ApiError {
    fn from(err: MealError) -> Self {
        match err {
            MealError::Validation(msg) => Self::BadRequest(msg),
            MealError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Internal(other.into()),
        }
    }
}

// Keeps the extractor's status (400, 413, 415, 422) but uses the JSON error shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

fn parse_path_date(date: &str) -> Result<NaiveDate, ApiError> {
    Ok(parse_date(date)?)
}

/// Positions are canonical zero-based integers: ASCII digits only, no sign,
/// no leading zeros. Anything else cannot name an entry.
fn parse_index(date: &str, index: &str) -> Result<usize, ApiError> {
    let canonical = !index.is_empty()
        && index.bytes().all(|b| b.is_ascii_digit())
        && (index == "0" || !index.starts_with('0'));
    canonical
        .then(|| index.parse().ok())
        .flatten()
        .ok_or_else(|| ApiError::NotFound(format!("No meal at index {index} on {date}")))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn api_status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

async fn get_week(
    State(state): State<AppState>,
    Query(params): Query<WeekQuery>,
) -> Result<Json<WeekBucket>, ApiError> {
    let date = match params.date.as_deref() {
        Some(d) if !d.is_empty() => parse_date(d)?,
        _ => Local::now().date_naive(),
    };
    let week = state.service().list_week(date)?;
    Ok(Json(week))
}

async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<MealEntry>>, ApiError> {
    let date = parse_path_date(&date)?;
    let entries = state.service().list_day(date)?;
    Ok(Json(entries))
}

async fn create_meal(
    State(state): State<AppState>,
    payload: Result<Json<CreateMealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MealResponse>), ApiError> {
    let Json(req) = payload?;
    let input = MealInput {
        date: req.date,
        time: req.time,
        description: req.description,
    };
    let meal = state.service().create_meal(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(MealResponse {
            success: true,
            meal,
        }),
    ))
}

async fn update_meal(
    State(state): State<AppState>,
    Path((date, index)): Path<(String, String)>,
    payload: Result<Json<UpdateMealRequest>, JsonRejection>,
) -> Result<Json<MealResponse>, ApiError> {
    let Json(req) = payload?;
    let input = MealInput {
        date: req.new_date,
        time: req.time,
        description: req.description,
    };
    input.validate_update()?;
    let index = parse_index(&date, &index)?;
    let date = parse_path_date(&date)?;
    let meal = state.service().update_meal(date, index, &input)?;
    Ok(Json(MealResponse {
        success: true,
        meal,
    }))
}

async fn delete_meal(
    State(state): State<AppState>,
    Path((date, index)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let index = parse_index(&date, &index)?;
    let date = parse_path_date(&date)?;
    state.service().delete_meal(date, index)?;
    Ok(Json(DeleteResponse { success: true }))
}

async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateRecord>, ApiError> {
    let record = state.service().list_templates()?;
    Ok(Json(record))
}

async fn create_template(
    State(state): State<AppState>,
    payload: Result<Json<CreateTemplateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    let Json(req) = payload?;
    let template = state
        .service()
        .save_template(req.name.as_deref(), req.description.as_deref())?;
    Ok((
        StatusCode::CREATED,
        Json(TemplateResponse {
            success: true,
            template,
        }),
    ))
}

// --- Router builder ---

fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api", get(api_status))
        .route("/api/week", get(get_week))
        .route("/api/meals", post(create_meal))
        .route("/api/meals/{date}", get(get_day))
        .route(
            "/api/meals/{date}/{index}",
            put(update_meal).delete(delete_meal),
        )
        .route("/api/templates", get(list_templates).post(create_template))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state);

    // Front-end assets are served outside the API's header policy
    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };
    app.layer(TraceLayer::new_for_http())
}

// --- Server startup ---

pub async fn start_server(
    service: MealService,
    port: u16,
    bind: &str,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
    };

    if let Some(ref dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving front-end assets");
    }

    let app = build_router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
