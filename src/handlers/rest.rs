//! JSON API over the relief services.
//!
//! Every route except health and profile creation needs a resolved actor:
//! the `x-actor-id` header set by the identity proxy must name an existing
//! profile, otherwise the request is answered with 401.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::actor::{Actor, ActorResolver, ACTOR_HEADER};
use crate::config::ServerConfig;
use crate::model::{
    Assistance, Camp, CampStatus, DeliveryStatus, Need, PledgeReceipt, Profile,
    VolunteerRegistration,
};
use crate::services::{
    errmsg, CampDraft, NeedDraft, ProfileDraft, ReliefServices, ServiceError,
};

/// Shared state for axum handlers.
pub struct ApiState {
    pub services: ReliefServices,
    pub resolver: Arc<dyn ActorResolver>,
}

type AppState = Arc<ApiState>;

/// Start the REST server.
///
/// When the configured port is 0, the OS assigns an ephemeral port. The
/// actual bound address is always logged.
pub async fn serve(
    state: ApiState,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "reliefhub API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/profiles", post(create_profile))
        .route("/api/profiles/:id", get(get_profile))
        .route("/api/camps", get(list_camps).post(create_camp))
        .route("/api/camps/mine", get(my_camps))
        .route("/api/camps/:id", get(get_camp).delete(delete_camp))
        .route("/api/camps/:id/status", patch(update_camp_status))
        .route("/api/camps/:id/needs", get(list_needs).post(create_need))
        .route("/api/camps/:id/assistance", get(camp_assistance))
        .route(
            "/api/camps/:id/volunteers",
            get(list_volunteers).post(register_volunteer),
        )
        .route("/api/needs/:id", get(get_need))
        .route("/api/needs/:id/pledges", get(list_pledges).post(pledge))
        .route("/api/assistance/mine", get(my_assistance))
        .route("/api/assistance/:id/advance", post(advance_delivery))
        .route("/api/volunteers/mine", get(my_registrations))
        .route("/api/volunteers/:id", delete(withdraw_volunteer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for the JSON API.
#[derive(Debug)]
pub enum ApiError {
    /// No usable actor header.
    Unauthenticated,
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Service(ServiceError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Service(ServiceError::Validation(rejection.body_text()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, retryable) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                format!("missing or unknown {} header", ACTOR_HEADER),
                false,
            ),
            ApiError::Service(err) => {
                let retryable = err.is_retryable();
                match err {
                    ServiceError::Validation(msg) => {
                        (StatusCode::BAD_REQUEST, "validation", msg, retryable)
                    }
                    ServiceError::Authorization(msg) => {
                        (StatusCode::FORBIDDEN, "authorization", msg, retryable)
                    }
                    ServiceError::NotFound(msg) => {
                        (StatusCode::NOT_FOUND, "not_found", msg, retryable)
                    }
                    ServiceError::OverCommit(msg) => {
                        (StatusCode::CONFLICT, "over_commit", msg, retryable)
                    }
                    ServiceError::InvalidTransition(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "invalid_transition",
                        msg,
                        retryable,
                    ),
                    ServiceError::Internal(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal",
                        errmsg::INTERNAL.to_string(),
                        retryable,
                    ),
                }
            }
        };
        let body = ErrorBody {
            error: kind.to_string(),
            message,
            retryable,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Extractors
// ============================================================================

fn credential(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// The resolved caller.
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let credential = credential(parts).ok_or(ApiError::Unauthenticated)?;
        match state.resolver.resolve(credential).await? {
            Some(actor) => Ok(CurrentActor(actor)),
            None => Err(ApiError::Unauthenticated),
        }
    }
}

/// The authenticated subject id, before any profile exists.
pub struct Subject(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for Subject {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> ApiResult<Self> {
        credential(parts)
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Subject)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// JSON body whose parse failures answer as `validation` errors.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> ApiResult<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Path parameters whose parse failures answer as `validation` errors.
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> ApiResult<Self> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

// ============================================================================
// Request and response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: CampStatus,
}

#[derive(Debug, Deserialize)]
pub struct PledgeRequest {
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
pub struct VolunteerRequest {
    pub volunteer_type: String,
}

#[derive(Debug, Serialize)]
pub struct MyCampsResponse {
    /// The camp a dashboard opens on.
    pub default_camp_id: Option<Uuid>,
    pub camps: Vec<Camp>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn create_profile(
    State(state): State<AppState>,
    Subject(id): Subject,
    ApiJson(draft): ApiJson<ProfileDraft>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let profile = state.services.profiles.create(id, draft).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.services.profiles.get(id).await?))
}

async fn list_camps(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
) -> ApiResult<Json<Vec<Camp>>> {
    Ok(Json(state.services.camps.list().await?))
}

async fn create_camp(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(draft): ApiJson<CampDraft>,
) -> ApiResult<(StatusCode, Json<Camp>)> {
    let camp = state.services.camps.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(camp)))
}

async fn my_camps(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<MyCampsResponse>> {
    let camps = state.services.camps.list_mine(&actor).await?;
    let default_camp_id = state
        .services
        .camps
        .default_camp_for(&actor)
        .await?
        .map(|camp| camp.id);
    Ok(Json(MyCampsResponse {
        default_camp_id,
        camps,
    }))
}

async fn get_camp(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Camp>> {
    Ok(Json(state.services.camps.get(id).await?))
}

async fn update_camp_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<Camp>> {
    let camp = state
        .services
        .camps
        .update_status(&actor, id, request.status)
        .await?;
    Ok(Json(camp))
}

async fn delete_camp(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.camps.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_needs(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(camp_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Need>>> {
    Ok(Json(state.services.needs.list_by_camp(camp_id).await?))
}

async fn create_need(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(camp_id): ApiPath<Uuid>,
    ApiJson(draft): ApiJson<NeedDraft>,
) -> ApiResult<(StatusCode, Json<Need>)> {
    let need = state.services.needs.create(&actor, camp_id, draft).await?;
    Ok((StatusCode::CREATED, Json(need)))
}

async fn camp_assistance(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(camp_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Assistance>>> {
    Ok(Json(
        state.services.fulfillment.pledges_for_camp(camp_id).await?,
    ))
}

async fn get_need(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Need>> {
    Ok(Json(state.services.needs.get(id).await?))
}

async fn pledge(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(need_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PledgeRequest>,
) -> ApiResult<(StatusCode, Json<PledgeReceipt>)> {
    let receipt = state
        .services
        .fulfillment
        .pledge_assistance(&actor, need_id, request.quantity, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_pledges(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(need_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Assistance>>> {
    Ok(Json(
        state.services.fulfillment.pledges_for_need(need_id).await?,
    ))
}

async fn my_assistance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<Vec<Assistance>>> {
    Ok(Json(state.services.fulfillment.pledges_by_ngo(&actor).await?))
}

async fn advance_delivery(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(entry_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AdvanceRequest>,
) -> ApiResult<Json<Assistance>> {
    let entry = state
        .services
        .fulfillment
        .advance_delivery(&actor, entry_id, request.status)
        .await?;
    Ok(Json(entry))
}

async fn register_volunteer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(camp_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<VolunteerRequest>,
) -> ApiResult<(StatusCode, Json<VolunteerRegistration>)> {
    let registration = state
        .services
        .volunteers
        .register(&actor, camp_id, &request.volunteer_type)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn list_volunteers(
    State(state): State<AppState>,
    CurrentActor(_): CurrentActor,
    ApiPath(camp_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<VolunteerRegistration>>> {
    Ok(Json(state.services.volunteers.list_by_camp(camp_id).await?))
}

async fn my_registrations(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<Vec<VolunteerRegistration>>> {
    Ok(Json(state.services.volunteers.list_mine(&actor).await?))
}

async fn withdraw_volunteer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.volunteers.withdraw(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
