//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the lead endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::http_error;
use crate::web::auth::{LoginRequest, LoginResponse, SessionResponse, UserResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use lead_tracker_core::{
    Lead, LeadFilter, LeadForm, LeadPatch, LeadSource, LeadStatus, PortError, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        list_leads_handler,
        due_today_handler,
        get_lead_handler,
        create_lead_handler,
        update_lead_handler,
        update_status_handler,
        delete_lead_handler,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            SessionResponse,
            UserResponse,
            LeadResponse,
            CreateLeadRequest,
            UpdateLeadRequest,
            StatusUpdateRequest
        )
    ),
    tags(
        (name = "Lead Tracker API", description = "Prospective-student leads and mock authentication.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A lead as returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: String,
    pub student_name: String,
    pub parent_name: String,
    pub contact_number: String,
    pub contact_email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: String,
    pub street: String,
    #[schema(value_type = String, example = "website")]
    pub source: LeadSource,
    pub follow_up_date: NaiveDate,
    pub notes: String,
    #[schema(value_type = String, example = "new")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id,
            student_name: lead.student_name,
            parent_name: lead.parent_name,
            contact_number: lead.contact_number,
            contact_email: lead.contact_email,
            class_name: lead.class_name,
            street: lead.street,
            source: lead.source,
            follow_up_date: lead.follow_up_date,
            notes: lead.notes,
            status: lead.status,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
            created_by: lead.created_by,
        }
    }
}

/// The payload for creating a lead. Status always starts as `new`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub student_name: String,
    pub parent_name: String,
    pub contact_number: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: String,
    pub street: String,
    #[schema(value_type = String, example = "school_event")]
    pub source: LeadSource,
    pub follow_up_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

impl From<CreateLeadRequest> for LeadForm {
    fn from(req: CreateLeadRequest) -> Self {
        Self {
            student_name: req.student_name,
            parent_name: req.parent_name,
            contact_number: req.contact_number,
            contact_email: req.contact_email,
            class_name: req.class_name,
            street: req.street,
            source: req.source,
            follow_up_date: req.follow_up_date,
            notes: req.notes,
        }
    }
}

/// A partial update; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateLeadRequest {
    pub student_name: Option<String>,
    pub parent_name: Option<String>,
    pub contact_number: Option<String>,
    /// An empty string removes the email.
    pub contact_email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub street: Option<String>,
    #[schema(value_type = Option<String>)]
    pub source: Option<LeadSource>,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>)]
    pub status: Option<LeadStatus>,
}

impl From<UpdateLeadRequest> for LeadPatch {
    fn from(req: UpdateLeadRequest) -> Self {
        Self {
            student_name: req.student_name,
            parent_name: req.parent_name,
            contact_number: req.contact_number,
            contact_email: req.contact_email,
            class_name: req.class_name,
            street: req.street,
            source: req.source,
            follow_up_date: req.follow_up_date,
            notes: req.notes,
            status: req.status,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    #[schema(value_type = String, example = "contacted")]
    pub status: LeadStatus,
}

/// Query parameters of `GET /leads`. `all` or an empty value disables a criterion.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadQuery {
    /// Must match the authenticated user when given.
    pub owner_id: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (start of day, UTC).
    pub from: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (end of day, UTC).
    pub to: Option<String>,
    /// Case-insensitive match on student or parent name.
    pub q: Option<String>,
}

impl LeadQuery {
    fn into_filter(self) -> Result<LeadFilter, String> {
        Ok(LeadFilter {
            status: criterion(self.status.as_deref())
                .map(str::parse::<LeadStatus>)
                .transpose()
                .map_err(|e| format!("status: {e}"))?,
            source: criterion(self.source.as_deref())
                .map(str::parse::<LeadSource>)
                .transpose()
                .map_err(|e| format!("source: {e}"))?,
            from: criterion(self.from.as_deref())
                .map(|raw| parse_bound(raw, false))
                .transpose()?,
            to: criterion(self.to.as_deref())
                .map(|raw| parse_bound(raw, true))
                .transpose()?,
            search_query: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }
}

fn criterion(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Parses a range bound. A bare date covers the whole day.
fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date"))?;
    let time = if end_of_day {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| format!("'{raw}' is out of range"))
}

fn to_responses(leads: Vec<Lead>) -> Vec<LeadResponse> {
    leads.into_iter().map(LeadResponse::from).collect()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's leads, optionally filtered.
#[utoipa::path(
    get,
    path = "/leads",
    params(LeadQuery),
    responses(
        (status = 200, description = "Matching leads", body = [LeadResponse]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "ownerId is not the caller")
    )
)]
pub async fn list_leads_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Vec<LeadResponse>>, (StatusCode, String)> {
    if let Some(owner_id) = query.owner_id.as_deref() {
        if owner_id != user.id {
            warn!(user_id = %user.id, owner_id, "Refused to list another user's leads");
            return Err((
                StatusCode::FORBIDDEN,
                "ownerId must be the logged-in user".to_string(),
            ));
        }
    }
    let filter = query
        .into_filter()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let leads = app_state
        .leads
        .filter(&user.id, &filter)
        .map_err(|e| http_error("Failed to list leads", e))?;
    Ok(Json(to_responses(leads)))
}

/// Open leads whose follow-up date is today.
#[utoipa::path(
    get,
    path = "/leads/due-today",
    responses(
        (status = 200, description = "Leads to follow up today", body = [LeadResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn due_today_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<LeadResponse>>, (StatusCode, String)> {
    let leads = app_state
        .leads
        .due_today(&user.id)
        .map_err(|e| http_error("Failed to list follow-ups", e))?;
    Ok(Json(to_responses(leads)))
}

#[utoipa::path(
    get,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "The lead", body = LeadResponse),
        (status = 404, description = "No such lead")
    )
)]
pub async fn get_lead_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, (StatusCode, String)> {
    let lead = owned_lead(&app_state, &user, &id, "Failed to load lead")?;
    Ok(Json(lead.into()))
}

/// Loads a lead the caller owns. Other users' leads look exactly like missing ones.
fn owned_lead(
    app_state: &AppState,
    user: &User,
    id: &str,
    context: &str,
) -> Result<Lead, (StatusCode, String)> {
    let found = app_state
        .leads
        .get_by_id(id)
        .map_err(|e| http_error(context, e))?;
    match found {
        Some(lead) if lead.created_by == user.id => Ok(lead),
        other => {
            if other.is_some() {
                warn!(user_id = %user.id, lead_id = %id, "Refused access to another user's lead");
            }
            Err(http_error(
                context,
                PortError::NotFound(format!("Lead {id} not found")),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_lead_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lead = app_state
        .leads
        .create(req.into(), &user.id)
        .map_err(|e| http_error("Failed to create lead", e))?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

#[utoipa::path(
    patch,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    request_body = UpdateLeadRequest,
    responses(
        (status = 200, description = "Lead updated", body = LeadResponse),
        (status = 400, description = "The merged lead is missing or has invalid fields"),
        (status = 404, description = "No such lead")
    )
)]
pub async fn update_lead_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<LeadResponse>, (StatusCode, String)> {
    owned_lead(&app_state, &user, &id, "Failed to update lead")?;
    let lead = app_state
        .leads
        .update(&id, req.into())
        .map_err(|e| http_error("Failed to update lead", e))?;
    Ok(Json(lead.into()))
}

#[utoipa::path(
    patch,
    path = "/leads/{id}/status",
    params(("id" = String, Path, description = "Lead id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = LeadResponse),
        (status = 404, description = "No such lead")
    )
)]
pub async fn update_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<LeadResponse>, (StatusCode, String)> {
    owned_lead(&app_state, &user, &id, "Failed to update lead status")?;
    let lead = app_state
        .leads
        .update_status(&id, req.status)
        .map_err(|e| http_error("Failed to update lead status", e))?;
    Ok(Json(lead.into()))
}

/// Delete a lead. Always 204; unknown ids and other users' leads are left alone.
#[utoipa::path(
    delete,
    path = "/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 204, description = "Lead deleted (or already absent)")
    )
)]
pub async fn delete_lead_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    match owned_lead(&app_state, &user, &id, "Failed to delete lead") {
        Ok(_) => {}
        Err((status, _)) if status == StatusCode::NOT_FOUND => return Ok(StatusCode::NO_CONTENT),
        Err(e) => return Err(e),
    }
    app_state
        .leads
        .delete(&id)
        .map_err(|e| http_error("Failed to delete lead", e))?;
    Ok(StatusCode::NO_CONTENT)
}
