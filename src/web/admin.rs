use crate::db::{self, LookupRow, RefTable, ResponseUpsert, SessionDetail, SessionSummaryRow, SessionUpdate};
use crate::error::{ApiError, ApiJson};
use crate::state::SharedState;
use crate::time_utils::{parse_session_datetime, DatetimeFormat};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct NamePayload {
    pub name: String,
}

/// Admin session update. `datetime_format` selects how `session_datetime`
/// is parsed (the submit form round-trips ISO-8601, older admin clients
/// echo the textual server rendering); `total_score` is only written when
/// present.
#[derive(Debug, Deserialize)]
pub struct UpdateSessionPayload {
    pub tester_name: String,
    pub division_id: i32,
    pub venue_id: i32,
    pub session_datetime: String,
    #[serde(default)]
    pub datetime_format: DatetimeFormat,
    pub total_score: Option<f64>,
    #[serde(default)]
    pub responses: Vec<ResponseUpsert>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/feedback-sessions", get(list_sessions))
        .route("/feedback-session/:id", get(get_session))
        .route("/feedback-session/:id", put(update_session))
        .route("/feedback-session/:id", delete(delete_session))
        .route("/division", post(create_division))
        .route("/venue", post(create_venue))
        .route("/divisions", get(list_divisions))
        .route("/venues", get(list_venues))
        .route("/division/:id", put(rename_division))
        .route("/venue/:id", put(rename_venue))
        .route("/division/:id", delete(delete_division))
        .route("/venue/:id", delete(delete_venue))
        .with_state(state)
}

async fn list_sessions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SessionSummaryRow>>, ApiError> {
    let sessions = db::list_sessions(&state.pool).await?;
    Ok(Json(sessions))
}

async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = db::get_session(&state.pool, id).await?;
    Ok(Json(detail))
}

async fn update_session(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateSessionPayload>,
) -> Result<Json<Value>, ApiError> {
    let session_datetime =
        parse_session_datetime(&payload.session_datetime, payload.datetime_format)?;

    let update = SessionUpdate {
        tester_name: payload.tester_name,
        division_id: payload.division_id,
        venue_id: payload.venue_id,
        session_datetime,
        total_score: payload.total_score,
    };
    db::update_session(&state.pool, id, &update, &payload.responses).await?;

    tracing::info!("Session {} updated ({} responses in payload)", id, payload.responses.len());
    Ok(Json(json!({ "message": "Session updated successfully" })))
}

async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    db::delete_session(&state.pool, id).await?;
    Ok(Json(json!({ "message": "Feedback session deleted successfully" })))
}

async fn create_division(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<NamePayload>,
) -> Result<Json<Value>, ApiError> {
    db::create_ref(&state.pool, RefTable::Divisions, &payload.name).await?;
    Ok(Json(json!({ "message": "Division added successfully" })))
}

async fn create_venue(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<NamePayload>,
) -> Result<Json<Value>, ApiError> {
    db::create_ref(&state.pool, RefTable::Venues, &payload.name).await?;
    Ok(Json(json!({ "message": "Venue added successfully" })))
}

async fn list_divisions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LookupRow>>, ApiError> {
    let divisions = db::list_refs(&state.pool, RefTable::Divisions).await?;
    Ok(Json(divisions))
}

async fn list_venues(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LookupRow>>, ApiError> {
    let venues = db::list_refs(&state.pool, RefTable::Venues).await?;
    Ok(Json(venues))
}

async fn rename_division(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<NamePayload>,
) -> Result<Json<Value>, ApiError> {
    db::rename_ref(&state.pool, RefTable::Divisions, id, &payload.name).await?;
    Ok(Json(json!({ "message": "Division updated successfully" })))
}

async fn rename_venue(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<NamePayload>,
) -> Result<Json<Value>, ApiError> {
    db::rename_ref(&state.pool, RefTable::Venues, id, &payload.name).await?;
    Ok(Json(json!({ "message": "Venue updated successfully" })))
}

async fn delete_division(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    db::delete_ref(&state.pool, RefTable::Divisions, id).await?;
    Ok(Json(json!({ "message": "Division deleted successfully" })))
}

async fn delete_venue(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    db::delete_ref(&state.pool, RefTable::Venues, id).await?;
    Ok(Json(json!({ "message": "Venue deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_defaults_to_iso() {
        let payload: UpdateSessionPayload = serde_json::from_value(json!({
            "tester_name": "Alice",
            "division_id": 1,
            "venue_id": 2,
            "session_datetime": "2024-01-01T10:00:00Z",
            "responses": []
        }))
        .unwrap();

        assert_eq!(payload.datetime_format, DatetimeFormat::Iso8601);
        assert!(payload.total_score.is_none());
    }

    #[test]
    fn test_update_payload_textual_selector() {
        let payload: UpdateSessionPayload = serde_json::from_value(json!({
            "tester_name": "Bob",
            "division_id": 3,
            "venue_id": 4,
            "session_datetime": "Mon, 01 Jan 2024 10:00:00 GMT",
            "datetime_format": "textual",
            "total_score": 4.5,
            "responses": [
                { "id": 7, "question": "Q", "chatbot_answer": "A",
                  "accuracy_score": 4, "relevancy_score": 5, "performance_score": 3 },
                { "question": "Q2", "chatbot_answer": "A2",
                  "accuracy_score": 2, "relevancy_score": 2, "performance_score": 2 }
            ]
        }))
        .unwrap();

        assert_eq!(payload.datetime_format, DatetimeFormat::Textual);
        assert_eq!(payload.total_score, Some(4.5));
        assert_eq!(payload.responses[0].id, Some(7));
        assert_eq!(payload.responses[1].id, None);
    }

    #[test]
    fn test_unknown_datetime_format_rejected() {
        let result: Result<UpdateSessionPayload, _> = serde_json::from_value(json!({
            "tester_name": "Eve",
            "division_id": 1,
            "venue_id": 1,
            "session_datetime": "2024-01-01T10:00:00Z",
            "datetime_format": "epoch"
        }));

        assert!(result.is_err());
    }
}
