use crate::db::{self, LookupRow, NewResponse, RefTable};
use crate::error::{ApiError, ApiJson};
use crate::scoring;
use crate::state::SharedState;
use crate::time_utils::{parse_session_datetime, DatetimeFormat};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Feedback submission body. Required fields are modelled as `Option` so
/// their absence surfaces as a 400 validation error rather than a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    pub tester_name: Option<String>,
    pub division_id: Option<i32>,
    pub venue_id: Option<i32>,
    pub session_datetime: Option<String>,
    #[serde(default)]
    pub responses: Vec<NewResponse>,
}

#[derive(Debug)]
struct ValidatedSubmission {
    tester_name: String,
    division_id: i32,
    venue_id: i32,
    session_datetime: String,
}

impl SubmitPayload {
    fn validate(&self) -> Result<ValidatedSubmission, ApiError> {
        let tester_name = self
            .tester_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::validation("tester_name is required"))?;
        let division_id = self
            .division_id
            .ok_or_else(|| ApiError::validation("division_id is required"))?;
        let venue_id = self
            .venue_id
            .ok_or_else(|| ApiError::validation("venue_id is required"))?;
        let session_datetime = self
            .session_datetime
            .as_deref()
            .ok_or_else(|| ApiError::validation("session_datetime is required"))?;
        if self.responses.is_empty() {
            return Err(ApiError::validation("responses must not be empty"));
        }

        Ok(ValidatedSubmission {
            tester_name: tester_name.to_string(),
            division_id,
            venue_id,
            session_datetime: session_datetime.to_string(),
        })
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/divisions", get(list_divisions))
        .route("/venues", get(list_venues))
        .route("/submit-feedback", post(submit_feedback))
        .with_state(state)
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

async fn submit_feedback(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SubmitPayload>,
) -> Result<Json<Value>, ApiError> {
    let submission = payload.validate()?;

    let session_datetime =
        parse_session_datetime(&submission.session_datetime, DatetimeFormat::Iso8601)?;

    let score_triples: Vec<(i32, i32, i32)> = payload
        .responses
        .iter()
        .map(|r| (r.accuracy_score, r.relevancy_score, r.performance_score))
        .collect();
    let scores = scoring::aggregate(&score_triples)?;

    let session_id = db::create_session(
        &state.pool,
        &submission.tester_name,
        submission.division_id,
        submission.venue_id,
        session_datetime,
        &scores,
        &payload.responses,
    )
    .await?;

    tracing::info!(
        "Feedback session {} submitted by {} ({} responses)",
        session_id,
        submission.tester_name,
        payload.responses.len()
    );

    Ok(Json(json!({
        "message": "Feedback submitted successfully",
        "session_id": session_id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> SubmitPayload {
        SubmitPayload {
            tester_name: Some("Alice".to_string()),
            division_id: Some(1),
            venue_id: Some(1),
            session_datetime: Some("2024-01-01T10:00:00Z".to_string()),
            responses: vec![NewResponse {
                question: "Q1".to_string(),
                chatbot_answer: "A1".to_string(),
                accuracy_score: 5,
                relevancy_score: 5,
                performance_score: 5,
                additional_comments: None,
            }],
        }
    }

    #[test]
    fn test_complete_payload_passes() {
        let validated = full_payload().validate().unwrap();
        assert_eq!(validated.tester_name, "Alice");
        assert_eq!(validated.division_id, 1);
    }

    #[test]
    fn test_missing_division_id_rejected() {
        let mut payload = full_payload();
        payload.division_id = None;

        let err = payload.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().contains("division_id"));
    }

    #[test]
    fn test_blank_tester_name_rejected() {
        let mut payload = full_payload();
        payload.tester_name = Some("   ".to_string());

        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_empty_responses_rejected() {
        let mut payload = full_payload();
        payload.responses.clear();

        let err = payload.validate().unwrap_err();
        assert!(err.to_string().contains("responses"));
    }
}
