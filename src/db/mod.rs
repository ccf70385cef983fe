use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::ApiError;
use crate::scoring::ScoreSummary;

/// Division or venue row. The two tables are structurally identical lookup
/// tables, so they share one row type and one set of repository functions
/// parameterized by [`RefTable`].
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LookupRow {
    pub id: i32,
    pub name: String,
}

/// The two reference tables a feedback session points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefTable {
    Divisions,
    Venues,
}

impl RefTable {
    fn table(self) -> &'static str {
        match self {
            RefTable::Divisions => "divisions",
            RefTable::Venues => "venues",
        }
    }

    fn session_fk(self) -> &'static str {
        match self {
            RefTable::Divisions => "division_id",
            RefTable::Venues => "venue_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RefTable::Divisions => "division",
            RefTable::Venues => "venue",
        }
    }
}

/// One row of the admin session list: the session joined with its lookup
/// names plus comma-concatenated response fields, newest first.
#[derive(Debug, Serialize, FromRow)]
pub struct SessionSummaryRow {
    pub id: i32,
    pub tester_name: String,
    pub division_id: Option<i32>,
    pub venue_id: Option<i32>,
    pub session_datetime: Option<NaiveDateTime>,
    pub total_score: Option<f64>,
    pub accuracy_score: Option<f64>,
    pub relevancy_score: Option<f64>,
    pub performance_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub division_name: Option<String>,
    pub venue_name: Option<String>,
    pub questions: Option<String>,
    pub answers: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SessionRow {
    pub id: i32,
    pub tester_name: String,
    pub division_id: Option<i32>,
    pub venue_id: Option<i32>,
    pub session_datetime: Option<NaiveDateTime>,
    pub total_score: Option<f64>,
    pub accuracy_score: Option<f64>,
    pub relevancy_score: Option<f64>,
    pub performance_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub division_name: Option<String>,
    pub venue_name: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ResponseRow {
    pub id: i32,
    pub question: String,
    pub chatbot_answer: String,
    pub accuracy_score: i32,
    pub relevancy_score: i32,
    pub performance_score: i32,
    pub additional_comments: Option<String>,
}

/// Session detail returned by GET: the joined session row with its full,
/// non-concatenated response list.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionRow,
    pub responses: Vec<ResponseRow>,
}

/// A response as submitted with a new session.
#[derive(Debug, Deserialize)]
pub struct NewResponse {
    pub question: String,
    pub chatbot_answer: String,
    pub accuracy_score: i32,
    pub relevancy_score: i32,
    pub performance_score: i32,
    pub additional_comments: Option<String>,
}

/// A response in an admin update: with an `id` it overwrites the existing
/// row, without one it is appended to the session.
#[derive(Debug, Deserialize)]
pub struct ResponseUpsert {
    pub id: Option<i32>,
    pub question: String,
    pub chatbot_answer: String,
    pub accuracy_score: i32,
    pub relevancy_score: i32,
    pub performance_score: i32,
    pub additional_comments: Option<String>,
}

/// Session fields overwritten by the admin update. `total_score` is applied
/// only when supplied; the accuracy/relevancy/performance aggregates are
/// never recomputed on this path.
#[derive(Debug)]
pub struct SessionUpdate {
    pub tester_name: String,
    pub division_id: i32,
    pub venue_id: i32,
    pub session_datetime: NaiveDateTime,
    pub total_score: Option<f64>,
}

pub async fn list_refs(pool: &PgPool, table: RefTable) -> Result<Vec<LookupRow>, ApiError> {
    let rows = sqlx::query_as::<_, LookupRow>(&format!(
        "SELECT id, name FROM {}",
        table.table()
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_ref(pool: &PgPool, table: RefTable, name: &str) -> Result<(), ApiError> {
    sqlx::query(&format!("INSERT INTO {} (name) VALUES ($1)", table.table()))
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Silently succeeds when the id does not exist (zero rows affected).
pub async fn rename_ref(
    pool: &PgPool,
    table: RefTable,
    id: i32,
    name: &str,
) -> Result<(), ApiError> {
    sqlx::query(&format!(
        "UPDATE {} SET name = $1 WHERE id = $2",
        table.table()
    ))
    .bind(name)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes a division/venue unless a session still references it. The
/// reference count and the delete run in one transaction so a concurrent
/// submit cannot slip between them.
pub async fn delete_ref(pool: &PgPool, table: RefTable, id: i32) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let in_use: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM feedback_sessions WHERE {} = $1",
        table.session_fk()
    ))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if in_use > 0 {
        return Err(ApiError::conflict(format!(
            "Cannot delete {} as it is being used in feedback sessions",
            table.label()
        )));
    }

    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table.table()))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Inserts the session and all of its responses as one transaction and
/// returns the generated session id.
pub async fn create_session(
    pool: &PgPool,
    tester_name: &str,
    division_id: i32,
    venue_id: i32,
    session_datetime: NaiveDateTime,
    scores: &ScoreSummary,
    responses: &[NewResponse],
) -> Result<i32, ApiError> {
    let mut tx = pool.begin().await?;

    let session_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO feedback_sessions
            (tester_name, division_id, venue_id, session_datetime,
             total_score, accuracy_score, relevancy_score, performance_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(tester_name)
    .bind(division_id)
    .bind(venue_id)
    .bind(session_datetime)
    .bind(scores.total)
    .bind(scores.accuracy)
    .bind(scores.relevancy)
    .bind(scores.performance)
    .fetch_one(&mut *tx)
    .await?;

    for response in responses {
        sqlx::query(
            r#"
            INSERT INTO feedback_responses
                (session_id, question, chatbot_answer,
                 accuracy_score, relevancy_score, performance_score, additional_comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session_id)
        .bind(&response.question)
        .bind(&response.chatbot_answer)
        .bind(response.accuracy_score)
        .bind(response.relevancy_score)
        .bind(response.performance_score)
        .bind(response.additional_comments.as_deref().unwrap_or(""))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(session_id)
}

pub async fn list_sessions(pool: &PgPool) -> Result<Vec<SessionSummaryRow>, ApiError> {
    let rows = sqlx::query_as::<_, SessionSummaryRow>(
        r#"
        SELECT fs.id, fs.tester_name, fs.division_id, fs.venue_id,
               fs.session_datetime, fs.total_score, fs.accuracy_score,
               fs.relevancy_score, fs.performance_score, fs.created_at,
               d.name AS division_name, v.name AS venue_name,
               string_agg(fr.question, ',') AS questions,
               string_agg(fr.chatbot_answer, ',') AS answers,
               string_agg(fr.additional_comments, ',') AS comments
        FROM feedback_sessions fs
        LEFT JOIN divisions d ON fs.division_id = d.id
        LEFT JOIN venues v ON fs.venue_id = v.id
        LEFT JOIN feedback_responses fr ON fs.id = fr.session_id
        GROUP BY fs.id, d.name, v.name
        ORDER BY fs.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_session(pool: &PgPool, session_id: i32) -> Result<SessionDetail, ApiError> {
    let session = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT fs.id, fs.tester_name, fs.division_id, fs.venue_id,
               fs.session_datetime, fs.total_score, fs.accuracy_score,
               fs.relevancy_score, fs.performance_score, fs.created_at,
               d.name AS division_name, v.name AS venue_name
        FROM feedback_sessions fs
        LEFT JOIN divisions d ON fs.division_id = d.id
        LEFT JOIN venues v ON fs.venue_id = v.id
        WHERE fs.id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Session not found"))?;

    let responses = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, question, chatbot_answer, accuracy_score, relevancy_score,
               performance_score, additional_comments
        FROM feedback_responses
        WHERE session_id = $1
        ORDER BY id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(SessionDetail { session, responses })
}

/// Overwrites the session fields and upserts each payload response: rows
/// carrying an id are updated in place (scoped to this session), the rest
/// are inserted. Responses missing from the payload are left untouched.
pub async fn update_session(
    pool: &PgPool,
    session_id: i32,
    update: &SessionUpdate,
    responses: &[ResponseUpsert],
) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    match update.total_score {
        Some(total) => {
            sqlx::query(
                r#"
                UPDATE feedback_sessions
                SET tester_name = $1, division_id = $2, venue_id = $3,
                    session_datetime = $4, total_score = $5
                WHERE id = $6
                "#,
            )
            .bind(&update.tester_name)
            .bind(update.division_id)
            .bind(update.venue_id)
            .bind(update.session_datetime)
            .bind(total)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                UPDATE feedback_sessions
                SET tester_name = $1, division_id = $2, venue_id = $3,
                    session_datetime = $4
                WHERE id = $5
                "#,
            )
            .bind(&update.tester_name)
            .bind(update.division_id)
            .bind(update.venue_id)
            .bind(update.session_datetime)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    for response in responses {
        match response.id {
            Some(response_id) => {
                sqlx::query(
                    r#"
                    UPDATE feedback_responses
                    SET question = $1, chatbot_answer = $2, accuracy_score = $3,
                        relevancy_score = $4, performance_score = $5,
                        additional_comments = $6
                    WHERE id = $7 AND session_id = $8
                    "#,
                )
                .bind(&response.question)
                .bind(&response.chatbot_answer)
                .bind(response.accuracy_score)
                .bind(response.relevancy_score)
                .bind(response.performance_score)
                .bind(response.additional_comments.as_deref().unwrap_or(""))
                .bind(response_id)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO feedback_responses
                        (session_id, question, chatbot_answer, accuracy_score,
                         relevancy_score, performance_score, additional_comments)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(session_id)
                .bind(&response.question)
                .bind(&response.chatbot_answer)
                .bind(response.accuracy_score)
                .bind(response.relevancy_score)
                .bind(response.performance_score)
                .bind(response.additional_comments.as_deref().unwrap_or(""))
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Deletes a session by id; the schema cascades the delete to its
/// responses. NotFound when no row matched.
pub async fn delete_session(pool: &PgPool, session_id: i32) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM feedback_sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Feedback session not found"));
    }
    Ok(())
}
