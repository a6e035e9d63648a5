use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "call_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "call_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Completed,
    Missed,
    Rejected,
    Busy,
}

/// Append-only; never updated after insert.
#[derive(Debug, Clone, FromRow)]
pub struct CallRecordEntity {
    pub id: Uuid,
    pub caller: String,
    pub receiver: String,
    pub participants: Vec<String>,
    pub kind: CallKind,
    pub outcome: CallOutcome,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
}
