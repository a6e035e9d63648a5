use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::call::schema::{CallKind, CallOutcome};
use crate::modules::user::schema::DisplayInfo;

pub struct NewCallRecord {
    pub caller: String,
    pub receiver: String,
    pub kind: CallKind,
    pub outcome: CallOutcome,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogCallModel {
    #[validate(length(min = 1, message = "Caller is required"))]
    pub caller: String,
    #[validate(length(min = 1, message = "Receiver is required"))]
    pub receiver: String,
    pub kind: CallKind,
    pub outcome: CallOutcome,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CallHistoryQuery {
    #[validate(range(min = 1, max = 200, message = "Limit must be between 1 and 200"))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub identity: String,
    pub peer_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryEntry {
    pub id: Uuid,
    pub other_identity: String,
    pub other_display: DisplayInfo,
    pub kind: CallKind,
    pub outcome: CallOutcome,
    pub direction: CallDirection,
    pub missed: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecordResponse {
    pub id: Uuid,
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
}
