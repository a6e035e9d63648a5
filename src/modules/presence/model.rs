use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header presence derived from last-active timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PresenceLabel {
    Online,
    #[serde(rename_all = "camelCase")]
    LastSeen { at: DateTime<Utc> },
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub identity: String,
    pub online: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub label: PresenceLabel,
}
