/// Call Service
///
/// Cầu nối giữa danh tính trong app và lớp truyền tải P2P bên ngoài:
///
/// - `peer_id` biến email thành token ổn định, an toàn cho URL
/// - Lớp truyền tải gọi `log_call` đúng một lần cho mỗi cuộc gọi, không retry
/// - Lịch sử cuộc gọi lấy tên/avatar của người còn lại tại thời điểm đọc
use chrono::{DateTime, Utc};
use log::info;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::error;
use crate::constants::CALL_HISTORY_MAX_LIMIT;
use crate::modules::call::{
    model::{CallDirection, CallHistoryEntry, LogCallModel, NewCallRecord, PeerEndpoint},
    repository::CallRepository,
    schema::{CallOutcome, CallRecordEntity},
};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::service::{display_info, load_user_map};
use crate::utils::{normalize_identity, Clock};

/// Readable prefix plus a hash suffix, so distinct identities that sanitize
/// to the same prefix still get distinct tokens.
pub fn peer_id(identity: &str) -> String {
    let sanitized: String = identity
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let digest = hex::encode(Sha256::digest(identity.as_bytes()));
    format!("{}-{}", sanitized, &digest[..8])
}

/// Floored minutes: `"Nm"` below an hour, `"Hh Mm"` otherwise.
pub fn duration_label(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let minutes = (end - start).num_minutes().max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

#[derive(Clone)]
pub struct CallService {
    call_repo: Arc<dyn CallRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl CallService {
    pub fn with_dependencies(
        call_repo: Arc<dyn CallRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        CallService { call_repo, user_repo, clock }
    }

    pub async fn peer_endpoint(&self, target: &str) -> Result<PeerEndpoint, error::SystemError> {
        let target = normalize_identity(target);
        let user = self
            .user_repo
            .find_by_email(&target)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(PeerEndpoint { peer_id: peer_id(&user.email), identity: user.email })
    }

    pub async fn log_call(
        &self,
        requester: &str,
        call: LogCallModel,
    ) -> Result<CallRecordEntity, error::SystemError> {
        let caller = normalize_identity(&call.caller);
        let receiver = normalize_identity(&call.receiver);
        if requester != caller && requester != receiver {
            return Err(error::SystemError::permission_denied(
                "Only a call participant can log this call",
            ));
        }
        if caller == receiver {
            return Err(error::SystemError::invalid_operation("Caller and receiver must differ"));
        }
        if call.end_time.is_some_and(|end| end < call.start_time) {
            return Err(error::SystemError::invalid_operation("Call cannot end before it starts"));
        }

        let record = self
            .call_repo
            .create(&NewCallRecord {
                caller,
                receiver,
                kind: call.kind,
                outcome: call.outcome,
                start_time: call.start_time,
                end_time: call.end_time,
                duration: call.end_time.map(|end| duration_label(call.start_time, end)),
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            "Call {} logged: {} -> {} ({:?})",
            record.id, record.caller, record.receiver, record.outcome
        );
        Ok(record)
    }

    pub async fn history(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<CallHistoryEntry>, error::SystemError> {
        let limit = limit.clamp(1, CALL_HISTORY_MAX_LIMIT);
        let records = self.call_repo.find_by_participant(identity, limit).await?;

        let mut others: Vec<String> = records
            .iter()
            .map(|r| if r.caller == identity { r.receiver.clone() } else { r.caller.clone() })
            .collect();
        others.sort();
        others.dedup();
        let users = load_user_map(self.user_repo.as_ref(), &others).await?;

        Ok(records
            .into_iter()
            .map(|r| {
                let outgoing = r.caller == identity;
                let other = if outgoing { r.receiver } else { r.caller };
                let duration = match (r.duration, r.outcome) {
                    (Some(d), _) => Some(d),
                    (None, CallOutcome::Completed) => Some("0m".to_string()),
                    (None, _) => None,
                };
                CallHistoryEntry {
                    id: r.id,
                    other_display: display_info(&users, &other),
                    other_identity: other,
                    kind: r.kind,
                    outcome: r.outcome,
                    direction: if outgoing {
                        CallDirection::Outgoing
                    } else {
                        CallDirection::Incoming
                    },
                    missed: r.outcome == CallOutcome::Missed,
                    start_time: r.start_time,
                    end_time: r.end_time,
                    duration,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::call::schema::CallKind;
    use crate::test::TestHarness;
    use chrono::TimeDelta;

    fn call(caller: &str, receiver: &str, outcome: CallOutcome, secs: Option<i64>) -> LogCallModel {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        LogCallModel {
            caller: caller.into(),
            receiver: receiver.into(),
            kind: CallKind::Video,
            outcome,
            start_time: start,
            end_time: secs.map(|s| start + TimeDelta::seconds(s)),
        }
    }

    #[test]
    fn test_peer_id_is_deterministic_and_url_safe() {
        let id = peer_id("Alice.Smith@example.com");
        assert_eq!(id, peer_id("Alice.Smith@example.com"));
        assert!(id.starts_with("alice-smith-example-com-"));
        assert_eq!(id.len(), "alice-smith-example-com-".len() + 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert_ne!(peer_id("a.b@x.io"), peer_id("a-b@x.io"));
    }

    #[test]
    fn test_duration_label() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(duration_label(t, t + TimeDelta::seconds(95)), "1m");
        assert_eq!(duration_label(t, t + TimeDelta::seconds(3700)), "1h 1m");
        assert_eq!(duration_label(t, t + TimeDelta::seconds(59)), "0m");
        assert_eq!(duration_label(t, t + TimeDelta::seconds(3599)), "59m");
        assert_eq!(duration_label(t, t + TimeDelta::seconds(7200)), "2h 0m");
    }

    #[tokio::test]
    async fn test_peer_endpoint_requires_known_user() {
        let h = TestHarness::new().await;
        h.sign_up("bob@x.io", "Bob").await;

        let endpoint = h.services.call.peer_endpoint("Bob@x.io").await.unwrap();
        assert_eq!(endpoint.identity, "bob@x.io");
        assert_eq!(endpoint.peer_id, peer_id("bob@x.io"));

        let err = h.services.call.peer_endpoint("ghost@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_log_call_validation() {
        let h = TestHarness::new().await;
        let svc = &h.services.call;

        let err = svc
            .log_call("c@x.io", call("a@x.io", "b@x.io", CallOutcome::Completed, Some(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::PermissionDenied(_)));

        let err = svc
            .log_call("a@x.io", call("a@x.io", "b@x.io", CallOutcome::Completed, Some(-10)))
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::InvalidOperation(_)));

        let record = svc
            .log_call("b@x.io", call("a@x.io", "b@x.io", CallOutcome::Completed, Some(95)))
            .await
            .unwrap();
        assert_eq!(record.duration.as_deref(), Some("1m"));
        assert_eq!(record.participants, vec!["a@x.io".to_string(), "b@x.io".to_string()]);
    }

    #[tokio::test]
    async fn test_history_direction_missed_and_live_names() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        let svc = &h.services.call;

        svc.log_call("a@x.io", call("a@x.io", "b@x.io", CallOutcome::Completed, Some(3700)))
            .await
            .unwrap();
        h.clock.advance_secs(1);
        svc.log_call("b@x.io", call("b@x.io", "a@x.io", CallOutcome::Missed, None)).await.unwrap();
        h.clock.advance_secs(1);
        svc.log_call("a@x.io", call("a@x.io", "b@x.io", CallOutcome::Completed, None))
            .await
            .unwrap();

        let history = svc.history("a@x.io", 50).await.unwrap();
        assert_eq!(history.len(), 3);

        assert_eq!(history[0].duration.as_deref(), Some("0m"));
        assert_eq!(history[1].direction, CallDirection::Incoming);
        assert!(history[1].missed);
        assert_eq!(history[1].duration, None);
        assert_eq!(history[1].other_display.name, "Bob");
        assert_eq!(history[2].direction, CallDirection::Outgoing);
        assert_eq!(history[2].duration.as_deref(), Some("1h 1m"));

        assert_eq!(svc.history("a@x.io", 2).await.unwrap().len(), 2);
        assert_eq!(svc.history("b@x.io", 50).await.unwrap()[1].direction, CallDirection::Outgoing);
        assert!(svc.history("c@x.io", 50).await.unwrap().is_empty());
    }
}
