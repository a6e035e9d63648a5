/// Presence Service
///
/// Quản lý trạng thái online/offline dựa trên `last_active_at` của user:
///
/// - Heartbeat ghi `last_active_at = now` (client gọi mỗi 30s, lỗi bị bỏ qua)
/// - Online được tính lại ở mỗi lần đọc: `now - last_active_at < ONLINE_THRESHOLD`,
///   không có cờ boolean nào được lưu hay cache
/// - Sign-out ghi epoch vào `last_active_at` để user offline ngay lập tức,
///   không phải chờ hết ngưỡng 2 phút
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

use crate::api::error;
use crate::constants::ONLINE_THRESHOLD_SECS;
use crate::modules::presence::model::{PresenceLabel, PresenceResponse};
use crate::modules::user::repository::UserRepository;
use crate::utils::Clock;

/// Epoch and pre-epoch timestamps mean "never active".
pub fn effective_last_active(last_active: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    last_active.filter(|t| t.timestamp() > 0)
}

pub fn is_online(last_active: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match effective_last_active(last_active) {
        Some(at) => now - at < TimeDelta::seconds(ONLINE_THRESHOLD_SECS),
        None => false,
    }
}

/// Gộp presence của nhiều identity: online nếu có ít nhất một người online,
/// ngược lại lấy lần hoạt động gần nhất, không có gì thì offline.
pub fn last_seen_label<I>(timestamps: I, now: DateTime<Utc>) -> PresenceLabel
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    let mut latest: Option<DateTime<Utc>> = None;
    for at in timestamps.into_iter().filter_map(effective_last_active) {
        if is_online(Some(at), now) {
            return PresenceLabel::Online;
        }
        match latest {
            Some(l) if l >= at => {}
            _ => latest = Some(at),
        }
    }

    match latest {
        Some(at) => PresenceLabel::LastSeen { at },
        None => PresenceLabel::Offline,
    }
}

#[derive(Clone)]
pub struct PresenceService {
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl PresenceService {
    pub fn with_dependencies(
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PresenceService { user_repo, clock }
    }

    /// Idempotent; gọi nhiều lần chỉ dời `last_active_at` về hiện tại.
    pub async fn heartbeat(&self, identity: &str) -> Result<(), error::SystemError> {
        let found = self.user_repo.set_last_active(identity, self.clock.now()).await?;
        if !found {
            return Err(error::SystemError::not_found("User not found"));
        }
        Ok(())
    }

    /// Đưa user về offline ngay khi đăng xuất.
    pub async fn sign_out(&self, identity: &str) -> Result<(), error::SystemError> {
        self.user_repo.set_last_active(identity, DateTime::<Utc>::UNIX_EPOCH).await?;
        log::info!("User {} signed out, presence reset", identity);
        Ok(())
    }

    pub async fn status(&self, identity: &str) -> Result<PresenceResponse, error::SystemError> {
        let user = self
            .user_repo
            .find_by_email(identity)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let now = self.clock.now();
        let last_active_at = effective_last_active(user.last_active_at);
        Ok(PresenceResponse {
            identity: user.email,
            online: is_online(last_active_at, now),
            last_active_at,
            label: last_seen_label([last_active_at], now),
        })
    }
}
