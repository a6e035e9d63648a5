mod routes;

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};

use crate::{
    configs::{Repositories, Services},
    modules::user::model::SignUpModel,
    utils::{Clock, TokenConfig},
};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "password1";

/// Clock that only moves when a test says so.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Services wired like production over a manual clock, in memory unless a pool is given.
pub struct TestHarness {
    pub services: Services,
    pub clock: Arc<ManualClock>,
    pub upload_dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_repositories(Repositories::in_memory())
    }

    pub fn with_repositories(repos: Repositories) -> Self {
        let clock = Arc::new(ManualClock::new(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let upload_dir = tempfile::tempdir().unwrap();
        let services = Services::with_dependencies(
            repos,
            clock.clone(),
            TokenConfig { secret: TEST_SECRET.to_string(), access_token_expiration: 3600 },
            Services::local_disk_store(upload_dir.path().to_str().unwrap(), "/uploads"),
            1024 * 1024,
        );
        Self { services, clock, upload_dir }
    }

    pub async fn sign_up(&self, email: &str, name: &str) {
        self.services
            .user
            .sign_up(SignUpModel {
                name: name.to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();
    }

    pub fn token_for(&self, email: &str) -> String {
        crate::utils::Claims::new(email, 3600).encode(TEST_SECRET.as_bytes()).unwrap()
    }
}
