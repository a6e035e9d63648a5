use std::time::Duration;

/// A user counts as online while their last heartbeat is younger than this.
pub const ONLINE_THRESHOLD_SECS: i64 = 120;

/// Client read-path poll period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Client heartbeat period.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Idle time after the last keystroke before the client clears its typing flag.
/// Longer than `POLL_INTERVAL` so other participants observe it at least once.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(4);
/// Upper bound for any single client call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const CALL_HISTORY_LIMIT: usize = 50;
pub const CALL_HISTORY_MAX_LIMIT: usize = 200;

pub const ATTACHMENT_MARKER: &str = "📎";
pub const ATTACHMENT_FALLBACK_CAPTION: &str = "Attachment";

pub const DEFAULT_GROUP_COLOR: &str = "#0052cc";
pub const DEFAULT_DIRECT_COLOR: &str = "#f59e0b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

pub struct Env {
    pub jwt_secret: String,
    pub access_token_expiration: u64,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub upload_dir: String,
    pub upload_base_url: String,
    pub max_upload_size: usize,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let access_token_expiration = std::env::var("ACCESS_TOKEN_EXPIRATION")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .expect("ACCESS_TOKEN_EXPIRATION must be a valid u64 integer");

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => panic!("STORAGE_BACKEND must be `postgres` or `memory`, got `{other}`"),
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set in .env file or environment variable");
        }

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let upload_base_url =
            std::env::var("UPLOAD_BASE_URL").unwrap_or_else(|_| "/uploads".to_string());
        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse::<usize>()
            .expect("MAX_UPLOAD_SIZE must be a valid usize integer");

        Env {
            jwt_secret,
            access_token_expiration,
            storage_backend,
            database_url,
            frontend_url,
            ip,
            port,
            upload_dir,
            upload_base_url,
            max_upload_size,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
