use actix_web::web;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use crate::{
    api::error,
    modules::{
        attachment::{
            service::AttachmentService,
            store::{AttachmentStore, LocalDiskStore},
        },
        call::{
            repository::CallRepository, repository_memory::CallRepositoryMemory,
            repository_pg::CallRepositoryPg, service::CallService,
        },
        conversation::{
            repository::ConversationRepository, repository_memory::ConversationRepositoryMemory,
            repository_pg::ConversationRepositoryPg, service::ConversationService,
        },
        message::{
            repository::MessageRepository, repository_pg::MessageRepositoryPg,
            service::MessageService,
        },
        presence::service::PresenceService,
        user::{
            repository::UserRepository, repository_memory::UserRepositoryMemory,
            repository_pg::UserRepositoryPg, service::UserService,
        },
    },
    utils::{Clock, TokenConfig},
};

pub async fn connect_database(database_url: &str) -> Result<PgPool, error::SystemError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database connected and migrations applied");
    Ok(pool)
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository + Send + Sync>,
    pub conversations: Arc<dyn ConversationRepository + Send + Sync>,
    pub messages: Arc<dyn MessageRepository + Send + Sync>,
    pub calls: Arc<dyn CallRepository + Send + Sync>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepositoryPg::new(pool.clone())),
            conversations: Arc::new(ConversationRepositoryPg::new(pool.clone())),
            messages: Arc::new(MessageRepositoryPg::new(pool.clone())),
            calls: Arc::new(CallRepositoryPg::new(pool)),
        }
    }

    /// Conversations and messages share one store so each conversation locks as a unit.
    pub fn in_memory() -> Self {
        let chat = Arc::new(ConversationRepositoryMemory::new());
        Self {
            users: Arc::new(UserRepositoryMemory::new()),
            conversations: chat.clone(),
            messages: chat,
            calls: Arc::new(CallRepositoryMemory::new()),
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub user: UserService,
    pub presence: PresenceService,
    pub conversation: ConversationService,
    pub message: MessageService,
    pub call: CallService,
    pub attachment: AttachmentService,
    pub tokens: TokenConfig,
}

impl Services {
    pub fn with_dependencies(
        repos: Repositories,
        clock: Arc<dyn Clock>,
        tokens: TokenConfig,
        attachment_store: Arc<dyn AttachmentStore + Send + Sync>,
        max_upload_size: usize,
    ) -> Self {
        Services {
            user: UserService::with_dependencies(repos.users.clone(), clock.clone(), tokens.clone()),
            presence: PresenceService::with_dependencies(repos.users.clone(), clock.clone()),
            conversation: ConversationService::with_dependencies(
                repos.conversations,
                repos.users.clone(),
                clock.clone(),
            ),
            message: MessageService::with_dependencies(
                repos.messages,
                repos.users.clone(),
                clock.clone(),
            ),
            call: CallService::with_dependencies(repos.calls, repos.users, clock),
            attachment: AttachmentService::with_dependencies(attachment_store, max_upload_size),
            tokens,
        }
    }

    pub fn local_disk_store(upload_dir: &str, base_url: &str) -> Arc<dyn AttachmentStore + Send + Sync> {
        Arc::new(LocalDiskStore::new(upload_dir, base_url))
    }

    /// Registers every service as actix app data, plus a path extractor config that
    /// reports malformed ids in the failure envelope.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        let path_config = web::PathConfig::default()
            .error_handler(|err, _| error::Error::bad_request(err.to_string()).into());

        cfg.app_data(path_config)
            .app_data(web::Data::new(self.user.clone()))
            .app_data(web::Data::new(self.presence.clone()))
            .app_data(web::Data::new(self.conversation.clone()))
            .app_data(web::Data::new(self.message.clone()))
            .app_data(web::Data::new(self.call.clone()))
            .app_data(web::Data::new(self.attachment.clone()))
            .app_data(web::Data::new(self.tokens.clone()));
    }
}
