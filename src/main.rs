use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use std::sync::{Arc, LazyLock};

use chat_backend::{
    api::success,
    configs::{connect_database, Repositories, Services},
    constants::{self, StorageBackend},
    modules,
    utils::{SystemClock, TokenConfig},
};

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> success::Success<()> {
    success::Success::ok(None).message("Server is running")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish()).is_err() {
        log::warn!("A tracing subscriber was already installed");
    }

    let repos = match ENV.storage_backend {
        StorageBackend::Postgres => {
            let database_url = ENV.database_url.as_deref().unwrap_or_default();
            let pool = connect_database(database_url)
                .await
                .map_err(|e| std::io::Error::other(format!("Database connection error: {e}")))?;
            Repositories::postgres(pool)
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; all data is lost on restart");
            Repositories::in_memory()
        }
    };

    let services = Services::with_dependencies(
        repos,
        Arc::new(SystemClock),
        TokenConfig {
            secret: ENV.jwt_secret.clone(),
            access_token_expiration: ENV.access_token_expiration,
        },
        Services::local_disk_store(&ENV.upload_dir, &ENV.upload_base_url),
        ENV.max_upload_size,
    );

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(|cfg| services.register(cfg))
            .service(health_check)
            .configure(modules::configure)
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
