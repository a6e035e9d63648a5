use actix_web::{middleware::from_fn, web};

use crate::middlewares::authentication;

pub mod user {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_memory;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod presence {
    pub mod model;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod conversation {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_memory;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod message {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_memory;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod call {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_memory;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod attachment {
    pub mod store;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod sync {
    pub mod backend;
    pub mod session;
}

/// Mounts the whole `/api` tree. Everything except sign-up/sign-in sits behind
/// bearer authentication.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api").configure(user::route::public_api_configure).service(
            web::scope("")
                .wrap(from_fn(authentication))
                .configure(user::route::configure)
                .configure(presence::route::configure)
                .configure(message::route::configure)
                .configure(conversation::route::configure)
                .configure(call::route::configure)
                .configure(attachment::route::configure),
        ),
    );
}
