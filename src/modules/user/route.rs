use crate::middlewares::authentication;
use crate::modules::user::handle::*;
use actix_web::middleware::from_fn;
use actix_web::web::{scope, ServiceConfig};

/// `/auth` is mounted outside the authenticated scope, so sign-out carries its own guard.
pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/auth")
            .service(sign_up)
            .service(sign_in)
            .service(scope("").wrap(from_fn(authentication)).service(sign_out)),
    );
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/users").service(get_profile).service(update_profile));
}
