use actix_web::web::{scope, ServiceConfig};

use crate::modules::call::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/calls").service(get_peer_endpoint).service(log_call).service(get_history),
    );
}
