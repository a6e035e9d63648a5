use actix_web::web::{scope, ServiceConfig};

use crate::modules::presence::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/presence").service(heartbeat).service(get_presence));
}
