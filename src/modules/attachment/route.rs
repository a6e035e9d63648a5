use actix_web::web::{scope, ServiceConfig};

use crate::modules::attachment::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/attachments").service(upload_attachment));
}
