use actix_web::web::{scope, ServiceConfig};

use crate::modules::message::handle::*;

/// Must be registered before the `/conversations` scope.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations/{conversation_id}/messages")
            .service(get_messages)
            .service(send_message)
            .service(delete_message)
            .service(add_reaction)
            .service(remove_reaction),
    );
}
