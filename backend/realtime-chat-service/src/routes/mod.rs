pub mod conversations;
pub mod messages;
pub mod wsroute;

use actix_web::{web, HttpResponse};

/// Mount every route. Shared by the server and the HTTP tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(wsroute::ws_handler)
        .service(
            web::scope("/api/v1")
                .service(conversations::get_conversations)
                .service(conversations::create_conversation)
                .service(messages::get_messages)
                .service(messages::send_message),
        )
        .route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }));
}
