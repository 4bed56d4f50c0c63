use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::handshake_token;
use crate::state::AppState;
use crate::websocket::handlers::{run_connection, ClientFrame, ConnectionContext};
use crate::websocket::message_types::WsInboundEvent;
use crate::websocket::ConnectionId;

// WebSocket Actor
//
// Owns the socket only: heartbeat, frame decoding and writing outbound text.
// Decoded frames go to the connection's event loop in arrival order.
struct WsSession {
    connection_id: ConnectionId,
    user_id: Uuid,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    inbound: UnboundedSender<ClientFrame>,
    outbound: Option<UnboundedReceiver<String>>,
}

impl WsSession {
    fn new(
        connection_id: ConnectionId,
        user_id: Uuid,
        state: &AppState,
        inbound: UnboundedSender<ClientFrame>,
        outbound: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            hb: Instant::now(),
            heartbeat_interval: Duration::from_secs(state.config.ws_heartbeat_interval_secs),
            client_timeout: Duration::from_secs(state.config.ws_client_timeout_secs),
            inbound,
            outbound: Some(outbound),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(user_id = %act.user_id, connection_id = %act.connection_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn forward(&self, frame: ClientFrame, ctx: &mut ws::WebsocketContext<Self>) {
        if self.inbound.send(frame).is_err() {
            tracing::warn!(connection_id = %self.connection_id, "connection event loop gone, closing socket");
            ctx.stop();
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, connection_id = %self.connection_id, "WebSocket session started");
        self.hb(ctx);

        if let Some(outbound) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(outbound));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, connection_id = %self.connection_id, "WebSocket session stopped");
    }
}

// Outbound text produced by handlers and broadcasts
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, text: String, ctx: &mut Self::Context) {
        ctx.text(text);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(bytes)) => {
                self.hb = Instant::now();
                ctx.pong(&bytes);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                let frame = match serde_json::from_str::<WsInboundEvent>(&text) {
                    Ok(event) => ClientFrame::Event(event),
                    Err(e) => ClientFrame::Invalid(AppError::from(e)),
                };
                self.forward(frame, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.forward(
                    ClientFrame::Invalid(AppError::Validation(
                        "binary frames are not supported".into(),
                    )),
                    ctx,
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(connection_id = %self.connection_id, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

/// Upgrade to a WebSocket after authenticating the handshake.
///
/// Bad or missing tokens are answered with 401 before any upgrade happens.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let token =
        handshake_token(&req).ok_or_else(|| AppError::Authentication("token missing".into()))?;
    let user_id = state.verifier.verify(&token).map_err(|e| {
        tracing::warn!(error = %e, "WebSocket handshake rejected");
        e
    })?;

    let connection_id = ConnectionId::new();
    let (inbound_tx, inbound_rx) = unbounded_channel();
    let (outbound_tx, outbound_rx) = unbounded_channel();

    let session = WsSession::new(connection_id, user_id, &state, inbound_tx, outbound_rx);
    let response = ws::start(session, &req, stream)?;

    let ctx = ConnectionContext::new(connection_id, user_id, outbound_tx, state.get_ref().clone());
    actix_web::rt::spawn(run_connection(ctx, inbound_rx));

    Ok(response)
}
