use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hub::{Client, Frame, Hub};

pub const WS_PATH: &str = "/ws";

/// The `/ws` route for any router state that can hand out the hub.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<Hub>: FromRef<S>,
{
    Router::new().route(WS_PATH, get(ws_handler))
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Register the connection with the hub, pump hub frames to the socket and
/// drop whatever the browser sends. The client is removed as soon as either
/// direction ends.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    hub.register_client(client);

    // hub → client
    let send_id = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame.to_string())).await {
                debug!(client_id = %send_id, error = %e, "send failed");
                break;
            }
        }
    });

    // client → nowhere; only close and errors matter
    let recv_id = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(client_id = %recv_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.remove_client(&client_id);
}
