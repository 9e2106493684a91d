//! WebSocket transport for the gateway.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::Gateway;

/// Drive one client connection until either side goes away.
pub async fn serve_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let gw = Arc::clone(&gateway);
    let sink = tx.clone();
    let id = match tokio::task::spawn_blocking(move || gw.join(sink)).await {
        Ok(id) => id,
        Err(e) => {
            error!("Could not register client: {e}");
            return;
        }
    };
    info!("Client {id} connected ({} total)", gateway.hub().len());

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(text.into())).await {
                debug!("Send to client {id} failed: {e}");
                break;
            }
        }
    });

    let recv_gateway = Arc::clone(&gateway);
    let mut receive_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let gw = Arc::clone(&recv_gateway);
                    let text = text.as_str().to_owned();
                    let replies =
                        match tokio::task::spawn_blocking(move || gw.handle_message(id, &text))
                            .await
                        {
                            Ok(replies) => replies,
                            Err(e) => {
                                error!("Command handler for client {id} panicked: {e}");
                                continue;
                            }
                        };
                    for reply in replies {
                        if tx.send(reply).is_err() {
                            return;
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!("WebSocket error from client {id}: {e}");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    gateway.hub().unregister(id);
    info!("Client {id} disconnected ({} total)", gateway.hub().len());
    if gateway.hub().is_empty() {
        debug!("No clients connected");
    }
}
