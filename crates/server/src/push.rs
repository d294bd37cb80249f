use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use serde::Serialize;
use tracing::error;

/// Writes one event as a JSON text frame. Fails only when the socket is gone.
pub(crate) async fn send_event<S, E>(sender: &mut S, event: &E) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
    E: Serialize,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(error) => {
            error!(%error, "failed to encode push event");
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await
}
