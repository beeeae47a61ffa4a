//! Server-Sent Events subscription endpoint.
//!
//! Each subscriber gets its own [`ObserverHandle`]; the stream owns the
//! handle, so a client disconnect drops it and unregisters the observer.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;

use crate::api::AppState;

/// GET /api/events/sse
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = state.fanout.register();
    log::info!("[SSE] Subscriber attached: {}", handle.id());

    let stream = futures::stream::unfold(handle, |mut handle| async move {
        let event = handle.recv().await?;
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("[SSE] Failed to serialize event: {}", err);
                return None;
            }
        };
        Some((Ok(Event::default().data(payload)), handle))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
