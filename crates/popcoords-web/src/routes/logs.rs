use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};

use crate::state::AppState;

/// GET /logs - Server-sent events for the next (or pending) run
///
/// The stream ends once that run has finished and its messages are drained.
/// A client that disconnects early simply drops the receiver. Server
/// shutdown ends the stream too.
pub async fn logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let hub = state.generator.logs();

    let events = stream::once(async move { hub.next_run().await.into_stream() })
        .flatten()
        .take_until(state.shutdown.cancelled_owned())
        .map(|message| Ok(Event::default().data(message.as_str())));

    Sse::new(events).keep_alive(KeepAlive::default())
}
