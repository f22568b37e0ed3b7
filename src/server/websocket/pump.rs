//! Per-session inbound and outbound pumps.
//!
//! Every session runs exactly two concurrent loops. The outbound pump owns
//! the write half of the transport and the consuming end of the session
//! queue. The inbound pump owns the read half and feeds the dispatcher.
//! When the outbound pump ends it cancels the session token, which stops
//! the inbound pump before it reads another frame.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    dispatcher::{EventContext, EventDispatcher},
    hub::Hub,
    messages::SerializedFrame,
    session::{Session, SessionId},
    transport::{FrameSink, FrameSource, InboundFrame},
};

/// Drain the session queue into the transport.
///
/// Ends on the first write error, or once the queue is closed and empty,
/// in which case a close frame is sent first. `closed` is cancelled before
/// the transport is closed.
pub async fn outbound_pump<S: FrameSink>(
    session_id: SessionId,
    mut queue: mpsc::Receiver<SerializedFrame>,
    mut sink: S,
    closed: CancellationToken,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = sink.send_text(frame.as_str()).await {
            debug!("Write to session {} failed: {}", session_id, e);
            closed.cancel();
            let _ = sink.close().await;
            return;
        }
    }
    debug!("Queue of session {} closed, closing transport", session_id);
    closed.cancel();
    if let Err(e) = sink.close().await {
        debug!("Close of session {} failed: {}", session_id, e);
    }
}

/// Read frames and dispatch them one at a time until the transport ends
/// or `closed` is cancelled.
pub async fn inbound_pump<S: FrameSource>(
    ctx: &EventContext,
    mut source: S,
    dispatcher: Arc<EventDispatcher>,
    closed: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = closed.cancelled() => {
                debug!("Session {} closed, no longer reading", ctx.session_id);
                break;
            }
            next = source.next_frame() => next,
        };
        let Some(result) = next else {
            break;
        };
        match result {
            Ok(InboundFrame::Text(text)) => {
                dispatcher.dispatch(ctx, &text).await;
            }
            Ok(InboundFrame::Other) => {
                debug!("Ignoring non-text frame from session {}", ctx.session_id);
            }
            Ok(InboundFrame::Close) => {
                debug!("Session {} sent close", ctx.session_id);
                break;
            }
            Err(e) => {
                debug!("Read from session {} failed: {}", ctx.session_id, e);
                break;
            }
        }
    }
}

/// Serve one connection for its whole lifetime.
///
/// Creates the session, starts its outbound pump, registers it with the hub
/// and runs the inbound pump on the current task. Whichever side ends first
/// tears the session down: the session is released from the hub, which
/// closes its queue, and the call returns once both pumps have finished.
pub async fn serve_session<R, W>(
    hub: Hub,
    dispatcher: Arc<EventDispatcher>,
    queue_capacity: usize,
    source: R,
    sink: W,
) where
    R: FrameSource,
    W: FrameSink + 'static,
{
    let (session, queue) = Session::new(queue_capacity);
    let session = Arc::new(session);
    let session_id = session.id().clone();
    debug!("Session {} connected", session_id);

    let closed = CancellationToken::new();
    let outbound = tokio::spawn(outbound_pump(
        session_id.clone(),
        queue,
        sink,
        closed.clone(),
    ));

    if let Err(e) = hub.register(session.clone()).await {
        warn!("Could not register session {}: {}", session_id, e);
        outbound.abort();
        return;
    }

    let ctx = EventContext::new(session_id.clone(), hub);
    inbound_pump(&ctx, source, dispatcher, closed).await;

    if let Err(e) = ctx.hub.release(&session).await {
        warn!("Failed to unregister session {}: {}", session_id, e);
    }
    let _ = outbound.await;
    debug!("Session {} disconnected", session_id);
}
