//! The per-session relay between a downstream client and the Live API.
//!
//! A session starts in `Connecting`. The upstream is opened on the first
//! downstream data frame; anything the client sends while the connection is
//! being established is buffered and replayed in order. Once `Active`, frames
//! flow through unmodified in both directions except upstream `toolCall`
//! envelopes, which are answered locally with a single `toolResponse`.

use super::{
    frame::{BoxTransport, CloseReason, Frame},
    lifecycle::Session,
    upstream::{Handshake, UpstreamConnector},
};
use crate::error::RelayError;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt, future::join_all};
use gemini_realtime::{
    ClientMessage, FunctionResponse, ServerFrame, ToolGroup, ToolResponse,
    protocol::{inject_tool_declarations, inspect_server_frame},
};
use live_relay_core::{ToolCall, ToolDispatcher, ToolResult};
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{Instant, timeout, timeout_at},
};
use tracing::{Instrument, debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Deadline for answering one tool-call batch.
    pub tool_timeout: Duration,
    pub connect_timeout: Duration,
    /// Declarations to add to a `setup` that has no `tools`.
    pub inject: Option<ToolGroup>,
}

/// Why the active loop stopped.
#[derive(Debug)]
enum Teardown {
    DownstreamClosed,
    DownstreamFailed(RelayError),
    UpstreamClosed(Option<CloseReason>),
    UpstreamFailed(RelayError),
}

pub struct SessionRelay {
    session: Arc<Session>,
    handshake: Handshake,
    connector: Arc<dyn UpstreamConnector>,
    dispatcher: ToolDispatcher,
    settings: RelaySettings,
}

impl SessionRelay {
    pub fn new(
        session: Arc<Session>,
        handshake: Handshake,
        connector: Arc<dyn UpstreamConnector>,
        dispatcher: ToolDispatcher,
        settings: RelaySettings,
    ) -> Self {
        Self {
            session,
            handshake,
            connector,
            dispatcher,
            settings,
        }
    }

    /// Drives the session until either side goes away. Both sides are closed
    /// when this returns.
    pub async fn run(self, mut downstream: BoxTransport) {
        let Some(first) = self.await_first_frame(&mut downstream).await else {
            return;
        };

        let Some(mut upstream) = self.open_upstream(first, &mut downstream).await else {
            return;
        };

        let teardown = self.relay(&mut downstream, &mut upstream).await;
        let (to_downstream, to_upstream) = match teardown {
            Teardown::DownstreamClosed => {
                info!("Client closed the connection.");
                (CloseReason::normal(), CloseReason::normal())
            }
            Teardown::DownstreamFailed(e) => {
                warn!(error = %e, "Client connection failed.");
                (CloseReason::error(e.to_string()), CloseReason::normal())
            }
            Teardown::UpstreamClosed(reason) => {
                info!(?reason, "Upstream closed the connection.");
                (mirrored(reason), CloseReason::normal())
            }
            Teardown::UpstreamFailed(e) => {
                error!(error = %e, "Upstream connection failed.");
                (CloseReason::error(e.to_string()), CloseReason::normal())
            }
        };
        self.close(&mut downstream, Some(&mut upstream), to_downstream, to_upstream)
            .await;
    }

    /// Waits for the first data frame while `Connecting`. Control frames are
    /// answered by the socket layer and skipped here.
    async fn await_first_frame(&self, downstream: &mut BoxTransport) -> Option<Frame> {
        loop {
            match downstream.next().await {
                Some(Ok(frame)) if frame.is_data() => return Some(frame),
                Some(Ok(Frame::Close(_))) | None => {
                    info!("Client left before sending any data.");
                    self.close(downstream, None, CloseReason::normal(), CloseReason::normal())
                        .await;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(error = %e, "Client connection failed before any data.");
                    self.close(downstream, None, CloseReason::error(e.to_string()), CloseReason::normal())
                        .await;
                    return None;
                }
            }
        }
    }

    /// Opens the upstream, buffering further downstream data until it is
    /// ready, then replays everything in arrival order.
    async fn open_upstream(&self, first: Frame, downstream: &mut BoxTransport) -> Option<BoxTransport> {
        let mut pending = VecDeque::from([first]);
        let connect = timeout(
            self.settings.connect_timeout,
            self.connector.connect(&self.handshake),
        );
        tokio::pin!(connect);

        let mut upstream = loop {
            tokio::select! {
                result = &mut connect => {
                    let err = match result {
                        Ok(Ok(upstream)) => break upstream,
                        Ok(Err(RelayError::UpstreamUnavailable(reason))) => RelayError::UpstreamUnavailable(reason),
                        Ok(Err(e)) => RelayError::UpstreamUnavailable(e.to_string()),
                        Err(_) => RelayError::UpstreamUnavailable(format!(
                            "connection timed out after {:?}",
                            self.settings.connect_timeout
                        )),
                    };
                    error!(error = %err, "Could not open the upstream connection.");
                    self.close(downstream, None, CloseReason::error(err.to_string()), CloseReason::normal())
                        .await;
                    return None;
                }
                frame = downstream.next() => match frame {
                    Some(Ok(frame)) if frame.is_data() => pending.push_back(frame),
                    Some(Ok(Frame::Close(_))) | None => {
                        info!("Client left while the upstream was connecting.");
                        self.close(downstream, None, CloseReason::normal(), CloseReason::normal())
                            .await;
                        return None;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Client connection failed while connecting upstream.");
                        self.close(downstream, None, CloseReason::error(e.to_string()), CloseReason::normal())
                            .await;
                        return None;
                    }
                },
            }
        };

        if !self.session.mark_upstream_open() {
            warn!("Upstream opened for a session that is no longer connecting.");
        }
        info!(buffered = pending.len(), "Upstream established; session active.");

        let mut first = true;
        while let Some(frame) = pending.pop_front() {
            let frame = if first { self.prepare_setup(frame) } else { frame };
            first = false;
            if let Err(e) = upstream.send(frame).await {
                error!(error = %e, "Failed to replay buffered frames upstream.");
                self.close(
                    downstream,
                    Some(&mut upstream),
                    CloseReason::error(e.to_string()),
                    CloseReason::normal(),
                )
                .await;
                return None;
            }
        }
        Some(upstream)
    }

    async fn relay(&self, downstream: &mut BoxTransport, upstream: &mut BoxTransport) -> Teardown {
        let (result_tx, mut result_rx) = mpsc::channel::<ToolResponse>(8);

        loop {
            tokio::select! {
                frame = downstream.next() => match frame {
                    Some(Ok(Frame::Close(_))) | None => return Teardown::DownstreamClosed,
                    Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {}
                    Some(Ok(frame)) => {
                        if let Err(e) = upstream.send(frame).await {
                            return Teardown::UpstreamFailed(e);
                        }
                    }
                    Some(Err(e)) => return Teardown::DownstreamFailed(e),
                },
                frame = upstream.next() => match frame {
                    Some(Ok(Frame::Close(reason))) => return Teardown::UpstreamClosed(reason),
                    None => return Teardown::UpstreamClosed(None),
                    Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {}
                    Some(Ok(frame)) => {
                        if let Some(frame) = self.route_upstream(frame, &result_tx) {
                            if let Err(e) = downstream.send(frame).await {
                                return Teardown::DownstreamFailed(e);
                            }
                        }
                    }
                    Some(Err(e)) => return Teardown::UpstreamFailed(e),
                },
                Some(response) = result_rx.recv() => {
                    let count = response.function_responses.len();
                    self.session.batch_answered();
                    match ClientMessage::ToolResponse(response).to_json() {
                        Ok(json) => {
                            if let Err(e) = upstream.send(Frame::Text(json)).await {
                                return Teardown::UpstreamFailed(e);
                            }
                            debug!(responses = count, "Sent tool response upstream.");
                        }
                        Err(e) => error!(error = %e, "Failed to encode tool response."),
                    }
                }
            }
        }
    }

    /// Inspects an upstream data frame. Tool calls are answered locally and
    /// not forwarded; everything else is returned for the client.
    fn route_upstream(&self, frame: Frame, results: &mpsc::Sender<ToolResponse>) -> Option<Frame> {
        let inspected = match &frame {
            Frame::Text(text) => inspect_server_frame(text.as_bytes()),
            Frame::Binary(data) => inspect_server_frame(data),
            _ => return Some(frame),
        };

        match inspected {
            Ok(ServerFrame::ToolCall(call)) => {
                self.spawn_batch(call.function_calls, results.clone());
                None
            }
            Ok(ServerFrame::TurnEnded) => {
                self.session.record_turn_end();
                Some(frame)
            }
            Ok(ServerFrame::Passthrough) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Unparseable tool envelope; forwarding unmodified.");
                Some(frame)
            }
        }
    }

    fn spawn_batch(&self, calls: Vec<ToolCall>, results: mpsc::Sender<ToolResponse>) {
        if calls.is_empty() {
            debug!("Ignoring tool call envelope without function calls.");
            return;
        }
        info!(
            calls = calls.len(),
            tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Intercepted tool call batch."
        );
        self.session.batch_started();

        let dispatcher = self.dispatcher.clone();
        let limit = self.settings.tool_timeout;
        tokio::spawn(
            async move {
                let response = answer_batch(&dispatcher, calls, limit).await;
                if results.send(response).await.is_err() {
                    debug!("Session ended before the tool batch finished; results discarded.");
                }
            }
            .in_current_span(),
        );
    }

    /// Rewrites the first frame sent upstream when declaration injection is on.
    fn prepare_setup(&self, frame: Frame) -> Frame {
        let Some(group) = &self.settings.inject else {
            return frame;
        };
        match frame {
            Frame::Text(text) => match inject_tool_declarations(&text, group) {
                Some(injected) => {
                    info!("Added tool declarations to setup.");
                    Frame::Text(injected)
                }
                None => Frame::Text(text),
            },
            Frame::Binary(data) => {
                let injected = std::str::from_utf8(&data)
                    .ok()
                    .and_then(|text| inject_tool_declarations(text, group));
                match injected {
                    Some(injected) => {
                        info!("Added tool declarations to setup.");
                        Frame::Binary(Bytes::from(injected))
                    }
                    None => Frame::Binary(data),
                }
            }
            other => other,
        }
    }

    /// Closes both sides once. Later calls do nothing.
    async fn close(
        &self,
        downstream: &mut BoxTransport,
        upstream: Option<&mut BoxTransport>,
        to_downstream: CloseReason,
        to_upstream: CloseReason,
    ) {
        if !self.session.begin_close() {
            return;
        }
        if let Some(upstream) = upstream {
            let _ = upstream.send(Frame::Close(Some(to_upstream))).await;
            let _ = upstream.close().await;
        }
        let code = to_downstream.code;
        let _ = downstream.send(Frame::Close(Some(to_downstream))).await;
        let _ = downstream.close().await;
        self.session.finish_close();
        info!(code, "Session closed.");
    }
}

/// Runs every call of one envelope concurrently under a shared deadline.
/// Results come back in call order; calls still running at the deadline are
/// answered with a failure.
pub async fn answer_batch(dispatcher: &ToolDispatcher, calls: Vec<ToolCall>, limit: Duration) -> ToolResponse {
    let deadline = Instant::now() + limit;
    let pending = calls.into_iter().map(|call| async move {
        match timeout_at(deadline, dispatcher.dispatch(call.clone())).await {
            Ok(result) => {
                if !result.is_ok() {
                    debug!(tool = %call.name, call_id = %call.id, "Tool call failed.");
                }
                result
            }
            Err(_) => {
                warn!(tool = %call.name, call_id = %call.id, "Tool call timed out.");
                ToolResult::failure(&call, format!("Tool '{}' timed out after {:?}", call.name, limit))
            }
        }
    });

    let results = join_all(pending).await;
    ToolResponse {
        function_responses: results.into_iter().map(FunctionResponse::from).collect(),
    }
}

/// Upstream close codes the client may see. Codes that cannot appear on the
/// wire are replaced with an error close.
fn mirrored(reason: Option<CloseReason>) -> CloseReason {
    match reason {
        None => CloseReason::normal(),
        Some(CloseReason { code, reason }) if matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999) => {
            CloseReason { code, reason }
        }
        Some(CloseReason { reason, .. }) => CloseReason::error(reason),
    }
}
