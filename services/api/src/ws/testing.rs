//! In-memory transports and a scripted connector for driving the relay
//! without a network.

use super::{
    frame::{BoxTransport, Frame},
    upstream::{Handshake, UpstreamConnector},
};
use crate::error::RelayError;
use async_trait::async_trait;
use futures::{
    Sink, Stream, StreamExt,
    channel::{mpsc, oneshot},
};
use std::{
    pin::Pin,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

/// The relay's end of an in-memory socket.
pub struct ChannelTransport {
    incoming: mpsc::UnboundedReceiver<Result<Frame, RelayError>>,
    outgoing: mpsc::UnboundedSender<Frame>,
}

/// The test's end: push frames at the relay, read what it sends.
pub struct Peer {
    to_relay: mpsc::UnboundedSender<Result<Frame, RelayError>>,
    from_relay: mpsc::UnboundedReceiver<Frame>,
}

pub fn pair() -> (ChannelTransport, Peer) {
    let (to_relay, incoming) = mpsc::unbounded();
    let (outgoing, from_relay) = mpsc::unbounded();
    (
        ChannelTransport { incoming, outgoing },
        Peer { to_relay, from_relay },
    )
}

impl Stream for ChannelTransport {
    type Item = Result<Frame, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_next_unpin(cx)
    }
}

impl Sink<Frame> for ChannelTransport {
    type Error = RelayError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.outgoing
            .unbounded_send(item)
            .map_err(|e| RelayError::Transport(e.to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.outgoing.close_channel();
        Poll::Ready(Ok(()))
    }
}

impl Peer {
    pub fn push(&self, frame: Frame) {
        self.to_relay.unbounded_send(Ok(frame)).unwrap();
    }

    pub fn push_text(&self, text: &str) {
        self.push(Frame::Text(text.to_string()));
    }

    pub fn fail(&self, reason: &str) {
        self.to_relay
            .unbounded_send(Err(RelayError::Transport(reason.to_string())))
            .unwrap();
    }

    pub async fn recv(&mut self) -> Frame {
        self.from_relay.next().await.expect("relay dropped the socket")
    }

    /// Everything the relay sent until it closed its end.
    pub async fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.from_relay.next().await {
            frames.push(frame);
        }
        frames
    }
}

enum Script {
    Ready(ChannelTransport),
    Refuse(String),
    Hang,
}

/// Hands out a prepared upstream (once), optionally after a gate opens.
pub struct ScriptedConnector {
    script: Mutex<Option<Script>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    connects: AtomicUsize,
    pub last_handshake: Mutex<Option<Handshake>>,
}

impl ScriptedConnector {
    fn with(script: Script) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            gate: Mutex::new(None),
            connects: AtomicUsize::new(0),
            last_handshake: Mutex::new(None),
        }
    }

    pub fn ready(upstream: ChannelTransport) -> Self {
        Self::with(Script::Ready(upstream))
    }

    pub fn refusing(reason: &str) -> Self {
        Self::with(Script::Refuse(reason.to_string()))
    }

    pub fn hanging() -> Self {
        Self::with(Script::Hang)
    }

    /// Holds `connect` until the returned sender fires.
    pub fn gated(upstream: ChannelTransport) -> (Self, oneshot::Sender<()>) {
        let (open, gate) = oneshot::channel();
        let connector = Self::ready(upstream);
        *connector.gate.lock().unwrap() = Some(gate);
        (connector, open)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamConnector for ScriptedConnector {
    async fn connect(&self, handshake: &Handshake) -> Result<BoxTransport, RelayError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_handshake.lock().unwrap() = Some(handshake.clone());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let script = self.script.lock().unwrap().take();
        match script {
            Some(Script::Ready(upstream)) => Ok(Box::new(upstream)),
            Some(Script::Refuse(reason)) => Err(RelayError::UpstreamUnavailable(reason)),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(RelayError::UpstreamUnavailable(
                "connector used twice".to_string(),
            )),
        }
    }
}
