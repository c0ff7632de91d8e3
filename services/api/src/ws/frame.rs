//! Transport-neutral WebSocket frames.
//!
//! The downstream side speaks axum's WebSocket types and the upstream side
//! speaks tungstenite's. The relay only ever sees [`Frame`], through any
//! [`FrameTransport`].

use crate::error::RelayError;
use axum::extract::ws::{CloseFrame as AxumCloseFrame, Message as AxumMessage};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::{
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_tungstenite::tungstenite::{
    Message as WsMessage,
    protocol::{CloseFrame as WsCloseFrame, frame::coding::CloseCode},
};

pub const NORMAL_CLOSURE: u16 = 1000;
pub const INTERNAL_ERROR: u16 = 1011;

/// Close reasons must fit in a control frame alongside the 2-byte code.
const MAX_CLOSE_REASON_BYTES: usize = 123;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn normal() -> Self {
        Self {
            code: NORMAL_CLOSURE,
            reason: String::new(),
        }
    }

    pub fn error(reason: impl AsRef<str>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            reason: truncate_reason(reason.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<CloseReason>),
}

impl Frame {
    /// Text and binary frames carry session traffic; the rest is control.
    pub fn is_data(&self) -> bool {
        matches!(self, Frame::Text(_) | Frame::Binary(_))
    }
}

/// Cuts `reason` to the close-frame limit on a character boundary.
pub fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason.to_string();
    }
    let mut end = MAX_CLOSE_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

// --- axum (downstream) ---

impl From<AxumMessage> for Frame {
    fn from(message: AxumMessage) -> Self {
        match message {
            AxumMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
            AxumMessage::Binary(data) => Frame::Binary(data),
            AxumMessage::Ping(data) => Frame::Ping(data),
            AxumMessage::Pong(data) => Frame::Pong(data),
            AxumMessage::Close(close) => Frame::Close(close.map(|c| CloseReason {
                code: c.code,
                reason: c.reason.as_str().to_owned(),
            })),
        }
    }
}

impl From<Frame> for AxumMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => AxumMessage::Text(text.into()),
            Frame::Binary(data) => AxumMessage::Binary(data),
            Frame::Ping(data) => AxumMessage::Ping(data),
            Frame::Pong(data) => AxumMessage::Pong(data),
            Frame::Close(close) => AxumMessage::Close(close.map(|c| AxumCloseFrame {
                code: c.code,
                reason: c.reason.into(),
            })),
        }
    }
}

// --- tungstenite (upstream) ---

impl From<WsMessage> for Frame {
    fn from(message: WsMessage) -> Self {
        match message {
            WsMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
            WsMessage::Binary(data) => Frame::Binary(data),
            WsMessage::Ping(data) => Frame::Ping(data),
            WsMessage::Pong(data) => Frame::Pong(data),
            WsMessage::Close(close) => Frame::Close(close.map(|c| CloseReason {
                code: c.code.into(),
                reason: c.reason.as_str().to_owned(),
            })),
            raw @ WsMessage::Frame(_) => Frame::Binary(raw.into_data()),
        }
    }
}

impl From<Frame> for WsMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => WsMessage::Text(text.into()),
            Frame::Binary(data) => WsMessage::Binary(data),
            Frame::Ping(data) => WsMessage::Ping(data),
            Frame::Pong(data) => WsMessage::Pong(data),
            Frame::Close(close) => WsMessage::Close(close.map(|c| WsCloseFrame {
                code: CloseCode::from(c.code),
                reason: c.reason.into(),
            })),
        }
    }
}

/// Anything the relay can read frames from and write frames to.
pub trait FrameTransport:
    Stream<Item = Result<Frame, RelayError>> + Sink<Frame, Error = RelayError> + Send + Unpin
{
}

impl<T> FrameTransport for T where
    T: Stream<Item = Result<Frame, RelayError>> + Sink<Frame, Error = RelayError> + Send + Unpin
{
}

pub type BoxTransport = Box<dyn FrameTransport>;

/// Adapts a message-level socket (axum or tungstenite) to [`FrameTransport`].
pub struct Framed<S, M> {
    inner: S,
    _message: PhantomData<fn(M) -> M>,
}

impl<S, M> Framed<S, M> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            _message: PhantomData,
        }
    }
}

impl<S, M, E> Stream for Framed<S, M>
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: Into<Frame>,
    E: Into<RelayError>,
{
    type Item = Result<Frame, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner
            .poll_next_unpin(cx)
            .map(|item| item.map(|r| r.map(Into::into).map_err(Into::into)))
    }
}

impl<S, M, E> Sink<Frame> for Framed<S, M>
where
    S: Sink<M, Error = E> + Unpin,
    Frame: Into<M>,
    E: Into<RelayError>,
{
    type Error = RelayError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready_unpin(cx).map_err(Into::into)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.inner.start_send_unpin(item.into()).map_err(Into::into)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_flush_unpin(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_close_unpin(cx).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_binary_survive_both_conversions() {
        let text = Frame::Text(r#"{"serverContent":{"turnComplete":true}}"#.to_string());
        let binary = Frame::Binary(Bytes::from_static(&[0, 1, 2, 255]));

        for frame in [text, binary] {
            let via_axum: Frame = AxumMessage::from(frame.clone()).into();
            let via_ws: Frame = WsMessage::from(frame.clone()).into();
            assert_eq!(via_axum, frame);
            assert_eq!(via_ws, frame);
        }
    }

    #[test]
    fn close_codes_are_preserved() {
        let close = Frame::Close(Some(CloseReason {
            code: 1007,
            reason: "API key not valid".to_string(),
        }));
        let via_ws: Frame = WsMessage::from(close.clone()).into();
        assert_eq!(via_ws, close);
    }

    #[test]
    fn long_reasons_are_truncated_on_char_boundary() {
        let reason = "上游不可用".repeat(20);
        let close = CloseReason::error(&reason);
        assert_eq!(close.code, INTERNAL_ERROR);
        assert!(close.reason.len() <= 123);
        assert!(reason.starts_with(&close.reason));
        assert_eq!(truncate_reason("short"), "short");
    }
}
