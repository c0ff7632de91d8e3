//! Wire types and client plumbing for the Gemini Live `BidiGenerateContent`
//! WebSocket protocol.
//!
//! - `declaration`: function declarations advertised to the model and the
//!   identifier rule their names must follow.
//! - `protocol`: the JSON envelopes the relay inspects or constructs.
//! - `client`: opening the upstream WebSocket.

pub mod client;
pub mod declaration;
pub mod protocol;

pub use declaration::{DeclarationError, FunctionDeclaration, PropertySchema, Schema, SchemaType, ToolGroup};
pub use protocol::{
    ClientMessage, FunctionCall, FunctionResponse, FunctionResponsePayload, ProtocolError,
    ServerFrame, ToolCall, ToolResponse,
};
