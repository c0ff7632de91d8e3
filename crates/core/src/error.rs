use gemini_realtime::DeclarationError;

/// Errors raised by the tool layer.
///
/// Only `InvalidDeclaration` ever reaches an operator; the other variants are
/// folded into failed [`crate::ToolResult`]s by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid tool declaration: {0}")]
    InvalidDeclaration(#[from] DeclarationError),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// Carries the handler's own message unchanged.
    #[error("{0}")]
    HandlerFailure(String),
}
