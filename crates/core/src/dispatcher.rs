use crate::{
    error::ToolError,
    registry::ToolRegistry,
    tool::{ToolCall, ToolResult},
};
use futures::{FutureExt, future::join_all};
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tracing::{info, warn};

/// Turns function calls into results.
///
/// Every call produces exactly one [`ToolResult`] carrying the call's id. An
/// unknown name, a handler error, or a handler panic all become failed
/// results; nothing here can end a session. No timeout is applied: the caller
/// decides how long a batch may take.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, call: ToolCall) -> ToolResult {
        let handler = match self.registry.resolve(&call.name) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, "Model called an unregistered tool.");
                return ToolResult::failure(&call, e.to_string());
            }
        };

        info!(tool = %call.name, call_id = %call.id, "Executing tool.");
        let execution = AssertUnwindSafe(handler.execute(&call.name, &call.args)).catch_unwind();
        match execution.await {
            Ok(Ok(output)) => ToolResult::ok(&call, output),
            Ok(Err(e)) => {
                let error = ToolError::HandlerFailure(format!("{e:#}"));
                warn!(tool = %call.name, call_id = %call.id, error = %error, "Tool handler failed.");
                ToolResult::failure(&call, error.to_string())
            }
            Err(panic) => {
                let error = ToolError::HandlerFailure(panic_message(panic.as_ref()));
                warn!(tool = %call.name, call_id = %call.id, error = %error, "Tool handler panicked.");
                ToolResult::failure(&call, error.to_string())
            }
        }
    }

    /// Runs all calls concurrently and returns their results in call order.
    pub async fn dispatch_batch(&self, calls: Vec<ToolCall>) -> Vec<ToolResult> {
        join_all(calls.into_iter().map(|call| self.dispatch(call))).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool handler panicked".to_string()
    }
}
