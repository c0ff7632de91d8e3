//! The handler contract and the values flowing through the dispatcher.

use async_trait::async_trait;
use gemini_realtime::{FunctionDeclaration, FunctionResponse, FunctionResponsePayload};
use serde_json::{Map, Value, json};

/// A function call issued by the model.
pub type ToolCall = gemini_realtime::FunctionCall;

/// A local capability the model can invoke.
///
/// One handler may expose several named functions; `execute` receives the
/// name the model called. Expected domain conditions (nothing found, a
/// missing argument) are reported through the returned value, typically with
/// [`failure_output`]. `Err` is reserved for conditions the handler could not
/// anticipate, such as an unreachable backend.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn declarations(&self) -> Vec<FunctionDeclaration>;

    async fn execute(&self, name: &str, args: &Map<String, Value>) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Ok(Value),
    Err(String),
}

/// The answer to exactly one [`ToolCall`], correlated by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn ok(call: &ToolCall, output: Value) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Ok(output),
        }
    }

    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Err(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Ok(_))
    }
}

impl From<ToolResult> for FunctionResponse {
    fn from(result: ToolResult) -> Self {
        let response = match result.outcome {
            ToolOutcome::Ok(output) => FunctionResponsePayload::Output(output),
            ToolOutcome::Err(error) => FunctionResponsePayload::Error(error),
        };
        FunctionResponse {
            id: result.id,
            name: result.name,
            response,
        }
    }
}

/// Returns the first of `names` that is absent, empty, or not a string.
pub fn first_missing<'a>(args: &Map<String, Value>, names: &[&'a str]) -> Option<&'a str> {
    names.iter().copied().find(|name| {
        args.get(*name)
            .and_then(Value::as_str)
            .is_none_or(|s| s.trim().is_empty())
    })
}

/// A non-empty string argument, trimmed.
pub fn str_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The value shape handlers use for expected, non-exceptional failures.
pub fn failure_output(error: impl Into<String>, suggestion: impl Into<String>) -> Value {
    json!({
        "success": false,
        "error": error.into(),
        "suggestion": suggestion.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCall {
        ToolCall {
            id: "c7".into(),
            name: "get_location_info".into(),
            args: Map::new(),
        }
    }

    #[test]
    fn results_keep_call_identity() {
        let ok = ToolResult::ok(&call(), json!({ "name": "x" }));
        assert_eq!(ok.id, "c7");
        assert!(ok.is_ok());

        let response: FunctionResponse = ToolResult::failure(&call(), "boom").into();
        assert_eq!(response.id, "c7");
        assert_eq!(response.name, "get_location_info");
        assert_eq!(response.response, FunctionResponsePayload::Error("boom".into()));
    }

    #[test]
    fn missing_arguments_are_detected() {
        let args: Map<String, Value> = serde_json::from_value(json!({
            "query": "北京大学",
            "region": "  ",
            "radius": 5
        }))
        .unwrap();

        assert_eq!(first_missing(&args, &["query"]), None);
        assert_eq!(first_missing(&args, &["query", "region"]), Some("region"));
        assert_eq!(first_missing(&args, &["radius"]), Some("radius"));
        assert_eq!(first_missing(&args, &["origin"]), Some("origin"));
        assert_eq!(str_arg(&args, "query"), Some("北京大学"));
        assert_eq!(str_arg(&args, "region"), None);
    }
}
