//! Error-isolated plugin execution.
//!
//! A plugin action must never crash the host or abort an unrelated request.
//! [`execute_plugin`] runs the action on its own tokio task and folds both
//! error returns and panics into a [`PluginOutcome`].

use std::any::Any;
use std::future::Future;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::warn;

/// Result of a plugin invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginOutcome<T> {
    Success(T),
    Failure(String),
}

impl<T> PluginOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, PluginOutcome::Success(_))
    }

    /// Error message of a failed invocation.
    pub fn error(&self) -> Option<&str> {
        match self {
            PluginOutcome::Success(_) => None,
            PluginOutcome::Failure(message) => Some(message),
        }
    }
}

/// Serialized as `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
impl<T: Serialize> Serialize for PluginOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PluginOutcome", 2)?;
        match self {
            PluginOutcome::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            PluginOutcome::Failure(error) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Run a plugin action, containing any failure.
///
/// `plugin` is only used for the diagnostic log line. The returned future
/// never panics and never returns an error.
pub async fn execute_plugin<T, F>(plugin: &str, action: F) -> PluginOutcome<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let message = match tokio::spawn(action).await {
        Ok(Ok(value)) => return PluginOutcome::Success(value),
        Ok(Err(e)) => e.to_string(),
        Err(join_error) if join_error.is_panic() => panic_message(join_error.into_panic()),
        Err(join_error) => join_error.to_string(),
    };

    warn!(plugin = %plugin, error = %message, "plugin execution failed");
    PluginOutcome::Failure(message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("plugin panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("plugin panicked: {s}")
    } else {
        "plugin panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[tokio::test]
    async fn success_carries_the_value() {
        let outcome = execute_plugin("ok", async { Ok(42) }).await;
        assert_eq!(outcome, PluginOutcome::Success(42));
    }

    #[tokio::test]
    async fn error_becomes_failure() {
        let outcome: PluginOutcome<()> = execute_plugin("broken", async { bail!("boom") }).await;
        assert_eq!(outcome, PluginOutcome::Failure("boom".to_string()));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let outcome: PluginOutcome<()> =
            execute_plugin("panicky", async { panic!("kaboom") }).await;
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn failure_does_not_affect_later_calls() {
        let first: PluginOutcome<u32> = execute_plugin("a", async { bail!("boom") }).await;
        assert!(!first.is_success());

        let same = execute_plugin("a", async { Ok(1u32) }).await;
        let other = execute_plugin("b", async { Ok(2u32) }).await;
        assert_eq!(same, PluginOutcome::Success(1));
        assert_eq!(other, PluginOutcome::Success(2));
    }

    #[test]
    fn serializes_tagged_shape() {
        let ok = serde_json::to_value(PluginOutcome::Success(serde_json::json!({"n": 1}))).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": {"n": 1}}));

        let err = serde_json::to_value(PluginOutcome::<()>::Failure("boom".into())).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "boom"}));
    }
}
