//! Model gate — rejects requests for models the operator disabled.
//!
//! Inspecting the model means buffering the whole body, so the gate only
//! runs when `custom_models` is configured. Anything short of an explicit
//! "unavailable" entry lets the request through.

use axum::body::{Body, Bytes};
use keygate_config::ModelTable;
use serde_json::Value;

/// Largest request body buffered in memory, for the model gate and the
/// Copilot retry.
pub const MAX_GATED_BODY: usize = 32 * 1024 * 1024;

/// Result of [`ModelGate::check`].
#[derive(Debug)]
pub enum GateOutcome {
    /// Forward the request with this buffered body in place of the original.
    Allow(Bytes),
    /// The named model is disabled.
    Deny(String),
}

pub struct ModelGate<'a> {
    table: &'a ModelTable,
    limit: usize,
}

impl<'a> ModelGate<'a> {
    #[must_use]
    pub fn new(table: &'a ModelTable) -> Self {
        Self {
            table,
            limit: MAX_GATED_BODY,
        }
    }

    #[cfg(test)]
    fn with_limit(table: &'a ModelTable, limit: usize) -> Self {
        Self { table, limit }
    }

    /// Buffers `body` once, up to [`MAX_GATED_BODY`], and checks its
    /// `model` field.
    ///
    /// A body that cannot be read, or that exceeds the limit, is logged and
    /// replaced by an empty body. The request is still forwarded and the
    /// upstream rejects it on its own terms.
    pub async fn check(&self, body: Body) -> GateOutcome {
        let bytes = match axum::body::to_bytes(body, self.limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "model gate could not read request body");
                return GateOutcome::Allow(Bytes::new());
            }
        };
        match self.disabled_model(&bytes) {
            Some(model) => GateOutcome::Deny(model),
            None => GateOutcome::Allow(bytes),
        }
    }

    /// Returns the model name if the body asks for a disabled model.
    #[must_use]
    pub fn disabled_model(&self, body: &[u8]) -> Option<String> {
        let json: Value = match serde_json::from_slice(body) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "model gate skipped: body is not JSON");
                return None;
            }
        };
        let model = json.get("model").and_then(Value::as_str)?;
        if self.table.is_disabled(model) {
            tracing::info!(model, "request for disabled model refused");
            Some(model.to_string())
        } else {
            None
        }
    }
}
