use crate::config::Config;
use crate::error::HandlerError;
use crate::gateway::TransferGateway;
use crate::store::RecordStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub gateway: Arc<dyn TransferGateway>,
}

/// Trigger sent by the conversation manager once a caller accepts the transfer. The manager also
/// sends its own copy of the phone number and customer info; the stored records win, so only the
/// call id is read.
#[derive(Debug, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub call_id: Option<String>,
}

impl TransferRequest {
    pub fn new(call_id: &str) -> Self {
        Self {
            call_id: Some(call_id.to_string()),
        }
    }

    /// Parse a trigger body. Accepts the event itself or a proxy envelope whose `body` holds the
    /// event, either as a JSON string or inline.
    pub fn from_event(raw: &str) -> Result<Self, HandlerError> {
        let event: Value = serde_json::from_str(raw)
            .map_err(|e| HandlerError::InvalidRequest(format!("body is not JSON: {e}")))?;
        let event = match event.get("body") {
            Some(Value::String(inner)) => serde_json::from_str(inner).map_err(|e| {
                HandlerError::InvalidRequest(format!("envelope body is not JSON: {e}"))
            })?,
            Some(inner @ Value::Object(_)) => inner.clone(),
            _ => event,
        };
        // A non-string call_id is as good as a missing one.
        let call_id = event
            .get("call_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { call_id })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub message: String,
    pub call_id: Option<String>,
    pub success: bool,
    pub transfer_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
