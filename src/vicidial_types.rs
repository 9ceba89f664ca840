use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function selector for the dialer's non-agent API.
pub const TRANSFER_FUNCTION: &str = "transfer_call";

/// Form posted to the dialer to move a call into an agent in-group.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct TransferForm {
    pub user: String,
    pub pass: String,
    pub function: String,
    /// Routing id of the live call
    pub call_id: String,
    pub phone_number: String,
    pub ingroup: String,
    /// `CustomerData` as a JSON string
    pub customer_data: String,
}

impl std::fmt::Debug for TransferForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferForm")
            .field("user", &self.user)
            .field("function", &self.function)
            .field("call_id", &self.call_id)
            .field("phone_number", &self.phone_number)
            .field("ingroup", &self.ingroup)
            .field("customer_data", &self.customer_data)
            .finish_non_exhaustive()
    }
}

/// What the agent sees on screen when the call lands. Financial answers keep the JSON type
/// they were stored with.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerData {
    pub first_name: String,
    pub last_name: String,
    pub debt_amount: Value,
    pub card_count: Value,
    pub payment_status: Value,
    pub employment_status: Value,
    pub monthly_payment: Value,
    pub qualification_status: String,
}

/// The dialer's JSON reply. Only `result` and `message` are interpreted; the whole body is kept
/// as transfer details.
#[derive(Debug, Deserialize)]
pub struct TransferReply {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl TransferReply {
    pub fn is_success(&self) -> bool {
        self.result.as_deref() == Some("success")
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().and_then(Value::as_str)
    }
}

/// Result of one transfer attempt. Failures are data, never errors.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub details: Value,
    pub error_message: Option<String>,
}
