use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::time::OffsetDateTime;
use std::fmt;
use std::str::FromStr;

/// Where a call stands with respect to being handed to a live agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "completed" => Ok(TransferStatus::Completed),
            "failed" => Ok(TransferStatus::Failed),
            other => Err(format!("unknown transfer status '{other}'")),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the telephone call itself, as written by the components that own it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Initiated,
    Initializing,
    Active,
    Ended,
    Failed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Initiated => "initiated",
            CallState::Initializing => "initializing",
            CallState::Active => "active",
            CallState::Ended => "ended",
            CallState::Failed => "failed",
        }
    }
}

impl FromStr for CallState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(CallState::Initiated),
            "initializing" => Ok(CallState::Initializing),
            "active" => Ok(CallState::Active),
            "ended" => Ok(CallState::Ended),
            "failed" => Ok(CallState::Failed),
            other => Err(format!("unknown call state '{other}'")),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    pub call_id: String,
    /// Identifier the dialer knows this call by
    pub vicidial_id: Option<String>,
    pub phone_number: Option<String>,
    pub qualification_status: Option<String>,
    pub transfer_status: TransferStatus,
    pub transfer_details: Option<Value>,
    pub call_state: CallState,
    pub last_update: Option<OffsetDateTime>,
    pub end_timestamp: Option<OffsetDateTime>,
}

impl CallRecord {
    /// Fresh record in the shape the inbound webhook writes it.
    pub fn new(call_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            vicidial_id: None,
            phone_number: None,
            qualification_status: None,
            transfer_status: TransferStatus::Pending,
            transfer_details: None,
            call_state: CallState::Initiated,
            last_update: None,
            end_timestamp: None,
        }
    }

    /// The id the dialer routes on. Upstream writes an empty string when the dialer sent none.
    pub fn routing_id(&self) -> &str {
        match self.vicidial_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.call_id,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerInfo {
    pub call_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Serialized JSON object, see `DebtInfo`
    pub debt_info: String,
}

impl CustomerInfo {
    pub fn debt_info(&self) -> Result<DebtInfo, serde_json::Error> {
        if self.debt_info.trim().is_empty() {
            return Ok(DebtInfo::default());
        }
        serde_json::from_str(&self.debt_info)
    }
}

/// Financial answers collected during qualification. The conversation manager stores numbers
/// or strings depending on what the caller said, so values are kept as raw JSON.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DebtInfo {
    #[serde(default)]
    pub total_amount: Option<Value>,
    #[serde(default)]
    pub card_count: Option<Value>,
    #[serde(default)]
    pub payment_status: Option<Value>,
    #[serde(default)]
    pub employment_status: Option<Value>,
    #[serde(default)]
    pub monthly_payment: Option<Value>,
}

/// Stored answer as sent to the dialer; absent answers become "".
pub fn field_value(value: &Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(other) => other.clone(),
    }
}

/// Raw `calls` row.
#[derive(sqlx::FromRow)]
pub struct CallRow {
    pub call_id: String,
    pub vicidial_id: Option<String>,
    pub phone_number: Option<String>,
    pub qualification_status: Option<String>,
    pub transfer_status: String,
    pub transfer_details: Option<Value>,
    pub call_state: String,
    pub last_update: Option<OffsetDateTime>,
    pub end_timestamp: Option<OffsetDateTime>,
}

impl TryFrom<CallRow> for CallRecord {
    type Error = String;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        Ok(CallRecord {
            transfer_status: row.transfer_status.parse()?,
            call_state: row.call_state.parse()?,
            call_id: row.call_id,
            vicidial_id: row.vicidial_id,
            phone_number: row.phone_number,
            qualification_status: row.qualification_status,
            transfer_details: row.transfer_details,
            last_update: row.last_update,
            end_timestamp: row.end_timestamp,
        })
    }
}

/// Raw `customer_info` row.
#[derive(sqlx::FromRow)]
pub struct CustomerRow {
    pub call_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub debt_info: String,
}

impl From<CustomerRow> for CustomerInfo {
    fn from(row: CustomerRow) -> Self {
        CustomerInfo {
            call_id: row.call_id,
            first_name: row.first_name,
            last_name: row.last_name,
            debt_info: row.debt_info,
        }
    }
}
