use crate::config::GatewayConfig;
use crate::db_types::{field_value, CallRecord, CallState, CustomerInfo, TransferStatus};
use crate::error::{AppError, HandlerError};
use crate::store::StoreError;
use crate::types::{AppState, TransferRequest, TransferResponse};
use crate::vicidial_types::{CustomerData, TransferForm, TransferOutcome, TRANSFER_FUNCTION};

use sqlx::types::time::OffsetDateTime;
use tracing::{info, warn};

pub const TRANSFER_OK_MESSAGE: &str = "Call transferred to agent";
pub const TRANSFER_FAILED_MESSAGE: &str = "Call transfer failed";

/// Run one transfer attempt: read both records, ask the dialer to move the call, record the
/// outcome. A dialer failure is still a handled invocation; only bad input and store problems
/// come back as errors.
pub async fn handle_transfer(
    app_state: &AppState,
    request: TransferRequest,
) -> Result<TransferResponse, AppError> {
    let call_id = match request.call_id {
        Some(call_id) if !call_id.is_empty() => call_id,
        _ => {
            return Err(AppError::new(
                None,
                HandlerError::InvalidRequest("call_id is required".to_string()),
            ))
        }
    };
    info!(call_id = %call_id, "processing transfer request");
    let fail = |error: HandlerError| AppError::new(Some(call_id.clone()), error);

    let call = app_state
        .store
        .get_call(&call_id)
        .await
        .map_err(|e| fail(read_error(e)))?;
    let customer = app_state
        .store
        .get_customer_info(&call_id)
        .await
        .map_err(|e| fail(read_error(e)))?;

    let form = build_transfer_form(&app_state.config.gateway, &call, &customer).map_err(&fail)?;
    let outcome = app_state.gateway.transfer(&form).await;
    if outcome.success {
        info!(call_id = %call_id, routing_id = %form.call_id, "transfer accepted by dialer");
    } else {
        warn!(
            call_id = %call_id,
            status = ?outcome.status_code,
            error = outcome.error_message.as_deref().unwrap_or_default(),
            "transfer rejected by dialer"
        );
    }

    let call = apply_outcome(call, &outcome, OffsetDateTime::now_utc());
    app_state
        .store
        .update_call(&call)
        .await
        .map_err(|e| fail(HandlerError::StoreWrite(e)))?;
    info!(
        call_id = %call_id,
        transfer_status = %call.transfer_status,
        call_state = %call.call_state,
        "transfer outcome recorded"
    );

    let message = if outcome.success {
        TRANSFER_OK_MESSAGE.to_string()
    } else {
        format!(
            "{TRANSFER_FAILED_MESSAGE}: {}",
            outcome.error_message.as_deref().unwrap_or_default()
        )
    };
    Ok(TransferResponse {
        message,
        call_id: Some(call_id),
        success: outcome.success,
        transfer_details: Some(outcome.details),
        status: None,
    })
}

fn read_error(e: StoreError) -> HandlerError {
    match e {
        StoreError::Malformed(detail) => HandlerError::Unexpected(detail),
        other => HandlerError::StoreRead(other),
    }
}

/// Assemble the dialer form from the stored records.
pub fn build_transfer_form(
    config: &GatewayConfig,
    call: &CallRecord,
    customer: &CustomerInfo,
) -> Result<TransferForm, HandlerError> {
    let debt = customer.debt_info().map_err(|e| {
        HandlerError::Unexpected(format!(
            "debt_info for call_id {} is not valid JSON: {e}",
            customer.call_id
        ))
    })?;
    let customer_data = CustomerData {
        first_name: customer.first_name.clone().unwrap_or_default(),
        last_name: customer.last_name.clone().unwrap_or_default(),
        debt_amount: field_value(&debt.total_amount),
        card_count: field_value(&debt.card_count),
        payment_status: field_value(&debt.payment_status),
        employment_status: field_value(&debt.employment_status),
        monthly_payment: field_value(&debt.monthly_payment),
        qualification_status: call.qualification_status.clone().unwrap_or_default(),
    };
    let customer_data = serde_json::to_string(&customer_data)
        .map_err(|e| HandlerError::Unexpected(format!("failed to encode customer data: {e}")))?;

    Ok(TransferForm {
        user: config.api_user.clone(),
        pass: config.api_pass.clone(),
        function: TRANSFER_FUNCTION.to_string(),
        call_id: call.routing_id().to_string(),
        phone_number: call.phone_number.clone().unwrap_or_default(),
        ingroup: config.agent_group.clone(),
        customer_data,
    })
}

/// Record the dialer's answer on the call. On success the call stays as it is, since whoever
/// picks up the call owns it from here; on failure the call is over.
pub fn apply_outcome(
    mut call: CallRecord,
    outcome: &TransferOutcome,
    now: OffsetDateTime,
) -> CallRecord {
    call.transfer_details = Some(outcome.details.clone());
    call.last_update = Some(now);
    if outcome.success {
        call.transfer_status = TransferStatus::Completed;
    } else {
        call.transfer_status = TransferStatus::Failed;
        call.call_state = CallState::Ended;
        call.end_timestamp = Some(now);
    }
    call
}
