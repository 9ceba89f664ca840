use crate::config::GatewayConfig;
use crate::vicidial_types::{TransferForm, TransferOutcome, TransferReply};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const INVALID_RESPONSE: &str = "Invalid response from transfer gateway";

/// The external call-routing API.
#[async_trait]
pub trait TransferGateway: Send + Sync {
    /// Ask the dialer to move the call. Never fails: network errors, error statuses and
    /// unreadable replies all come back as an unsuccessful outcome.
    async fn transfer(&self, form: &TransferForm) -> TransferOutcome;
}

pub struct VicidialGateway {
    http_client: reqwest::Client,
    api_url: String,
}

impl VicidialGateway {
    pub fn new(http_client: reqwest::Client, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.to_string(),
        }
    }

    /// Client with the configured request timeout; there is no other timeout on a transfer.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::new(http_client, &config.api_url))
    }
}

#[async_trait]
impl TransferGateway for VicidialGateway {
    async fn transfer(&self, form: &TransferForm) -> TransferOutcome {
        let body = match serde_urlencoded::to_string(form) {
            Ok(body) => body,
            Err(e) => return error_outcome(None, &format!("failed to encode transfer form: {e}")),
        };
        debug!(form = ?form, "posting transfer to dialer");
        let res = self
            .http_client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await;
        let res = match res {
            Ok(res) => res,
            Err(e) => {
                warn!(error = %e, "transfer request did not complete");
                return error_outcome(None, &e.to_string());
            }
        };
        let status = res.status();
        match res.text().await {
            Ok(text) => interpret_reply(status, &text),
            Err(e) => {
                warn!(error = %e, "failed to read transfer response body");
                error_outcome(Some(status.as_u16()), &e.to_string())
            }
        }
    }
}

/// Success requires both a 200 and `"result": "success"`.
pub fn interpret_reply(status: StatusCode, body: &str) -> TransferOutcome {
    let details: Value = match serde_json::from_str(body) {
        Ok(details) => details,
        Err(_) => {
            return TransferOutcome {
                success: false,
                status_code: Some(status.as_u16()),
                details: json!({
                    "result": "error",
                    "message": INVALID_RESPONSE,
                    "status_code": status.as_u16(),
                    "raw_response": body,
                }),
                error_message: Some(INVALID_RESPONSE.to_string()),
            }
        }
    };
    // Only an object carries `result`; serde would also read a struct out of an array.
    let reply: Option<TransferReply> = if details.is_object() {
        serde_json::from_value(details.clone()).ok()
    } else {
        None
    };
    let success = status == StatusCode::OK && reply.as_ref().map_or(false, TransferReply::is_success);
    let error_message = if success {
        None
    } else {
        Some(
            reply
                .as_ref()
                .and_then(TransferReply::message)
                .unwrap_or(UNKNOWN_ERROR)
                .to_string(),
        )
    };
    TransferOutcome {
        success,
        status_code: Some(status.as_u16()),
        details,
        error_message,
    }
}

fn error_outcome(status_code: Option<u16>, message: &str) -> TransferOutcome {
    TransferOutcome {
        success: false,
        status_code,
        details: json!({ "result": "error", "message": message }),
        error_message: Some(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vicidial_types::TRANSFER_FUNCTION;
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn form() -> TransferForm {
        TransferForm {
            user: "api_user".to_string(),
            pass: "s3cret".to_string(),
            function: TRANSFER_FUNCTION.to_string(),
            call_id: "V3011502".to_string(),
            phone_number: "+14155550100".to_string(),
            ingroup: "AGENTDIRECT".to_string(),
            customer_data: r#"{"first_name":"Dana"}"#.to_string(),
        }
    }

    async fn gateway_for(server: &MockServer) -> VicidialGateway {
        let config = GatewayConfig {
            api_url: format!("{}/vicidial/non_agent_api.php", server.uri()),
            timeout: Duration::from_secs(2),
            ..Default::default()
        };
        VicidialGateway::from_config(&config).unwrap()
    }

    #[test]
    fn success_needs_ok_status_and_success_result() {
        let outcome = interpret_reply(StatusCode::OK, r#"{"result": "success", "call_id": "V1"}"#);
        assert!(outcome.success);
        assert_eq!(outcome.error_message, None);
        assert_eq!(outcome.details["call_id"], "V1");

        let outcome = interpret_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"result": "success"}"#,
        );
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(500));
        assert_eq!(outcome.error_message.as_deref(), Some(UNKNOWN_ERROR));
    }

    #[test]
    fn gateway_message_is_preferred() {
        let outcome = interpret_reply(
            StatusCode::OK,
            r#"{"result": "error", "message": "NO AGENTS AVAILABLE"}"#,
        );
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("NO AGENTS AVAILABLE"));
        assert_eq!(outcome.details["message"], "NO AGENTS AVAILABLE");
    }

    #[test]
    fn unparseable_body_is_a_failure() {
        let outcome = interpret_reply(StatusCode::OK, "ERROR: invalid user");
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some(INVALID_RESPONSE));
        assert_eq!(outcome.details["raw_response"], "ERROR: invalid user");
        assert_eq!(outcome.details["status_code"], 200);

        let outcome = interpret_reply(StatusCode::OK, r#"["success"]"#);
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some(UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn posts_form_encoded_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vicidial/non_agent_api.php"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("function=transfer_call"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"success"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway_for(&server).await.transfer(&form()).await;
        assert!(outcome.success);
        assert_eq!(outcome.status_code, Some(200));

        let requests = server.received_requests().await.unwrap();
        let sent: HashMap<String, String> = serde_urlencoded::from_bytes(&requests[0].body).unwrap();
        assert_eq!(sent["user"], "api_user");
        assert_eq!(sent["pass"], "s3cret");
        assert_eq!(sent["call_id"], "V3011502");
        assert_eq!(sent["phone_number"], "+14155550100");
        assert_eq!(sent["ingroup"], "AGENTDIRECT");
        assert_eq!(sent["customer_data"], r#"{"first_name":"Dana"}"#);
    }

    #[tokio::test]
    async fn error_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string(r#"{"result":"error","message":"busy"}"#),
            )
            .mount(&server)
            .await;

        let outcome = gateway_for(&server).await.transfer(&form()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(503));
        assert_eq!(outcome.error_message.as_deref(), Some("busy"));
    }

    #[tokio::test]
    async fn connection_refused_is_a_failure() {
        // Grab a free port and close it again so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = GatewayConfig {
            api_url: format!("http://{addr}/vicidial/non_agent_api.php"),
            timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let gateway = VicidialGateway::from_config(&config).unwrap();

        let outcome = gateway.transfer(&form()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, None);
        assert_eq!(outcome.details["result"], "error");
        assert!(outcome.error_message.is_some());
    }
}
