// src/backend/adapter/mail_adapter.rs
// Outbound reminder mail through the relay's HTTP API.

use crate::error::LegacyError;
use candid::Nat;
use ic_cdk::api::management_canister::http_request::{
    http_request, CanisterHttpRequestArgument, HttpHeader, HttpMethod,
};
use serde::{Deserialize, Serialize};

const SEND_PATH: &str = "/v1/send";

const HTTP_OUTCALL_CYCLES: u128 = 100_000_000;
const MAX_RESPONSE_BYTES: u64 = 1024 * 4;

/// Notification delivery seam. The keeper never fails a stage transition on
/// delivery problems, but it still wants the error for logging.
#[allow(async_fn_in_trait)]
pub trait MailClient {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), LegacyError>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct MailSendRequest {
    to: String,
    subject: String,
    body: String,
}

/// Production client posting to the configured relay endpoint.
pub struct RelayMailClient {
    pub relay_url: String,
}

impl MailClient for RelayMailClient {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), LegacyError> {
        let req = MailSendRequest {
            to: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let request_body = serde_json::to_vec(&req).map_err(|e| {
            LegacyError::InternalError(format!("Failed to serialize mail request: {}", e))
        })?;

        let request_arg = CanisterHttpRequestArgument {
            url: format!("{}{}", self.relay_url, SEND_PATH),
            method: HttpMethod::POST,
            body: Some(request_body),
            max_response_bytes: Some(MAX_RESPONSE_BYTES),
            transform: None,
            headers: vec![HttpHeader {
                name: String::from("Content-Type"),
                value: String::from("application/json"),
            }],
        };

        ic_cdk::print(format!("📧 INFO: Sending reminder mail to {}", to_email));
        match http_request(request_arg, HTTP_OUTCALL_CYCLES).await {
            Ok((response,)) => {
                if response.status >= Nat::from(200u16) && response.status < Nat::from(300u16) {
                    Ok(())
                } else {
                    Err(LegacyError::InternalError(format!(
                        "Mail relay returned status {}: {}",
                        response.status,
                        String::from_utf8_lossy(&response.body)
                    )))
                }
            }
            Err((code, msg)) => {
                ic_cdk::eprintln!("🔥 ERROR: Mail outcall failed: {:?} - {}", code, msg);
                Err(LegacyError::InternalError(format!(
                    "Failed to call mail relay: {:?} - {}",
                    code, msg
                )))
            }
        }
    }
}
