//! JSON-RPC 2.0 client for remote A2A agents.
//!
//! Every call is a single independent POST carrying its own request id; the
//! echoed id is checked so a response can never be attributed to the wrong
//! call.

use crate::a2a::error::{A2aError, Result};
use crate::a2a::types::*;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

pub const SEND_MESSAGE_METHOD: &str = "message/send";

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Call `message/send` on `service_url`.
    ///
    /// A blank or absent `credential` sends no `Authorization` header at all.
    pub async fn send_message(
        &self,
        service_url: &str,
        params: &MessageSendParams,
        credential: Option<&str>,
    ) -> Result<RemoteReply> {
        let params = serde_json::to_value(params)
            .map_err(|e| A2aError::protocol(format!("failed to encode params: {e}")))?;
        let result = self
            .call(service_url, SEND_MESSAGE_METHOD, params, credential)
            .await?;

        serde_json::from_value(result)
            .map_err(|e| A2aError::protocol(format!("unexpected result shape: {e}")))
    }

    /// Issue one JSON-RPC call and return its `result` member.
    pub async fn call(
        &self,
        service_url: &str,
        method: &str,
        params: Value,
        credential: Option<&str>,
    ) -> Result<Value> {
        let request = JsonRpcRequest::new(Uuid::new_v4().to_string(), method, params);
        tracing::debug!(url = %service_url, method, id = %request.id, "A2A: sending JSON-RPC request");

        let mut builder = self
            .http
            .post(service_url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(&request);
        if let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|source| A2aError::Transport {
            url: service_url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %service_url, status = status.as_u16(), "A2A: JSON-RPC endpoint returned error status");
            return Err(A2aError::RpcHttp {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|source| A2aError::Transport {
            url: service_url.to_string(),
            source,
        })?;
        let envelope: JsonRpcResponse = serde_json::from_slice(&body)
            .map_err(|e| A2aError::protocol(format!("malformed response: {e}")))?;

        into_result(envelope, &request.id)
    }
}

/// Validate a response envelope against the id that was sent.
fn into_result(envelope: JsonRpcResponse, sent_id: &Value) -> Result<Value> {
    match (envelope.result, envelope.error) {
        (Some(_), Some(_)) => Err(A2aError::protocol(
            "malformed response: carries both result and error",
        )),
        (None, None) => Err(A2aError::protocol("malformed response")),
        // A server that could not read the request id answers with a null id.
        (None, Some(error)) if envelope.id.is_null() || envelope.id == *sent_id => {
            tracing::warn!(code = error.code, message = %error.message, "A2A: JSON-RPC error response");
            Err(A2aError::RpcProtocol {
                code: Some(error.code),
                message: error.message,
            })
        }
        (Some(result), None) if envelope.id == *sent_id => Ok(result),
        _ => Err(A2aError::protocol(format!(
            "response id mismatch: sent {sent_id}, received {}",
            envelope.id
        ))),
    }
}
