//! Shared fixtures for A2A tests: agent card documents and mock JSON-RPC
//! endpoints that echo the caller's request id.

use serde_json::{Value, json};

/// A complete, valid agent card whose serialized form round-trips exactly.
pub fn sample_card_json(service_url: &str) -> Value {
    json!({
        "kind": "agent-card",
        "name": "Test Agent",
        "url": service_url,
        "version": "1.0",
        "capabilities": {
            "streaming": false,
            "pushNotifications": false,
            "stateTransitionHistory": false
        },
        "defaultInputModes": ["text/plain"],
        "defaultOutputModes": ["text/plain"],
        "skills": [{"id": "skill1", "name": "Test Skill"}]
    })
}

fn request_id(request: &mockito::Request) -> Value {
    request
        .body()
        .ok()
        .and_then(|body| serde_json::from_slice::<Value>(body).ok())
        .and_then(|body| body.get("id").cloned())
        .unwrap_or(Value::Null)
}

/// Respond with `{"jsonrpc":"2.0","id":<echoed>,"result":result}`.
pub fn echo_result(result: Value) -> impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static {
    move |request: &mockito::Request| {
        let body = json!({"jsonrpc": "2.0", "id": request_id(request), "result": result});
        body.to_string().into_bytes()
    }
}

/// Respond with `{"jsonrpc":"2.0","id":<echoed>,"error":{code,message}}`.
pub fn echo_error(
    code: i64,
    message: &'static str,
) -> impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static {
    move |request: &mockito::Request| {
        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id(request),
            "error": {"code": code, "message": message}
        });
        body.to_string().into_bytes()
    }
}

/// Mount a valid agent card on `server` whose service URL is `{server}/a2a`.
pub async fn mount_agent_card(server: &mut mockito::ServerGuard) -> mockito::Mock {
    let card = sample_card_json(&format!("{}/a2a", server.url()));
    server
        .mock("GET", "/.well-known/agent.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(card.to_string())
        .create_async()
        .await
}
