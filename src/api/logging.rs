use crate::types::ChatRequest;
use crate::util::mask_secret;
use serde_json::Value;
use tracing::info;

/// Logs an outgoing chat payload. The API key is masked before it is written.
pub fn emit_debug_payload(request_url: &str, request: &ChatRequest) {
    let payload = redacted_payload(request);
    let formatted_payload = serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    info!(
        target: "streamchat::api",
        url = %request_url,
        "payload_request\n{formatted_payload}"
    );
}

fn redacted_payload(request: &ChatRequest) -> Value {
    let mut payload = serde_json::to_value(request).unwrap_or(Value::Null);
    if let Some(object) = payload.as_object_mut() {
        object.insert(
            "api_key".to_string(),
            Value::String(mask_secret(&request.api_key)),
        );
    }
    payload
}
