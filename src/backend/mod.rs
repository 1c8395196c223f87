//! Client for the external model-serving backend.
//!
//! Requests go through `curl` on a blocking task with a timeout; the JSON
//! payload is written to its stdin.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::BackendConfig;
use crate::error::{InterpretError, Result};
use crate::interpret::hotflip::AttackResponse;
use crate::interpret::saliency::Interpretation;
use crate::interpret::Interpreter;

/// Endpoint for an interpretation request
pub fn interpret_url(base: &str, model: &str, interpreter: Interpreter) -> String {
    format!(
        "{}/interpret/{}/{}",
        base.trim_end_matches('/'),
        model,
        interpreter.id()
    )
}

/// Endpoint for an attack request
pub fn attack_url(base: &str, model: &str, attacker: &str) -> String {
    format!("{}/attack/{}/{}", base.trim_end_matches('/'), model, attacker)
}

/// Body of an attack request: the original inputs plus the field names
pub fn attack_body(request: &Value, input_field: &str, grad_field: &str) -> Value {
    json!({
        "inputs": request,
        "input_field_to_attack": input_field,
        "grad_input_field": grad_field,
    })
}

/// Ask the backend for a saliency interpretation
pub async fn interpret(
    config: &BackendConfig,
    model: &str,
    interpreter: Interpreter,
    request: &Value,
) -> Result<Interpretation> {
    let url = interpret_url(&config.url, model, interpreter);
    tracing::info!("Requesting {} interpretation from {}", interpreter.id(), url);
    post_json(&url, request, Duration::from_secs(config.timeout_secs)).await
}

/// Ask the backend to perturb `input_field` until the prediction flips
pub async fn attack(
    config: &BackendConfig,
    model: &str,
    attacker: &str,
    request: &Value,
    input_field: &str,
    grad_field: &str,
) -> Result<AttackResponse> {
    let url = attack_url(&config.url, model, attacker);
    tracing::info!("Requesting {} attack on {:?} from {}", attacker, input_field, url);
    let body = attack_body(request, input_field, grad_field);
    post_json(&url, &body, Duration::from_secs(config.timeout_secs)).await
}

async fn post_json<T: DeserializeOwned>(url: &str, body: &Value, limit: Duration) -> Result<T> {
    let payload = serde_json::to_string(body)?;
    let stdout = run_curl(url, payload, limit).await?;
    let parsed = serde_json::from_slice(&stdout)?;
    tracing::debug!("Backend answered {} bytes from {}", stdout.len(), url);
    Ok(parsed)
}

/// POST `payload` to `url` and return the response body
async fn run_curl(url: &str, payload: String, limit: Duration) -> Result<Vec<u8>> {
    let url = url.to_string();
    let max_time = limit.as_secs().max(1).to_string();

    let result = timeout(limit, tokio::task::spawn_blocking(move || {
        use std::io::Write;

        let mut child = Command::new("curl")
            .args([
                "-s",               // Silent
                "-S",               // ...but still report errors
                "-f",               // Fail on HTTP errors
                "--max-time", max_time.as_str(),
                "-H", "Content-Type: application/json",
                "--data-binary", "@-",
                url.as_str(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // curl may exit before reading its input; its stderr explains why
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                tracing::debug!("Writing request body to curl failed: {}", e);
            }
        }

        child.wait_with_output()
    }))
    .await;

    match result {
        Ok(Ok(Ok(output))) if output.status.success() => Ok(output.stdout),
        Ok(Ok(Ok(output))) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(InterpretError::Backend(stderr.trim().to_string()))
        }
        Ok(Ok(Err(e))) => Err(InterpretError::Io(e)),
        Ok(Err(e)) => Err(InterpretError::Backend(format!("Task failed: {}", e))),
        Err(_) => Err(InterpretError::Backend(format!(
            "Request timed out after {}s",
            limit.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_urls() {
        assert_eq!(
            interpret_url("http://localhost:8000/", "sst", Interpreter::SmoothGradient),
            "http://localhost:8000/interpret/sst/smooth_gradient"
        );
        assert_eq!(
            attack_url("http://localhost:8000", "snli", "hotflip"),
            "http://localhost:8000/attack/snli/hotflip"
        );
    }

    #[test]
    fn test_attack_body() {
        let request = json!({"premise": "p", "hypothesis": "h"});
        let body = attack_body(&request, "hypothesis", "grad_input_1");
        assert_eq!(body["inputs"]["hypothesis"], "h");
        assert_eq!(body["input_field_to_attack"], "hypothesis");
        assert_eq!(body["grad_input_field"], "grad_input_1");
    }

    #[tokio::test]
    async fn test_curl_error_survives_unread_body() {
        // Larger than a pipe buffer, so curl exiting early breaks the pipe
        let payload = "x".repeat(4 * 1024 * 1024);
        match run_curl("unsupported-scheme://backend", payload, Duration::from_secs(10)).await {
            Err(InterpretError::Backend(msg)) => assert!(!msg.is_empty()),
            // curl is not installed on this machine
            Err(InterpretError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            other => panic!("expected curl's own error, got {:?}", other.map(|b| b.len())),
        }
    }
}
