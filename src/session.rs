//! Session files: everything the viewer needs to draw and to call the backend.
//!
//! ```json
//! {
//!   "task": "Textual Entailment",
//!   "model": "snli",
//!   "request": { "premise": "A man is sleeping.", "hypothesis": "A person rests." },
//!   "input1_tokens": ["A", "man", "is", "sleeping", "."],
//!   "input2_tokens": ["A", "person", "rests", "."],
//!   "interpreter": "simple_gradient",
//!   "input_to_attack": "hypothesis",
//!   "grad_input": "grad_input_1"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::interpret::hotflip::{AttackResponse, HOTFLIP_ATTACKER};
use crate::interpret::saliency::Interpretation;
use crate::interpret::{Interpreter, Task};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,

    /// Model name used in backend request paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Opaque request payload forwarded to the backend
    #[serde(default)]
    pub request: serde_json::Value,

    #[serde(default)]
    pub input1_tokens: Vec<String>,
    #[serde(default)]
    pub input2_tokens: Vec<String>,

    #[serde(default)]
    pub interpreter: Interpreter,

    #[serde(default = "default_attacker")]
    pub attacker: String,

    /// Request field the attacker perturbs
    #[serde(default = "default_input_to_attack")]
    pub input_to_attack: String,

    /// Gradient field that matches `input_to_attack`
    #[serde(default = "default_grad_input")]
    pub grad_input: String,

    /// Cached responses; filled in as the backend answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackResponse>,
}

fn default_attacker() -> String {
    HOTFLIP_ATTACKER.to_string()
}

fn default_input_to_attack() -> String {
    "tokens".to_string()
}

fn default_grad_input() -> String {
    "grad_input_1".to_string()
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        let session = Self::parse(&content)
            .with_context(|| format!("Failed to parse session {}", path.display()))?;
        tracing::debug!(
            "Loaded session {} ({} + {} tokens)",
            path.display(),
            session.input1_tokens.len(),
            session.input2_tokens.len()
        );
        Ok(session)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write the session back, including any cached responses
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write session {}", path.display()))?;
        Ok(())
    }

    /// Premise text shown above an entailment flip
    pub fn premise(&self) -> Option<&str> {
        self.request.get("premise").and_then(|v| v.as_str())
    }

    pub fn is_hotflip(&self) -> bool {
        self.attacker == HOTFLIP_ATTACKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_session() {
        let session = Session::parse(r#"{"input1_tokens": ["a", "fine", "film"]}"#).unwrap();
        assert_eq!(session.task, None);
        assert_eq!(session.interpreter, Interpreter::SimpleGradient);
        assert!(session.is_hotflip());
        assert_eq!(session.grad_input, "grad_input_1");
        assert!(session.interpretation.is_none());
        assert!(session.premise().is_none());
    }

    #[test]
    fn test_full_session() {
        let session = Session::parse(
            r#"{
                "task": "Textual Entailment",
                "model": "snli",
                "request": {"premise": "A man sleeps.", "hypothesis": "A person rests."},
                "input1_tokens": ["A", "man", "sleeps", "."],
                "input2_tokens": ["A", "person", "rests", "."],
                "interpreter": "integrated_gradient",
                "input_to_attack": "hypothesis",
                "attack": {"hotflip": {"original": ["A"], "final": [["The"]], "new_prediction": [0.1, 0.8, 0.1]}}
            }"#,
        )
        .unwrap();
        assert_eq!(session.task, Some(Task::TextualEntailment));
        assert_eq!(session.model.as_deref(), Some("snli"));
        assert_eq!(session.premise(), Some("A man sleeps."));
        assert_eq!(session.input_to_attack, "hypothesis");
        assert!(session.attack.as_ref().unwrap().hotflip.is_some());

        let again = Session::parse(&serde_json::to_string(&session).unwrap()).unwrap();
        assert_eq!(again.interpreter, Interpreter::IntegratedGradient);
        assert_eq!(again.attack, session.attack);
    }
}
