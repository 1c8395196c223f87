//! HotFlip results: token diffs between the original and flipped input, and
//! the label of the prediction the flip produced.

use serde::{Deserialize, Serialize};

use super::{Tag, TaggedToken, Task};
use crate::error::{InterpretError, Result};

/// The only attacker with a rendering.
pub const HOTFLIP_ATTACKER: &str = "hotflip";

/// One HotFlip run as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlipResult {
    pub original: Vec<String>,
    /// Candidate flipped sequences; the first one is displayed.
    #[serde(rename = "final")]
    pub flipped: Vec<Vec<String>>,
    #[serde(default)]
    pub new_prediction: Vec<f64>,
}

/// Backend answer to an attack request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotflip: Option<FlipResult>,
}

/// Diff two equal-length sequences position by position.
///
/// Differing positions are tagged `Removed` in the original and `Added` in
/// the modified sequence; matching positions stay `Neutral` in both.
pub fn highlight(
    original: &[String],
    modified: &[String],
) -> Result<(Vec<TaggedToken>, Vec<TaggedToken>)> {
    if original.len() != modified.len() {
        return Err(InterpretError::mismatch(
            "flipped sequence",
            modified.len(),
            original.len(),
        ));
    }

    Ok(original
        .iter()
        .zip(modified)
        .map(|(before, after)| {
            if before != after {
                (
                    TaggedToken::new(before.as_str(), Tag::Removed),
                    TaggedToken::new(after.as_str(), Tag::Added),
                )
            } else {
                (
                    TaggedToken::new(before.as_str(), Tag::Neutral),
                    TaggedToken::new(after.as_str(), Tag::Neutral),
                )
            }
        })
        .unzip())
}

impl FlipResult {
    /// Highlighted original and first flipped sequence.
    pub fn highlighted(&self) -> Result<(Vec<TaggedToken>, Vec<TaggedToken>)> {
        let flipped = self.flipped.first().map(Vec::as_slice).unwrap_or(&[]);
        highlight(&self.original, flipped)
    }

    /// Label of the new prediction for tasks that have one.
    pub fn prediction_label(&self, task: Option<Task>) -> Option<&'static str> {
        prediction_label(task, &self.new_prediction)
    }
}

/// Label for a class-score vector.
///
/// Sentiment scores are `[positive, negative]`; entailment scores are
/// `[entailment, contradiction, neutral]`. Other tasks have no label.
pub fn prediction_label(task: Option<Task>, scores: &[f64]) -> Option<&'static str> {
    match (task?, scores) {
        (Task::SentimentAnalysis, [pos, neg, ..]) => {
            Some(if pos > neg { "Positive" } else { "Negative" })
        }
        (Task::TextualEntailment, [entail, contr, neutral, ..]) => Some(if entail > contr {
            if entail > neutral {
                "Entailment"
            } else {
                "Neutral"
            }
        } else if contr > neutral {
            "Contradiction"
        } else {
            "Neutral"
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_changed_position() {
        let (orig, new) = highlight(&tokens(&["a", "b", "c"]), &tokens(&["a", "x", "c"])).unwrap();
        assert_eq!(orig.len(), 3);
        assert_eq!(new.len(), 3);
        assert_eq!(orig[0].tag, Tag::Neutral);
        assert_eq!(orig[1].tag, Tag::Removed);
        assert_eq!(new[1].tag, Tag::Added);
        assert_eq!(new[1].text, "x");
        assert_eq!(orig[2].tag, Tag::Neutral);
        assert_eq!(new[2].tag, Tag::Neutral);
    }

    #[test]
    fn test_changed_iff_different() {
        let a = tokens(&["the", "movie", "was", "great", "!"]);
        let b = tokens(&["the", "film", "was", "awful", "!"]);
        let (orig, new) = highlight(&a, &b).unwrap();
        for i in 0..a.len() {
            assert_eq!(orig[i].is_highlighted(), a[i] != b[i]);
            assert_eq!(new[i].is_highlighted(), a[i] != b[i]);
            assert_eq!(orig[i].text, a[i]);
            assert_eq!(new[i].text, b[i]);
        }
    }

    #[test]
    fn test_unequal_lengths_rejected() {
        let err = highlight(&tokens(&["a", "b"]), &tokens(&["a"])).unwrap_err();
        assert!(matches!(err, InterpretError::MalformedInput { left: 1, right: 2, .. }));
        assert!(highlight(&[], &[]).unwrap().0.is_empty());
    }

    #[test]
    fn test_sentiment_label() {
        let task = Some(Task::SentimentAnalysis);
        assert_eq!(prediction_label(task, &[0.8, 0.2]), Some("Positive"));
        assert_eq!(prediction_label(task, &[0.2, 0.8]), Some("Negative"));
        assert_eq!(prediction_label(task, &[0.5, 0.5]), Some("Negative"));
        assert_eq!(prediction_label(task, &[0.5]), None);
    }

    #[test]
    fn test_entailment_label() {
        let task = Some(Task::TextualEntailment);
        assert_eq!(prediction_label(task, &[0.7, 0.2, 0.1]), Some("Entailment"));
        assert_eq!(prediction_label(task, &[0.4, 0.1, 0.5]), Some("Neutral"));
        assert_eq!(prediction_label(task, &[0.1, 0.6, 0.3]), Some("Contradiction"));
        assert_eq!(prediction_label(task, &[0.1, 0.3, 0.6]), Some("Neutral"));
        assert_eq!(prediction_label(Some(Task::NamedEntityRecognition), &[1.0, 0.0]), None);
        assert_eq!(prediction_label(None, &[1.0, 0.0]), None);
    }

    #[test]
    fn test_attack_response_shape() {
        let json = r#"{"hotflip":{"original":["a","good","film"],"final":[["a","bad","film"]],"new_prediction":[0.1,0.9]}}"#;
        let resp: AttackResponse = serde_json::from_str(json).unwrap();
        let flip = resp.hotflip.unwrap();
        let (orig, new) = flip.highlighted().unwrap();
        assert_eq!(orig[1].tag, Tag::Removed);
        assert_eq!(new[1].text, "bad");
        assert_eq!(flip.prediction_label(Some(Task::SentimentAnalysis)), Some("Negative"));
    }
}
