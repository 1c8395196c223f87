//! Saliency maps: rank tokens by gradient weight and color the top K.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::colormap::ColorScale;
use super::{Interpreter, Tag, TaggedToken, WeightedToken};
use crate::error::{InterpretError, Result};

/// Gradients for one instance, one vector per input field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_input_1: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_input_2: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instances {
    pub instance_1: GradInputs,
}

/// Backend answer to an interpretation request, keyed by interpreter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_gradient: Option<Instances>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_gradient: Option<Instances>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_gradient: Option<Instances>,
}

impl Interpretation {
    pub fn get(&self, interpreter: Interpreter) -> Option<&GradInputs> {
        let instances = match interpreter {
            Interpreter::SimpleGradient => self.simple_gradient.as_ref(),
            Interpreter::IntegratedGradient => self.integrated_gradient.as_ref(),
            Interpreter::SmoothGradient => self.smooth_gradient.as_ref(),
        };
        instances.map(|i| &i.instance_1)
    }

    /// Fold another response in, keeping existing interpreters it lacks.
    pub fn merge(&mut self, other: Interpretation) {
        if other.simple_gradient.is_some() {
            self.simple_gradient = other.simple_gradient;
        }
        if other.integrated_gradient.is_some() {
            self.integrated_gradient = other.integrated_gradient;
        }
        if other.smooth_gradient.is_some() {
            self.smooth_gradient = other.smooth_gradient;
        }
    }
}

fn invert(tokens: &[String], grads: &[f64], what: &'static str) -> Result<Vec<WeightedToken>> {
    if tokens.len() != grads.len() {
        return Err(InterpretError::mismatch(what, grads.len(), tokens.len()));
    }
    // The colormap runs dark-to-light, so weights are flipped before ranking.
    Ok(tokens
        .iter()
        .zip(grads)
        .map(|(token, grad)| WeightedToken {
            token: token.clone(),
            weight: 1.0 - grad,
        })
        .collect())
}

/// Pair input tokens with inverted gradients.
///
/// A lone `grad_input_1` belongs to input 1. When both are present the
/// backend lists them in reverse field order: input 1 takes `grad_input_2`
/// and input 2 takes `grad_input_1`.
pub fn token_weight_pairs(
    grads: &GradInputs,
    input1_tokens: &[String],
    input2_tokens: &[String],
) -> Result<(Vec<WeightedToken>, Vec<WeightedToken>)> {
    match (&grads.grad_input_1, &grads.grad_input_2) {
        (first, None) => {
            let input1 = match first {
                Some(g) => invert(input1_tokens, g, "grad_input_1")?,
                None => Vec::new(),
            };
            Ok((input1, Vec::new()))
        }
        (first, Some(second)) => {
            let input1 = invert(input1_tokens, second, "grad_input_2")?;
            let input2 = match first {
                Some(g) => invert(input2_tokens, g, "grad_input_1")?,
                None => Vec::new(),
            };
            Ok((input1, input2))
        }
    }
}

/// Weighted tokens for the selected interpreter, or empty when the backend
/// has not answered for it yet.
pub fn weighted_inputs(
    interpretation: Option<&Interpretation>,
    interpreter: Interpreter,
    input1_tokens: &[String],
    input2_tokens: &[String],
) -> Result<(Vec<WeightedToken>, Vec<WeightedToken>)> {
    match interpretation.and_then(|i| i.get(interpreter)) {
        Some(grads) => token_weight_pairs(grads, input1_tokens, input2_tokens),
        None => Ok((Vec::new(), Vec::new())),
    }
}

/// Indices of the `k` lowest-weight tokens.
///
/// Weights are pre-inverted, so the lowest weight is the most important
/// token. The sort is stable, so ties keep their input order; NaN sorts last.
/// `k` larger than the sequence selects everything.
pub fn select_top_k(weighted: &[WeightedToken], k: usize) -> BTreeSet<usize> {
    let mut order: Vec<usize> = (0..weighted.len()).collect();
    order.sort_by(|&a, &b| weight_order(weighted[a].weight, weighted[b].weight));
    order.into_iter().take(k).collect()
}

/// Ascending order with every NaN, whatever its sign, after all numbers.
fn weight_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Tag every token: top-K positions get their colormap shade, the rest stay
/// neutral. The tooltip carries the raw gradient.
pub fn colorize(
    weighted: &[WeightedToken],
    top_k: &BTreeSet<usize>,
    scale: &ColorScale,
) -> Vec<TaggedToken> {
    weighted
        .iter()
        .enumerate()
        .map(|(idx, wt)| {
            let tag = if top_k.contains(&idx) {
                Tag::Salient(scale.at(wt.weight))
            } else {
                Tag::Neutral
            };
            TaggedToken {
                text: wt.token.clone(),
                tag,
                tooltip: Some(format!("{:.3}", 1.0 - wt.weight)),
            }
        })
        .collect()
}

/// Value of a top-K slider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopK {
    Count(usize),
    /// The slider input was empty; the raw text is kept as-is.
    Blank(String),
}

impl TopK {
    /// Interpret a slider change event.
    ///
    /// Blank input is stored verbatim. Otherwise the leading integer is
    /// taken (negative values become 0); `None` if there is no number.
    pub fn from_slider(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return Some(TopK::Blank(raw.to_string()));
        }
        parse_leading_int(raw).map(|n| TopK::Count(n.max(0) as usize))
    }

    /// How many tokens to select; blank selects none.
    pub fn count(&self) -> usize {
        match self {
            TopK::Count(n) => *n,
            TopK::Blank(_) => 0,
        }
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopK::Count(n) => write!(f, "{}", n),
            TopK::Blank(raw) => f.write_str(raw),
        }
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Which input field a slider controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    First,
    Second,
}

/// Per-input slider values. Each input's K changes only through its own
/// slider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopKState {
    pub input1: TopK,
    pub input2: TopK,
}

impl TopKState {
    pub fn new(default_k: usize) -> Self {
        Self {
            input1: TopK::Count(default_k),
            input2: TopK::Count(default_k),
        }
    }

    pub fn get(&self, input: Input) -> &TopK {
        match input {
            Input::First => &self.input1,
            Input::Second => &self.input2,
        }
    }

    /// Apply a slider change event. Returns false if the value was rejected.
    pub fn handle_change(&mut self, input: Input, raw: &str) -> bool {
        let Some(value) = TopK::from_slider(raw) else {
            tracing::warn!("Ignoring non-numeric slider value {:?}", raw);
            return false;
        };
        match input {
            Input::First => self.input1 = value,
            Input::Second => self.input2 = value,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(weights: &[f64]) -> Vec<WeightedToken> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightedToken {
                token: format!("t{}", i),
                weight: *w,
            })
            .collect()
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_top_one_is_lowest_weight() {
        let w = weighted(&[0.9, 0.1, 0.5]);
        assert_eq!(select_top_k(&w, 1), BTreeSet::from([1]));
        assert_eq!(select_top_k(&w, 2), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_top_k_size_and_ordering() {
        let w = weighted(&[0.3, 0.7, 0.3, 0.0, 1.0, 0.55]);
        for k in 0..=w.len() + 2 {
            let selected = select_top_k(&w, k);
            assert_eq!(selected.len(), k.min(w.len()));

            let max_selected = selected.iter().map(|&i| w[i].weight).fold(f64::MIN, f64::max);
            for (i, wt) in w.iter().enumerate() {
                if !selected.contains(&i) {
                    assert!(max_selected <= wt.weight);
                }
            }
            assert_eq!(selected, select_top_k(&w, k));
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let w = weighted(&[0.5, 0.2, 0.2, 0.2]);
        assert_eq!(select_top_k(&w, 2), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_nan_sorts_last() {
        let w = weighted(&[f64::NAN, 0.8, 0.4]);
        assert_eq!(select_top_k(&w, 2), BTreeSet::from([1, 2]));

        // Sign-flipped NaN must not jump ahead of real weights
        let w = weighted(&[-f64::NAN, 0.8, f64::NAN, 0.4]);
        assert_eq!(select_top_k(&w, 2), BTreeSet::from([1, 3]));
        assert_eq!(select_top_k(&w, 3), BTreeSet::from([0, 1, 3]));
    }

    #[test]
    fn test_colorize_only_top_k() {
        let scale = ColorScale::new("copper", 20).unwrap();
        let w = weighted(&[0.9, 0.1, 0.5]);
        let top = select_top_k(&w, 1);
        let out = colorize(&w, &top, &scale);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].tag, Tag::Neutral);
        assert_eq!(out[1].tag, Tag::Salient(scale.at(0.1)));
        assert_eq!(out[2].tag, Tag::Neutral);
        assert_eq!(out[1].tooltip.as_deref(), Some("0.900"));
        assert_eq!(out[0].text, "t0");
    }

    #[test]
    fn test_single_gradient_goes_to_input_one() {
        let grads = GradInputs {
            grad_input_1: Some(vec![0.25, 0.75]),
            grad_input_2: None,
        };
        let (first, second) = token_weight_pairs(&grads, &tokens(&["good", "movie"]), &[]).unwrap();
        assert_eq!(first[0].weight, 0.75);
        assert_eq!(first[1].weight, 0.25);
        assert!(second.is_empty());
    }

    #[test]
    fn test_two_gradients_are_swapped() {
        let grads = GradInputs {
            grad_input_1: Some(vec![0.1, 0.2, 0.3]),
            grad_input_2: Some(vec![1.0, 0.0]),
        };
        let (first, second) = token_weight_pairs(
            &grads,
            &tokens(&["a", "cat"]),
            &tokens(&["an", "animal", "sits"]),
        )
        .unwrap();
        assert_eq!(first[0].weight, 0.0);
        assert_eq!(first[1].weight, 1.0);
        assert_eq!(second.len(), 3);
        assert!((second[2].weight - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_misaligned_gradients_rejected() {
        let grads = GradInputs {
            grad_input_1: Some(vec![0.1]),
            grad_input_2: None,
        };
        let err = token_weight_pairs(&grads, &tokens(&["a", "b"]), &[]).unwrap_err();
        assert!(matches!(err, InterpretError::MalformedInput { left: 1, right: 2, .. }));
    }

    #[test]
    fn test_weighted_inputs_for_missing_interpreter() {
        let interp = Interpretation {
            simple_gradient: Some(Instances {
                instance_1: GradInputs {
                    grad_input_1: Some(vec![0.5]),
                    grad_input_2: None,
                },
            }),
            ..Default::default()
        };
        let words = tokens(&["hi"]);
        let (a, _) = weighted_inputs(Some(&interp), Interpreter::SmoothGradient, &words, &[]).unwrap();
        assert!(a.is_empty());
        let (a, _) = weighted_inputs(Some(&interp), Interpreter::SimpleGradient, &words, &[]).unwrap();
        assert_eq!(a.len(), 1);
        let (a, _) = weighted_inputs(None, Interpreter::SimpleGradient, &words, &[]).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_slider_values() {
        assert_eq!(TopK::from_slider("5"), Some(TopK::Count(5)));
        assert_eq!(TopK::from_slider(" 12abc"), Some(TopK::Count(12)));
        assert_eq!(TopK::from_slider("-3"), Some(TopK::Count(0)));
        assert_eq!(TopK::from_slider("abc"), None);
        assert_eq!(TopK::from_slider(""), Some(TopK::Blank(String::new())));
        assert_eq!(TopK::from_slider("  "), Some(TopK::Blank("  ".to_string())));
        assert_eq!(TopK::Blank(String::new()).count(), 0);
    }

    #[test]
    fn test_empty_slider_stores_sentinel() {
        let mut state = TopKState::new(3);
        assert!(state.handle_change(Input::First, ""));
        assert_eq!(state.input1, TopK::Blank(String::new()));
        assert_eq!(state.input1.to_string(), "");
        assert_eq!(state.input2, TopK::Count(3));

        assert!(!state.handle_change(Input::Second, "many"));
        assert_eq!(state.input2, TopK::Count(3));
        assert!(state.handle_change(Input::Second, "7"));
        assert_eq!(state.get(Input::Second), &TopK::Count(7));
        assert_eq!(state.get(Input::First), &TopK::Blank(String::new()));
    }

    #[test]
    fn test_interpretation_response_shape() {
        let json = r#"{"integrated_gradient":{"instance_1":{"grad_input_1":[0.2,0.8]}}}"#;
        let interp: Interpretation = serde_json::from_str(json).unwrap();
        assert!(interp.get(Interpreter::SimpleGradient).is_none());
        let grads = interp.get(Interpreter::IntegratedGradient).unwrap();
        assert_eq!(grads.grad_input_1.as_deref(), Some(&[0.2, 0.8][..]));

        let mut merged = Interpretation::default();
        merged.merge(interp);
        assert!(merged.integrated_gradient.is_some());
    }
}
