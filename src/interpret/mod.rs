//! Interpretation data model and the pure highlighting cores.
//!
//! - [`saliency`] ranks tokens by gradient weight and colors the top K.
//! - [`hotflip`] diffs an original token sequence against its flipped version.
//! - [`colormap`] builds the discrete palettes saliency colors come from.

pub mod colormap;
pub mod hotflip;
pub mod saliency;

use serde::{Deserialize, Serialize};
use std::fmt;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB` or `#RGB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Self(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Self(r, g, b))
        } else {
            None
        }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Marker attached to a rendered token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Transparent background.
    Neutral,
    /// Position differs; this is the original token.
    Removed,
    /// Position differs; this is the replacement token.
    Added,
    /// One of the top-K salient tokens, with its colormap shade.
    Salient(Rgb),
}

/// A token together with how it should be highlighted.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedToken {
    pub text: String,
    pub tag: Tag,
    /// Hover text; saliency maps show the raw gradient here.
    pub tooltip: Option<String>,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, tag: Tag) -> Self {
        Self {
            text: text.into(),
            tag,
            tooltip: None,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.tag != Tag::Neutral
    }
}

/// A token paired with its (already inverted) saliency weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedToken {
    pub token: String,
    pub weight: f64,
}

/// Gradient-computation method used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpreter {
    #[default]
    SimpleGradient,
    IntegratedGradient,
    SmoothGradient,
}

impl Interpreter {
    pub const ALL: [Interpreter; 3] = [
        Interpreter::SimpleGradient,
        Interpreter::IntegratedGradient,
        Interpreter::SmoothGradient,
    ];

    /// Identifier used in request paths and response keys.
    pub fn id(self) -> &'static str {
        match self {
            Interpreter::SimpleGradient => "simple_gradient",
            Interpreter::IntegratedGradient => "integrated_gradient",
            Interpreter::SmoothGradient => "smooth_gradient",
        }
    }

    /// Panel title and one-line description with the method's paper.
    pub fn headers(self) -> (&'static str, &'static str) {
        match self {
            Interpreter::SimpleGradient => (
                "Simple Gradients Visualization",
                "See saliency map interpretations generated by visualizing the gradient (https://arxiv.org/abs/1312.6034).",
            ),
            Interpreter::IntegratedGradient => (
                "Integrated Gradients Visualization",
                "See saliency map interpretations generated using Integrated Gradients (https://arxiv.org/abs/1703.01365).",
            ),
            Interpreter::SmoothGradient => (
                "SmoothGrad Visualization",
                "See saliency map interpretations generated using SmoothGrad (https://arxiv.org/abs/1706.03825).",
            ),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Interpreter::SimpleGradient => Interpreter::IntegratedGradient,
            Interpreter::IntegratedGradient => Interpreter::SmoothGradient,
            Interpreter::SmoothGradient => Interpreter::SimpleGradient,
        }
    }
}

/// Demo task; decides which panels are shown and how predictions are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    #[serde(rename = "Sentiment Analysis", alias = "sentiment")]
    SentimentAnalysis,
    #[serde(rename = "Textual Entailment", alias = "textual_entailment")]
    TextualEntailment,
    #[serde(rename = "Reading Comprehension", alias = "reading_comprehension")]
    ReadingComprehension,
    #[serde(rename = "Masked Language Modeling", alias = "masked_lm")]
    MaskedLanguageModeling,
    #[serde(rename = "Named Entity Recognition", alias = "ner")]
    NamedEntityRecognition,
    #[serde(rename = "Co-reference Resolution", alias = "coref")]
    CoreferenceResolution,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::SentimentAnalysis => "Sentiment Analysis",
            Task::TextualEntailment => "Textual Entailment",
            Task::ReadingComprehension => "Reading Comprehension",
            Task::MaskedLanguageModeling => "Masked Language Modeling",
            Task::NamedEntityRecognition => "Named Entity Recognition",
            Task::CoreferenceResolution => "Co-reference Resolution",
        }
    }
}

/// How the saliency panel is laid out for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Two saliency maps, each with a slider.
    TwoInputs,
    /// One saliency map with header and interpret button.
    SingleInput,
    /// Tokens and slider only.
    Compact,
}

/// Layout for an optional task; no task renders as a single input.
pub fn layout_for(task: Option<Task>) -> Layout {
    match task {
        Some(Task::TextualEntailment) | Some(Task::ReadingComprehension) => Layout::TwoInputs,
        Some(Task::NamedEntityRecognition) | Some(Task::CoreferenceResolution) => Layout::Compact,
        Some(Task::SentimentAnalysis) | Some(Task::MaskedLanguageModeling) | None => {
            Layout::SingleInput
        }
    }
}
