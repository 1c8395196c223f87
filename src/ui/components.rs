//! Reusable UI pieces: colorized token runs, the top-K slider, and buttons.

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::interpret::saliency::TopK;
use crate::interpret::TaggedToken;
use crate::theme::Theme;

/// Width of the slider track in cells
const SLIDER_WIDTH: usize = 24;

/// One span per token, highlighted tokens drawn on their marker background
pub fn token_line<'a>(tokens: &'a [TaggedToken], theme: &Theme) -> Line<'a> {
    let mut spans = Vec::with_capacity(tokens.len() * 2);
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let style = match theme.tag_background(token.tag) {
            Some(bg) => Style::default().bg(bg).fg(theme.on_marker),
            None => Style::default().fg(theme.text),
        };
        spans.push(Span::styled(token.text.as_str(), style));
    }
    Line::from(spans)
}

/// Raw scores of the highlighted tokens (the hover text of the web demo)
pub fn score_line<'a>(tokens: &'a [TaggedToken], theme: &Theme) -> Option<Line<'a>> {
    let mut spans = Vec::new();
    for token in tokens.iter().filter(|t| t.is_highlighted()) {
        let Some(tooltip) = token.tooltip.as_deref() else {
            continue;
        };
        if !spans.is_empty() {
            spans.push(Span::styled(" · ", Style::default().fg(theme.inactive)));
        }
        spans.push(Span::styled(token.text.as_str(), Style::default().fg(theme.text_dim)));
        spans.push(Span::styled(format!(" {}", tooltip), Style::default().fg(theme.inactive)));
    }
    if spans.is_empty() {
        None
    } else {
        Some(Line::from(spans))
    }
}

/// `0 ━━━━━●────── 12`
pub fn slider_line(value: &TopK, max: usize, focused: bool, theme: &Theme) -> Line<'static> {
    let filled = if max == 0 {
        0
    } else {
        value.count().min(max) * SLIDER_WIDTH / max
    };
    let track_color = if focused { theme.accent } else { theme.inactive };

    Line::from(vec![
        Span::styled("0 ", Style::default().fg(theme.text_dim)),
        Span::styled("━".repeat(filled), Style::default().fg(track_color)),
        Span::styled(
            "●",
            Style::default().fg(track_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "─".repeat(SLIDER_WIDTH - filled),
            Style::default().fg(theme.inactive),
        ),
        Span::styled(format!(" {}", max), Style::default().fg(theme.text_dim)),
    ])
}

/// "Visualizing the top K words." (blank K shows as-is)
pub fn top_k_caption(value: &TopK, theme: &Theme) -> Line<'static> {
    Line::styled(
        format!("Visualizing the top {} words.", value),
        Style::default().fg(theme.slider),
    )
}

/// `[ key ] Label`
pub fn button_line(key: &'static str, label: &'static str, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled("[ ", Style::default().fg(theme.text_dim)),
        Span::styled(key, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
        Span::styled(" ] ", Style::default().fg(theme.text_dim)),
        Span::styled(label, Style::default().fg(theme.text)),
    ])
}

pub fn placeholder(text: &'static str, theme: &Theme) -> Line<'static> {
    Line::styled(text, Style::default().fg(theme.text_dim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::{Rgb, Tag};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_token_line() {
        let theme = Theme::default();
        let tokens = vec![
            TaggedToken::new("a", Tag::Neutral),
            TaggedToken::new("dog", Tag::Added),
        ];
        let line = token_line(&tokens, &theme);
        assert_eq!(line_text(&line), "a dog");
        assert_eq!(line.spans[2].style.bg, Some(theme.added));
        assert_eq!(line.spans[0].style.bg, None);
    }

    #[test]
    fn test_score_line_only_highlighted() {
        let theme = Theme::default();
        let mut hot = TaggedToken::new("man", Tag::Salient(Rgb(1, 1, 1)));
        hot.tooltip = Some("0.600".to_string());
        let mut cold = TaggedToken::new("A", Tag::Neutral);
        cold.tooltip = Some("0.050".to_string());
        let tokens = vec![cold, hot];
        assert_eq!(line_text(&score_line(&tokens, &theme).unwrap()), "man 0.600");
        assert!(score_line(&tokens[..1], &theme).is_none());
    }

    #[test]
    fn test_slider_track() {
        let theme = Theme::default();
        let full = slider_line(&TopK::Count(9), 4, true, &theme);
        assert_eq!(full.spans[1].content.chars().count(), SLIDER_WIDTH);
        let empty = slider_line(&TopK::Blank(String::new()), 4, false, &theme);
        assert_eq!(empty.spans[1].content.chars().count(), 0);
        let none = slider_line(&TopK::Count(3), 0, false, &theme);
        assert_eq!(none.spans[3].content.chars().count(), SLIDER_WIDTH);
        assert_eq!(
            line_text(&top_k_caption(&TopK::Blank(String::new()), &theme)),
            "Visualizing the top  words."
        );
    }
}
