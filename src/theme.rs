//! Theme colors for the UI and the token highlight markers.
//! Chrome colors can come from the kitty terminal theme
//! (~/.config/kitty/current-theme.conf); marker colors come from the config.

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

use crate::config::MarkerConfig;
use crate::interpret::{Rgb, Tag};

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,       // Active borders, focused slider
    pub danger: Color,       // Errors
    pub success: Color,      // Prediction label
    pub warning: Color,      // Status messages
    pub text: Color,         // Primary text (foreground)
    pub text_dim: Color,     // Placeholders, hints
    pub inactive: Color,     // Inactive borders
    pub header: Color,       // Section headings
    pub slider: Color,       // "Visualizing the top K words" line
    pub removed: Color,      // Original token at a flipped position
    pub added: Color,        // Replacement token at a flipped position
    pub on_marker: Color,    // Text drawn over a colored token
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(114, 188, 255),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(124, 124, 124),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(243, 139, 168),
            slider: Color::Rgb(114, 188, 255),
            removed: Color::Rgb(255, 87, 51),
            added: Color::Rgb(38, 189, 25),
            on_marker: Color::Rgb(18, 18, 18),
        }
    }
}

impl Theme {
    /// Build the theme: terminal colors if available, markers from config
    pub fn load(markers: &MarkerConfig) -> Self {
        let mut theme = Self::load_kitty_theme().unwrap_or_default();
        theme.apply_markers(markers);
        theme
    }

    /// Override marker colors; invalid hex strings keep the current color
    pub fn apply_markers(&mut self, markers: &MarkerConfig) {
        match Rgb::from_hex(&markers.removed) {
            Some(rgb) => self.removed = to_color(rgb),
            None => tracing::warn!("Invalid removed marker color: {}", markers.removed),
        }
        match Rgb::from_hex(&markers.added) {
            Some(rgb) => self.added = to_color(rgb),
            None => tracing::warn!("Invalid added marker color: {}", markers.added),
        }
    }

    /// Background for a tagged token, `None` for transparent
    pub fn tag_background(&self, tag: Tag) -> Option<Color> {
        match tag {
            Tag::Neutral => None,
            Tag::Removed => Some(self.removed),
            Tag::Added => Some(self.added),
            Tag::Salient(rgb) => Some(to_color(rgb)),
        }
    }

    /// Load chrome colors from the kitty theme file
    fn load_kitty_theme() -> Option<Self> {
        let home = dirs::home_dir()?;
        let theme_path = home.join(".config/kitty/current-theme.conf");

        let content = fs::read_to_string(&theme_path).ok()?;
        let colors = Self::parse_kitty_conf(&content);
        Self::from_kitty_colors(&colors)
    }

    fn from_kitty_colors(colors: &HashMap<String, Color>) -> Option<Self> {
        if colors.is_empty() {
            return None;
        }

        let defaults = Self::default();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k))
                .copied()
                .unwrap_or(fallback)
        };

        Some(Self {
            accent: pick(&["color4", "color12"], defaults.accent),
            danger: pick(&["color1", "color9"], defaults.danger),
            success: pick(&["color2", "color10"], defaults.success),
            warning: pick(&["color3", "color11"], defaults.warning),
            text: pick(&["foreground"], defaults.text),
            text_dim: pick(&["color8"], defaults.text_dim),
            inactive: pick(&["inactive_border_color", "color8"], defaults.inactive),
            header: pick(&["color5", "color13"], defaults.header),
            slider: pick(&["color12", "color4"], defaults.slider),
            on_marker: pick(&["background"], defaults.on_marker),
            ..defaults
        })
    }

    /// Parse kitty.conf format: `key value` or `key #hexcolor`
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
            if parts.len() == 2 {
                if let Some(rgb) = Rgb::from_hex(parts[1]) {
                    colors.insert(parts[0].trim().to_string(), to_color(rgb));
                }
            }
        }

        colors
    }
}

pub fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kitty_conf() {
        let conf = "# theme\nforeground #cdd6f4\ncolor4 #89b4fa\nfont_family Fira\n";
        let colors = Theme::parse_kitty_conf(conf);
        assert_eq!(colors.len(), 2);
        let theme = Theme::from_kitty_colors(&colors).unwrap();
        assert_eq!(theme.accent, Color::Rgb(0x89, 0xb4, 0xfa));
        assert_eq!(theme.text, Color::Rgb(0xcd, 0xd6, 0xf4));
        assert_eq!(theme.removed, Theme::default().removed);
        assert!(Theme::from_kitty_colors(&HashMap::new()).is_none());
    }

    #[test]
    fn test_markers() {
        let mut theme = Theme::default();
        theme.apply_markers(&MarkerConfig {
            removed: "#000".to_string(),
            added: "not a color".to_string(),
        });
        assert_eq!(theme.tag_background(Tag::Removed), Some(Color::Rgb(0, 0, 0)));
        assert_eq!(theme.tag_background(Tag::Added), Some(Color::Rgb(38, 189, 25)));
        assert_eq!(theme.tag_background(Tag::Neutral), None);
        assert_eq!(
            theme.tag_background(Tag::Salient(Rgb(1, 2, 3))),
            Some(Color::Rgb(1, 2, 3))
        );
    }
}
