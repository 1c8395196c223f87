use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::backend;
use crate::config::AppConfig;
use crate::error::InterpretError;
use crate::interpret::colormap::ColorScale;
use crate::interpret::saliency::{self, Input, TopK, TopKState};
use crate::interpret::{layout_for, Layout, TaggedToken, WeightedToken};
use crate::session::Session;
use crate::theme::Theme;

/// How long a status message stays in the info line
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Input1,   // First saliency map and its slider
    Input2,   // Second saliency map (two-input tasks only)
    Hotflip,  // Word-flip panel
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Tagged tokens for one saliency map and its slider value
pub struct SaliencyView {
    pub tokens: Vec<TaggedToken>,
    pub top_k: TopK,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,

    pub session: Session,
    pub session_path: Option<PathBuf>,

    pub config: AppConfig,
    pub theme: Theme,
    pub scale: ColorScale,

    // Per-input slider values (independent)
    pub top_k: TopKState,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    pub fn new(session: Session, session_path: Option<PathBuf>, config: AppConfig) -> Result<Self> {
        let scale = ColorScale::new(&config.colormap.name, config.colormap.nshades)
            .context("Invalid colormap in config")?;
        let theme = Theme::load(&config.markers);
        let top_k = TopKState::new(config.default_top_k);

        Ok(Self {
            section: Section::Input1,
            popup: Popup::None,
            session,
            session_path,
            config,
            theme,
            scale,
            top_k,
            status_message: None,
            status_message_time: None,
        })
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn layout(&self) -> Layout {
        layout_for(self.session.task)
    }

    /// Weighted tokens for both inputs under the selected interpreter
    pub fn weighted(&self) -> Result<(Vec<WeightedToken>, Vec<WeightedToken>), InterpretError> {
        saliency::weighted_inputs(
            self.session.interpretation.as_ref(),
            self.session.interpreter,
            &self.session.input1_tokens,
            &self.session.input2_tokens,
        )
    }

    /// Colorized saliency maps for both inputs, recomputed on every call
    pub fn saliency_views(&self) -> Result<(SaliencyView, SaliencyView), InterpretError> {
        let (first, second) = self.weighted()?;
        let view = |weighted: &[WeightedToken], top_k: &TopK| {
            let selected = saliency::select_top_k(weighted, top_k.count());
            SaliencyView {
                tokens: saliency::colorize(weighted, &selected, &self.scale),
                top_k: top_k.clone(),
            }
        };
        Ok((
            view(&first, &self.top_k.input1),
            view(&second, &self.top_k.input2),
        ))
    }

    /// Highlighted original and flipped tokens, if an attack has run
    pub fn flip_view(&self) -> Option<Result<(Vec<TaggedToken>, Vec<TaggedToken>), InterpretError>> {
        let flip = self.session.attack.as_ref()?.hotflip.as_ref()?;
        Some(flip.highlighted())
    }

    pub fn prediction_label(&self) -> Option<&'static str> {
        let flip = self.session.attack.as_ref()?.hotflip.as_ref()?;
        flip.prediction_label(self.session.task)
    }

    /// Sections reachable with Tab for the current task
    pub fn sections(&self) -> Vec<Section> {
        let mut sections = vec![Section::Input1];
        if self.layout() == Layout::TwoInputs {
            sections.push(Section::Input2);
        }
        if self.session.is_hotflip() {
            sections.push(Section::Hotflip);
        }
        sections
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup == Popup::Help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter | KeyCode::Char('q')) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Tab => self.cycle_section(true),
            KeyCode::BackTab => self.cycle_section(false),

            // Slider (focused saliency map)
            KeyCode::Left | KeyCode::Char('h') => self.step_slider(-1),
            KeyCode::Right | KeyCode::Char('l') => self.step_slider(1),
            KeyCode::Home => self.set_slider(0),
            KeyCode::End => {
                if let Some(input) = self.slider_input() {
                    let max = self.slider_max(input);
                    self.set_slider(max);
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.type_slider_digit(c),
            KeyCode::Backspace => self.erase_slider_digit(),

            // Buttons
            KeyCode::Char('i') => self.request_interpretation().await?,
            KeyCode::Char('f') => self.request_flip().await?,

            KeyCode::Char('m') => {
                self.session.interpreter = self.session.interpreter.next();
                self.set_status(self.session.interpreter.headers().0);
            }
            KeyCode::Char('w') => self.save_session()?,
            KeyCode::Char('?') => self.popup = Popup::Help,
            _ => {}
        }
        Ok(())
    }

    fn cycle_section(&mut self, forward: bool) {
        let sections = self.sections();
        let pos = sections.iter().position(|s| *s == self.section).unwrap_or(0);
        let next = if forward {
            (pos + 1) % sections.len()
        } else {
            pos.checked_sub(1).unwrap_or(sections.len() - 1)
        };
        self.section = sections[next];
    }

    fn focused_input(&self) -> Option<Input> {
        match self.section {
            Section::Input1 => Some(Input::First),
            Section::Input2 => Some(Input::Second),
            Section::Hotflip => None,
        }
    }

    /// Focused input whose slider is on screen; no saliency map, no slider
    fn slider_input(&self) -> Option<Input> {
        self.focused_input().filter(|&input| self.slider_max(input) > 0)
    }

    /// Slider upper bound: number of tokens in that saliency map
    pub fn slider_max(&self, input: Input) -> usize {
        match self.weighted() {
            Ok((first, second)) => match input {
                Input::First => first.len(),
                Input::Second => second.len(),
            },
            Err(_) => 0,
        }
    }

    /// Forward a raw slider value the way an input-change event would
    fn slider_changed(&mut self, input: Input, raw: &str) {
        if !self.top_k.handle_change(input, raw) {
            self.set_status(format!("Not a number: {}", raw));
        }
    }

    fn set_slider(&mut self, value: usize) {
        if let Some(input) = self.slider_input() {
            let value = value.min(self.slider_max(input));
            self.slider_changed(input, &value.to_string());
        }
    }

    fn step_slider(&mut self, delta: i64) {
        if let Some(input) = self.slider_input() {
            let current = self.top_k.get(input).count() as i64;
            let value = (current + delta).max(0) as usize;
            self.set_slider(value);
        }
    }

    fn type_slider_digit(&mut self, digit: char) {
        if let Some(input) = self.slider_input() {
            let d = digit.to_digit(10).unwrap_or(0) as usize;
            let value = match self.top_k.get(input) {
                TopK::Count(n) => n.saturating_mul(10).saturating_add(d),
                TopK::Blank(_) => d,
            };
            self.set_slider(value);
        }
    }

    fn erase_slider_digit(&mut self) {
        if let Some(input) = self.slider_input() {
            match self.top_k.get(input).clone() {
                TopK::Count(n) if n >= 10 => {
                    self.slider_changed(input, &(n / 10).to_string());
                }
                // Clearing the field leaves the empty-string sentinel
                _ => self.slider_changed(input, ""),
            }
        }
    }

    fn model(&self) -> Result<String> {
        self.session
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Session has no model name"))
    }

    /// "Interpret Prediction" button
    async fn request_interpretation(&mut self) -> Result<()> {
        if self.layout() == Layout::Compact {
            return Ok(());
        }
        let model = self.model()?;
        let interpreter = self.session.interpreter;
        self.set_status(format!("Interpreting with {}...", interpreter.id()));

        let response = backend::interpret(&self.config.backend, &model, interpreter, &self.session.request)
            .await
            .context("Interpretation request failed")?;

        self.session
            .interpretation
            .get_or_insert_with(Default::default)
            .merge(response);

        // Surface misaligned gradients now rather than as a blank panel
        if let Err(e) = self.weighted() {
            tracing::warn!("Backend returned unusable gradients: {}", e);
            self.set_status(format!("Error: {}", e));
        } else {
            self.set_status(format!("{} ready", interpreter.headers().0));
        }
        Ok(())
    }

    /// "Flip Words" button
    async fn request_flip(&mut self) -> Result<()> {
        if !self.session.is_hotflip() {
            return Ok(());
        }
        let model = self.model()?;
        self.set_status("Flipping words...");

        let response = backend::attack(
            &self.config.backend,
            &model,
            &self.session.attacker,
            &self.session.request,
            &self.session.input_to_attack,
            &self.session.grad_input,
        )
        .await
        .context("Attack request failed")?;

        self.session.attack = Some(response);

        let message = match self.prediction_label() {
            Some(label) => format!("Prediction changed to: {}", label),
            None => "HotFlip finished".to_string(),
        };
        if self.config.notifications {
            if let Err(e) = notify("salience", &message) {
                tracing::debug!("Notification failed: {}", e);
            }
        }
        self.set_status(message);
        Ok(())
    }

    /// Write cached responses back to the session file
    fn save_session(&mut self) -> Result<()> {
        match &self.session_path {
            Some(path) => {
                self.session.save(path)?;
                self.set_status(format!("Saved {}", path.display()));
            }
            None => self.set_status("Session was read from stdin; nothing to save"),
        }
        Ok(())
    }

    pub async fn tick(&mut self) -> Result<()> {
        if let Some(t) = self.status_message_time {
            if t.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
        Ok(())
    }
}

pub fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-information")
        .show()?;
    Ok(())
}
