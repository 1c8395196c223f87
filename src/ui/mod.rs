mod components;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup, Section, SaliencyView};
use crate::interpret::saliency::Input;
use crate::interpret::{Layout as TaskLayout, Task};
use crate::theme::Theme;
use components::{button_line, placeholder, score_line, slider_line, token_line, top_k_caption};

const INTERPRET_PROMPT: &str = "Press \"interpret prediction\" to show the interpretation.";
const FLIP_PROMPT: &str = "Press \"flip words\" to run HotFlip.";

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let show_hotflip = app.session.is_hotflip();
    let body = if show_hotflip {
        vec![Constraint::Percentage(60), Constraint::Percentage(40)]
    } else {
        vec![Constraint::Min(4)]
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Info line
            Constraint::Min(6),     // Panels
            Constraint::Length(1),  // Footer
        ])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints(body)
        .split(rows[1]);

    draw_info_line(f, app, rows[0]);
    draw_saliency_box(f, app, panels[0]);
    if show_hotflip {
        draw_hotflip_box(f, app, panels[1]);
    }
    draw_footer(f, app, rows[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f, &app.theme);
    }
}

fn panel_block<'a>(title: &'a str, active: bool, theme: &Theme) -> Block<'a> {
    let border_color = if active { theme.accent } else { theme.inactive };
    let title_style = if active {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.inactive)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    if title.is_empty() {
        block
    } else {
        block.title(Span::styled(format!(" {} ", title), title_style))
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let line = if let Some(ref status) = app.status_message {
        Line::styled(status.as_str(), Style::default().fg(theme.warning))
    } else {
        let task = app
            .session
            .task
            .map(Task::name)
            .unwrap_or("No task");
        Line::from(vec![
            Span::styled(task, Style::default().fg(theme.text_dim)),
            Span::styled(" │ ", Style::default().fg(theme.inactive)),
            Span::styled(app.session.interpreter.id(), Style::default().fg(theme.text_dim)),
            Span::styled(" │ ", Style::default().fg(theme.inactive)),
            Span::styled(
                format!("{} ({} shades)", app.scale.name(), app.scale.len()),
                Style::default().fg(theme.text_dim),
            ),
        ])
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

/// Saliency map lines for one input: tokens, slider, caption
fn saliency_lines<'a>(
    view: &'a SaliencyView,
    max: usize,
    focused: bool,
    caption: bool,
    theme: &Theme,
) -> Vec<Line<'a>> {
    let mut lines = vec![token_line(&view.tokens, theme)];
    if let Some(scores) = score_line(&view.tokens, theme) {
        lines.push(scores);
    }
    lines.push(slider_line(&view.top_k, max, focused, theme));
    if caption {
        lines.push(top_k_caption(&view.top_k, theme));
    }
    lines.push(Line::from(""));
    lines
}

fn saliency_heading(theme: &Theme) -> Line<'static> {
    Line::styled(
        "Saliency Map:",
        Style::default().fg(theme.header).add_modifier(Modifier::BOLD),
    )
}

fn draw_saliency_box(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let layout = app.layout();
    let (title, description) = app.session.interpreter.headers();
    let active = matches!(app.section, Section::Input1 | Section::Input2);

    let views = match app.saliency_views() {
        Ok(views) => views,
        Err(e) => {
            let error = Paragraph::new(Line::styled(
                format!("Error: {}", e),
                Style::default().fg(theme.danger),
            ))
            .wrap(Wrap { trim: false })
            .block(panel_block(title, active, theme));
            f.render_widget(error, area);
            return;
        }
    };
    let (first, second) = &views;

    let mut lines: Vec<Line> = Vec::new();
    match layout {
        TaskLayout::Compact => {
            lines.extend(saliency_lines(
                first,
                app.slider_max(Input::First),
                app.section == Section::Input1,
                false,
                theme,
            ));
        }
        TaskLayout::SingleInput | TaskLayout::TwoInputs => {
            lines.push(Line::styled(description, Style::default().fg(theme.text_dim)));
            lines.push(Line::from(""));

            let mut maps = vec![(first, Input::First, Section::Input1)];
            if layout == TaskLayout::TwoInputs {
                maps.push((second, Input::Second, Section::Input2));
            }
            for (view, input, section) in maps {
                lines.push(saliency_heading(theme));
                if view.tokens.is_empty() {
                    lines.push(placeholder(INTERPRET_PROMPT, theme));
                    lines.push(Line::from(""));
                } else {
                    lines.extend(saliency_lines(
                        view,
                        app.slider_max(input),
                        app.section == section,
                        true,
                        theme,
                    ));
                }
            }
            lines.push(button_line("i", "Interpret Prediction", theme));
        }
    }

    let block_title = if layout == TaskLayout::Compact { "" } else { title };
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block(block_title, active, theme));
    f.render_widget(paragraph, area);
}

fn draw_hotflip_box(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let active = app.section == Section::Hotflip;
    let sentiment = app.session.task == Some(Task::SentimentAnalysis);

    let field = if sentiment { "Input" } else { "Hypothesis" };
    let mut lines = vec![
        Line::styled(
            format!(
                "HotFlip (https://arxiv.org/abs/1712.06751) flips words in the {0} to change the model's prediction. We iteratively flip the word in the {0} with the highest gradient until the prediction changes.",
                if sentiment { "input" } else { "Hypothesis" }
            ),
            Style::default().fg(theme.text_dim),
        ),
        Line::from(""),
    ];

    let label_style = Style::default().fg(theme.header).add_modifier(Modifier::BOLD);
    match app.flip_view() {
        None => lines.push(placeholder(FLIP_PROMPT, theme)),
        Some(Err(e)) => lines.push(Line::styled(
            format!("Error: {}", e),
            Style::default().fg(theme.danger),
        )),
        Some(Ok((original, flipped))) => {
            if !sentiment {
                if let Some(premise) = app.session.premise() {
                    lines.push(Line::from(vec![
                        Span::styled("Original Premise: ", label_style),
                        Span::styled(premise.to_string(), Style::default().fg(theme.text)),
                    ]));
                }
            }

            let mut orig_line = token_line(&original, theme);
            orig_line.spans.insert(0, Span::styled(format!("Original {}: ", field), label_style));
            lines.push(own_line(orig_line));

            let flip_label = if sentiment { "Flipped Input: " } else { "Flipped Hypothesis: " };
            let mut flip_line = token_line(&flipped, theme);
            flip_line.spans.insert(0, Span::styled(flip_label, label_style));
            lines.push(own_line(flip_line));

            if let Some(label) = app.prediction_label() {
                lines.push(Line::from(vec![
                    Span::styled("Prediction changed to: ", label_style),
                    Span::styled(label, Style::default().fg(theme.success)),
                ]));
            }
        }
    }
    lines.push(Line::from(""));
    lines.push(button_line("f", "Flip Words", theme));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("HotFlip Attack", active, theme));
    f.render_widget(paragraph, area);
}

/// Detach a line from the token vector it borrows
fn own_line(line: Line<'_>) -> Line<'static> {
    Line::from(
        line.spans
            .into_iter()
            .map(|s| Span::styled(s.content.into_owned(), s.style))
            .collect::<Vec<_>>(),
    )
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let key = |k: &'static str| Span::styled(k, Style::default().fg(theme.accent));
    let text = |t: &'static str| Span::styled(t, Style::default().fg(theme.text_dim));

    let mut spans = vec![key("Tab"), text(" focus  "), key("←/→"), text(" top K  ")];
    if app.layout() != TaskLayout::Compact {
        spans.extend([key("i"), text(" interpret  ")]);
    }
    if app.session.is_hotflip() {
        spans.extend([key("f"), text(" flip  ")]);
    }
    spans.extend([
        key("m"),
        text(" method  "),
        key("?"),
        text(" help  "),
        key("q"),
        text(" quit"),
    ]);

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame, theme: &Theme) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let heading = |t: &'static str| {
        Line::from(Span::styled(t, Style::default().fg(theme.header).add_modifier(Modifier::BOLD)))
    };
    let entry = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(theme.accent)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        heading("═══ Navigation ═══"),
        entry("  Tab       ", "Switch between saliency maps and HotFlip"),
        Line::from(""),
        heading("═══ Saliency ═══"),
        entry("  ←/→ h/l   ", "Highlight one token fewer/more"),
        entry("  Home/End  ", "Highlight none/all tokens"),
        entry("  0-9       ", "Type the number of tokens to highlight"),
        entry("  Backspace ", "Erase a digit (empty highlights nothing)"),
        entry("  m         ", "Cycle gradient method"),
        entry("  i         ", "Interpret prediction"),
        Line::from(""),
        heading("═══ HotFlip ═══"),
        entry("  f         ", "Flip words until the prediction changes"),
        Line::from(""),
        heading("═══ Session ═══"),
        entry("  w         ", "Write cached results back to the session file"),
        entry("  q         ", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(theme.text_dim)),
            Span::styled("?", Style::default().fg(theme.accent)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("Esc", Style::default().fg(theme.accent)),
            Span::styled(" to close", Style::default().fg(theme.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" salience Help ", Style::default().fg(theme.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
