mod app;
mod backend;
mod config;
mod error;
mod interpret;
mod session;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::{AppConfig, MarkerConfig};
use interpret::{Interpreter, Layout, Tag, TaggedToken};
use session::Session;

#[derive(Parser, Debug)]
#[command(name = "salience")]
#[command(version = "0.1.0")]
#[command(about = "A terminal viewer for saliency maps and HotFlip word-flip attacks")]
struct Args {
    /// Session file (JSON); `-` reads it from stdin
    session: PathBuf,

    /// Print the colorized sequences as JSON instead of starting the TUI
    #[arg(short, long)]
    render: bool,

    /// Request an interpretation before rendering
    #[arg(long)]
    interpret: bool,

    /// Run the word-flip attack before rendering
    #[arg(long)]
    flip: bool,

    /// Tokens highlighted per saliency map
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Gradient method (simple_gradient, integrated_gradient, smooth_gradient)
    #[arg(short, long, value_parser = parse_interpreter)]
    method: Option<Interpreter>,

    /// Colormap name (copper, greys, hot, cool, bone, jet)
    #[arg(long)]
    colormap: Option<String>,

    /// Number of colormap shades (clamped to 6..=72)
    #[arg(long)]
    nshades: Option<usize>,

    /// Backend base URL
    #[arg(short, long)]
    backend: Option<String>,
}

fn parse_interpreter(s: &str) -> Result<Interpreter, String> {
    Interpreter::ALL
        .into_iter()
        .find(|i| i.id() == s)
        .ok_or_else(|| format!("unknown method {:?}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr keeps --render output clean)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    apply_overrides(&mut config, &args);

    let (session, session_path) = read_session(&args.session)?;
    let mut app = App::new(session, session_path, config)?;
    if let Some(method) = args.method {
        app.session.interpreter = method;
    }

    if args.interpret {
        app.handle_key(event::KeyEvent::from(KeyCode::Char('i'))).await?;
    }
    if args.flip {
        app.handle_key(event::KeyEvent::from(KeyCode::Char('f'))).await?;
    }

    if args.render {
        let output = render_json(&app)?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    // Run TUI
    run_tui(app).await
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(k) = args.top_k {
        config.default_top_k = k;
    }
    if let Some(ref name) = args.colormap {
        config.colormap.name = name.clone();
    }
    if let Some(n) = args.nshades {
        config.colormap.nshades = n;
    }
    if let Some(ref url) = args.backend {
        config.backend.url = url.clone();
    }
}

fn read_session(path: &Path) -> Result<(Session, Option<PathBuf>)> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read session from stdin")?;
        return Ok((Session::parse(&content)?, None));
    }
    Ok((Session::load(path)?, Some(path.to_path_buf())))
}

fn tag_hex(tag: Tag, markers: &MarkerConfig) -> String {
    match tag {
        Tag::Neutral => "transparent".to_string(),
        Tag::Removed => markers.removed.clone(),
        Tag::Added => markers.added.clone(),
        Tag::Salient(rgb) => rgb.to_hex(),
    }
}

fn tokens_json(tokens: &[TaggedToken], markers: &MarkerConfig) -> Value {
    tokens
        .iter()
        .map(|t| {
            json!({
                "text": t.text,
                "background": tag_hex(t.tag, markers),
                "tooltip": t.tooltip,
            })
        })
        .collect()
}

/// JSON rendering of everything the TUI would show
fn render_json(app: &App) -> Result<Value> {
    let markers = &app.config.markers;
    let (first, second) = app.saliency_views()?;

    let mut saliency = Vec::new();
    if !first.tokens.is_empty() {
        saliency.push(json!({
            "top_k": first.top_k.to_string(),
            "tokens": tokens_json(&first.tokens, markers),
        }));
    }
    if app.layout() == Layout::TwoInputs && !second.tokens.is_empty() {
        saliency.push(json!({
            "top_k": second.top_k.to_string(),
            "tokens": tokens_json(&second.tokens, markers),
        }));
    }

    let hotflip = match app.flip_view() {
        Some(result) => {
            let (original, flipped) = result?;
            json!({
                "original": tokens_json(&original, markers),
                "flipped": tokens_json(&flipped, markers),
                "prediction": app.prediction_label(),
            })
        }
        None => Value::Null,
    };

    Ok(json!({
        "task": app.session.task.map(|t| t.name()),
        "interpreter": app.session.interpreter.id(),
        "colormap": app.scale.name(),
        "nshades": app.scale.len(),
        "saliency": saliency,
        "hotflip": hotflip,
    }))
}

async fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                tracing::warn!("{:#}", e);
                                app.set_status(format!("Error: {:#}", e));
                            }
                        }
                    }
                }
            }
        }

        let _ = app.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(json: &str) -> App {
        App::new(Session::parse(json).unwrap(), None, AppConfig::default()).unwrap()
    }

    #[test]
    fn test_render_json() {
        let app = app(
            r#"{
                "task": "Sentiment Analysis",
                "input1_tokens": ["a", "great", "movie"],
                "interpretation": {"simple_gradient": {"instance_1": {"grad_input_1": [0.1, 0.9, 0.4]}}},
                "attack": {"hotflip": {"original": ["a", "great", "movie"],
                    "final": [["a", "dull", "movie"]], "new_prediction": [0.2, 0.8]}}
            }"#,
        );
        let out = render_json(&app).unwrap();
        assert_eq!(out["task"], "Sentiment Analysis");
        assert_eq!(out["nshades"], 20);

        let saliency = out["saliency"].as_array().unwrap();
        assert_eq!(saliency.len(), 1);
        assert_eq!(saliency[0]["top_k"], "3");
        assert_eq!(saliency[0]["tokens"][1]["tooltip"], "0.900");
        // "great" has weight 0.1, palette index round(0.1 * 19) = 2
        assert_eq!(
            saliency[0]["tokens"][1]["background"],
            app.scale.colors()[2].to_hex()
        );

        assert_eq!(out["hotflip"]["original"][1]["background"], "#FF5733");
        assert_eq!(out["hotflip"]["flipped"][1]["background"], "#26BD19");
        assert_eq!(out["hotflip"]["flipped"][0]["background"], "transparent");
        assert_eq!(out["hotflip"]["prediction"], "Negative");
    }

    #[test]
    fn test_render_json_without_results() {
        let out = render_json(&app(r#"{"input1_tokens": ["hello"]}"#)).unwrap();
        assert_eq!(out["task"], Value::Null);
        assert!(out["saliency"].as_array().unwrap().is_empty());
        assert_eq!(out["hotflip"], Value::Null);
    }

    #[test]
    fn test_method_parser() {
        assert_eq!(parse_interpreter("smooth_gradient"), Ok(Interpreter::SmoothGradient));
        assert!(parse_interpreter("lime").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from(["salience", "s.json", "-k", "5", "--colormap", "hot", "--nshades", "99"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.colormap.name, "hot");
        assert_eq!(config.colormap.nshades, 99);
        assert!(!args.render);
    }
}
