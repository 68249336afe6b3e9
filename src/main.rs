mod app;
mod braille;
mod color;
mod config;
mod error;
mod export;
mod quadtree;
mod settings;
mod simulation;
mod store;
mod ui;

use app::{App, Focus, MAX_BRUSH_SIZE, MAX_DENSITY, MAX_TICKS_PER_FRAME};
use clap::Parser;
use color::Palette;
use config::AppConfig;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use settings::{EdgeBehavior, FloorBehavior, SimulationSettings, MAX_GRID_SIZE, MAX_RAIN_RATE};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "falling-sand")]
#[command(about = "Falling-sand cellular automaton in the terminal")]
struct Args {
    // === Grid (fixed for the whole run) ===
    /// Grid width in cells (default: fit the terminal)
    #[arg(long)]
    width: Option<usize>,

    /// Grid height in cells (default: fit the terminal)
    #[arg(long)]
    height: Option<usize>,

    /// Quadtree depth (2-10, default: sized to the grid)
    #[arg(long)]
    depth: Option<usize>,

    /// Ticks without moving before a grain settles (1-100)
    #[arg(long = "rest-threshold")]
    rest_threshold: Option<u32>,

    // === Behavior ===
    /// Bottom row behavior (settle, hold)
    #[arg(long)]
    floor: Option<String>,

    /// Side edge behavior for diagonal slides (wall, wrap)
    #[arg(long)]
    edges: Option<String>,

    /// Grains dropped along the top row per tick (0-32)
    #[arg(long)]
    rain: Option<usize>,

    /// Random seed for the rain spawner
    #[arg(long)]
    seed: Option<u64>,

    // === Host ===
    /// Simulation ticks per frame (1-20)
    #[arg(long)]
    speed: Option<usize>,

    /// Brush radius in cells (0-5)
    #[arg(long)]
    brush: Option<i32>,

    /// Paint color (white, red, blue, green, yellow)
    #[arg(long)]
    color: Option<String>,

    /// Pixels per cell for PNG/GIF export (1-8)
    #[arg(long)]
    density: Option<u32>,

    /// Config file to load settings from and save to
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn parse_floor(s: &str) -> FloorBehavior {
    match s.to_lowercase().as_str() {
        "hold" | "legacy" => FloorBehavior::Hold,
        _ => FloorBehavior::Settle,
    }
}

fn parse_edges(s: &str) -> EdgeBehavior {
    match s.to_lowercase().as_str() {
        "wrap" | "toroidal" => EdgeBehavior::Wrap,
        _ => EdgeBehavior::Wall,
    }
}

fn parse_color(s: &str) -> Palette {
    match s.to_lowercase().as_str() {
        "white" => Palette::White,
        "blue" => Palette::Blue,
        "green" => Palette::Green,
        "yellow" => Palette::Yellow,
        _ => Palette::Red,
    }
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();
    Ok(())
}

/// Merge config file, terminal size and CLI flags into one config.
/// CLI flags win over the file; the terminal only decides the grid size
/// when neither does.
fn build_config(args: &Args, file_config: Option<AppConfig>, canvas: (u16, u16)) -> AppConfig {
    let from_file = file_config.is_some();
    let mut config = file_config.unwrap_or_default();

    if !from_file {
        let (fit_width, fit_height) = braille::calculate_simulation_size(canvas.0, canvas.1);
        config.settings = SimulationSettings::for_grid(fit_width, fit_height);
    }
    if args.width.is_some() || args.height.is_some() {
        let width = args.width.unwrap_or(config.settings.width).clamp(2, MAX_GRID_SIZE);
        let height = args.height.unwrap_or(config.settings.height).clamp(2, MAX_GRID_SIZE);
        config.settings.width = width;
        config.settings.height = height;
        config.settings.depth = quadtree::default_depth(width, height);
    }

    let settings = &mut config.settings;
    settings.width = settings.width.clamp(2, MAX_GRID_SIZE);
    settings.height = settings.height.clamp(2, MAX_GRID_SIZE);
    if let Some(depth) = args.depth {
        settings.depth = depth.clamp(quadtree::MIN_DEPTH, quadtree::MAX_DEPTH);
    }
    if let Some(rest) = args.rest_threshold {
        settings.rest_threshold = rest.clamp(1, 100);
    }
    if let Some(floor) = &args.floor {
        settings.floor_behavior = parse_floor(floor);
    }
    if let Some(edges) = &args.edges {
        settings.edge_behavior = parse_edges(edges);
    }
    if let Some(rain) = args.rain {
        settings.rain_rate = rain.min(MAX_RAIN_RATE);
    }

    if let Some(speed) = args.speed {
        config.ticks_per_frame = speed.clamp(1, MAX_TICKS_PER_FRAME);
    }
    if let Some(brush) = args.brush {
        config.brush_size = brush.clamp(0, MAX_BRUSH_SIZE);
    }
    if let Some(color) = &args.color {
        config.palette = parse_color(color);
    }
    if let Some(density) = args.density {
        config.density = density.clamp(1, MAX_DENSITY);
    }

    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let file_config = match &args.config {
        Some(path) if path.exists() => Some(AppConfig::load_from_file(path)?),
        _ => None,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Size the grid to the initial canvas unless told otherwise
    let size = terminal.size()?;
    let canvas = ui::canvas_area(Rect::new(0, 0, size.width, size.height), false);
    let config = build_config(&args, file_config, (canvas.width, canvas.height));

    let res: Result<(), Box<dyn std::error::Error>> = match config.validate() {
        Ok(()) => {
            let mut app = App::new(&config, args.seed);
            app.config_path = args.config.clone();
            let res = run_app(&mut terminal, &mut app);
            app.shutdown();
            res.map_err(|e| e.into())
        }
        Err(e) => Err(e.into()),
    };

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!(error = %err, "exiting with error");
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    loop {
        let size = terminal.size()?;
        app.canvas = ui::canvas_area(Rect::new(0, 0, size.width, size.height), app.fullscreen_mode);

        terminal.draw(|frame| ui::render(frame, app))?;

        // Drain every pending event before the next tick
        let mut timeout = FRAME_DURATION;
        while event::poll(timeout)? {
            timeout = Duration::ZERO;
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    // Handle Ctrl+C
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    match key.code {
                        // System controls
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char(' ') => app.toggle_pause(),
                        KeyCode::Char('.') => app.step_once(),
                        KeyCode::Char('r') | KeyCode::Char('R') => app.reset(),
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
                        KeyCode::Char('c') => {
                            app.cycle_palette();
                            app.focus = Focus::Palette;
                        }
                        KeyCode::Char('C') => {
                            app.cycle_palette_prev();
                            app.focus = Focus::Palette;
                        }
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            app.increase_speed();
                            app.focus = Focus::Speed;
                        }
                        KeyCode::Char('-') | KeyCode::Char('_') => {
                            app.decrease_speed();
                            app.focus = Focus::Speed;
                        }
                        KeyCode::Char('[') => {
                            app.adjust_brush(-1);
                            app.focus = Focus::Brush;
                        }
                        KeyCode::Char(']') => {
                            app.adjust_brush(1);
                            app.focus = Focus::Brush;
                        }
                        KeyCode::Char('p') | KeyCode::Char('P') => app.export_png(),
                        KeyCode::Char('g') | KeyCode::Char('G') => app.toggle_recording(),
                        KeyCode::Char('w') | KeyCode::Char('W') => app.save_config(),

                        // Navigation
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Up => {
                            if !app.show_help && app.focus.is_param() {
                                app.adjust_focused_up();
                            }
                        }
                        KeyCode::Down => {
                            if !app.show_help && app.focus.is_param() {
                                app.adjust_focused_down();
                            }
                        }
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Controls;
                            }
                        }
                        KeyCode::Char('j') | KeyCode::Char('J') => {
                            if app.show_help {
                                let frame_area = Rect::new(0, 0, size.width, size.height);
                                app.scroll_help_down(ui::help_max_scroll(frame_area, app.fullscreen_mode));
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if app.show_help {
                                app.scroll_help_up();
                            }
                        }
                        _ => {}
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => app.pointer_down(mouse.column, mouse.row),
                    MouseEventKind::Drag(MouseButton::Left) => app.pointer_drag(mouse.column, mouse.row),
                    MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
                    _ => {}
                },
                // The grid keeps its size; the next frame rescales to the new canvas
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        // Run simulation tick
        app.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(flags: &[&str]) -> Args {
        Args::parse_from(std::iter::once("falling-sand").chain(flags.iter().copied()))
    }

    #[test]
    fn test_oversized_grid_flags_are_clamped() {
        let config = build_config(&args(&["--width", "100000", "--height", "1"]), None, (80, 24));

        assert_eq!(config.settings.width, MAX_GRID_SIZE);
        assert_eq!(config.settings.height, 2);
        assert!(config.settings.validate().is_ok());
    }

    #[test]
    fn test_grid_fits_canvas_without_flags() {
        let config = build_config(&args(&[]), None, (40, 10));

        assert_eq!((config.settings.width, config.settings.height), (80, 40));
        assert!(config.settings.validate().is_ok());
    }

    #[test]
    fn test_flags_override_file_config() {
        let file = AppConfig {
            settings: SimulationSettings::for_grid(64, 64),
            ..AppConfig::default()
        };
        let config = build_config(&args(&["--rain", "99", "--floor", "hold"]), Some(file), (80, 24));

        assert_eq!((config.settings.width, config.settings.height), (64, 64));
        assert_eq!(config.settings.rain_rate, MAX_RAIN_RATE);
        assert_eq!(config.settings.floor_behavior, FloorBehavior::Hold);
    }
}
