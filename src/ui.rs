use crate::app::{App, Focus};
use crate::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Inner canvas area (excluding borders) for a given frame area
pub fn canvas_area(frame_area: Rect, fullscreen: bool) -> Rect {
    let outer = if fullscreen {
        frame_area
    } else {
        let sidebar = SIDEBAR_WIDTH.min(frame_area.width);
        Rect {
            x: frame_area.x + sidebar,
            y: frame_area.y,
            width: frame_area.width - sidebar,
            height: frame_area.height,
        }
    };
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Status
            Constraint::Length(8), // Parameters
            Constraint::Min(6),    // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Falling Sand ");
    let sim = &app.simulation;

    let (status_text, status_color) = if app.recorder.is_some() {
        ("RECORDING", Color::Red)
    } else if sim.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", BORDER_COLOR)
    };

    let mut content = vec![
        Line::from(Span::styled(format!("FPS: {:.1}", app.fps), Style::default().fg(TEXT_COLOR))),
        Line::from(Span::styled(
            format!("Active: {}", sim.active_count()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(
            format!("Settled: {}", sim.settled_count()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(format!("Tick: {}", sim.ticks), Style::default().fg(DIM_TEXT_COLOR))),
        Line::from(Span::styled(status_text, Style::default().fg(status_color))),
    ];

    if let Some(recorder) = &app.recorder {
        content.push(Line::from(Span::styled(
            format!("{} frames", recorder.frame_count()),
            Style::default().fg(DIM_TEXT_COLOR),
        )));
    } else if let Some(status) = &app.status {
        content.push(Line::from(Span::styled(status.as_str(), Style::default().fg(DIM_TEXT_COLOR))));
    }

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let settings = &app.simulation.settings;

    let content = vec![
        Line::from(vec![
            Span::styled(
                if app.focus == Focus::Palette { "> Color: " } else { "  Color: " },
                Style::default().fg(if app.focus == Focus::Palette {
                    HIGHLIGHT_COLOR
                } else {
                    TEXT_COLOR
                }),
            ),
            Span::styled(app.palette.name(), Style::default().fg(app.palette.color())),
        ]),
        make_line("Speed", format!("{}", app.ticks_per_frame), app.focus == Focus::Speed),
        make_line("Brush", format!("{}", app.brush_size), app.focus == Focus::Brush),
        make_line("Rain", format!("{}", settings.rain_rate), app.focus == Focus::Rain),
        make_line("Floor", settings.floor_behavior.name().to_string(), app.focus == Focus::Floor),
        make_line("Edges", settings.edge_behavior.name().to_string(), app.focus == Focus::Edges),
    ];

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2); // minus borders
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0
    } else if focus_line >= visible_height {
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let grid = format!(
        "{}x{} d{}",
        app.simulation.width(),
        app.simulation.height(),
        app.simulation.index().depth()
    );

    let content = vec![
        make_control("Mouse", "paint sand".to_string()),
        make_control("Space", "pause/resume".to_string()),
        make_control(".", "single step".to_string()),
        make_control("C", format!("color: {}", app.palette.name())),
        make_control("+/-", "speed".to_string()),
        make_control("[/]", "brush size".to_string()),
        make_control("Tab", "select param".to_string()),
        make_control("R", "reset".to_string()),
        make_control("P", "save png".to_string()),
        make_control("G", "record gif".to_string()),
        make_control("W", "save config".to_string()),
        make_control("V", "fullscreen".to_string()),
        make_control("H", "help".to_string()),
        make_control("Q", "quit".to_string()),
        Line::from(Span::styled(format!("  {}", grid), desc_style)),
    ];

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = braille::render_to_braille(&app.simulation, inner.width, inner.height);

    let buffer = frame.buffer_mut();
    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buffer.cell_mut((x, y)) {
                target.set_char(cell.char).set_fg(cell.color);
            }
        }
    }
}

/// Help dialog rectangle, centered within the canvas
fn help_area(area: Rect, fullscreen: bool) -> Rect {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if fullscreen { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if fullscreen {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(32);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    }
}

fn help_content() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled("FALLING SAND", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Paint with the mouse. Each grain falls straight down, or slides down-left, then down-right, when the cell below is taken. A grain that cannot move for a few ticks settles for good."),
        Line::from(""),
        Line::from(Span::styled("PARAMETERS (Tab, then Up/Down):", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from(""),
        Line::from(Span::styled("Color / Speed / Brush", Style::default().fg(TEXT_COLOR))),
        Line::from("Paint color, ticks per frame, brush radius in cells"),
        Line::from(""),
        Line::from(Span::styled("Rain", Style::default().fg(TEXT_COLOR))),
        Line::from("Grains dropped along the top row every tick"),
        Line::from(""),
        Line::from(Span::styled("Floor", Style::default().fg(TEXT_COLOR))),
        Line::from("Settle: grains on the bottom row settle normally. Hold: they stay active forever"),
        Line::from(""),
        Line::from(Span::styled("Edges", Style::default().fg(TEXT_COLOR))),
        Line::from("Wall: the grid sides block sliding. Wrap: slides continue on the other side"),
        Line::from(""),
        Line::from(Span::styled("EXPORT:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("P=PNG snapshot, G=start/stop GIF recording, W=save settings"),
        Line::from(""),
        Line::from(Span::styled("BASIC CONTROLS:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("Space=Pause, .=Step, R=Reset, C=Color, V=Fullscreen, +/-=Speed, [/]=Brush, Q=Quit"),
        Line::from(""),
    ]
}

/// Rows a line takes when word-wrapped to `width` columns
fn wrapped_rows(line: &Line, width: usize) -> usize {
    let mut rows = 1;
    let mut used = 0;
    for span in &line.spans {
        for word in span.content.split_whitespace() {
            let len = word.chars().count();
            if used > 0 && used + 1 + len <= width {
                used += 1 + len;
                continue;
            }
            if used > 0 {
                rows += 1;
            }
            // Words longer than the line break mid-word
            rows += len.saturating_sub(1) / width;
            used = (len - 1) % width + 1;
        }
    }
    rows
}

/// Furthest the help text can scroll inside a frame of `area`
pub fn help_max_scroll(area: Rect, fullscreen: bool) -> u16 {
    let help = help_area(area, fullscreen);
    let text_width = help.width.saturating_sub(2).max(1) as usize;
    let visible_height = help.height.saturating_sub(2); // minus borders

    let rows: usize = help_content()
        .iter()
        .map(|line| wrapped_rows(line, text_width))
        .sum();
    (rows as u16).saturating_sub(visible_height)
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let help_area = help_area(area, app.fullscreen_mode);
    frame.render_widget(Clear, help_area);

    let is_scrollable = help_max_scroll(area, app.fullscreen_mode) > 0;

    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(help_content())
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::config::AppConfig;
    use crate::settings::SimulationSettings;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_canvas_area_excludes_sidebar_and_border() {
        let area = Rect::new(0, 0, 100, 30);
        assert_eq!(canvas_area(area, false), Rect::new(SIDEBAR_WIDTH + 1, 1, 100 - SIDEBAR_WIDTH - 2, 28));
        assert_eq!(canvas_area(area, true), Rect::new(1, 1, 98, 28));
    }

    #[test]
    fn test_canvas_area_tiny_terminal() {
        let area = Rect::new(0, 0, 10, 1);
        let canvas = canvas_area(area, false);
        assert_eq!(canvas.width, 0);
        assert_eq!(canvas.height, 0);
    }

    #[test]
    fn test_wrapped_rows_breaks_on_words() {
        assert_eq!(wrapped_rows(&Line::from(""), 10), 1);
        assert_eq!(wrapped_rows(&Line::from("one two"), 10), 1);
        // "one two" fits, "three" goes to a new row
        assert_eq!(wrapped_rows(&Line::from("one two three"), 10), 2);
        assert_eq!(wrapped_rows(&Line::from("abcdefghijklmnopqrstuvwxy"), 10), 3);
    }

    #[test]
    fn test_help_scroll_stops_at_last_line() {
        let area = Rect::new(0, 0, 60, 12);
        let max_scroll = help_max_scroll(area, true);
        assert!(max_scroll > 0);
        assert!(help_max_scroll(Rect::new(0, 0, 60, 40), true) < max_scroll);

        let config = AppConfig {
            settings: SimulationSettings::for_grid(20, 20),
            ..AppConfig::default()
        };
        let mut app = App::new(&config, Some(1));
        app.fullscreen_mode = true;
        app.toggle_help();
        for _ in 0..100 {
            app.scroll_help_down(max_scroll);
        }
        assert_eq!(app.help_scroll, max_scroll);

        let mut terminal = Terminal::new(TestBackend::new(area.width, area.height)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = (0..area.height)
            .map(|y| (0..area.width).map(|x| buffer[(x, y)].symbol()).collect())
            .collect();
        assert!(rows.iter().any(|row| row.contains("Q=Quit")), "{:#?}", rows);
    }

    #[test]
    fn test_render_draws_particles() {
        let config = AppConfig {
            settings: SimulationSettings::for_grid(20, 40),
            ..AppConfig::default()
        };
        let mut app = App::new(&config, Some(1));
        app.fullscreen_mode = true;
        app.simulation.place(0, 0, Palette::Green);

        // 10x10 canvas inside a 12x12 terminal = 20x40 dots
        let mut terminal = Terminal::new(TestBackend::new(12, 12)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let cell = &terminal.backend().buffer()[(1, 1)];
        assert_eq!(cell.symbol(), "\u{2801}");
        assert_eq!(cell.fg, Palette::Green.color());
    }
}
