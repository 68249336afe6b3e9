use crate::braille;
use crate::color::Palette;
use crate::config::{AppConfig, CONFIG_VERSION};
use crate::export::{self, GifRecorder};
use crate::simulation::SandSimulation;
use ratatui::layout::Rect;
use std::path::PathBuf;
use std::time::Instant;

pub const MAX_TICKS_PER_FRAME: usize = 20;
pub const MAX_BRUSH_SIZE: i32 = 5;
pub const MAX_DENSITY: u32 = 8;

/// Focus state for parameter editing in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    None,
    Palette,
    Speed,
    Brush,
    Rain,
    Floor,
    Edges,
    // Controls box (not a param)
    Controls,
}

impl Focus {
    /// Tab cycles through parameters in display order
    pub fn next(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Palette,
            Focus::Palette => Focus::Speed,
            Focus::Speed => Focus::Brush,
            Focus::Brush => Focus::Rain,
            Focus::Rain => Focus::Floor,
            Focus::Floor => Focus::Edges,
            Focus::Edges => Focus::Palette, // Loop back
        }
    }

    /// Shift+Tab cycles through parameters in reverse order
    pub fn prev(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Edges,
            Focus::Palette => Focus::Edges, // Loop back
            Focus::Speed => Focus::Palette,
            Focus::Brush => Focus::Speed,
            Focus::Rain => Focus::Brush,
            Focus::Floor => Focus::Rain,
            Focus::Edges => Focus::Floor,
        }
    }

    /// Get the line index in the parameters box for this focus
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::None | Focus::Controls => 0,
            Focus::Palette => 0,
            Focus::Speed => 1,
            Focus::Brush => 2,
            Focus::Rain => 3,
            Focus::Floor => 4,
            Focus::Edges => 5,
        }
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }
}

/// Exponential moving average of frames per second, rounded to one decimal
pub fn smooth_fps(previous: f32, frame_secs: f32) -> f32 {
    if frame_secs <= 0.0 {
        return previous;
    }
    let fps = previous * 0.9 + 0.1 * (1.0 / frame_secs);
    (fps * 10.0).round() / 10.0
}

/// Main application state
pub struct App {
    pub simulation: SandSimulation,
    pub palette: Palette,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub ticks_per_frame: usize,
    pub brush_size: i32,
    pub density: u32,
    pub show_help: bool,
    pub help_scroll: u16,
    pub fps: f32,
    last_frame: Option<Instant>,
    /// Inner canvas area in terminal cells, used to map the pointer
    pub canvas: Rect,
    last_pointer: Option<(i32, i32)>,
    pub recorder: Option<GifRecorder>,
    /// Last export/save result shown in the status box
    pub status: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(config: &AppConfig, seed: Option<u64>) -> Self {
        let settings = config.settings.clone();
        let mut simulation = match seed {
            Some(seed) => SandSimulation::with_seed(settings, seed),
            None => SandSimulation::new(settings),
        };
        simulation.rain_color = config.palette;

        Self {
            simulation,
            palette: config.palette,
            focus: Focus::Controls,
            fullscreen_mode: false,
            ticks_per_frame: config.ticks_per_frame.clamp(1, MAX_TICKS_PER_FRAME),
            brush_size: config.brush_size.clamp(0, MAX_BRUSH_SIZE),
            density: config.density.clamp(1, MAX_DENSITY),
            show_help: false,
            help_scroll: 0,
            fps: 0.0,
            last_frame: None,
            canvas: Rect::default(),
            last_pointer: None,
            recorder: None,
            status: None,
            config_path: None,
        }
    }

    /// Snapshot of the current settings for saving
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            version: CONFIG_VERSION,
            settings: self.simulation.settings.clone(),
            palette: self.palette,
            ticks_per_frame: self.ticks_per_frame,
            brush_size: self.brush_size,
            density: self.density,
        }
    }

    /// Run simulation ticks for the current frame
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            self.fps = smooth_fps(self.fps, now.duration_since(last).as_secs_f32());
        }
        self.last_frame = Some(now);

        if !self.simulation.paused {
            for _ in 0..self.ticks_per_frame {
                self.simulation.step();
            }
        }
        self.capture_frame();
    }

    /// Advance exactly one tick while paused
    pub fn step_once(&mut self) {
        if self.simulation.paused {
            self.simulation.step();
        }
    }

    fn capture_frame(&mut self) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if !recorder.capture(&self.simulation) {
            self.stop_recording();
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_up(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Palette => self.cycle_palette(),
            Focus::Speed => self.increase_speed(),
            Focus::Brush => self.adjust_brush(1),
            Focus::Rain => self.simulation.settings.adjust_rain_rate(1),
            Focus::Floor => self.simulation.settings.cycle_floor_behavior(),
            Focus::Edges => self.simulation.settings.cycle_edge_behavior(),
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_down(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Palette => self.cycle_palette_prev(),
            Focus::Speed => self.decrease_speed(),
            Focus::Brush => self.adjust_brush(-1),
            Focus::Rain => self.simulation.settings.adjust_rain_rate(-1),
            // Two-state toggles
            Focus::Floor => self.simulation.settings.cycle_floor_behavior(),
            Focus::Edges => self.simulation.settings.cycle_edge_behavior(),
        }
    }

    /// Cycle to next focus
    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.simulation.toggle_pause();
    }

    /// Reset simulation
    pub fn reset(&mut self) {
        self.simulation.reset();
        self.last_pointer = None;
    }

    pub fn cycle_palette(&mut self) {
        self.palette = self.palette.next();
        self.simulation.rain_color = self.palette;
    }

    pub fn cycle_palette_prev(&mut self) {
        self.palette = self.palette.prev();
        self.simulation.rain_color = self.palette;
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    /// Scroll help content up
    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    /// Scroll help content down
    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    /// Increase simulation speed
    pub fn increase_speed(&mut self) {
        self.ticks_per_frame = (self.ticks_per_frame + 1).min(MAX_TICKS_PER_FRAME);
    }

    /// Decrease simulation speed
    pub fn decrease_speed(&mut self) {
        self.ticks_per_frame = self.ticks_per_frame.saturating_sub(1).max(1);
    }

    pub fn adjust_brush(&mut self, delta: i32) {
        self.brush_size = (self.brush_size + delta).clamp(0, MAX_BRUSH_SIZE);
    }

    // === Pointer painting ===

    /// Grid cell under a terminal position, if it is on the canvas
    fn pointer_to_grid(&self, column: u16, row: u16) -> Option<(i32, i32)> {
        let canvas = self.canvas;
        let inside = column >= canvas.x
            && column < canvas.x + canvas.width
            && row >= canvas.y
            && row < canvas.y + canvas.height;
        if !inside {
            return None;
        }
        Some(braille::canvas_to_grid(
            &self.simulation,
            canvas.width,
            canvas.height,
            column - canvas.x,
            row - canvas.y,
        ))
    }

    /// Left button pressed: paint under the pointer
    pub fn pointer_down(&mut self, column: u16, row: u16) {
        self.last_pointer = self.pointer_to_grid(column, row);
        if let Some(cell) = self.last_pointer {
            self.simulation.paint_line(cell, cell, self.brush_size, self.palette);
        }
    }

    /// Pointer dragged: paint along the line from the previous position
    pub fn pointer_drag(&mut self, column: u16, row: u16) {
        let Some(cell) = self.pointer_to_grid(column, row) else {
            self.last_pointer = None;
            return;
        };
        let from = self.last_pointer.unwrap_or(cell);
        self.simulation.paint_line(from, cell, self.brush_size, self.palette);
        self.last_pointer = Some(cell);
    }

    pub fn pointer_up(&mut self) {
        self.last_pointer = None;
    }

    // === Export ===

    /// Write a PNG snapshot of the grid
    pub fn export_png(&mut self) {
        let path = export::export_path(self.simulation.ticks, "png");
        self.status = Some(match export::save_png(&self.simulation, self.density, &path) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot failed");
                format!("Snapshot failed: {}", e)
            }
        });
    }

    /// Start a GIF recording, or finish the running one
    pub fn toggle_recording(&mut self) {
        if self.recorder.is_some() {
            self.stop_recording();
            return;
        }
        let path = export::export_path(self.simulation.ticks, "gif");
        match GifRecorder::new(
            path,
            self.simulation.width(),
            self.simulation.height(),
            self.density,
        ) {
            Ok(recorder) => {
                self.status = Some(format!("Recording {}", recorder.path().display()));
                self.recorder = Some(recorder);
            }
            Err(e) => self.status = Some(format!("Recording failed: {}", e)),
        }
    }

    fn stop_recording(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        self.status = Some(match recorder.finish() {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => {
                tracing::warn!(error = %e, "gif encoding failed");
                format!("Recording failed: {}", e)
            }
        });
    }

    /// Save current settings to the config file
    pub fn save_config(&mut self) {
        let path = match self.config_path.clone() {
            Some(path) => Ok(path),
            None => AppConfig::default_path(),
        };
        let result = path.and_then(|path| {
            self.to_config().save_to_file(&path)?;
            Ok(path)
        });
        self.status = Some(match result {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => format!("Save failed: {}", e),
        });
    }

    /// Finish any running recording before exit
    pub fn shutdown(&mut self) {
        self.stop_recording();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FloorBehavior, SimulationSettings};
    use tempfile::TempDir;

    fn app() -> App {
        let config = AppConfig {
            settings: SimulationSettings::for_grid(40, 80),
            ..AppConfig::default()
        };
        let mut app = App::new(&config, Some(5));
        // 10x10 canvas starting at (23, 1): 2 grid cells per dot
        app.canvas = Rect::new(23, 1, 10, 10);
        app
    }

    #[test]
    fn test_focus_cycle_round_trip() {
        let mut focus = Focus::Controls;
        for _ in 0..6 {
            focus = focus.next();
            assert!(focus.is_param());
            assert_eq!(focus.next().prev(), focus);
        }
        assert_eq!(focus.next(), Focus::Palette);
    }

    #[test]
    fn test_smooth_fps() {
        assert_eq!(smooth_fps(60.0, 1.0 / 60.0), 60.0);
        assert_eq!(smooth_fps(0.0, 0.1), 1.0);
        assert_eq!(smooth_fps(30.0, 0.0), 30.0);
    }

    #[test]
    fn test_pointer_outside_canvas_ignored() {
        let mut app = app();
        app.pointer_down(0, 0);
        app.pointer_drag(5, 5);
        assert_eq!(app.simulation.particle_count(), 0);
    }

    #[test]
    fn test_drag_paints_connected_line() {
        let mut app = app();
        app.pointer_down(23, 1);
        app.pointer_drag(26, 1);
        app.pointer_up();

        // (0,0) to (12,0) in grid cells
        assert_eq!(app.simulation.particle_count(), 13);
        for x in 0..=12 {
            let p = app.simulation.particle_at(x, 0).unwrap();
            assert_eq!(p.color, app.palette);
        }
    }

    #[test]
    fn test_repeated_paint_does_not_duplicate() {
        let mut app = app();
        app.brush_size = 1;
        app.pointer_down(25, 3);
        app.pointer_drag(25, 3);
        assert_eq!(app.simulation.particle_count(), 9);
    }

    #[test]
    fn test_tick_respects_pause_and_speed() {
        let mut app = app();
        app.ticks_per_frame = 3;
        app.tick();
        assert_eq!(app.simulation.ticks, 3);

        app.toggle_pause();
        app.tick();
        assert_eq!(app.simulation.ticks, 3);
        app.step_once();
        assert_eq!(app.simulation.ticks, 4);
    }

    #[test]
    fn test_adjust_focused_params() {
        let mut app = app();
        app.focus = Focus::Rain;
        app.adjust_focused_up();
        assert_eq!(app.simulation.settings.rain_rate, 1);

        app.focus = Focus::Floor;
        app.adjust_focused_down();
        assert_eq!(app.simulation.settings.floor_behavior, FloorBehavior::Hold);

        app.focus = Focus::Palette;
        let before = app.palette;
        app.adjust_focused_up();
        assert_eq!(app.palette, before.next());
        assert_eq!(app.simulation.rain_color, app.palette);

        app.focus = Focus::Brush;
        for _ in 0..10 {
            app.adjust_focused_up();
        }
        assert_eq!(app.brush_size, MAX_BRUSH_SIZE);
    }

    #[test]
    fn test_to_config_reflects_state() {
        let mut app = app();
        app.cycle_palette();
        app.increase_speed();
        let config = app.to_config();

        assert_eq!(config.palette, app.palette);
        assert_eq!(config.ticks_per_frame, 2);
        assert_eq!(config.settings, app.simulation.settings);
    }

    #[test]
    fn test_save_config_to_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut app = app();
        app.config_path = Some(path.clone());
        app.save_config();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, app.to_config());
        assert!(app.status.unwrap().starts_with("Saved"));
    }
}
