use crate::color::blend;
use crate::simulation::SandSimulation;
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// Smallest grid picked automatically for a tiny terminal
const MIN_GRID_SIZE: usize = 16;

/// A single rendered Braille cell with position and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Grid cells per Braille dot along each axis
fn scale(simulation: &SandSimulation, canvas_width: u16, canvas_height: u16) -> (f32, f32) {
    let braille_width = (canvas_width as usize * 2).max(1);
    let braille_height = (canvas_height as usize * 4).max(1);
    (
        simulation.width() as f32 / braille_width as f32,
        simulation.height() as f32 / braille_height as f32,
    )
}

/// Render active and settled particles to Braille characters.
/// A character's color is the average of the particles under its dots.
pub fn render_to_braille(simulation: &SandSimulation, canvas_width: u16, canvas_height: u16) -> Vec<BrailleCell> {
    let sim_width = simulation.width();
    let sim_height = simulation.height();
    let (scale_x, scale_y) = scale(simulation, canvas_width, canvas_height);
    let raster = simulation.raster();

    let mut cells = Vec::new();
    let mut dot_colors = Vec::with_capacity(8);

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let mut pattern: u8 = 0;
            dot_colors.clear();

            let base_bx = cx as usize * 2;
            let base_by = cy as usize * 4;

            for dx in 0..2 {
                for dy in 0..4 {
                    let sim_x = ((base_bx + dx) as f32 * scale_x) as usize;
                    let sim_y = ((base_by + dy) as f32 * scale_y) as usize;
                    if sim_x >= sim_width || sim_y >= sim_height {
                        continue;
                    }

                    if let Some(color) = raster[sim_y * sim_width + sim_x] {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        dot_colors.push(color.rgb());
                    }
                }
            }

            // Only emit cells that have at least one dot
            if pattern != 0 {
                cells.push(BrailleCell {
                    x: cx,
                    y: cy,
                    char: char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' '),
                    color: blend(&dot_colors),
                });
            }
        }
    }

    cells
}

/// Map a character cell of the canvas to the grid cell under its top-left dot
pub fn canvas_to_grid(simulation: &SandSimulation, canvas_width: u16, canvas_height: u16, cx: u16, cy: u16) -> (i32, i32) {
    let (scale_x, scale_y) = scale(simulation, canvas_width, canvas_height);
    (
        (cx as f32 * 2.0 * scale_x) as i32,
        (cy as f32 * 4.0 * scale_y) as i32,
    )
}

/// Calculate simulation grid size matching a canvas at Braille resolution
/// Returns (width, height) for the simulation grid
pub fn calculate_simulation_size(canvas_width: u16, canvas_height: u16) -> (usize, usize) {
    let width = (canvas_width as usize * 2).max(MIN_GRID_SIZE);
    let height = (canvas_height as usize * 4).max(MIN_GRID_SIZE);
    (width, height)
}
