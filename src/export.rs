use crate::color::Palette;
use crate::error::{Result, SandError};
use crate::simulation::SandSimulation;
use image::{Rgb, RgbImage};
use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Recording stops accepting frames past this many
pub const MAX_GIF_FRAMES: usize = 600;
/// Frame delay in hundredths of a second
const GIF_FRAME_DELAY: u16 = 3;
const BACKGROUND: [u8; 3] = [0, 0, 0];

/// `falling-sand-<tick>.<ext>` in the working directory
pub fn export_path(tick: u64, extension: &str) -> PathBuf {
    PathBuf::from(format!("falling-sand-{:06}.{}", tick, extension))
}

/// Paint every particle as a `density` x `density` block on black
pub fn render_image(sim: &SandSimulation, density: u32) -> RgbImage {
    let density = density.max(1);
    let width = sim.width();
    let raster = sim.raster();

    RgbImage::from_fn(
        width as u32 * density,
        sim.height() as u32 * density,
        |px, py| {
            let cell = (py / density) as usize * width + (px / density) as usize;
            Rgb(raster[cell].map_or(BACKGROUND, |c| c.rgb()))
        },
    )
}

/// Save a PNG snapshot of the current grid
pub fn save_png(sim: &SandSimulation, density: u32, path: &Path) -> Result<()> {
    render_image(sim, density).save(path)?;
    tracing::info!(path = %path.display(), tick = sim.ticks, "saved snapshot");
    Ok(())
}

/// Global GIF palette: background, then `Palette::ALL`, padded to 8 entries
fn gif_palette() -> Vec<u8> {
    let mut colors = BACKGROUND.to_vec();
    for p in Palette::ALL {
        colors.extend_from_slice(&p.rgb());
    }
    colors.resize(8 * 3, 0);
    colors
}

/// Collects frames at cell resolution and encodes them on `finish`
pub struct GifRecorder {
    path: PathBuf,
    width: usize,
    height: usize,
    density: usize,
    frames: Vec<Vec<u8>>,
}

impl GifRecorder {
    pub fn new(path: PathBuf, width: usize, height: usize, density: u32) -> Result<Self> {
        let largest = width.max(height).max(1);
        if largest > u16::MAX as usize {
            return Err(SandError::InvalidSettings(format!(
                "{}x{} grid is too large for a GIF",
                width, height
            )));
        }
        let density = (density as usize).clamp(1, (u16::MAX as usize / largest).max(1));
        tracing::info!(path = %path.display(), "started gif recording");
        Ok(Self {
            path,
            width,
            height,
            density,
            frames: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= MAX_GIF_FRAMES
    }

    /// Grab the current grid. Returns false once the recording is full.
    pub fn capture(&mut self, sim: &SandSimulation) -> bool {
        if self.is_full() {
            return false;
        }
        debug_assert_eq!((sim.width(), sim.height()), (self.width, self.height));
        let frame = sim
            .raster()
            .into_iter()
            .map(|cell| cell.map_or(0, |c| c.index() as u8 + 1))
            .collect();
        self.frames.push(frame);
        true
    }

    /// Scale one cell-resolution frame up by `density`
    fn scale(&self, cells: &[u8]) -> Vec<u8> {
        let out_width = self.width * self.density;
        let mut pixels = Vec::with_capacity(out_width * self.height * self.density);
        for row in cells.chunks(self.width) {
            let mut line = Vec::with_capacity(out_width);
            for &cell in row {
                line.extend(std::iter::repeat(cell).take(self.density));
            }
            for _ in 0..self.density {
                pixels.extend_from_slice(&line);
            }
        }
        pixels
    }

    /// Encode all captured frames, returning the written path
    pub fn finish(self) -> Result<PathBuf> {
        let width = (self.width * self.density) as u16;
        let height = (self.height * self.density) as u16;

        let file = File::create(&self.path)?;
        let mut encoder = gif::Encoder::new(file, width, height, &gif_palette())?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        for cells in &self.frames {
            let pixels = self.scale(cells);
            let mut frame = gif::Frame::default();
            frame.width = width;
            frame.height = height;
            frame.delay = GIF_FRAME_DELAY;
            frame.buffer = Cow::Borrowed(&pixels);
            encoder.write_frame(&frame)?;
        }

        tracing::info!(path = %self.path.display(), frames = self.frames.len(), "saved gif");
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimulationSettings;
    use tempfile::TempDir;

    fn small_sim() -> SandSimulation {
        let mut sim = SandSimulation::with_seed(SimulationSettings::for_grid(6, 4), 1);
        sim.place(1, 0, Palette::Blue);
        sim.place(5, 3, Palette::Yellow);
        sim
    }

    #[test]
    fn test_render_image_scales_cells() {
        let sim = small_sim();
        let img = render_image(&sim, 3);

        assert_eq!(img.dimensions(), (18, 12));
        assert_eq!(img.get_pixel(3, 0), &Rgb(Palette::Blue.rgb()));
        assert_eq!(img.get_pixel(5, 2), &Rgb(Palette::Blue.rgb()));
        assert_eq!(img.get_pixel(17, 11), &Rgb(Palette::Yellow.rgb()));
        assert_eq!(img.get_pixel(0, 0), &Rgb(BACKGROUND));
    }

    #[test]
    fn test_save_png_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.png");
        save_png(&small_sim(), 2, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (12, 8));
        assert_eq!(loaded.get_pixel(10, 6), &Rgb(Palette::Yellow.rgb()));
    }

    #[test]
    fn test_gif_recording_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rec.gif");
        let mut sim = small_sim();
        let mut recorder = GifRecorder::new(path.clone(), 6, 4, 2).unwrap();

        for _ in 0..3 {
            assert!(recorder.capture(&sim));
            sim.step();
        }
        assert_eq!(recorder.frame_count(), 3);

        let written = recorder.finish().unwrap();
        assert_eq!(written, path);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
    }

    #[test]
    fn test_gif_recorder_caps_frames() {
        let sim = small_sim();
        let mut recorder = GifRecorder::new(PathBuf::from("unused.gif"), 6, 4, 1).unwrap();
        for _ in 0..MAX_GIF_FRAMES {
            assert!(recorder.capture(&sim));
        }
        assert!(recorder.is_full());
        assert!(!recorder.capture(&sim));
    }

    #[test]
    fn test_scale_repeats_rows_and_columns() {
        let recorder = GifRecorder::new(PathBuf::from("unused.gif"), 2, 1, 2).unwrap();
        assert_eq!(recorder.scale(&[1, 2]), vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn test_export_path_is_zero_padded() {
        assert_eq!(export_path(42, "png"), PathBuf::from("falling-sand-000042.png"));
    }
}
