use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Particle colors the user can paint with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    White,
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
}

impl Palette {
    pub const ALL: [Palette; 5] = [
        Palette::White,
        Palette::Red,
        Palette::Blue,
        Palette::Green,
        Palette::Yellow,
    ];

    pub fn name(&self) -> &str {
        match self {
            Palette::White => "White",
            Palette::Red => "Red",
            Palette::Blue => "Blue",
            Palette::Green => "Green",
            Palette::Yellow => "Yellow",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Palette::White => Palette::Red,
            Palette::Red => Palette::Blue,
            Palette::Blue => Palette::Green,
            Palette::Green => Palette::Yellow,
            Palette::Yellow => Palette::White,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Palette::White => Palette::Yellow,
            Palette::Red => Palette::White,
            Palette::Blue => Palette::Red,
            Palette::Green => Palette::Blue,
            Palette::Yellow => Palette::Green,
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Palette::White => [255, 255, 255],
            Palette::Red => [255, 0, 0],
            Palette::Blue => [0x11, 0x66, 0xFF],
            Palette::Green => [0, 255, 0],
            Palette::Yellow => [255, 255, 0],
        }
    }

    pub fn color(&self) -> Color {
        let [r, g, b] = self.rgb();
        Color::Rgb(r, g, b)
    }

    /// Position in [`Palette::ALL`], used as the GIF color index offset
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

/// Average several RGB triples into one terminal color
pub fn blend(colors: &[[u8; 3]]) -> Color {
    if colors.is_empty() {
        return Color::Reset;
    }
    let mut sum = [0u32; 3];
    for rgb in colors {
        for (acc, &channel) in sum.iter_mut().zip(rgb) {
            *acc += channel as u32;
        }
    }
    let n = colors.len() as u32;
    Color::Rgb((sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_visits_every_color() {
        let mut palette = Palette::White;
        for expected in Palette::ALL.iter().skip(1) {
            palette = palette.next();
            assert_eq!(palette, *expected);
        }
        assert_eq!(palette.next(), Palette::White);

        for p in Palette::ALL {
            assert_eq!(p.next().prev(), p);
        }
    }

    #[test]
    fn test_index_matches_all() {
        for (i, p) in Palette::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_blend_averages_channels() {
        assert_eq!(blend(&[[255, 0, 0], [0, 0, 255]]), Color::Rgb(127, 0, 127));
        assert_eq!(blend(&[Palette::Blue.rgb()]), Color::Rgb(0x11, 0x66, 0xFF));
        assert_eq!(blend(&[]), Color::Reset);
    }
}
