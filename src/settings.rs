use crate::error::{Result, SandError};
use crate::quadtree::{self, MAX_DEPTH, MIN_DEPTH};
use serde::{Deserialize, Serialize};

/// Grid size used when nothing else decides it
pub const DEFAULT_GRID_SIZE: usize = 512;
/// Largest width or height accepted for a grid
pub const MAX_GRID_SIZE: usize = 4096;
/// Ticks without movement before a particle settles
pub const DEFAULT_REST_THRESHOLD: u32 = 5;
/// Upper bound for particles dropped by the rain spawner per tick
pub const MAX_RAIN_RATE: usize = 32;

/// What a particle on the bottom row does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloorBehavior {
    /// The floor blocks like any other particle, so bottom-row particles
    /// rest and settle normally
    #[default]
    Settle,
    /// Bottom-row particles are skipped every tick and stay active forever
    Hold,
}

impl FloorBehavior {
    pub fn name(&self) -> &str {
        match self {
            FloorBehavior::Settle => "Settle",
            FloorBehavior::Hold => "Hold",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FloorBehavior::Settle => FloorBehavior::Hold,
            FloorBehavior::Hold => FloorBehavior::Settle,
        }
    }
}

/// What diagonal moves do at the left and right grid edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeBehavior {
    /// Columns outside the grid count as occupied
    #[default]
    Wall,
    /// Diagonal targets wrap to the opposite column
    Wrap,
}

impl EdgeBehavior {
    pub fn name(&self) -> &str {
        match self {
            EdgeBehavior::Wall => "Wall",
            EdgeBehavior::Wrap => "Wrap",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            EdgeBehavior::Wall => EdgeBehavior::Wrap,
            EdgeBehavior::Wrap => EdgeBehavior::Wall,
        }
    }
}

/// Simulation settings.
///
/// Grid size, index depth and rest threshold are fixed once a simulation
/// is built; the behaviors and rain rate may change between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub width: usize,
    pub height: usize,
    /// Quadtree depth (2-10)
    pub depth: usize,
    /// Ticks without moving before a particle settles (>= 1)
    pub rest_threshold: u32,
    pub floor_behavior: FloorBehavior,
    pub edge_behavior: EdgeBehavior,
    /// Particles dropped along the top row per tick (0-32, 0 = off)
    pub rain_rate: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::for_grid(DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE)
    }
}

impl SimulationSettings {
    /// Defaults for a `width` x `height` grid, with a depth sized to it
    pub fn for_grid(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: quadtree::default_depth(width, height),
            rest_threshold: DEFAULT_REST_THRESHOLD,
            floor_behavior: FloorBehavior::default(),
            edge_behavior: EdgeBehavior::default(),
            rain_rate: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(SandError::InvalidSettings(format!(
                "grid must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_GRID_SIZE || self.height > MAX_GRID_SIZE {
            return Err(SandError::InvalidSettings(format!(
                "grid must be at most {}x{}, got {}x{}",
                MAX_GRID_SIZE, MAX_GRID_SIZE, self.width, self.height
            )));
        }
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.depth) {
            return Err(SandError::InvalidSettings(format!(
                "depth must be {}-{}, got {}",
                MIN_DEPTH, MAX_DEPTH, self.depth
            )));
        }
        if self.rest_threshold == 0 {
            return Err(SandError::InvalidSettings(
                "rest threshold must be at least 1".to_string(),
            ));
        }
        if self.rain_rate > MAX_RAIN_RATE {
            return Err(SandError::InvalidSettings(format!(
                "rain rate must be 0-{}, got {}",
                MAX_RAIN_RATE, self.rain_rate
            )));
        }
        Ok(())
    }

    /// Adjust rain rate within bounds
    pub fn adjust_rain_rate(&mut self, delta: i32) {
        self.rain_rate = (self.rain_rate as i32 + delta).clamp(0, MAX_RAIN_RATE as i32) as usize;
    }

    pub fn cycle_floor_behavior(&mut self) {
        self.floor_behavior = self.floor_behavior.next();
    }

    pub fn cycle_edge_behavior(&mut self) {
        self.edge_behavior = self.edge_behavior.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_grid() {
        let settings = SimulationSettings::default();
        assert_eq!(settings.width, 512);
        assert_eq!(settings.height, 512);
        assert_eq!(settings.depth, 8);
        assert_eq!(settings.rest_threshold, 5);
        assert_eq!(settings.floor_behavior, FloorBehavior::Settle);
        assert_eq!(settings.edge_behavior, EdgeBehavior::Wall);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = SimulationSettings::for_grid(10, 10);
        settings.depth = 1;
        assert!(settings.validate().is_err());

        let mut settings = SimulationSettings::for_grid(10, 10);
        settings.rest_threshold = 0;
        assert!(settings.validate().is_err());

        let settings = SimulationSettings::for_grid(1, 10);
        assert!(settings.validate().is_err());

        let mut settings = SimulationSettings::for_grid(10, 10);
        settings.rain_rate = MAX_RAIN_RATE + 1;
        assert!(matches!(settings.validate(), Err(SandError::InvalidSettings(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_grid() {
        let mut settings = SimulationSettings::for_grid(600_000_000, 2);
        settings.depth = MIN_DEPTH;
        assert!(matches!(settings.validate(), Err(SandError::InvalidSettings(_))));

        let settings = SimulationSettings::for_grid(2, MAX_GRID_SIZE + 1);
        assert!(settings.validate().is_err());

        let settings = SimulationSettings::for_grid(MAX_GRID_SIZE, MAX_GRID_SIZE);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rain_rate_clamped() {
        let mut settings = SimulationSettings::default();
        settings.adjust_rain_rate(-3);
        assert_eq!(settings.rain_rate, 0);
        settings.adjust_rain_rate(100);
        assert_eq!(settings.rain_rate, MAX_RAIN_RATE);
    }

    #[test]
    fn test_behavior_cycles() {
        let mut settings = SimulationSettings::default();
        settings.cycle_floor_behavior();
        assert_eq!(settings.floor_behavior, FloorBehavior::Hold);
        settings.cycle_floor_behavior();
        assert_eq!(settings.floor_behavior, FloorBehavior::Settle);

        settings.cycle_edge_behavior();
        assert_eq!(settings.edge_behavior, EdgeBehavior::Wrap);
        assert_eq!(settings.edge_behavior.name(), "Wrap");
    }
}
