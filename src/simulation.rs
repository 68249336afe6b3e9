use crate::color::Palette;
use crate::quadtree::{Point, Quadtree};
use crate::settings::{EdgeBehavior, FloorBehavior, SimulationSettings};
use crate::store::PointId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A grain of sand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandParticle {
    pub x: i32,
    pub y: i32,
    pub color: Palette,
    /// Ticks this particle has failed to move (never reset)
    pub rest_count: u32,
}

impl SandParticle {
    pub fn new(x: i32, y: i32, color: Palette) -> Self {
        Self {
            x,
            y,
            color,
            rest_count: 0,
        }
    }
}

impl Point for SandParticle {
    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }
}

/// Counts collected during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub spawned: usize,
    pub moved: usize,
    pub rested: usize,
    pub settled: usize,
}

/// What happened to one active particle during a tick
enum Outcome {
    Moved,
    Rested,
    Settled,
    /// Skipped entirely (bottom row under `FloorBehavior::Hold`)
    Held,
}

/// Falling-sand simulation state
pub struct SandSimulation {
    index: Quadtree<SandParticle>,
    pub settings: SimulationSettings,
    pub paused: bool,
    pub ticks: u64,
    /// Color used by the rain spawner
    pub rain_color: Palette,
    rng: StdRng,
}

impl SandSimulation {
    /// Build an empty simulation. `settings` must already be validated.
    pub fn new(settings: SimulationSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Like [`SandSimulation::new`] with a reproducible rain sequence
    pub fn with_seed(settings: SimulationSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: SimulationSettings, rng: StdRng) -> Self {
        debug_assert!(settings.validate().is_ok(), "{:?}", settings.validate());
        tracing::info!(
            width = settings.width,
            height = settings.height,
            depth = settings.depth,
            rest_threshold = settings.rest_threshold,
            "building simulation"
        );
        Self {
            index: Quadtree::new(settings.width, settings.height, settings.depth),
            settings,
            paused: false,
            ticks: 0,
            rain_color: Palette::default(),
            rng,
        }
    }

    pub fn width(&self) -> usize {
        self.index.width()
    }

    pub fn height(&self) -> usize {
        self.index.height()
    }

    pub fn index(&self) -> &Quadtree<SandParticle> {
        &self.index
    }

    #[cfg(test)]
    pub fn particle_at(&self, x: i32, y: i32) -> Option<&SandParticle> {
        if !self.index.contains(x, y) {
            return None;
        }
        self.index.lookup(x, y).map(|id| self.index.get(id))
    }

    pub fn active_count(&self) -> usize {
        self.index.store().active().len()
    }

    pub fn settled_count(&self) -> usize {
        self.index.store().settled().len()
    }

    pub fn particle_count(&self) -> usize {
        self.index.store().len()
    }

    /// Color of every cell, row-major, `None` where empty
    pub fn raster(&self) -> Vec<Option<Palette>> {
        let width = self.width();
        let mut cells = vec![None; width * self.height()];
        for p in self.index.store().points() {
            cells[p.y as usize * width + p.x as usize] = Some(p.color);
        }
        cells
    }

    /// Drop a new particle at `(x, y)` if the cell is on the grid and free
    pub fn place(&mut self, x: i32, y: i32, color: Palette) -> Option<PointId> {
        if !self.index.contains(x, y) || self.index.is_occupied(x, y) {
            return None;
        }
        Some(self.index.insert(SandParticle::new(x, y, color)))
    }

    /// Paint a square brush of `radius` at every cell on the line from
    /// `from` to `to`. Returns how many particles were placed.
    pub fn paint_line(&mut self, from: (i32, i32), to: (i32, i32), radius: i32, color: Palette) -> usize {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs());
        let mut placed = 0;

        for i in 0..=steps {
            let (cx, cy) = if steps == 0 {
                from
            } else {
                (from.0 + dx * i / steps, from.1 + dy * i / steps)
            };
            for y in cy - radius..=cy + radius {
                for x in cx - radius..=cx + radius {
                    if self.place(x, y, color).is_some() {
                        placed += 1;
                    }
                }
            }
        }

        placed
    }

    /// Advance every active particle by one tick
    pub fn step(&mut self) -> StepReport {
        let mut report = StepReport {
            spawned: self.spawn_rain(),
            ..Default::default()
        };

        let active = self.index.store_mut().take_active();
        let mut kept = Vec::with_capacity(active.len());

        for id in active {
            match self.advance(id) {
                Outcome::Moved => {
                    report.moved += 1;
                    kept.push(id);
                }
                Outcome::Rested => {
                    report.rested += 1;
                    kept.push(id);
                }
                Outcome::Held => kept.push(id),
                Outcome::Settled => {
                    self.index.store_mut().settle(id);
                    report.settled += 1;
                }
            }
        }

        self.index.store_mut().restore_active(kept);
        self.ticks += 1;

        if report.settled > 0 {
            tracing::debug!(
                tick = self.ticks,
                spawned = report.spawned,
                moved = report.moved,
                rested = report.rested,
                settled = report.settled,
                active = self.active_count(),
                "particles settled"
            );
        }

        report
    }

    fn advance(&mut self, id: PointId) -> Outcome {
        let SandParticle { x, y, .. } = *self.index.get(id);
        let on_floor = y + 1 >= self.height() as i32;

        if on_floor && self.settings.floor_behavior == FloorBehavior::Hold {
            return Outcome::Held;
        }

        let target = if on_floor { None } else { self.free_cell_below(x, y) };
        if let Some((nx, ny)) = target {
            self.index.move_point(id, nx, ny);
            return Outcome::Moved;
        }

        let particle = self.index.get_mut(id);
        particle.rest_count += 1;
        if particle.rest_count >= self.settings.rest_threshold {
            Outcome::Settled
        } else {
            Outcome::Rested
        }
    }

    /// First free cell of straight down, down-left, down-right
    fn free_cell_below(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        let below = y + 1;
        [x, x - 1, x + 1]
            .into_iter()
            .filter_map(|column| self.resolve_column(column))
            .find(|&column| !self.index.is_occupied(column, below))
            .map(|column| (column, below))
    }

    /// Map a possibly off-grid column according to the edge behavior
    fn resolve_column(&self, x: i32) -> Option<i32> {
        let width = self.width() as i32;
        if (0..width).contains(&x) {
            return Some(x);
        }
        match self.settings.edge_behavior {
            EdgeBehavior::Wall => None,
            EdgeBehavior::Wrap => Some(x.rem_euclid(width)),
        }
    }

    fn spawn_rain(&mut self) -> usize {
        let width = self.width() as i32;
        let mut spawned = 0;
        for _ in 0..self.settings.rain_rate {
            let x = self.rng.gen_range(0..width);
            if self.place(x, 0, self.rain_color).is_some() {
                spawned += 1;
            }
        }
        spawned
    }

    /// Clear the grid, keeping the current settings
    pub fn reset(&mut self) {
        tracing::info!(
            particles = self.particle_count(),
            ticks = self.ticks,
            "resetting simulation"
        );
        self.index = Quadtree::new(self.settings.width, self.settings.height, self.settings.depth);
        self.ticks = 0;
        self.paused = false;
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}
