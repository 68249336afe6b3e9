/// Handle to a point owned by a [`ParticleStore`].
///
/// Handles are dense arena indices. Points are never removed, so a handle
/// stays valid for the lifetime of the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

impl PointId {
    #[cfg(test)]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of points plus the ordered `active` and `settled` id lists.
#[derive(Debug, Clone)]
pub struct ParticleStore<T> {
    points: Vec<T>,
    active: Vec<PointId>,
    settled: Vec<PointId>,
}

impl<T> Default for ParticleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ParticleStore<T> {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            active: Vec::new(),
            settled: Vec::new(),
        }
    }

    /// Take ownership of `point` and register it as active
    pub fn push(&mut self, point: T) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(point);
        self.active.push(id);
        id
    }

    pub fn get(&self, id: PointId) -> &T {
        &self.points[id.0]
    }

    pub fn get_mut(&mut self, id: PointId) -> &mut T {
        &mut self.points[id.0]
    }

    /// Total number of points ever stored
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn active(&self) -> &[PointId] {
        &self.active
    }

    pub fn settled(&self) -> &[PointId] {
        &self.settled
    }

    #[cfg(test)]
    pub fn active_points(&self) -> impl Iterator<Item = &T> {
        self.active.iter().map(|id| &self.points[id.0])
    }

    /// Every stored point, active and settled
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// Detach the active list for a traversal that may drop elements.
    ///
    /// Hand the surviving ids back with [`ParticleStore::restore_active`].
    pub fn take_active(&mut self) -> Vec<PointId> {
        std::mem::take(&mut self.active)
    }

    pub fn restore_active(&mut self, mut kept: Vec<PointId>) {
        // Anything pushed while the list was detached goes after the survivors.
        kept.append(&mut self.active);
        self.active = kept;
    }

    /// Record `id` as settled. The caller has already dropped it from `active`.
    pub fn settle(&mut self, id: PointId) {
        debug_assert!(!self.active.contains(&id), "settling a point still listed as active");
        self.settled.push(id);
    }
}
