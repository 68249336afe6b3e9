use crate::store::{ParticleStore, PointId};

/// Shallowest tree that still splits the root into leaves
pub const MIN_DEPTH: usize = 2;
/// Deepest supported tree (4^9 leaves)
pub const MAX_DEPTH: usize = 10;
/// Leaf edge length (in cells) the default depth aims for
const LEAF_TARGET_SIZE: usize = 4;

/// Anything with a mutable integer position on the grid
pub trait Point {
    fn x(&self) -> i32;
    fn y(&self) -> i32;
    fn set_position(&mut self, x: i32, y: i32);
}

/// Pick a depth whose leaves are roughly `LEAF_TARGET_SIZE` cells wide.
///
/// A 512x512 grid gets depth 8: 4^7 leaves of 4x4 cells.
pub fn default_depth(width: usize, height: usize) -> usize {
    let cells = (width.max(height) / LEAF_TARGET_SIZE).max(1);
    (cells.ilog2() as usize + 1).clamp(MIN_DEPTH, MAX_DEPTH)
}

#[derive(Debug)]
enum TreeNode {
    /// Children ordered top-left, top-right, bottom-left, bottom-right
    Internal {
        split_x: i32,
        split_y: i32,
        children: Box<[TreeNode; 4]>,
    },
    /// Index into `Quadtree::leaves`
    Leaf(usize),
}

/// Fixed-depth quadtree over `[0, width) x [0, height)`.
///
/// The topology is built once and never changes; only leaf buckets do.
/// Points live in the embedded [`ParticleStore`], leaves hold their ids.
///
/// Every stored point sits in exactly one bucket: the one its *current*
/// coordinates route to. Whoever mutates a position through
/// [`Quadtree::get_mut`] must follow up with [`Quadtree::relocate`].
#[derive(Debug)]
pub struct Quadtree<T> {
    width: i32,
    height: i32,
    depth: usize,
    root: TreeNode,
    leaves: Vec<Vec<PointId>>,
    store: ParticleStore<T>,
}

impl<T: Point> Quadtree<T> {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        assert!(
            (MIN_DEPTH..=MAX_DEPTH).contains(&depth),
            "quadtree depth {} outside {}..={}",
            depth,
            MIN_DEPTH,
            MAX_DEPTH
        );
        let width = width as i32;
        let height = height as i32;

        let mut leaves = Vec::with_capacity(4usize.pow(depth as u32 - 1));
        let root = build_layer(1, width / 2, height / 2, width, height, depth, &mut leaves);

        Self {
            width,
            height,
            depth,
            root,
            leaves,
            store: ParticleStore::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    #[cfg(test)]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Whether `(x, y)` lies inside the indexed area
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Walk from the root to the leaf bucket covering `(x, y)`.
    /// Ties on a split line go to the right/bottom side.
    fn leaf_for(&self, x: i32, y: i32) -> usize {
        debug_assert!(
            self.contains(x, y),
            "({}, {}) outside {}x{} index",
            x,
            y,
            self.width,
            self.height
        );
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Internal {
                    split_x,
                    split_y,
                    children,
                } => {
                    let quadrant = usize::from(x >= *split_x) | (usize::from(y >= *split_y) << 1);
                    node = &children[quadrant];
                }
                TreeNode::Leaf(leaf) => return *leaf,
            }
        }
    }

    /// Store `point`, mark it active and file it under its leaf.
    ///
    /// There is no duplicate check; callers look up the cell first.
    pub fn insert(&mut self, point: T) -> PointId {
        let leaf = self.leaf_for(point.x(), point.y());
        let id = self.store.push(point);
        self.leaves[leaf].push(id);
        id
    }

    /// Find the point stored at exactly `(x, y)`.
    ///
    /// Linear in the size of the covering leaf.
    pub fn lookup(&self, x: i32, y: i32) -> Option<PointId> {
        let leaf = self.leaf_for(x, y);
        self.leaves[leaf].iter().copied().find(|&id| {
            let point = self.store.get(id);
            point.x() == x && point.y() == y
        })
    }

    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.lookup(x, y).is_some()
    }

    /// Re-file `id` after its coordinates changed from `(old_x, old_y)`.
    ///
    /// Does nothing when both positions share a leaf. Never touches the
    /// active/settled lists.
    pub fn relocate(&mut self, id: PointId, old_x: i32, old_y: i32) {
        let point = self.store.get(id);
        let old_leaf = self.leaf_for(old_x, old_y);
        let new_leaf = self.leaf_for(point.x(), point.y());
        if old_leaf == new_leaf {
            return;
        }

        let bucket = &mut self.leaves[old_leaf];
        let position = bucket.iter().position(|&other| other == id);
        debug_assert!(
            position.is_some(),
            "{:?} was not filed under ({}, {})",
            id,
            old_x,
            old_y
        );
        if let Some(position) = position {
            bucket.swap_remove(position);
        }
        self.leaves[new_leaf].push(id);
    }

    /// Set the position of `id` and re-file it
    pub fn move_point(&mut self, id: PointId, x: i32, y: i32) {
        let point = self.store.get_mut(id);
        let (old_x, old_y) = (point.x(), point.y());
        point.set_position(x, y);
        self.relocate(id, old_x, old_y);
    }

    pub fn get(&self, id: PointId) -> &T {
        self.store.get(id)
    }

    /// Mutable access to a point. Position changes need a `relocate`.
    pub fn get_mut(&mut self, id: PointId) -> &mut T {
        self.store.get_mut(id)
    }

    pub fn store(&self) -> &ParticleStore<T> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParticleStore<T> {
        &mut self.store
    }

    /// Check that every point is filed exactly once, under the leaf its
    /// current coordinates route to.
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![0usize; self.store.len()];
        for (leaf, bucket) in self.leaves.iter().enumerate() {
            for &id in bucket {
                let point = self.store.get(id);
                if self.leaf_for(point.x(), point.y()) != leaf {
                    return false;
                }
                seen[id.index()] += 1;
            }
        }
        seen.iter().all(|&count| count == 1)
    }
}

fn build_layer(
    level: usize,
    split_x: i32,
    split_y: i32,
    width: i32,
    height: i32,
    depth: usize,
    leaves: &mut Vec<Vec<PointId>>,
) -> TreeNode {
    let children = if level + 1 >= depth {
        [(); 4].map(|_| {
            leaves.push(Vec::new());
            TreeNode::Leaf(leaves.len() - 1)
        })
    } else {
        let half_w = (width >> level) / 2;
        let half_h = (height >> level) / 2;
        [
            (split_x - half_w, split_y - half_h),
            (split_x + half_w, split_y - half_h),
            (split_x - half_w, split_y + half_h),
            (split_x + half_w, split_y + half_h),
        ]
        .map(|(x, y)| build_layer(level + 1, x, y, width, height, depth, leaves))
    };

    TreeNode::Internal {
        split_x,
        split_y,
        children: Box::new(children),
    }
}
