//! 2D k-d tree for neighbour searches during gridding
//!
//! Used by IDW when a search radius or a point limit is configured, so
//! each cell only visits the points that can contribute to it.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use zonalreg_core::SamplePoint;

/// A 2D k-d tree over sample points.
///
/// The tree is stored implicitly: the points are permuted so that the
/// median of every sub-slice is its split node, alternating x and y by depth.
#[derive(Debug, Clone)]
pub struct KdTree {
    /// Points in tree order
    points: Vec<SamplePoint>,
    /// Original index of each point in tree order
    indices: Vec<usize>,
}

/// A point found by a tree query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub point: SamplePoint,
    pub distance_sq: f64,
    /// Index of the point in the slice the tree was built from
    pub index: usize,
}

/// Max-heap entry ordered by (distance, original index)
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance_sq: f64,
    slot: usize,
    index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl KdTree {
    /// Build a tree from sample points in O(n log n).
    pub fn build(points: &[SamplePoint]) -> Self {
        let mut order: Vec<(usize, SamplePoint)> = points.iter().copied().enumerate().collect();
        arrange(&mut order, 0);

        let (indices, points) = order.into_iter().unzip();
        Self { points, indices }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The single nearest point to (qx, qy), `None` if the tree is empty.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<Neighbor> {
        self.k_nearest(qx, qy, 1).into_iter().next()
    }

    /// Up to `k` nearest points, sorted by ascending distance.
    ///
    /// Ties are broken by the original point index so the result does not
    /// depend on the tree layout.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<Neighbor> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_visit(0, self.points.len(), 0, qx, qy, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|e| self.neighbor(e.slot, e.distance_sq))
            .collect()
    }

    /// All points within `radius` (inclusive) of (qx, qy), sorted by
    /// original point index.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<Neighbor> {
        if self.is_empty() || !(radius > 0.0) {
            return Vec::new();
        }

        let mut found = Vec::new();
        self.radius_visit(0, self.points.len(), 0, qx, qy, radius * radius, &mut found);
        found.sort_by_key(|n| n.index);
        found
    }

    fn neighbor(&self, slot: usize, distance_sq: f64) -> Neighbor {
        Neighbor {
            point: self.points[slot],
            distance_sq,
            index: self.indices[slot],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn knn_visit(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        qx: f64,
        qy: f64,
        k: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let p = &self.points[mid];

        let entry = HeapEntry {
            distance_sq: p.dist_sq(qx, qy),
            slot: mid,
            index: self.indices[mid],
        };
        if heap.len() < k {
            heap.push(entry);
        } else if heap.peek().is_some_and(|worst| entry < *worst) {
            heap.pop();
            heap.push(entry);
        }

        let diff = if depth % 2 == 0 { qx - p.x } else { qy - p.y };
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.knn_visit(near.0, near.1, depth + 1, qx, qy, k, heap);

        // Equal distances still need visiting for the index tie-break
        let bound = if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map_or(f64::INFINITY, |e| e.distance_sq)
        };
        if diff * diff <= bound {
            self.knn_visit(far.0, far.1, depth + 1, qx, qy, k, heap);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn radius_visit(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        qx: f64,
        qy: f64,
        radius_sq: f64,
        found: &mut Vec<Neighbor>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let p = &self.points[mid];

        let dist_sq = p.dist_sq(qx, qy);
        if dist_sq <= radius_sq {
            found.push(self.neighbor(mid, dist_sq));
        }

        let diff = if depth % 2 == 0 { qx - p.x } else { qy - p.y };
        if diff <= 0.0 || diff * diff <= radius_sq {
            self.radius_visit(lo, mid, depth + 1, qx, qy, radius_sq, found);
        }
        if diff >= 0.0 || diff * diff <= radius_sq {
            self.radius_visit(mid + 1, hi, depth + 1, qx, qy, radius_sq, found);
        }
    }
}

/// Permute `slice` in place into implicit k-d tree order.
fn arrange(slice: &mut [(usize, SamplePoint)], depth: usize) {
    if slice.len() <= 1 {
        return;
    }
    let mid = slice.len() / 2;
    let key = |e: &(usize, SamplePoint)| if depth % 2 == 0 { e.1.x } else { e.1.y };

    slice.select_nth_unstable_by(mid, |a, b| key(a).total_cmp(&key(b)).then(a.0.cmp(&b.0)));

    let (left, right) = slice.split_at_mut(mid);
    arrange(left, depth + 1);
    arrange(&mut right[1..], depth + 1);
}
