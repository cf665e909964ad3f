//! k-nearest-neighbor distances and the adaptive clustering radius.

use super::stats::Sample;
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Relative slack on the squared radius so a point sitting exactly at eps
/// survives the sqrt/square round trip.
const RADIUS_SLACK: f64 = 1e-9;

fn distance_2(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// R-tree over projected (planar, meters) positions.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn build(points: &[[f64; 2]]) -> Self {
        let items = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new(*p, i))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Distance from `query` to its k-th nearest indexed point (1-based, a
    /// point coinciding with the query counts as its own first neighbor).
    pub fn kth_neighbor_distance(&self, query: &[f64; 2], k: usize) -> Option<f64> {
        if k == 0 {
            return None;
        }
        self.tree
            .nearest_neighbor_iter(query)
            .nth(k - 1)
            .map(|p| distance_2(p.geom(), query).sqrt())
    }

    /// Indices of all points within `radius` of `query` (inclusive), ascending.
    pub fn within(&self, query: &[f64; 2], radius: f64) -> Vec<usize> {
        let max_d2 = radius * radius * (1.0 + RADIUS_SLACK);
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(*query, max_d2)
            .map(|p| p.data)
            .collect();
        found.sort_unstable();
        found
    }
}

/// Per-point k-th neighbor distances and the radius derived from them.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub kth_distances: Vec<f64>,
    /// Clustering radius in meters.
    pub eps: f64,
}

impl Neighborhood {
    /// All fixes coincide; zero-radius clustering is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.eps == 0.0
    }
}

pub struct NeighborhoodAnalyzer {
    k: usize,
    quantile: f64,
}

impl NeighborhoodAnalyzer {
    pub fn new(k: usize, quantile: f64) -> Self {
        Self { k, quantile }
    }

    /// Compute eps as the `quantile` of every point's k-th neighbor distance.
    /// Returns `None` when there are fewer than k points.
    pub fn analyze(&self, index: &SpatialIndex, points: &[[f64; 2]]) -> Option<Neighborhood> {
        if self.k == 0 || points.len() < self.k {
            return None;
        }
        let kth_distances = points
            .iter()
            .map(|p| index.kth_neighbor_distance(p, self.k))
            .collect::<Option<Vec<f64>>>()?;
        let eps = Sample::new(kth_distances.clone()).quantile(self.quantile);
        Some(Neighborhood { kth_distances, eps })
    }
}
