//! DBSCAN over a trajectory's projected positions.
//!
//! Core points (at least `min_samples` points within eps, counting
//! themselves) are joined with union-find along core-to-core edges of the
//! eps-neighbor graph. Border points take the lowest cluster id among their
//! core neighbors; everything else is noise. Cluster ids are numbered in
//! order of each cluster's first core point.

use super::neighbors::SpatialIndex;
use crate::model::ClusterLabel;
use std::collections::{BTreeMap, HashMap};

/// Member counts per label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStats {
    counts: BTreeMap<ClusterLabel, usize>,
}

impl ClusterStats {
    pub fn from_labels(labels: &[ClusterLabel]) -> Self {
        let mut counts = BTreeMap::new();
        for label in labels {
            *counts.entry(*label).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn member_count(&self, label: ClusterLabel) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Distinct labels, noise included.
    pub fn label_count(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClusterLabel, usize)> + '_ {
        self.counts.iter().map(|(l, c)| (*l, *c))
    }
}

/// Labels per position plus their member counts.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub labels: Vec<ClusterLabel>,
    pub stats: ClusterStats,
}

impl Clustering {
    pub fn label_count(&self) -> usize {
        self.stats.label_count()
    }
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

pub struct DensityClusterer {
    eps: f64,
    min_samples: usize,
}

impl DensityClusterer {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Cluster `points`, building a fresh spatial index.
    pub fn fit(&self, points: &[[f64; 2]]) -> Clustering {
        let index = SpatialIndex::build(points);
        self.fit_indexed(&index, points)
    }

    /// Cluster `points` using an index already built over the same points.
    pub fn fit_indexed(&self, index: &SpatialIndex, points: &[[f64; 2]]) -> Clustering {
        let n = points.len();
        let neighbors: Vec<Vec<usize>> = points.iter().map(|p| index.within(p, self.eps)).collect();
        let core: Vec<bool> = neighbors
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut uf = UnionFind::new(n);
        for i in (0..n).filter(|&i| core[i]) {
            for &j in neighbors[i].iter().filter(|&&j| core[j]) {
                uf.union(i, j);
            }
        }

        let mut labels = vec![ClusterLabel::NOISE; n];
        let mut root_label: HashMap<usize, ClusterLabel> = HashMap::new();
        for i in (0..n).filter(|&i| core[i]) {
            let root = uf.find(i);
            let next = ClusterLabel(root_label.len() as i32);
            labels[i] = *root_label.entry(root).or_insert(next);
        }

        for i in (0..n).filter(|&i| !core[i]) {
            if let Some(label) = neighbors[i]
                .iter()
                .filter(|&&j| core[j])
                .map(|&j| labels[j])
                .min()
            {
                labels[i] = label;
            }
        }

        let stats = ClusterStats::from_labels(&labels);
        Clustering { labels, stats }
    }
}
