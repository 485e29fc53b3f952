// ============================================================
// Layer 4 — Spatial Region Clustering
// ============================================================
// K-means over (latitude, longitude) assigns every event a region
// id. Distances are squared Euclidean in degree space, matching
// how the regions were defined when the feature set was designed.
//
// Algorithm:
//   1. k-means++ seeding from a ChaCha RNG with a fixed seed
//   2. Lloyd iterations: assign → recompute centroids
//   3. Stop when no assignment changes or MAX_ITERATIONS is hit
//
// Same seed + same input → same centroids → same region ids.
// The fitted centroids are persisted with the checkpoint so
// inference assigns new events to the training-time regions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 300;

/// Fitted region centroids as (latitude, longitude) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionClusters {
    centroids: Vec<[f64; 2]>,
}

impl RegionClusters {
    /// Fit `k` regions. With fewer than `k` distinct inputs some regions
    /// may coincide; with fewer than `k` points, `k` shrinks to the point count.
    pub fn fit(points: &[[f64; 2]], k: usize, seed: u64) -> Self {
        let k = k.min(points.len());
        if k == 0 {
            return Self { centroids: Vec::new() };
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut centroids = seed_centroids(points, k, &mut rng);
        let mut assignments = vec![usize::MAX; points.len()];

        for iteration in 1..=MAX_ITERATIONS {
            let mut changed = false;
            for (i, p) in points.iter().enumerate() {
                let nearest = nearest_centroid(&centroids, p);
                if nearest != assignments[i] {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            if !changed {
                tracing::debug!("K-means converged after {} iterations", iteration);
                break;
            }
            recompute_centroids(points, &assignments, &mut centroids);
        }

        Self { centroids }
    }

    /// Region id of the nearest centroid (0 when nothing was fitted)
    pub fn assign(&self, point: [f64; 2]) -> usize {
        if self.centroids.is_empty() {
            return 0;
        }
        nearest_centroid(&self.centroids, &point)
    }

    pub fn centroids(&self) -> &[[f64; 2]] {
        &self.centroids
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0 * d0 + d1 * d1
}

/// Ties resolve to the lowest index
fn nearest_centroid(centroids: &[[f64; 2]], p: &[f64; 2]) -> usize {
    let mut best     = 0;
    let mut best_d   = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(c, p);
        if d < best_d {
            best_d = d;
            best   = i;
        }
    }
    best
}

/// k-means++: first centroid uniform, each next one sampled with
/// probability proportional to squared distance from the nearest
/// centroid chosen so far.
fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut ChaCha8Rng) -> Vec<[f64; 2]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut min_dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = points.len() - 1;
            for (i, d) in min_dist.iter().enumerate() {
                acc += d;
                if acc >= target && *d > 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // Every point already sits on a centroid
            rng.gen_range(0..points.len())
        };

        let c = points[next];
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &c));
        }
        centroids.push(c);
    }

    centroids
}

/// Mean of each cluster's members; an empty cluster keeps its previous centroid
fn recompute_centroids(points: &[[f64; 2]], assignments: &[usize], centroids: &mut [[f64; 2]]) {
    let k = centroids.len();
    let mut sums   = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];

    for (p, &a) in points.iter().zip(assignments) {
        sums[a][0] += p[0];
        sums[a][1] += p[1];
        counts[a]  += 1;
    }

    for j in 0..k {
        if counts[j] > 0 {
            let n = counts[j] as f64;
            centroids[j] = [sums[j][0] / n, sums[j][1] / n];
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.01;
            pts.push([10.0 + jitter, 10.0 - jitter]);
            pts.push([-40.0 - jitter, 120.0 + jitter]);
            pts.push([60.0 + jitter, -30.0 + jitter]);
        }
        pts
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let pts = blobs();
        let a = RegionClusters::fit(&pts, 10, 42);
        let b = RegionClusters::fit(&pts, 10, 42);
        assert_eq!(a, b);
        let ids_a: Vec<usize> = pts.iter().map(|p| a.assign(*p)).collect();
        let ids_b: Vec<usize> = pts.iter().map(|p| b.assign(*p)).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_separates_distant_blobs() {
        let pts = blobs();
        let rc = RegionClusters::fit(&pts, 3, 7);
        let a = rc.assign([10.0, 10.0]);
        let b = rc.assign([-40.0, 120.0]);
        let c = rc.assign([60.0, -30.0]);
        assert!(a != b && b != c && a != c);
    }

    #[test]
    fn test_k_shrinks_to_point_count() {
        let rc = RegionClusters::fit(&[[1.0, 1.0], [2.0, 2.0]], 10, 42);
        assert_eq!(rc.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let rc = RegionClusters::fit(&[], 10, 42);
        assert!(rc.is_empty());
        assert_eq!(rc.assign([0.0, 0.0]), 0);
    }

    #[test]
    fn test_all_identical_points() {
        let pts = vec![[5.0, 5.0]; 20];
        let rc = RegionClusters::fit(&pts, 4, 42);
        assert_eq!(rc.len(), 4);
        assert!(pts.iter().all(|p| rc.assign(*p) == 0));
    }
}
