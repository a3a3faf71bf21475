use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    /// Stop once no centroid moves more than this (squared distance)
    pub tolerance: f64,
    pub seed: Option<u64>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 3,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: [f64; 3],
    pub members: usize,
}

/// A distinct color and how many input points share it
struct WeightedPoint {
    value: [f64; 3],
    weight: usize,
}

fn distance2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

fn nearest(point: &[f64; 3], centroids: &[[f64; 3]]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, distance2(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// Cluster 3-channel points into `min(k, distinct colors)` groups.
///
/// Identical points are merged first, so the work scales with the number
/// of distinct colors rather than pixels. Clusters come back ordered by
/// member count, largest first. An empty input yields no clusters.
pub fn kmeans(points: &[[u8; 3]], params: &KMeansParams) -> Vec<Cluster> {
    let mut counts: BTreeMap<[u8; 3], usize> = BTreeMap::new();
    for p in points {
        *counts.entry(*p).or_insert(0) += 1;
    }
    let distinct: Vec<WeightedPoint> = counts
        .into_iter()
        .map(|(p, weight)| WeightedPoint {
            value: [p[0] as f64, p[1] as f64, p[2] as f64],
            weight,
        })
        .collect();

    let k = params.k.min(distinct.len());
    if k == 0 {
        return Vec::new();
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut centroids = seed_plus_plus(&distinct, k, &mut rng);
    let mut assignment = vec![0usize; distinct.len()];

    for iteration in 0..params.max_iterations.max(1) {
        for (idx, point) in distinct.iter().enumerate() {
            assignment[idx] = nearest(&point.value, &centroids).0;
        }

        let mut sums = vec![[0f64; 3]; k];
        let mut weights = vec![0usize; k];
        for (point, &cluster) in distinct.iter().zip(&assignment) {
            for c in 0..3 {
                sums[cluster][c] += point.value[c] * point.weight as f64;
            }
            weights[cluster] += point.weight;
        }

        let mut shift: f64 = 0.0;
        for cluster in 0..k {
            let updated = if weights[cluster] == 0 {
                farthest_point(&distinct, &centroids, &assignment)
            } else {
                let w = weights[cluster] as f64;
                [sums[cluster][0] / w, sums[cluster][1] / w, sums[cluster][2] / w]
            };
            shift = shift.max(distance2(&updated, &centroids[cluster]));
            centroids[cluster] = updated;
        }

        if shift <= params.tolerance {
            tracing::trace!(iteration, "k-means converged");
            break;
        }
    }

    let mut members = vec![0usize; k];
    for point in &distinct {
        members[nearest(&point.value, &centroids).0] += point.weight;
    }

    let mut clusters: Vec<Cluster> = centroids
        .into_iter()
        .zip(members)
        .map(|(centroid, members)| Cluster { centroid, members })
        .collect();
    clusters.sort_by(|a, b| {
        b.members
            .cmp(&a.members)
            .then_with(|| a.centroid.partial_cmp(&b.centroid).unwrap_or(std::cmp::Ordering::Equal))
    });
    clusters
}

/// k-means++ seeding over distinct points; every seed is a different point.
fn seed_plus_plus(points: &[WeightedPoint], k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let total: usize = points.iter().map(|p| p.weight).sum();
    let mut target = rng.random_range(0..total);
    let first = points
        .iter()
        .position(|p| {
            if target < p.weight {
                true
            } else {
                target -= p.weight;
                false
            }
        })
        .unwrap_or(0);

    let mut centroids = vec![points[first].value];
    let mut closest: Vec<f64> = points.iter().map(|p| distance2(&p.value, &centroids[0])).collect();

    while centroids.len() < k {
        let scores: Vec<f64> = points
            .iter()
            .zip(&closest)
            .map(|(p, d)| d * p.weight as f64)
            .collect();
        let sum: f64 = scores.iter().sum();

        let next = if sum > 0.0 {
            let mut pick = rng.random::<f64>() * sum;
            let mut chosen = None;
            for (idx, score) in scores.iter().enumerate() {
                if *score > 0.0 {
                    chosen = Some(idx);
                    if pick < *score {
                        break;
                    }
                    pick -= score;
                }
            }
            chosen
        } else {
            None
        };
        // Distinct points always leave a positive score while centroids < k
        let Some(next) = next else { break };

        centroids.push(points[next].value);
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(distance2(&p.value, &points[next].value));
        }
    }
    centroids
}

/// Point farthest from its assigned centroid; used to revive an empty cluster.
fn farthest_point(points: &[WeightedPoint], centroids: &[[f64; 3]], assignment: &[usize]) -> [f64; 3] {
    points
        .iter()
        .zip(assignment)
        .filter(|(p, _)| !centroids.contains(&p.value))
        .map(|(p, &cluster)| (p.value, distance2(&p.value, &centroids[cluster])))
        .fold(None, |best: Option<([f64; 3], f64)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(value, _)| value)
        .unwrap_or(points[0].value)
}
