//! K-means clustering of label objects
//!
//! Each object is a point whose coordinates are the values of the chosen
//! attributes. Objects are partitioned into k clusters by Euclidean
//! distance and each object's class label is set to its cluster (1..k).

use crate::maybe_rayon::*;
use obia_core::{Error, Label, LabelMap, Result};
use tracing::{debug, warn};

/// Parameters for K-means clustering
#[derive(Debug, Clone)]
pub struct KmeansParams {
    /// Number of clusters
    pub k: usize,
    /// Maximum iterations (default: 100)
    pub max_iterations: usize,
    /// Stop when no centroid moves more than this (default: 0.001)
    pub convergence: f64,
    /// Seed for the initial centroid selection
    pub seed: u64,
    /// Scale every attribute to zero mean and unit variance before
    /// clustering (default: true)
    pub standardize: bool,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            max_iterations: 100,
            convergence: 0.001,
            seed: 42,
            standardize: true,
        }
    }
}

/// Cluster the objects of `map` on the named attributes.
///
/// Sets the class label of every clustered object to its cluster index
/// (1..k). Objects with a non-finite attribute value are not clustered
/// and their class label is cleared. Returns the k centroids in attribute
/// units, in the order of `attribute_names`.
///
/// A missing attribute fails before any class label is written.
pub fn kmeans_attributes<L: Label>(
    map: &mut LabelMap<L>,
    attribute_names: &[&str],
    params: &KmeansParams,
) -> Result<Vec<Vec<f64>>> {
    if params.k < 2 {
        return Err(Error::InvalidParameter {
            name: "k",
            value: params.k.to_string(),
            reason: "K-means requires k >= 2".into(),
        });
    }
    if params.max_iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "max_iterations",
            value: "0".into(),
            reason: "at least one assignment step is required".into(),
        });
    }
    if attribute_names.is_empty() {
        return Err(Error::InvalidParameter {
            name: "attribute_names",
            value: "[]".into(),
            reason: "at least one attribute is required".into(),
        });
    }
    if L::from_ordinal(params.k).is_none() {
        return Err(Error::InvalidParameter {
            name: "k",
            value: params.k.to_string(),
            reason: "cluster index does not fit the label type".into(),
        });
    }

    // Read every feature vector first
    let rows = map
        .iter()
        .map(|obj| {
            let values = attribute_names
                .iter()
                .map(|name| obj.attribute(name))
                .collect::<Result<Vec<f64>>>()?;
            Ok((obj.label(), values))
        })
        .collect::<Result<Vec<(L, Vec<f64>)>>>()?;

    let (labels, mut points): (Vec<L>, Vec<Vec<f64>>) = rows
        .into_iter()
        .filter(|(_, values)| values.iter().all(|v| v.is_finite()))
        .unzip();

    let skipped = map.number_of_label_objects() - labels.len();
    if skipped > 0 {
        warn!(skipped, "objects with non-finite attributes left unclassified");
    }

    if points.len() < params.k {
        return Err(Error::Algorithm(format!(
            "Not enough objects ({}) for {} clusters",
            points.len(),
            params.k
        )));
    }

    let dims = attribute_names.len();
    let scales = if params.standardize {
        standardize(&mut points, dims)
    } else {
        vec![(0.0, 1.0); dims]
    };

    let mut centroids = initialize_centroids(&points, params.k, params.seed);
    let mut assignment = vec![0usize; points.len()];
    let mut iterations = 0;

    for _ in 0..params.max_iterations {
        iterations += 1;

        // Assignment step
        assignment = (0..points.len())
            .into_par_iter()
            .map(|i| nearest(&points[i], &centroids))
            .collect();

        // Update step
        let mut sums = vec![vec![0.0; dims]; params.k];
        let mut counts = vec![0usize; params.k];
        for (point, &cluster) in points.iter().zip(&assignment) {
            for (s, v) in sums[cluster].iter_mut().zip(point) {
                *s += v;
            }
            counts[cluster] += 1;
        }

        let mut max_shift = 0.0_f64;
        for (cluster, sum) in sums.iter_mut().enumerate() {
            if counts[cluster] == 0 {
                // Keep empty cluster centroid
                continue;
            }
            for s in sum.iter_mut() {
                *s /= counts[cluster] as f64;
            }
            max_shift = max_shift.max(distance2(sum, &centroids[cluster]).sqrt());
            centroids[cluster].clone_from(sum);
        }

        if max_shift < params.convergence {
            break;
        }
    }

    let unclassified: Vec<L> = map.labels().collect();
    for label in unclassified {
        map.label_object_mut(label)?.set_class_label(None);
    }
    for (label, &cluster) in labels.iter().zip(&assignment) {
        map.label_object_mut(*label)?
            .set_class_label(L::from_ordinal(cluster + 1));
    }

    debug!(
        k = params.k,
        objects = labels.len(),
        iterations,
        "k-means on object attributes"
    );

    Ok(centroids
        .into_iter()
        .map(|c| {
            c.into_iter()
                .zip(&scales)
                .map(|(v, &(mean, sigma))| v * sigma + mean)
                .collect()
        })
        .collect())
}

/// Scale each dimension in place; returns `(mean, sigma)` per dimension
fn standardize(points: &mut [Vec<f64>], dims: usize) -> Vec<(f64, f64)> {
    let n = points.len() as f64;
    (0..dims)
        .map(|d| {
            let mean = points.iter().map(|p| p[d]).sum::<f64>() / n;
            let var = points.iter().map(|p| (p[d] - mean).powi(2)).sum::<f64>() / n;
            let sigma = if var > 0.0 { var.sqrt() } else { 1.0 };
            for p in points.iter_mut() {
                p[d] = (p[d] - mean) / sigma;
            }
            (mean, sigma)
        })
        .collect()
}

fn distance2(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best_dist = f64::INFINITY;
    let mut best_k = 0;
    for (k, centroid) in centroids.iter().enumerate() {
        let dist = distance2(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_k = k;
        }
    }
    best_k
}

/// Linear congruential step, returns a value in `[0, 1)`
fn next_uniform(state: &mut u64) -> f64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*state >> 11) as f64 / (1u64 << 53) as f64
}

/// k-means++ seeding driven by a deterministic generator
fn initialize_centroids(points: &[Vec<f64>], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut rng = seed;
    let first = ((next_uniform(&mut rng) * n as f64) as usize).min(n - 1);
    let mut centroids = vec![points[first].clone()];
    let mut chosen = vec![first];

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| distance2(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let pick = if total > 0.0 {
            let target = next_uniform(&mut rng) * total;
            let mut acc = 0.0;
            weights
                .iter()
                .position(|w| {
                    acc += w;
                    acc > target
                })
                .unwrap_or(n - 1)
        } else {
            // All points coincide with a centroid
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
        };

        chosen.push(pick);
        centroids.push(points[pick].clone());
    }

    centroids
}
