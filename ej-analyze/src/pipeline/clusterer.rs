//! Feature Clusterer
//!
//! Partitions tracts into `k` similarity clusters over a fixed feature set.
//!
//! # Preprocessing
//! Tracts missing any clustering feature are dropped (never imputed). Each
//! remaining feature is standardized with the surviving rows' own mean and
//! population standard deviation.
//!
//! # Algorithm
//! k-means++ seeding from a `StdRng` seeded with the configured seed, then
//! Lloyd iterations. `n_init` initializations draw from the same seeded
//! stream and the lowest-inertia fit wins, so identical input and seed give
//! identical labels. Label numbering carries no meaning across different
//! inputs or seeds.

use crate::types::{ClusterSummary, ClusteredTract, TractRecord};
use ej_common::config::PipelineConfig;
use ej_common::{ClusterFeature, Error, Result, TractId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// k-means parameters
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    /// Stop when the summed squared centroid shift falls to this value
    pub tolerance: f64,
}

impl KMeansParams {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            k: config.clusters,
            seed: config.seed,
            n_init: config.n_init,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// A fitted partition
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
}

/// Clustering stage output
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    pub features: Vec<ClusterFeature>,
    pub tracts: Vec<ClusteredTract>,
    pub summaries: Vec<ClusterSummary>,
    /// Tracts dropped for a missing clustering feature
    pub excluded: Vec<TractId>,
    pub inertia: f64,
}

impl ClusterOutcome {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.summaries.iter().map(|s| s.tract_count).collect()
    }
}

fn squared_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the nearest centroid; ties go to the lower index
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_dist(point, centroid);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// Z-score each column using the rows' own mean and population std dev
///
/// A constant column gets unit scale and standardizes to zero.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return Vec::new();
    };
    let n = rows.len() as f64;

    let mut means = vec![0.0; width];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut scales = vec![0.0; width];
    for row in rows {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2);
        }
    }
    for s in &mut scales {
        *s = (*s / n).sqrt();
        if *s < 1e-12 {
            *s = 1.0;
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&means)
                .zip(&scales)
                .map(|((v, m), s)| (v - m) / s)
                .collect()
        })
        .collect()
}

/// k-means++ seeding: first centroid uniform, the rest with D² weighting
fn init_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    while centroids.len() < k {
        let dists: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = dists.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a centroid
            centroids.push(points[rng.gen_range(0..n)].clone());
            continue;
        }

        let threshold = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, d) in dists.iter().enumerate() {
            cumulative += d;
            if cumulative > threshold {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen].clone());
    }
    centroids
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = points
        .iter()
        .map(|p| {
            let (label, d) = nearest(p, centroids);
            inertia += d;
            label
        })
        .collect();
    (labels, inertia)
}

/// Recompute centroids; an empty cluster takes over the point farthest from its centroid
fn update_centroids(
    points: &[Vec<f64>],
    labels: &mut [usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let width = previous.first().map_or(0, |c| c.len());
    let mut sums = vec![vec![0.0; width]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels.iter()) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }

    let mut centroids: Vec<Vec<f64>> = sums
        .into_iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect();

    let empties: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
    for empty in empties {
        let farthest = points
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[labels[*i]] > 1)
            .map(|(i, p)| (i, squared_dist(p, &centroids[labels[i]])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = farthest {
            debug!(cluster = empty, point = i, "Re-seeding empty cluster");
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
            centroids[empty] = points[i].clone();
        }
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, params: &KMeansParams) -> KMeansFit {
    let (mut labels, _) = assign(points, &centroids);
    let mut iterations = 0;

    for iter in 1..=params.max_iter {
        iterations = iter;
        let updated = update_centroids(points, &mut labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_dist(a, b))
            .sum();
        centroids = updated;

        let (new_labels, _) = assign(points, &centroids);
        let changed = new_labels != labels;
        labels = new_labels;
        if !changed || shift <= params.tolerance {
            break;
        }
    }

    let (labels, inertia) = assign(points, &centroids);
    KMeansFit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Fit k-means to already-standardized points
pub fn kmeans(points: &[Vec<f64>], params: &KMeansParams) -> Result<KMeansFit> {
    if params.k == 0 {
        return Err(Error::Config("clusters must be at least 1".to_string()));
    }
    if points.len() < params.k {
        return Err(Error::ClusteringPrecondition {
            usable_rows: points.len(),
            k: params.k,
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansFit> = None;
    for run in 0..params.n_init.max(1) {
        let centroids = init_centroids(points, params.k, &mut rng);
        let fit = lloyd(points, centroids, params);
        debug!(run, inertia = fit.inertia, iterations = fit.iterations, "k-means run");
        let better = best.as_ref().map_or(true, |b| fit.inertia < b.inertia);
        if better {
            best = Some(fit);
        }
    }

    best.ok_or_else(|| Error::Config("n_init must be at least 1".to_string()))
}

/// One decimal, halves to even
fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Per-cluster feature means (one decimal) and percent designated
pub fn summarize(tracts: &[ClusteredTract], k: usize) -> Vec<ClusterSummary> {
    let width = tracts.first().map_or(0, |t| t.features.len());
    (0..k)
        .filter_map(|cluster| {
            let members: Vec<&ClusteredTract> =
                tracts.iter().filter(|t| t.cluster == cluster).collect();
            if members.is_empty() {
                return None;
            }
            let count = members.len() as f64;
            let feature_means = (0..width)
                .map(|j| round1(members.iter().map(|t| t.features[j]).sum::<f64>() / count))
                .collect();
            let designated = members.iter().filter(|t| t.is_dac == 1).count();
            Some(ClusterSummary {
                cluster,
                tract_count: members.len(),
                feature_means,
                percent_dac: 100.0 * designated as f64 / count,
            })
        })
        .collect()
}

/// Drop incomplete tracts, standardize, fit and summarize
pub fn cluster(
    records: &[TractRecord],
    features: &[ClusterFeature],
    params: &KMeansParams,
) -> Result<ClusterOutcome> {
    let mut complete: Vec<(&TractRecord, Vec<f64>)> = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();
    for record in records {
        let values: Option<Vec<f64>> = features.iter().map(|f| record.feature(*f)).collect();
        match values {
            Some(values) => complete.push((record, values)),
            None => excluded.push(record.tract.clone()),
        }
    }

    if !excluded.is_empty() {
        warn!(
            excluded = excluded.len(),
            "Tracts with missing clustering features excluded"
        );
        debug!(tracts = ?excluded, "Excluded from clustering");
    }

    let raw: Vec<Vec<f64>> = complete.iter().map(|(_, v)| v.clone()).collect();
    let fit = kmeans(&standardize(&raw), params)?;

    let tracts: Vec<ClusteredTract> = complete
        .into_iter()
        .zip(&fit.labels)
        .map(|((record, values), &label)| ClusteredTract {
            tract: record.tract.clone(),
            features: values,
            cluster: label,
            is_dac: record.is_dac(),
        })
        .collect();
    let summaries = summarize(&tracts, params.k);

    info!(
        clustered = tracts.len(),
        excluded = excluded.len(),
        k = params.k,
        inertia = fit.inertia,
        "Clustering complete"
    );
    for summary in &summaries {
        info!(
            cluster = summary.cluster,
            tracts = summary.tract_count,
            percent_dac = summary.percent_dac,
            "Cluster summary"
        );
    }

    Ok(ClusterOutcome {
        features: features.to_vec(),
        tracts,
        summaries,
        excluded,
        inertia: fit.inertia,
    })
}
