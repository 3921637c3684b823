//! Burden Scorer
//!
//! Category sub-scores are skip-missing means over their indicator sets: a
//! tract missing some indicators is scored on the rest, and only a tract
//! missing the whole set gets a missing sub-score.
//!
//! The cumulative score is the plain mean of pollution, hazard proximity and
//! overall vulnerability, and is missing if any of the three is missing.

use crate::types::{ScoredTract, TractRecord};
use ej_common::{Indicator, TractId};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Mean over the present values; `None` when nothing is present
pub fn mean_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean of all values; `None` if any value is missing
pub fn mean_all(values: &[Option<f64>]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for value in values {
        sum += (*value)?;
    }
    Some(sum / values.len() as f64)
}

/// Score one merged tract (normalization needs the whole run, so it is left unset)
pub fn score_tract(
    record: &TractRecord,
    pollution_indicators: &[Indicator],
    hazard_indicators: &[Indicator],
) -> ScoredTract {
    let pollution_score = mean_present(pollution_indicators.iter().map(|i| record.indicator(*i)));
    let hazardprox_score = mean_present(hazard_indicators.iter().map(|i| record.indicator(*i)));
    let vulnerability_percentile = record.vulnerability_percentile();

    let cumulative_burden_score =
        mean_all(&[pollution_score, hazardprox_score, vulnerability_percentile]);
    let weighted_burden = cumulative_burden_score.map(|score| score * record.population as f64);

    ScoredTract {
        tract: record.tract.clone(),
        population: record.population,
        households: record.households,
        is_dac: record.is_dac(),
        vulnerability_percentile,
        pollution_score,
        hazardprox_score,
        cumulative_burden_score,
        weighted_burden,
        weighted_burden_norm: None,
    }
}

/// Score every tract and normalize weighted burden by this run's maximum
///
/// When no tract has a positive weighted burden the normalized value is
/// undefined and stays missing.
pub fn score(
    records: &[TractRecord],
    pollution_indicators: &[Indicator],
    hazard_indicators: &[Indicator],
) -> Vec<ScoredTract> {
    let mut scored: Vec<ScoredTract> = records
        .iter()
        .map(|r| score_tract(r, pollution_indicators, hazard_indicators))
        .collect();

    let max_weighted = scored
        .iter()
        .filter_map(|s| s.weighted_burden)
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))));

    match max_weighted {
        Some(max) if max > 0.0 => {
            for tract in &mut scored {
                tract.weighted_burden_norm = tract.weighted_burden.map(|w| w / max);
            }
        }
        _ => debug!("No positive weighted burden; normalized burden left missing"),
    }

    let missing = scored
        .iter()
        .filter(|s| s.cumulative_burden_score.is_none())
        .count();
    info!(
        tracts = scored.len(),
        missing_cumulative = missing,
        max_weighted_burden = max_weighted.unwrap_or(0.0),
        "Burden scores computed"
    );
    scored
}

/// One entry of the top-burden diagnostic view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurdenRank {
    pub tract: TractId,
    pub cumulative_burden_score: f64,
    pub is_dac: u8,
}

/// Highest cumulative burden first; ties broken by tract identifier
pub fn top_burden(scored: &[ScoredTract], n: usize) -> Vec<BurdenRank> {
    let mut ranked: Vec<BurdenRank> = scored
        .iter()
        .filter_map(|s| {
            s.cumulative_burden_score.map(|score| BurdenRank {
                tract: s.tract.clone(),
                cumulative_burden_score: score,
                is_dac: s.is_dac,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.cumulative_burden_score
            .partial_cmp(&a.cumulative_burden_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.tract.cmp(&b.tract))
    });
    ranked.truncate(n);
    ranked
}
