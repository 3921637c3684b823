//! Output Projector
//!
//! Selects the condensed column set the mapping step consumes. Tracts that
//! were excluded from clustering keep their scores with `cluster: None`.

use crate::types::{ClusteredTract, MapRow, ScoredTract};
use ej_common::TractId;
use std::collections::HashMap;
use tracing::debug;

/// One row per scored tract, in scored order
pub fn project(scored: &[ScoredTract], clustered: &[ClusteredTract]) -> Vec<MapRow> {
    let labels: HashMap<&TractId, usize> =
        clustered.iter().map(|t| (&t.tract, t.cluster)).collect();

    let rows: Vec<MapRow> = scored
        .iter()
        .map(|s| MapRow {
            tract: s.tract.clone(),
            is_dac: s.is_dac,
            pollution_score: s.pollution_score,
            hazardprox_score: s.hazardprox_score,
            vulnerability_percentile: s.vulnerability_percentile,
            cumulative_burden_score: s.cumulative_burden_score,
            weighted_burden_norm: s.weighted_burden_norm,
            cluster: labels.get(&s.tract).copied(),
        })
        .collect();

    debug!(
        rows = rows.len(),
        unclustered = rows.iter().filter(|r| r.cluster.is_none()).count(),
        "Map table projected"
    );
    rows
}
