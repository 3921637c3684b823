//! Identifier Reconciler
//!
//! Re-keys legacy-vintage designations to current-vintage tract identifiers
//! through the crosswalk.
//!
//! # Join policy
//! Left join of the designation table onto the crosswalk. Every legacy row must
//! match at least one crosswalk row; an unmatched row means the two files come
//! from different vintages and the run stops with the exact match counts.
//!
//! # Conflict policy
//! Several legacy tracts can collapse into one current tract. The current tract
//! is designated if ANY contributing legacy tract is designated, and not
//! designated only when ALL of them are not.

use crate::types::{CrosswalkRow, DesignationRow, JoinReport};
use ej_common::{Designation, Error, Result, TractId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Designations keyed uniquely by current-vintage identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub designations: BTreeMap<TractId, Designation>,
    pub join: JoinReport,
}

impl Reconciliation {
    pub fn designated_count(&self) -> usize {
        self.designations
            .values()
            .filter(|d| d.is_designated())
            .count()
    }
}

/// Map every designation status through the total categorical mapping
///
/// All unmapped values are collected before failing so the report names each
/// offending category once.
fn parse_statuses(rows: &[DesignationRow]) -> Result<Vec<Designation>> {
    let mut parsed = Vec::with_capacity(rows.len());
    let mut unmapped: BTreeMap<&str, usize> = BTreeMap::new();

    for row in rows {
        match Designation::from_text(&row.status) {
            Ok(designation) => parsed.push(designation),
            Err(_) => *unmapped.entry(row.status.as_str()).or_insert(0) += 1,
        }
    }

    if unmapped.is_empty() {
        Ok(parsed)
    } else {
        let rows = unmapped.values().sum();
        let value = unmapped.keys().copied().collect::<Vec<_>>().join(", ");
        Err(Error::UnmappedDesignation { value, rows })
    }
}

/// Reconcile legacy designations onto current-vintage identifiers
pub fn reconcile(
    designations: &[DesignationRow],
    crosswalk: &[CrosswalkRow],
) -> Result<Reconciliation> {
    let statuses = parse_statuses(designations)?;

    // legacy → distinct current targets, in crosswalk order
    let mut targets: BTreeMap<&TractId, Vec<&TractId>> = BTreeMap::new();
    for row in crosswalk {
        let entry = targets.entry(&row.legacy_tract).or_default();
        if !entry.contains(&&row.current_tract) {
            entry.push(&row.current_tract);
        }
    }

    let mut join = JoinReport::new("designation/crosswalk");
    let mut referenced = BTreeSet::new();
    let mut reconciled: BTreeMap<TractId, Designation> = BTreeMap::new();

    for (row, status) in designations.iter().zip(statuses) {
        match targets.get(&row.legacy_tract) {
            Some(currents) => {
                referenced.insert(&row.legacy_tract);
                join.both += currents.len();
                for current in currents {
                    reconciled
                        .entry((*current).clone())
                        .and_modify(|existing| *existing = existing.union(status))
                        .or_insert(status);
                }
            }
            None => {
                join.left_only += 1;
                join.left_only_tracts.push(row.legacy_tract.clone());
            }
        }
    }
    join.right_unused = targets.len() - referenced.len();

    info!(
        both = join.both,
        left_only = join.left_only,
        "Designation crosswalk join"
    );

    if join.left_only > 0 {
        let unmatched = join
            .left_only_tracts
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::JoinIntegrity {
            join: join.join.clone(),
            report: format!("{}; unmatched legacy tracts: {}", join.summary(), unmatched),
        });
    }

    let reconciliation = Reconciliation {
        designations: reconciled,
        join,
    };
    debug!(
        current_tracts = reconciliation.designations.len(),
        designated = reconciliation.designated_count(),
        "Designations reconciled"
    );
    Ok(reconciliation)
}
