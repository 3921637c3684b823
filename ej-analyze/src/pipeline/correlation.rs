//! Indicator correlation matrix
//!
//! Pearson coefficients over pairwise-complete observations: each pair of
//! features uses only the tracts where both values are present.

use crate::types::TractRecord;
use ej_common::ClusterFeature;
use tracing::debug;

/// Square matrix indexed in `features` order
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub features: Vec<ClusterFeature>,
    pub coefficients: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.coefficients.get(row)?.get(col).copied().flatten()
    }
}

/// `None` for fewer than two complete pairs or a zero-variance side
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

pub fn correlate(records: &[TractRecord], features: &[ClusterFeature]) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = features
        .iter()
        .map(|f| records.iter().map(|r| r.feature(*f)).collect())
        .collect();

    let size = features.len();
    let mut coefficients = vec![vec![None; size]; size];
    for i in 0..size {
        for j in i..size {
            let pairs: Vec<(f64, f64)> = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .collect();
            let r = if i == j && pearson(&pairs).is_some() {
                Some(1.0)
            } else {
                pearson(&pairs)
            };
            coefficients[i][j] = r;
            coefficients[j][i] = r;
        }
    }

    debug!(features = size, tracts = records.len(), "Correlation matrix computed");
    CorrelationMatrix {
        features: features.to_vec(),
        coefficients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ej_common::{Designation, Indicator, TractId, VulnerabilityTheme};

    fn record(tract: &str, pm25: Option<f64>, ozone: Option<f64>, no2: f64) -> TractRecord {
        let mut indicators = [Some(10.0); Indicator::COUNT];
        indicators[Indicator::Pm25.index()] = pm25;
        indicators[Indicator::Ozone.index()] = ozone;
        indicators[Indicator::No2.index()] = Some(no2);
        TractRecord {
            tract: TractId::from(tract),
            population: 10,
            households: 5,
            designation: Designation::NotDesignated,
            indicators,
            vulnerability: [Some(20.0); VulnerabilityTheme::COUNT],
        }
    }

    fn features() -> Vec<ClusterFeature> {
        vec![
            ClusterFeature::Exposure(Indicator::Pm25),
            ClusterFeature::Exposure(Indicator::Ozone),
            ClusterFeature::Exposure(Indicator::No2),
            ClusterFeature::Exposure(Indicator::DieselPm),
        ]
    }

    #[test]
    fn test_perfect_positive_and_negative() {
        let records = vec![
            record("A", Some(1.0), Some(3.0), 30.0),
            record("B", Some(2.0), Some(2.0), 20.0),
            record("C", Some(3.0), Some(1.0), 10.0),
        ];
        let m = correlate(&records, &features());
        assert!((m.get(0, 1).unwrap() + 1.0).abs() < 1e-12);
        assert!((m.get(1, 2).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_eq!(m.get(0, 1), m.get(1, 0));
    }

    #[test]
    fn test_pairwise_complete_skips_missing() {
        let records = vec![
            record("A", Some(1.0), Some(1.0), 1.0),
            record("B", Some(2.0), None, 2.0),
            record("C", Some(3.0), Some(3.0), 3.0),
            record("D", None, Some(9.0), 4.0),
        ];
        let m = correlate(&records, &features());
        // Only A and C have both PM25 and Ozone
        assert!((m.get(0, 1).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_feature_is_missing() {
        let records = vec![
            record("A", Some(1.0), Some(1.0), 1.0),
            record("B", Some(2.0), Some(2.0), 2.0),
        ];
        let m = correlate(&records, &features());
        // Diesel PM is constant at 10
        assert_eq!(m.get(0, 3), None);
        assert_eq!(m.get(3, 3), None);
    }

    #[test]
    fn test_single_pair_is_missing() {
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
    }
}
