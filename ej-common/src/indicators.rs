//! Indicator catalogue and column naming
//!
//! Every raw source column the pipeline reads has exactly one readable name.
//! The rename table is total over those columns and injective; both are
//! checked by tests rather than trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environmental exposure percentile indicator (0-100 national percentile)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Indicator {
    #[serde(rename = "PM25")]
    Pm25,
    #[serde(rename = "Ozone")]
    Ozone,
    #[serde(rename = "Diesel_PM")]
    DieselPm,
    #[serde(rename = "Toxic_Air_Releases")]
    ToxicAirReleases,
    #[serde(rename = "Percent_HHLeadPaint")]
    LeadPaint,
    #[serde(rename = "Superfund_Prox")]
    SuperfundProx,
    #[serde(rename = "RMP_Prox")]
    RmpProx,
    #[serde(rename = "HazWaste_Prox")]
    HazWasteProx,
    #[serde(rename = "WW_Discharge")]
    WwDischarge,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "DW_Noncomp")]
    DwNoncomp,
    #[serde(rename = "Traffic_Prox")]
    TrafficProx,
}

impl Indicator {
    pub const COUNT: usize = 12;

    /// All indicators in source-file order
    pub const ALL: [Indicator; Indicator::COUNT] = [
        Indicator::Pm25,
        Indicator::Ozone,
        Indicator::DieselPm,
        Indicator::ToxicAirReleases,
        Indicator::LeadPaint,
        Indicator::SuperfundProx,
        Indicator::RmpProx,
        Indicator::HazWasteProx,
        Indicator::WwDischarge,
        Indicator::No2,
        Indicator::DwNoncomp,
        Indicator::TrafficProx,
    ];

    /// Position inside `ALL`, used to index value arrays
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name in the exposure-indicator source file
    pub fn raw_column(self) -> &'static str {
        match self {
            Indicator::Pm25 => "P_PM25",
            Indicator::Ozone => "P_OZONE",
            Indicator::DieselPm => "P_DSLPM",
            Indicator::ToxicAirReleases => "P_RSEI_AIR",
            Indicator::LeadPaint => "P_LDPNT",
            Indicator::SuperfundProx => "P_PNPL",
            Indicator::RmpProx => "P_PRMP",
            Indicator::HazWasteProx => "P_PTSDF",
            Indicator::WwDischarge => "P_PWDIS",
            Indicator::No2 => "P_NO2",
            Indicator::DwNoncomp => "P_DWATER",
            Indicator::TrafficProx => "P_PTRAF",
        }
    }

    /// Readable column name used in every output table
    pub fn name(self) -> &'static str {
        match self {
            Indicator::Pm25 => "PM25",
            Indicator::Ozone => "Ozone",
            Indicator::DieselPm => "Diesel_PM",
            Indicator::ToxicAirReleases => "Toxic_Air_Releases",
            Indicator::LeadPaint => "Percent_HHLeadPaint",
            Indicator::SuperfundProx => "Superfund_Prox",
            Indicator::RmpProx => "RMP_Prox",
            Indicator::HazWasteProx => "HazWaste_Prox",
            Indicator::WwDischarge => "WW_Discharge",
            Indicator::No2 => "NO2",
            Indicator::DwNoncomp => "DW_Noncomp",
            Indicator::TrafficProx => "Traffic_Prox",
        }
    }

    /// Presentation label for the correlation matrix
    pub fn label(self) -> &'static str {
        match self {
            Indicator::Pm25 => "PM2.5",
            Indicator::Ozone => "Ozone",
            Indicator::DieselPm => "Diesel PM",
            Indicator::ToxicAirReleases => "Toxic Releases to Air",
            Indicator::LeadPaint => "Lead Paint Percentage",
            Indicator::SuperfundProx => "Superfund Proximity",
            Indicator::RmpProx => "RMP Facility Proximity",
            Indicator::HazWasteProx => "Haz. Waste Proximity",
            Indicator::WwDischarge => "Wastewater Discharge",
            Indicator::No2 => "NO2",
            Indicator::DwNoncomp => "Drinking Water Noncomp.",
            Indicator::TrafficProx => "Traffic Proximity",
        }
    }
}

/// Social vulnerability theme or composite index
///
/// Arrives on [0,1] and is rescaled to the [0,100] percentile convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VulnerabilityTheme {
    #[serde(rename = "Socioecon_Percentile")]
    Socioeconomic,
    #[serde(rename = "HHVuln_Percentile")]
    HouseholdCharacteristics,
    #[serde(rename = "Minority_Percentile")]
    RacialEthnicMinority,
    #[serde(rename = "HouseType_Percentile")]
    HousingTransportation,
    #[serde(rename = "Vulnerability_Percentile")]
    Overall,
}

impl VulnerabilityTheme {
    pub const COUNT: usize = 5;

    pub const ALL: [VulnerabilityTheme; VulnerabilityTheme::COUNT] = [
        VulnerabilityTheme::Socioeconomic,
        VulnerabilityTheme::HouseholdCharacteristics,
        VulnerabilityTheme::RacialEthnicMinority,
        VulnerabilityTheme::HousingTransportation,
        VulnerabilityTheme::Overall,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn raw_column(self) -> &'static str {
        match self {
            VulnerabilityTheme::Socioeconomic => "RPL_THEME1",
            VulnerabilityTheme::HouseholdCharacteristics => "RPL_THEME2",
            VulnerabilityTheme::RacialEthnicMinority => "RPL_THEME3",
            VulnerabilityTheme::HousingTransportation => "RPL_THEME4",
            VulnerabilityTheme::Overall => "RPL_THEMES",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VulnerabilityTheme::Socioeconomic => "Socioecon_Percentile",
            VulnerabilityTheme::HouseholdCharacteristics => "HHVuln_Percentile",
            VulnerabilityTheme::RacialEthnicMinority => "Minority_Percentile",
            VulnerabilityTheme::HousingTransportation => "HouseType_Percentile",
            VulnerabilityTheme::Overall => "Vulnerability_Percentile",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VulnerabilityTheme::Socioeconomic => "Socioeconomic Index",
            VulnerabilityTheme::HouseholdCharacteristics => "Household Vuln. Index",
            VulnerabilityTheme::RacialEthnicMinority => "Racial Minority Index",
            VulnerabilityTheme::HousingTransportation => "Housing/Transport Index",
            VulnerabilityTheme::Overall => "Overall Vulnerability Index",
        }
    }
}

/// A column usable as a clustering or correlation feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClusterFeature {
    Population,
    Households,
    Exposure(Indicator),
    Vulnerability(VulnerabilityTheme),
}

impl ClusterFeature {
    pub fn name(self) -> &'static str {
        match self {
            ClusterFeature::Population => "Population",
            ClusterFeature::Households => "Households",
            ClusterFeature::Exposure(indicator) => indicator.name(),
            ClusterFeature::Vulnerability(theme) => theme.name(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClusterFeature::Population => "Population",
            ClusterFeature::Households => "Households",
            ClusterFeature::Exposure(indicator) => indicator.label(),
            ClusterFeature::Vulnerability(theme) => theme.label(),
        }
    }
}

impl fmt::Display for ClusterFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClusterFeature {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Population" => return Ok(ClusterFeature::Population),
            "Households" => return Ok(ClusterFeature::Households),
            _ => {}
        }
        if let Some(indicator) = Indicator::ALL.iter().find(|i| i.name() == s) {
            return Ok(ClusterFeature::Exposure(*indicator));
        }
        if let Some(theme) = VulnerabilityTheme::ALL.iter().find(|t| t.name() == s) {
            return Ok(ClusterFeature::Vulnerability(*theme));
        }
        Err(format!("unknown feature '{}'", s))
    }
}

impl TryFrom<String> for ClusterFeature {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClusterFeature> for String {
    fn from(feature: ClusterFeature) -> Self {
        feature.name().to_string()
    }
}

/// Default clustering features: demographics, air, hazard proximity, water,
/// then the four vulnerability themes. Derived burden scores are excluded.
pub fn default_cluster_features() -> Vec<ClusterFeature> {
    use ClusterFeature::{Exposure, Vulnerability};
    vec![
        ClusterFeature::Population,
        ClusterFeature::Households,
        Exposure(Indicator::Pm25),
        Exposure(Indicator::Ozone),
        Exposure(Indicator::DieselPm),
        Exposure(Indicator::No2),
        Exposure(Indicator::ToxicAirReleases),
        Exposure(Indicator::SuperfundProx),
        Exposure(Indicator::RmpProx),
        Exposure(Indicator::HazWasteProx),
        Exposure(Indicator::LeadPaint),
        Exposure(Indicator::TrafficProx),
        Exposure(Indicator::DwNoncomp),
        Exposure(Indicator::WwDischarge),
        Vulnerability(VulnerabilityTheme::Socioeconomic),
        Vulnerability(VulnerabilityTheme::HouseholdCharacteristics),
        Vulnerability(VulnerabilityTheme::RacialEthnicMinority),
        Vulnerability(VulnerabilityTheme::HousingTransportation),
    ]
}

/// Correlation matrix features: the clustering features minus demographics
pub fn default_correlation_features() -> Vec<ClusterFeature> {
    default_cluster_features()
        .into_iter()
        .filter(|f| !matches!(f, ClusterFeature::Population | ClusterFeature::Households))
        .collect()
}

pub fn default_pollution_indicators() -> Vec<Indicator> {
    vec![
        Indicator::Pm25,
        Indicator::Ozone,
        Indicator::DieselPm,
        Indicator::ToxicAirReleases,
        Indicator::No2,
        Indicator::WwDischarge,
    ]
}

pub fn default_hazard_indicators() -> Vec<Indicator> {
    vec![
        Indicator::LeadPaint,
        Indicator::SuperfundProx,
        Indicator::RmpProx,
        Indicator::HazWasteProx,
        Indicator::DwNoncomp,
    ]
}

pub const TRACT_COLUMN: &str = "Tract";
pub const POPULATION_COLUMN: &str = "Population";
pub const HOUSEHOLDS_COLUMN: &str = "Households";
pub const IS_DAC_COLUMN: &str = "Is_DAC";

/// Raw source column → readable output column
///
/// Ordered as the merged table is written: identity, counts, exposure
/// indicators, designation flag, vulnerability.
pub fn column_renames() -> Vec<(&'static str, &'static str)> {
    let mut renames = vec![
        ("ID", TRACT_COLUMN),
        ("ACSTOTPOP", POPULATION_COLUMN),
        ("ACSTOTHH", HOUSEHOLDS_COLUMN),
    ];
    renames.extend(Indicator::ALL.iter().map(|i| (i.raw_column(), i.name())));
    renames.push(("DAC_Designation", IS_DAC_COLUMN));
    renames.extend(VulnerabilityTheme::ALL.iter().map(|t| (t.raw_column(), t.name())));
    renames
}
