//! Source table ingestion
//!
//! Reads the four source CSV files by header name (never by position) and
//! applies the configured region subset. File handles live only inside the
//! `load_*` functions, so they are closed on every exit path.

use crate::types::{CrosswalkRow, DesignationRow, ExposureRow, VulnerabilityRow};
use csv::{ReaderBuilder, StringRecord};
use ej_common::config::RegionFilter;
use ej_common::{Error, Indicator, Result, TractId, VulnerabilityTheme};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const EXPOSURE_TABLE: &str = "exposure table";
pub const VULNERABILITY_TABLE: &str = "vulnerability table";
pub const DESIGNATION_TABLE: &str = "designation table";
pub const CROSSWALK_TABLE: &str = "crosswalk table";

/// Header lookup for one table
struct Columns {
    table: &'static str,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(table: &'static str, headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self { table, index }
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| Error::MissingColumn {
                table: self.table.to_string(),
                column: column.to_string(),
            })
    }
}

/// Single-row parsing context for error reporting
struct Cell<'a> {
    table: &'static str,
    record: &'a StringRecord,
}

impl<'a> Cell<'a> {
    fn row(&self) -> usize {
        self.record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default()
    }

    fn text(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("").trim()
    }

    fn invalid(&self, column: &str, value: &str) -> Error {
        Error::InvalidValue {
            table: self.table.to_string(),
            column: column.to_string(),
            row: self.row(),
            value: value.to_string(),
        }
    }

    fn tract(&self, index: usize, column: &str) -> Result<TractId> {
        let raw = self.text(index);
        TractId::parse(raw).ok_or_else(|| self.invalid(column, raw))
    }

    /// Optional numeric cell; empty and NaN-like cells are missing
    fn value(&self, index: usize, column: &str) -> Result<Option<f64>> {
        let raw = self.text(index);
        if is_missing_marker(raw) {
            return Ok(None);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_nan() => Ok(None),
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(self.invalid(column, raw)),
        }
    }

    /// Required non-negative integer count; accepts integral decimals
    fn count(&self, index: usize, column: &str) -> Result<u64> {
        let raw = self.text(index);
        if let Ok(n) = raw.parse::<u64>() {
            return Ok(n);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
            _ => Err(self.invalid(column, raw)),
        }
    }
}

fn is_missing_marker(raw: &str) -> bool {
    matches!(raw, "" | "NaN" | "nan" | "NA" | "N/A")
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new().has_headers(true).flexible(false).from_reader(source)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::File {
        path: path.display().to_string(),
        source,
    })
}

/// Reject a keyed table that repeats an identifier
fn ensure_unique<'a>(table: &str, tracts: impl Iterator<Item = &'a TractId>) -> Result<()> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for tract in tracts {
        if !seen.insert(tract) {
            duplicates.insert(tract.to_string());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::DuplicateTract {
            table: table.to_string(),
            tracts: duplicates.into_iter().collect(),
        })
    }
}

// ============================================================================
// Exposure indicators
// ============================================================================

/// Read the exposure-indicator table, keeping rows inside the region
pub fn read_exposure<R: Read>(source: R, region: &RegionFilter) -> Result<Vec<ExposureRow>> {
    let mut rdr = reader(source);
    let columns = Columns::new(EXPOSURE_TABLE, rdr.headers()?);

    let id = columns.require("ID")?;
    let state = columns.require("STATE_NAME")?;
    let county = columns.require("CNTY_NAME")?;
    let population = columns.require("ACSTOTPOP")?;
    let households = columns.require("ACSTOTHH")?;
    let indicator_columns = Indicator::ALL
        .iter()
        .map(|i| columns.require(i.raw_column()))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    let mut total = 0usize;
    for record in rdr.records() {
        let record = record?;
        total += 1;
        let cell = Cell {
            table: EXPOSURE_TABLE,
            record: &record,
        };
        if cell.text(state) != region.state_name || !region.includes_county(cell.text(county)) {
            continue;
        }

        let mut indicators = [None; Indicator::COUNT];
        for (indicator, &index) in Indicator::ALL.iter().zip(&indicator_columns) {
            indicators[indicator.index()] = cell.value(index, indicator.raw_column())?;
        }

        rows.push(ExposureRow {
            tract: cell.tract(id, "ID")?,
            population: cell.count(population, "ACSTOTPOP")?,
            households: cell.count(households, "ACSTOTHH")?,
            indicators,
        });
    }

    ensure_unique(EXPOSURE_TABLE, rows.iter().map(|r| &r.tract))?;
    info!(total_rows = total, kept_rows = rows.len(), "Read exposure table");
    Ok(rows)
}

pub fn load_exposure(path: &Path, region: &RegionFilter) -> Result<Vec<ExposureRow>> {
    debug!("Opening {}", path.display());
    read_exposure(open(path)?, region)
}

// ============================================================================
// Social vulnerability
// ============================================================================

/// Read the vulnerability table; values stay on their raw [0,1] scale
pub fn read_vulnerability<R: Read>(
    source: R,
    region: &RegionFilter,
) -> Result<Vec<VulnerabilityRow>> {
    let mut rdr = reader(source);
    let columns = Columns::new(VULNERABILITY_TABLE, rdr.headers()?);

    let fips = columns.require("FIPS")?;
    let state = columns.require("STATE")?;
    let county = columns.require("COUNTY")?;
    let theme_columns = VulnerabilityTheme::ALL
        .iter()
        .map(|t| columns.require(t.raw_column()))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    let mut total = 0usize;
    for record in rdr.records() {
        let record = record?;
        total += 1;
        let cell = Cell {
            table: VULNERABILITY_TABLE,
            record: &record,
        };
        if cell.text(state) != region.state || !region.includes_county(cell.text(county)) {
            continue;
        }

        let mut themes = [None; VulnerabilityTheme::COUNT];
        for (theme, &index) in VulnerabilityTheme::ALL.iter().zip(&theme_columns) {
            themes[theme.index()] = cell.value(index, theme.raw_column())?;
        }

        rows.push(VulnerabilityRow {
            tract: cell.tract(fips, "FIPS")?,
            themes,
        });
    }

    ensure_unique(VULNERABILITY_TABLE, rows.iter().map(|r| &r.tract))?;
    info!(total_rows = total, kept_rows = rows.len(), "Read vulnerability table");
    Ok(rows)
}

pub fn load_vulnerability(path: &Path, region: &RegionFilter) -> Result<Vec<VulnerabilityRow>> {
    debug!("Opening {}", path.display());
    read_vulnerability(open(path)?, region)
}

// ============================================================================
// Designations and crosswalk
// ============================================================================

/// Read the legacy-vintage designation table for the configured region
pub fn read_designations<R: Read>(
    source: R,
    region: &RegionFilter,
) -> Result<Vec<DesignationRow>> {
    let mut rdr = reader(source);
    let columns = Columns::new(DESIGNATION_TABLE, rdr.headers()?);

    let geoid = columns.require("GEOID")?;
    let status = columns.require("DAC_Designation")?;
    let region_column = columns.require("NYC_Region")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = Cell {
            table: DESIGNATION_TABLE,
            record: &record,
        };
        if cell.text(region_column) != region.designation_region {
            continue;
        }
        rows.push(DesignationRow {
            legacy_tract: cell.tract(geoid, "GEOID")?,
            status: cell.text(status).to_string(),
        });
    }

    info!(kept_rows = rows.len(), "Read designation table");
    Ok(rows)
}

pub fn load_designations(path: &Path, region: &RegionFilter) -> Result<Vec<DesignationRow>> {
    debug!("Opening {}", path.display());
    read_designations(open(path)?, region)
}

/// Read the legacy → current crosswalk (only the two identifier columns)
pub fn read_crosswalk<R: Read>(source: R) -> Result<Vec<CrosswalkRow>> {
    let mut rdr = reader(source);
    let columns = Columns::new(CROSSWALK_TABLE, rdr.headers()?);

    let legacy = columns.require("tr2010ge")?;
    let current = columns.require("tr2020ge")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = Cell {
            table: CROSSWALK_TABLE,
            record: &record,
        };
        rows.push(CrosswalkRow {
            legacy_tract: cell.tract(legacy, "tr2010ge")?,
            current_tract: cell.tract(current, "tr2020ge")?,
        });
    }

    info!(rows = rows.len(), "Read crosswalk table");
    Ok(rows)
}

pub fn load_crosswalk(path: &Path) -> Result<Vec<CrosswalkRow>> {
    debug!("Opening {}", path.display());
    read_crosswalk(open(path)?)
}
