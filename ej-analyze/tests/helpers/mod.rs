//! Test Helper Utilities
//!
//! Writes small source tables in the on-disk layout the pipeline reads.

#![allow(dead_code)]

use ej_common::config::PipelineConfig;
use ej_common::Indicator;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const VULNERABILITY_HEADER: &str = "FIPS,STATE,COUNTY,RPL_THEME1,RPL_THEME2,RPL_THEME3,RPL_THEME4,RPL_THEMES";
const DESIGNATION_HEADER: &str = "GEOID,DAC_Designation,NYC_Region";
const CROSSWALK_HEADER: &str = "tr2010ge,tr2020ge,wt_pop";

/// One current-vintage tract in the fixture
#[derive(Debug, Clone)]
pub struct FixtureTract {
    pub id: String,
    pub population: u64,
    pub households: u64,
    /// Every exposure percentile
    pub indicator: f64,
    /// Every raw [0,1] vulnerability value
    pub vulnerability: f64,
    /// Exposure indicators written as empty cells
    pub missing: Vec<Indicator>,
}

impl FixtureTract {
    pub fn new(id: &str, population: u64, indicator: f64, vulnerability: f64) -> Self {
        Self {
            id: id.to_string(),
            population,
            households: population / 2,
            indicator,
            vulnerability,
            missing: Vec::new(),
        }
    }

    /// Leave one exposure indicator empty
    pub fn without(mut self, indicator: Indicator) -> Self {
        self.missing.push(indicator);
        self
    }

    fn exposure_cells(&self) -> String {
        Indicator::ALL
            .iter()
            .map(|i| {
                if self.missing.contains(i) {
                    String::new()
                } else {
                    format!("{}", self.indicator)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn exposure_header() -> String {
    let mut columns = vec!["ID", "STATE_NAME", "CNTY_NAME", "ACSTOTPOP", "ACSTOTHH"];
    columns.extend(Indicator::ALL.iter().map(|i| i.raw_column()));
    columns.join(",")
}

/// Root folder holding `input_data/` with the four source files
pub struct Fixture {
    pub dir: TempDir,
    pub tracts: Vec<FixtureTract>,
    /// (legacy id, status text)
    pub designations: Vec<(String, String)>,
    /// (legacy id, current id)
    pub crosswalk: Vec<(String, String)>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            tracts: Vec::new(),
            designations: Vec::new(),
            crosswalk: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output_data")
    }

    pub fn tract(mut self, tract: FixtureTract) -> Self {
        self.tracts.push(tract);
        self
    }

    pub fn designation(mut self, legacy: &str, status: &str) -> Self {
        self.designations.push((legacy.to_string(), status.to_string()));
        self
    }

    pub fn link(mut self, legacy: &str, current: &str) -> Self {
        self.crosswalk.push((legacy.to_string(), current.to_string()));
        self
    }

    /// Write all four tables under `input_data/`
    pub fn write(&self) {
        let config = PipelineConfig::default();
        let input = self.root().join("input_data");
        fs::create_dir_all(&input).unwrap();

        let mut exposure = vec![exposure_header()];
        let mut vulnerability = vec![VULNERABILITY_HEADER.to_string()];
        for t in &self.tracts {
            exposure.push(format!(
                "{},NEW YORK,Bronx County,{},{},{}",
                t.id,
                t.population,
                t.households,
                t.exposure_cells()
            ));
            let themes = vec![format!("{}", t.vulnerability); 5].join(",");
            vulnerability.push(format!("{},New York,Bronx County,{}", t.id, themes));
        }
        // Outside the region filter
        exposure.push(format!(
            "99999999999,NEW JERSEY,Essex County,100,50,{}",
            vec!["50"; Indicator::COUNT].join(",")
        ));

        let mut designation = vec![DESIGNATION_HEADER.to_string()];
        for (legacy, status) in &self.designations {
            designation.push(format!("{},{},NYC", legacy, status));
        }

        let mut crosswalk = vec![CROSSWALK_HEADER.to_string()];
        for (legacy, current) in &self.crosswalk {
            crosswalk.push(format!("{},{},1.0", legacy, current));
        }

        write_lines(&input.join(&config.exposure_file), &exposure);
        write_lines(&input.join(&config.vulnerability_file), &vulnerability);
        write_lines(&input.join(&config.designation_file), &designation);
        write_lines(&input.join(&config.crosswalk_file), &crosswalk);
    }
}

fn write_lines(path: &Path, lines: &[String]) {
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text).unwrap();
}

/// Read an output CSV as header-keyed rows
pub fn read_csv(path: &Path) -> Vec<std::collections::HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            headers
                .iter()
                .zip(r.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}
