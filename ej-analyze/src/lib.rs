//! ej-analyze - Environmental-justice burden pipeline
//!
//! Reconciles tract designations across identifier vintages, merges them with
//! exposure and social-vulnerability tables, scores cumulative burden,
//! clusters tracts by feature similarity and writes the tables consumed by
//! the mapping step.

pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod types;

pub use pipeline::{run_pipeline, PipelineInputs, PipelineOutput, RunReport};

use ej_common::config::PipelineConfig;
use ej_common::Result;
use std::path::Path;
use tracing::info;

/// Read the four source tables from `input_dir`
pub fn load_inputs(config: &PipelineConfig, input_dir: &Path) -> Result<PipelineInputs> {
    let region = &config.region;
    Ok(PipelineInputs {
        exposure: ingest::load_exposure(&input_dir.join(&config.exposure_file), region)?,
        vulnerability: ingest::load_vulnerability(
            &input_dir.join(&config.vulnerability_file),
            region,
        )?,
        designations: ingest::load_designations(
            &input_dir.join(&config.designation_file),
            region,
        )?,
        crosswalk: ingest::load_crosswalk(&input_dir.join(&config.crosswalk_file))?,
    })
}

/// Load, run every stage, then write outputs
///
/// Outputs are written only after the whole pipeline succeeded, so a failed
/// run leaves the output folder untouched.
pub fn run(config: &PipelineConfig, root: &Path) -> Result<RunReport> {
    config.validate()?;
    let input_dir = config.input_dir(root);
    let output_dir = config.output_dir(root);
    info!(input = %input_dir.display(), output = %output_dir.display(), "Starting run");

    let inputs = load_inputs(config, &input_dir)?;
    let output = run_pipeline(&inputs, config)?;
    output::write_all(&output_dir, &output)?;
    Ok(output.report)
}
