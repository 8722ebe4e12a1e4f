//! Export check results to CSV/JSON.
//!
//! The CSV is one row per band and is meant to be easy to consume in
//! spreadsheets or plotting scripts. The JSON carries everything: config,
//! bands, the observed curve and draw accounting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::CheckOutput;
use crate::domain::{AggregatedBand, SimConfig};
use crate::error::SimError;

/// Schema of the JSON written by [`write_check_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub config: SimConfig,
    pub output: CheckOutput,
}

/// Write aggregated bands to a CSV file.
pub fn write_bands_csv(path: &Path, bands: &[AggregatedBand]) -> Result<(), SimError> {
    let file = File::create(path)
        .map_err(|e| SimError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "time_bin,mean,median,lower,upper")
        .map_err(|e| SimError::io(format!("Failed to write export CSV header: {e}")))?;

    for b in bands {
        writeln!(
            out,
            "{},{:.10},{:.10},{:.10},{:.10}",
            b.time_bin, b.mean, b.median, b.lower, b.upper
        )
        .map_err(|e| SimError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| SimError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write the full check result as pretty JSON.
pub fn write_check_json(path: &Path, output: &CheckOutput, config: &SimConfig) -> Result<(), SimError> {
    let file = File::create(path)
        .map_err(|e| SimError::io(format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let doc = CheckFile {
        tool: "survsim".to_string(),
        generated_at: Utc::now(),
        config: config.clone(),
        output: output.clone(),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .map_err(|e| SimError::io(format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicate::ReplicateSummary;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("survsim-{}-{name}", std::process::id()))
    }

    fn bands() -> Vec<AggregatedBand> {
        vec![
            AggregatedBand {
                time_bin: 0,
                mean: 0.95,
                median: 0.96,
                lower: 0.9,
                upper: 1.0,
            },
            AggregatedBand {
                time_bin: 4,
                mean: 0.5,
                median: 0.5,
                lower: 0.25,
                upper: 0.75,
            },
        ]
    }

    #[test]
    fn csv_has_header_and_one_row_per_band() {
        let path = temp_path("bands.csv");
        write_bands_csv(&path, &bands()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "time_bin,mean,median,lower,upper");
        assert!(lines[2].starts_with("4,0.5000000000,"));
    }

    #[test]
    fn json_export_reloads() {
        let path = temp_path("check.json");
        let output = CheckOutput {
            summary: ReplicateSummary {
                bands: bands(),
                draws_requested: 3,
                draws_used: 3,
                failures: Vec::new(),
            },
            observed_curve: None,
        };
        let config = SimConfig::default();
        write_check_json(&path, &output, &config).unwrap();

        let file = File::open(&path).unwrap();
        let doc: CheckFile = serde_json::from_reader(file).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(doc.tool, "survsim");
        assert_eq!(doc.config, config);
        assert_eq!(doc.output, output);
    }
}
