//! Read/write posterior draw JSON files.
//!
//! A draw file is a plain JSON array of `{"shape": .., "location": ..}`
//! records, so draws produced by an external inference engine can be fed
//! straight into `survsim check --draws-file`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::ParameterDraw;
use crate::error::SimError;

/// Read a draw JSON file.
pub fn read_draws_json(path: &Path) -> Result<Vec<ParameterDraw>, SimError> {
    let file = File::open(path)
        .map_err(|e| SimError::io(format!("Failed to open draws JSON '{}': {e}", path.display())))?;
    let draws: Vec<ParameterDraw> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SimError::io(format!("Invalid draws JSON '{}': {e}", path.display())))?;
    Ok(draws)
}

/// Write a draw JSON file.
pub fn write_draws_json(path: &Path, draws: &[ParameterDraw]) -> Result<(), SimError> {
    let file = File::create(path)
        .map_err(|e| SimError::io(format!("Failed to create draws JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, draws)
        .map_err(|e| SimError::io(format!("Failed to write draws JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("survsim-{}-{name}", std::process::id()))
    }

    #[test]
    fn draws_survive_a_file_round_trip() {
        let path = temp_path("draws.json");
        let draws = vec![ParameterDraw::new(0.8, -3.0), ParameterDraw::new(1.1, -2.5)];
        write_draws_json(&path, &draws).unwrap();
        let back = read_draws_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, draws);
    }

    #[test]
    fn malformed_file_is_an_io_error() {
        let path = temp_path("bad-draws.json");
        std::fs::write(&path, r#"[{"shape": 0.8}]"#).unwrap();
        let err = read_draws_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, SimError::Io { .. }));
        assert_eq!(err.exit_code(), 2);

        assert!(read_draws_json(&temp_path("missing.json")).is_err());
    }
}
