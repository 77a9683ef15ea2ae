//! CSV export of merged reaction counters.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;

/// Write counter rows `[step, count_r0, count_r1, ...]` to a CSV file.
///
/// Call with the rows returned by the engine's counter collection on
/// rank 0; on other ranks there is nothing to write.
pub fn export_reaction_counters<P: AsRef<Path>>(path: P, rows: &[Vec<u64>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let reaction_count = rows.iter().map(|r| r.len().saturating_sub(1)).max().unwrap_or(0);
    let mut header = vec!["step".to_string()];
    for i in 0..reaction_count {
        header.push(format!("reaction_{}", i));
    }
    writer.write_record(&header)?;

    for row in rows {
        let record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;

    log::info!("Reaction counters exported: {}", path.as_ref().display());
    Ok(())
}

/// Write `[step, intra, inter]` rows to a CSV file.
pub fn export_intra_inter_counters<P: AsRef<Path>>(path: P, rows: &[[u64; 3]]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["step", "intra", "inter"])?;
    for row in rows {
        writer.write_record(row.map(|v| v.to_string()))?;
    }
    writer.flush()?;

    log::info!("Intra/inter counters exported: {}", path.as_ref().display());
    Ok(())
}

/// Export counters into `dir` with an auto-timestamped filename
/// `reactions_YYYYMMDD_HHMMSS.csv`. Returns the path written.
pub fn export_reaction_counters_timestamped<P: AsRef<Path>>(
    dir: P,
    rows: &[Vec<u64>],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir.as_ref())?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.as_ref().join(format!("reactions_{}.csv", timestamp));

    export_reaction_counters(&path, rows)?;
    Ok(path)
}
