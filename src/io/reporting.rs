// src/io/reporting.rs

use crate::simulation::runner::StepRecord;
use std::error::Error;
use std::path::Path;
use tracing::info;

/// Writes per-step episode records to a CSV file.
///
/// # Arguments
/// * `file_path` - The path to save the file (e.g., "results/episode.csv").
/// * `data` - The step records collected by the episode runner.
pub fn write_episode_log(file_path: &Path, data: &[StepRecord]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut wtr = csv::Writer::from_path(file_path)?;

    for record in data {
        wtr.serialize(record)?;
    }

    // Flush the buffer to ensure all data is written
    wtr.flush()?;

    info!(
        rows = data.len(),
        path = %file_path.display(),
        "episode log exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_one_row_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("episode.csv");
        let record = StepRecord {
            episode: 0,
            day: 0,
            order: 12,
            arrivals: 0,
            demand: 18,
            forecast: 18.0,
            served: 0,
            shortage: 18,
            waste: 0,
            on_hand: 0,
            in_transit: 12,
            cost: 54.0,
            reward: -54.0,
        };

        write_episode_log(&path, &[record.clone(), record]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("episode,day,order,arrivals,demand,forecast"));
        assert!(lines[1].starts_with("0,0,12,0,18,18.0,0,18"));
    }
}
