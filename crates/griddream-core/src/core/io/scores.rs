use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes one score per line, in the order given, with no header.
pub fn write_scores(scores: &[f32], writer: &mut impl Write) -> io::Result<()> {
    for score in scores {
        writeln!(writer, "{}", score)?;
    }
    writer.flush()
}

pub fn write_scores_to_path<P: AsRef<Path>>(scores: &[f32], path: P) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_scores(scores, &mut writer)
}

/// One row of the combined summary table across all targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub target: usize,
    pub candidate: usize,
    pub title: String,
    pub score: f32,
}

pub fn write_summary<W: Write>(rows: &[SummaryRow], writer: W) -> Result<(), ScoreWriteError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_summary_to_path<P: AsRef<Path>>(
    rows: &[SummaryRow],
    path: P,
) -> Result<(), ScoreWriteError> {
    write_summary(rows, File::create(path)?)
}
