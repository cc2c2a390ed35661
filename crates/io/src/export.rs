//! Team export files.
//!
//! Every run writes all three files with the header line, even when a file
//! receives no rows. Data rows quote every field.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info};

use mandates_recon::model::{ResolvedRecord, OUTPUT_HEADER};
use mandates_recon::Destination;

use crate::error::IoError;

/// One path per destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPaths {
    pub pre_team: PathBuf,
    pub post_team: PathBuf,
    pub check: PathBuf,
}

impl ExportPaths {
    pub fn get(&self, destination: Destination) -> &Path {
        match destination {
            Destination::PreTeam => &self.pre_team,
            Destination::PostTeam => &self.post_team,
            Destination::Check => &self.check,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub pre_team_rows: usize,
    pub post_team_rows: usize,
    pub check_rows: usize,
}

impl ExportReport {
    pub fn rows(&self, destination: Destination) -> usize {
        match destination {
            Destination::PreTeam => self.pre_team_rows,
            Destination::PostTeam => self.post_team_rows,
            Destination::Check => self.check_rows,
        }
    }

    pub fn total(&self) -> usize {
        self.pre_team_rows + self.post_team_rows + self.check_rows
    }

    fn bump(&mut self, destination: Destination) {
        match destination {
            Destination::PreTeam => self.pre_team_rows += 1,
            Destination::PostTeam => self.post_team_rows += 1,
            Destination::Check => self.check_rows += 1,
        }
    }
}

/// Writes each resolved record to exactly one of three sinks.
pub struct Partitioner<W: Write> {
    pre_team: Writer<W>,
    post_team: Writer<W>,
    check: Writer<W>,
    report: ExportReport,
}

fn header_line() -> String {
    let mut line = OUTPUT_HEADER.join(",");
    line.push('\n');
    line
}

fn quoted_writer<W: Write>(mut sink: W) -> Result<Writer<W>, IoError> {
    // Header goes out bare; csv would quote it too under QuoteStyle::Always.
    sink.write_all(header_line().as_bytes())?;
    Ok(WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(sink))
}

impl<W: Write> Partitioner<W> {
    /// Header lines are written immediately.
    pub fn from_writers(pre_team: W, post_team: W, check: W) -> Result<Self, IoError> {
        Ok(Self {
            pre_team: quoted_writer(pre_team)?,
            post_team: quoted_writer(post_team)?,
            check: quoted_writer(check)?,
            report: ExportReport::default(),
        })
    }

    fn sink(&mut self, destination: Destination) -> &mut Writer<W> {
        match destination {
            Destination::PreTeam => &mut self.pre_team,
            Destination::PostTeam => &mut self.post_team,
            Destination::Check => &mut self.check,
        }
    }

    /// Append one row to the file its team maps to.
    pub fn write(&mut self, record: &ResolvedRecord) -> Result<Destination, IoError> {
        let destination = record.target_team.destination();
        self.sink(destination).write_record(record.output_fields())?;
        self.report.bump(destination);
        debug!(id = %record.event.id, %destination, "row exported");
        Ok(destination)
    }

    pub fn rows(&self) -> &ExportReport {
        &self.report
    }

    /// Flush all three sinks.
    pub fn finish(mut self) -> Result<ExportReport, IoError> {
        for destination in Destination::ALL {
            self.sink(destination).flush()?;
        }
        info!(
            pre_team = self.report.pre_team_rows,
            post_team = self.report.post_team_rows,
            check = self.report.check_rows,
            "export complete"
        );
        Ok(self.report)
    }

    /// Consume the partitioner and hand back the flushed sinks.
    #[cfg(test)]
    fn into_writers(self) -> Result<(W, W, W), IoError> {
        let unwrap = |w: Writer<W>| w.into_inner().map_err(|e| IoError::Io(e.into_error()));
        Ok((unwrap(self.pre_team)?, unwrap(self.post_team)?, unwrap(self.check)?))
    }
}

impl Partitioner<BufWriter<File>> {
    /// Create (truncating) all three files.
    pub fn create(paths: &ExportPaths) -> Result<Self, IoError> {
        let open = |path: &Path| -> Result<BufWriter<File>, IoError> {
            File::create(path)
                .map(BufWriter::new)
                .map_err(|source| IoError::OutputUnwritable { path: path.to_path_buf(), source })
        };
        Self::from_writers(open(&paths.pre_team)?, open(&paths.post_team)?, open(&paths.check)?)
    }
}
