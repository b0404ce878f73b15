use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sbucket_core::ProbeRecord;

use crate::error::DirectoryError;
use crate::page::Page;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dump {
    pub records: Vec<ProbeRecord>,
    /// JSON Lines entries that could not be parsed and were skipped.
    pub malformed: usize,
}

/// Load a pre-fetched probe dump.
///
/// Accepted layouts:
/// * JSON Lines, one record per line (blank lines ignored)
/// * a JSON array of records
/// * a saved listing page, `{"count": .., "next": .., "results": [...]}`
pub fn load_dump(path: &Path) -> Result<Dump, DirectoryError> {
    let text = fs::read_to_string(path).map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |source| DirectoryError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let records: Vec<ProbeRecord> = serde_json::from_str(trimmed).map_err(parse_err)?;
        return Ok(Dump {
            records,
            malformed: 0,
        });
    }
    if trimmed.starts_with('{') {
        if let Ok(page) = serde_json::from_str::<Page<ProbeRecord>>(trimmed) {
            return Ok(Dump {
                records: page.results,
                malformed: 0,
            });
        }
    }

    let dump = read_json_lines(BufReader::new(text.as_bytes())).map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if dump.malformed > 0 {
        log::warn!(
            "{}: skipped {} malformed line(s)",
            path.display(),
            dump.malformed
        );
    }
    Ok(dump)
}

pub fn read_json_lines<R: BufRead>(reader: R) -> std::io::Result<Dump> {
    let mut dump = Dump::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ProbeRecord>(&line) {
            Ok(rec) => dump.records.push(rec),
            Err(err) => {
                log::debug!("line {}: {err}", n + 1);
                dump.malformed += 1;
            }
        }
    }
    Ok(dump)
}
