//! Zip archive access.
//!
//! Each archive is expected to hold exactly one tabular tick file.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use timeslot_core::{Error, Result};
use tracing::{debug, warn};

use crate::tick_parser::TickReader;

/// Read the first entry of a zip archive into memory.
///
/// Returns the entry name and its bytes.
pub fn read_first_entry(path: &Path) -> Result<(String, Vec<u8>)> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::archive(format!("{}: {}", path.display(), e)))?;

    if archive.len() == 0 {
        return Err(Error::archive(format!("{}: archive has no entries", path.display())));
    }
    if archive.len() > 1 {
        warn!(
            archive = %path.display(),
            entries = archive.len(),
            "archive holds more than one entry, reading the first"
        );
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|e| Error::archive(format!("{}: {}", path.display(), e)))?;
    let name = entry.name().to_string();
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;

    debug!(archive = %path.display(), entry = %name, bytes = buf.len(), "archive entry read");
    Ok((name, buf))
}

/// Open a tick archive and return a reader over its ticks.
pub fn open_tick_archive(path: &Path) -> Result<TickReader<Cursor<Vec<u8>>>> {
    let (name, buf) = read_first_entry(path)?;
    let source = format!("{}:{}", path.display(), name);
    Ok(TickReader::new(Cursor::new(buf), source))
}
