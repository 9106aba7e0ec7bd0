//! Dataset directory layout.
//!
//! The input root holds one directory per instrument, each with one zip
//! archive per period. Period `k` is the `k`-th archive (by file name) of
//! every instrument directory.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use timeslot_core::config::DatasetConfig;
use timeslot_core::{Error, Result, Symbol};
use tracing::{debug, warn};

/// Six uppercase letters not embedded in a longer uppercase run.
const SYMBOL_PATTERN: &str = r"(?:^|[^A-Z])([A-Z]{6})(?:[^A-Z]|$)";

/// Extracts instrument symbols from archive file names.
#[derive(Debug, Clone)]
pub struct SymbolMatcher {
    re: Regex,
}

impl SymbolMatcher {
    pub fn new() -> Result<Self> {
        let re = Regex::new(SYMBOL_PATTERN)
            .map_err(|e| Error::config(format!("symbol pattern: {}", e)))?;
        Ok(Self { re })
    }

    /// First six-letter symbol in `name`.
    pub fn find(&self, name: &str) -> Option<Symbol> {
        self.re
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// One instrument directory with its archives sorted by file name.
#[derive(Debug, Clone)]
pub struct InstrumentDir {
    pub path: PathBuf,
    pub archives: Vec<PathBuf>,
}

impl InstrumentDir {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// An archive resolved to its instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    pub symbol: Symbol,
    pub path: PathBuf,
}

/// The archives processed together as one period.
#[derive(Debug, Clone)]
pub struct Period {
    /// Zero-based period index.
    pub index: usize,
    /// Tracked archives of this period, one per instrument.
    pub archives: Vec<ArchiveRef>,
}

/// Discovered input layout.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    instruments: Vec<InstrumentDir>,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

impl DatasetLayout {
    /// Scan `root` for instrument directories and their archives.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut instruments = Vec::new();

        for path in sorted_entries(root)? {
            if !path.is_dir() {
                debug!(path = %path.display(), "skipping non-directory entry");
                continue;
            }
            let mut archives = Vec::new();
            for file in sorted_entries(&path)? {
                if file.is_file() && is_zip(&file) {
                    archives.push(file);
                } else {
                    debug!(path = %file.display(), "skipping non-archive entry");
                }
            }
            instruments.push(InstrumentDir { path, archives });
        }

        if instruments.is_empty() {
            return Err(Error::config(format!(
                "no instrument directories under {}",
                root.display()
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            instruments,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn instruments(&self) -> &[InstrumentDir] {
        &self.instruments
    }

    /// Tracked archives of one directory, in file-name order. `None` when
    /// the directory holds no tracked instrument.
    fn tracked_archives(
        &self,
        dir: &InstrumentDir,
        matcher: &SymbolMatcher,
        dataset: &DatasetConfig,
    ) -> Result<Option<Vec<ArchiveRef>>> {
        let dir_symbol = matcher.find(&dir.name());
        if dir.archives.is_empty() {
            let tracked = dir_symbol.as_deref().map_or(false, |s| dataset.is_tracked(s));
            return Ok(tracked.then(Vec::new));
        }

        let mut archives = Vec::with_capacity(dir.archives.len());
        for path in &dir.archives {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let symbol = matcher
                .find(&file_name)
                .or_else(|| dir_symbol.clone())
                .ok_or_else(|| Error::data(format!("no instrument symbol in {}", path.display())))?;

            if !dataset.is_tracked(&symbol) {
                debug!(archive = %path.display(), %symbol, "skipping untracked instrument");
                continue;
            }
            archives.push(ArchiveRef {
                symbol,
                path: path.clone(),
            });
        }
        Ok((!archives.is_empty()).then_some(archives))
    }

    /// Group tracked archives into periods.
    ///
    /// The period count is the smallest archive count among directories that
    /// hold a tracked instrument; other directories do not shorten the run.
    pub fn periods(&self, dataset: &DatasetConfig) -> Result<Vec<Period>> {
        let matcher = SymbolMatcher::new()?;
        let mut tracked = Vec::new();
        for dir in &self.instruments {
            match self.tracked_archives(dir, &matcher, dataset)? {
                Some(archives) => tracked.push(archives),
                None => debug!(path = %dir.path.display(), "no tracked archives in directory"),
            }
        }

        let count = tracked.iter().map(Vec::len).min().ok_or_else(|| {
            Error::data(format!(
                "no tracked instrument directories under {}",
                self.root.display()
            ))
        })?;
        if count == 0 {
            return Err(Error::data(format!(
                "a tracked instrument directory under {} holds no archives",
                self.root.display()
            )));
        }
        let longest = tracked.iter().map(Vec::len).max().unwrap_or(count);
        if longest != count {
            warn!(
                periods = count,
                longest,
                "instrument directories hold different archive counts, using common prefix"
            );
        }

        let mut periods: Vec<Period> = (0..count)
            .map(|index| Period {
                index,
                archives: Vec::with_capacity(tracked.len()),
            })
            .collect();
        for archives in tracked {
            for (period, archive) in periods.iter_mut().zip(archives) {
                period.archives.push(archive);
            }
        }
        Ok(periods)
    }
}
