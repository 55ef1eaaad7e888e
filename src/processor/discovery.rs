//! File discovery for race dump directories
//!
//! Finds result (`kYYMMDD.txt`) and parameter (`bYYMMDD.txt`) dumps and
//! groups them by race day. The date comes from the file name only.

use crate::error::{ProcessorError, Result};
use crate::models::SectionKind;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// All dumps belonging to one race day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFiles {
    pub date: NaiveDate,
    pub parameters: Vec<PathBuf>,
    pub results: Vec<PathBuf>,
}

impl DayFiles {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            parameters: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.parameters.len() + self.results.len()
    }
}

/// File discovery component for dump directories
#[derive(Debug)]
pub struct FileDiscovery {
    results_dir: PathBuf,
    parameters_dir: Option<PathBuf>,
    skipped: usize,
}

impl FileDiscovery {
    pub fn new(results_dir: PathBuf, parameters_dir: Option<PathBuf>) -> Self {
        Self {
            results_dir,
            parameters_dir,
            skipped: 0,
        }
    }

    /// Dump-like files whose name did not carry a valid date
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// Discover every dump and group them by day, oldest first
    ///
    /// Either directory may hold both kinds; the `k`/`b` prefix decides.
    pub fn discover_days(&mut self) -> Result<Vec<DayFiles>> {
        let mut roots = vec![self.results_dir.clone()];
        if let Some(parameters_dir) = &self.parameters_dir {
            if parameters_dir != &self.results_dir {
                roots.push(parameters_dir.clone());
            }
        }

        let mut paths = BTreeSet::new();
        for root in &roots {
            if !root.is_dir() {
                return Err(ProcessorError::DirectoryNotFound { path: root.clone() });
            }
            debug!("Searching for dump files in: {}", root.display());

            for entry in WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && is_dump_candidate(path) {
                    paths.insert(path.to_path_buf());
                }
            }
        }

        let mut days: BTreeMap<NaiveDate, DayFiles> = BTreeMap::new();
        for path in paths {
            match parse_dump_name(&path) {
                Some((kind, date)) => {
                    let day = days.entry(date).or_insert_with(|| DayFiles::new(date));
                    match kind {
                        SectionKind::Result => day.results.push(path),
                        SectionKind::Parameter => day.parameters.push(path),
                    }
                }
                None => {
                    warn!("Skipping: {}", ProcessorError::InvalidFileName { path });
                    self.skipped += 1;
                }
            }
        }

        let days: Vec<DayFiles> = days.into_values().collect();
        debug!(
            "Found {} dump files over {} days",
            days.iter().map(DayFiles::file_count).sum::<usize>(),
            days.len()
        );
        Ok(days)
    }
}

/// `k`/`b` prefix and a `.txt` extension
fn is_dump_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let has_prefix = name
        .chars()
        .next()
        .is_some_and(|c| matches!(c, 'k' | 'K' | 'b' | 'B'));
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    has_prefix && has_extension
}

/// Dump kind and race date from a file name such as `k230901.txt`
pub fn parse_dump_name(path: &Path) -> Option<(SectionKind, NaiveDate)> {
    let stem = path.file_stem()?.to_str()?;
    let mut chars = stem.chars();
    let kind = match chars.next()? {
        'k' | 'K' => SectionKind::Result,
        'b' | 'B' => SectionKind::Parameter,
        _ => return None,
    };

    let digits = chars.as_str();
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = digits[0..2].parse().ok()?;
    let month: u32 = digits[2..4].parse().ok()?;
    let day: u32 = digits[4..6].parse().ok()?;
    let year = if yy < 70 { 2000 + yy } else { 1900 + yy };

    NaiveDate::from_ymd_opt(year, month, day).map(|date| (kind, date))
}
