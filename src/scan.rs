//! Directory walking and per-file classification into a scan snapshot.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::filter::FilterPredicate;
use crate::meta::{MetaOutcome, MetadataReader};

/// One discovered image, produced fresh on every rescan. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub rating: Option<u8>,
    pub tags: BTreeSet<String>,
}

/// Immutable result of one full rescan.
///
/// `matching` preserves the relative order files had in `discovered`
/// (stable filter, not a re-sort), and `discovered` is lexicographically
/// sorted so two scans over an unchanged tree order identically.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub discovered: Vec<ImageRecord>,
    pub matching: Vec<ImageRecord>,
    pub failed_count: u32,
    pub non_image_count: u32,
    pub taken_at: SystemTime,
}

impl ScanSnapshot {
    pub fn empty() -> Self {
        Self {
            discovered: Vec::new(),
            matching: Vec::new(),
            failed_count: 0,
            non_image_count: 0,
            taken_at: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Walk every root in configured order and return a deduplicated,
/// lexicographically sorted candidate list. A missing or unreadable root
/// contributes zero candidates rather than failing the scan.
pub fn collect_candidates(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    for root in roots {
        if !root.is_dir() {
            warn!(root = %root.display(), "media root missing or not a directory");
            continue;
        }
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !should_skip_dir(e))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            seen.insert(key);
        }
    }
    seen.into_iter().collect()
}

/// One full rescan pass: walk, classify, filter. Per-file errors are
/// absorbed into the counters and never abort the scan.
pub fn scan(
    roots: &[PathBuf],
    predicate: &FilterPredicate,
    reader: &dyn MetadataReader,
) -> ScanSnapshot {
    let mut discovered = Vec::new();
    let mut matching = Vec::new();
    let mut failed_count = 0u32;
    let mut non_image_count = 0u32;

    for path in collect_candidates(roots) {
        match reader.read(&path) {
            MetaOutcome::Image(meta) => {
                let record = ImageRecord {
                    path,
                    rating: meta.rating,
                    tags: meta.tags,
                };
                if predicate.matches(record.rating, &record.tags) {
                    matching.push(record.clone());
                }
                discovered.push(record);
            }
            MetaOutcome::Unreadable => {
                debug!(path = %path.display(), "skipping unreadable file");
                failed_count += 1;
            }
            MetaOutcome::NotAnImage => {
                non_image_count += 1;
            }
        }
    }

    debug!(
        discovered = discovered.len(),
        matching = matching.len(),
        failed = failed_count,
        non_image = non_image_count,
        "scan complete"
    );

    ScanSnapshot {
        discovered,
        matching,
        failed_count,
        non_image_count,
        taken_at: SystemTime::now(),
    }
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
