use std::fmt;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::record::ListingRecord;

/// Slash-separated collection address, e.g. `hackathons/hack2skill/events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    /// Collections sit at odd depths: `a`, `a/doc/b`, `a/doc/b/doc/c`.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            bail!("Empty segment in collection path {:?}", path);
        }
        if segments.len() % 2 == 0 {
            bail!("Collection path {:?} names a document, not a collection", path);
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}

/// Document store taking one record per write. Each successful write returns
/// the identifier the store generated for it.
pub trait Sink {
    fn write(&mut self, collection: &CollectionPath, record: &ListingRecord) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub total: usize,
}

impl SaveReport {
    pub fn failed(&self) -> usize {
        self.total - self.saved
    }
}

/// Write every record; a failed write is logged and counted, never fatal.
pub fn persist_all<S: Sink + ?Sized>(
    sink: &mut S,
    collection: &CollectionPath,
    records: &[ListingRecord],
) -> SaveReport {
    let pb = ProgressBar::new(records.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} saved")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut saved = 0usize;
    for record in records {
        match sink.write(collection, record) {
            Ok(id) => {
                saved += 1;
                debug!("Saved {} as {}", record.title_or_unknown(), id);
            }
            Err(e) => warn!("Write to {} failed for {}: {}", collection, record.title_or_unknown(), e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = SaveReport {
        saved,
        total: records.len(),
    };
    info!("Saved {}/{} records to {}", report.saved, report.total, collection);
    report
}
