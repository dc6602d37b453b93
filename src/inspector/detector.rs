use crate::core::config::InspectorConfig;
use crate::dom::{DomProcessor, DomTree, ElementDescriptor, IdentityHash, ScannedElement};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// Where the detector is inside one click-triggered cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPhase {
    Idle,
    Scanning,
    Diffing,
    Reporting,
    Committing,
}

/// An element reported as newly appeared.
#[derive(Debug, Clone, Serialize)]
pub struct NewElement {
    pub hash: IdentityHash,
    pub descriptor: ElementDescriptor,
}

/// Outcome of one detection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub cycle: u64,
    pub location: String,
    pub scanned: usize,
    pub skipped: usize,
    pub new_elements: Vec<NewElement>,
    /// Size of the known-hash set after the cycle committed.
    pub known_count: usize,
}

impl ScanReport {
    pub fn has_new_elements(&self) -> bool {
        !self.new_elements.is_empty()
    }
}

/// Tracks which interactive elements have been seen on the current page and
/// reports the ones that appear after each click.
///
/// Cycles take `&mut self`, so two cycles can never interleave; share it
/// behind a `tokio::sync::Mutex` when events arrive from several tasks.
#[derive(Debug)]
pub struct ElementChangeDetector {
    processor: DomProcessor,
    known: HashSet<IdentityHash>,
    phase: DetectorPhase,
    cycles: u64,
    location: Option<String>,
}

impl ElementChangeDetector {
    pub fn new(config: &InspectorConfig) -> Self {
        Self::with_processor(DomProcessor::new(config))
    }

    pub fn with_processor(processor: DomProcessor) -> Self {
        Self {
            processor,
            known: HashSet::new(),
            phase: DetectorPhase::Idle,
            cycles: 0,
            location: None,
        }
    }

    pub fn phase(&self) -> DetectorPhase {
        self.phase
    }

    pub fn known_hashes(&self) -> &HashSet<IdentityHash> {
        &self.known
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Run one full cycle against the tree as it is after a click.
    pub fn on_click(&mut self, tree: &DomTree) -> ScanReport {
        self.cycles += 1;
        let cycle = self.cycles;

        self.enter(DetectorPhase::Scanning);
        let batch = self.processor.scan_visible(tree);
        let scanned = batch.elements.len();

        self.enter(DetectorPhase::Diffing);
        let current: Vec<IdentityHash> = batch.elements.iter().map(|e| e.hash).collect();
        let fresh: HashSet<IdentityHash> = Self::diff_hashes(&self.known, &current)
            .into_iter()
            .collect();

        let mut new_elements = Vec::with_capacity(fresh.len());
        let mut reported = HashSet::with_capacity(fresh.len());
        for ScannedElement {
            hash, descriptor, ..
        } in batch.elements
        {
            if fresh.contains(&hash) && reported.insert(hash) {
                new_elements.push(NewElement { hash, descriptor });
            }
        }

        self.enter(DetectorPhase::Reporting);
        report_new_elements(cycle, &new_elements);

        self.enter(DetectorPhase::Committing);
        self.commit(current);

        self.enter(DetectorPhase::Idle);
        ScanReport {
            cycle,
            location: tree.url().to_string(),
            scanned,
            skipped: batch.skipped,
            new_elements,
            known_count: self.known.len(),
        }
    }

    /// Hashes of `current` absent from `known`, first occurrence order,
    /// without duplicates.
    pub fn diff_hashes(known: &HashSet<IdentityHash>, current: &[IdentityHash]) -> Vec<IdentityHash> {
        let mut seen = HashSet::new();
        current
            .iter()
            .copied()
            .filter(|hash| !known.contains(hash) && seen.insert(*hash))
            .collect()
    }

    /// Replace the known set with `hashes`. Elements that disappeared are
    /// forgotten and will be reported again if they come back.
    pub fn commit(&mut self, hashes: impl IntoIterator<Item = IdentityHash>) {
        self.known = hashes.into_iter().collect();
    }

    /// Record the current page location. Returns `true` when it differs from
    /// the previous one, in which case the known set has been cleared. The
    /// first observation only records.
    pub fn observe_location(&mut self, location: &str) -> bool {
        let normalized = normalize_location(location);
        match self.location.replace(normalized.clone()) {
            Some(previous) if previous != normalized => {
                info!(from = %previous, to = %normalized, "Location changed, resetting known elements");
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Whether `location` is the one last observed, compared the same way
    /// [`Self::observe_location`] compares.
    pub fn is_current_location(&self, location: &str) -> bool {
        self.location.as_deref() == Some(normalize_location(location).as_str())
    }

    pub fn reset(&mut self) {
        debug!(forgotten = self.known.len(), "Clearing known element hashes");
        self.known.clear();
        self.phase = DetectorPhase::Idle;
    }

    fn enter(&mut self, phase: DetectorPhase) {
        debug!(from = ?self.phase, to = ?phase, "Detector phase");
        self.phase = phase;
    }
}

fn report_new_elements(cycle: u64, new_elements: &[NewElement]) {
    if new_elements.is_empty() {
        debug!(cycle, "No new interactive elements after click");
        return;
    }

    info!(cycle, "=== NEW NODEDATA AFTER CLICK ===");
    info!("Found {} new interactive elements", new_elements.len());
    for element in new_elements {
        info!(
            hash = %element.hash,
            xpath = %element.descriptor.xpath,
            node = %element.descriptor.to_json(),
            "New element ({})",
            element.descriptor.tag_name
        );
    }
    info!("=== END NEW NODEDATA ===");
}

/// Locations compare as parsed URLs, fragment included. Unparseable strings
/// compare raw.
fn normalize_location(location: &str) -> String {
    match Url::parse(location) {
        Ok(url) => url.to_string(),
        Err(_) => location.to_string(),
    }
}
