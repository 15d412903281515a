//! Snapshots and change detection.
//!
//! A snapshot is compared structurally through its JSON serialization, hashed
//! with SHA-256. Two snapshots with the same fingerprint are the same content
//! no matter how many times the caller rebuilt the value.
//!
//! Map fields should be `BTreeMap` (or another ordered map): a `HashMap`
//! serializes in iteration order, which can differ between equal maps.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Anything that can be auto-saved.
pub trait Snapshot: Serialize + Clone + Send + Sync + 'static {}

impl<T> Snapshot for T where T: Serialize + Clone + Send + Sync + 'static {}

/// Structural content hash of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        let digest = Sha256::digest(&bytes);
        Ok(Self(format!("{:x}", digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A snapshot together with its fingerprint.
#[derive(Debug, Clone)]
pub struct Captured<T> {
    pub value: T,
    pub fingerprint: Fingerprint,
}

impl<T: Serialize> Captured<T> {
    pub fn new(value: T) -> Result<Self, serde_json::Error> {
        let fingerprint = Fingerprint::of(&value)?;
        Ok(Self { value, fingerprint })
    }
}

/// Result of observing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First snapshot seen; recorded as the baseline.
    Baseline,
    /// Same content as the previous observation.
    Unchanged,
    /// Content differs from the previous observation.
    Changed,
}

/// Remembers the last observed fingerprint.
#[derive(Debug, Default, Clone)]
pub struct ChangeDetector {
    previous: Option<Fingerprint>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, fingerprint: &Fingerprint) -> Observation {
        let observation = match &self.previous {
            None => Observation::Baseline,
            Some(previous) if previous == fingerprint => return Observation::Unchanged,
            Some(_) => Observation::Changed,
        };
        self.previous = Some(fingerprint.clone());
        observation
    }

    pub fn last(&self) -> Option<&Fingerprint> {
        self.previous.as_ref()
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}
