use std::collections::VecDeque;

use behavior_core::Guid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Runtime data disagrees with the authored graph (e.g. a switch index
    /// out of range). The node falls back to its documented default.
    ConfigurationDrift,
    /// An optional link is empty; the node reports Success.
    MissingLink,
    /// A hook reported a status it may not report.
    InvalidStatus,
    /// An awaken or notification named a node that does not exist.
    UnknownNode,
}

/// A degraded-but-recovered runtime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub node: Guid,
    pub tick: u64,
    pub message: String,
}

/// Bounded log of diagnostics; the oldest entries are dropped first.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    dropped: u64,
}

impl Diagnostics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }
}
