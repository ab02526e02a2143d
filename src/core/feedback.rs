//! Audible/visual feedback. Sinks are fire-and-forget: `notify` must return
//! immediately so it never stalls a polling loop.

use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
    CardDetected,
}

pub trait FeedbackSink {
    fn notify(&self, kind: FeedbackKind);
}

/// Terminal bell: one ring on detection, two on success, three on error.
#[derive(Debug, Clone, Copy)]
pub struct BellFeedback {
    enabled: bool,
}

impl BellFeedback {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl FeedbackSink for BellFeedback {
    fn notify(&self, kind: FeedbackKind) {
        if !self.enabled {
            return;
        }
        let pattern: &[u8] = match kind {
            FeedbackKind::CardDetected => b"\x07",
            FeedbackKind::Success => b"\x07\x07",
            FeedbackKind::Error => b"\x07\x07\x07",
        };
        let mut err = std::io::stderr();
        let _ = err.write_all(pattern);
        let _ = err.flush();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn notify(&self, _kind: FeedbackKind) {}
}

/// Keeps every notification; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    seen: Arc<Mutex<Vec<FeedbackKind>>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<FeedbackKind> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn notify(&self, kind: FeedbackKind) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(kind);
        }
    }
}
