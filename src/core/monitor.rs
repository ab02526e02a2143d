//! Per-reader polling tasks.
//!
//! Each channel runs on its own thread: sample the reader, maybe act, sleep.
//! Outcomes are sent as immutable `ScanReport` messages to a single consumer
//! (the presentation layer), which is the only place that prints.

use crate::core::dedup::{DedupCursor, Sample};
use crate::core::engine::{AttendanceEngine, AttendanceRecorded};
use crate::core::feedback::{FeedbackKind, FeedbackSink};
use crate::core::scan_source::{ScanSource, take_sample};
use crate::errors::{AppError, AppResult};
use crate::models::{CardUid, Channel};
use crate::store::{LedgerStore, RosterStore};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Source of "now" for the polling threads.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Debug, Clone)]
pub enum ScanReport {
    Recorded(AttendanceRecorded),
    Unregistered {
        channel: Channel,
        uid: CardUid,
    },
    WriteFailed {
        channel: Channel,
        uid: CardUid,
        attempts: u32,
    },
    Failed {
        channel: Channel,
        uid: CardUid,
        message: String,
    },
    SourceUnavailable {
        channel: Channel,
        reason: String,
    },
    Stopped {
        channel: Channel,
    },
}

impl ScanReport {
    pub fn channel(&self) -> &Channel {
        match self {
            ScanReport::Recorded(r) => &r.channel,
            ScanReport::Unregistered { channel, .. }
            | ScanReport::WriteFailed { channel, .. }
            | ScanReport::Failed { channel, .. }
            | ScanReport::SourceUnavailable { channel, .. }
            | ScanReport::Stopped { channel } => channel,
        }
    }
}

/// The state one polling task owns: its reader, its engine and its dedup cursor.
pub struct ChannelPoller<S, R, L, F> {
    channel: Channel,
    source: S,
    engine: AttendanceEngine<R, L, F>,
    cursor: DedupCursor,
}

impl<S, R, L, F> ChannelPoller<S, R, L, F>
where
    S: ScanSource,
    R: RosterStore,
    L: LedgerStore,
    F: FeedbackSink,
{
    pub fn new(channel: Channel, source: S, engine: AttendanceEngine<R, L, F>) -> Self {
        Self {
            channel,
            source,
            engine,
            cursor: DedupCursor::new(),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn engine(&self) -> &AttendanceEngine<R, L, F> {
        &self.engine
    }

    /// One iteration of the loop, without the sleep.
    pub fn poll_once(&mut self, now: NaiveDateTime) -> Option<ScanReport> {
        let sample: Sample = take_sample(&mut self.source);
        let uid = self.cursor.observe(&sample)?;

        self.engine.feedback().notify(FeedbackKind::CardDetected);

        let report = match self.engine.handle_scan(&self.channel, &uid, now) {
            Ok(recorded) => ScanReport::Recorded(recorded),
            Err(AppError::UnregisteredCard(_)) => ScanReport::Unregistered {
                channel: self.channel.clone(),
                uid,
            },
            Err(AppError::WriteFailed { attempts }) => ScanReport::WriteFailed {
                channel: self.channel.clone(),
                uid,
                attempts,
            },
            Err(e) => ScanReport::Failed {
                channel: self.channel.clone(),
                uid,
                message: e.to_string(),
            },
        };
        Some(report)
    }
}

/// Running set of polling threads.
pub struct Monitor {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Monitor {
    pub fn open() -> (Self, Sender<ScanReport>, Receiver<ScanReport>) {
        let (tx, rx) = mpsc::channel();
        let monitor = Self {
            stop: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        };
        (monitor, tx, rx)
    }

    /// Flag shared with every task; setting it stops the monitor.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Start one polling thread for `poller`.
    pub fn spawn<S, R, L, F>(
        &mut self,
        mut poller: ChannelPoller<S, R, L, F>,
        interval: Duration,
        clock: Clock,
        tx: Sender<ScanReport>,
    ) -> AppResult<()>
    where
        S: ScanSource + Send + 'static,
        R: RosterStore + Send + 'static,
        L: LedgerStore + Send + 'static,
        F: FeedbackSink + Send + 'static,
    {
        let stop = Arc::clone(&self.stop);
        let channel = poller.channel().clone();

        let handle = thread::Builder::new()
            .name(format!("reader-{}", channel))
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    if let Some(report) = poller.poll_once(clock())
                        && tx.send(report).is_err()
                    {
                        break;
                    }
                    sleep_with_stop(&stop, interval);
                }
                let _ = tx.send(ScanReport::Stopped { channel });
            })?;

        self.handles.push(handle);
        Ok(())
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop every task and wait for them; a task mid-scan finishes its
    /// bounded retry budget first.
    pub fn shutdown(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.join_all();
    }
}

fn sleep_with_stop(stop: &AtomicBool, interval: Duration) {
    let mut remaining = interval;
    const STEP: Duration = Duration::from_millis(50);
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let sleep_for = remaining.min(STEP);
        thread::sleep(sleep_for);
        remaining = remaining.saturating_sub(sleep_for);
    }
}
