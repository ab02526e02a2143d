//! Card readers as seen by the polling loop.

use crate::core::dedup::Sample;
use crate::errors::{AppError, AppResult};
use crate::models::CardUid;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

pub trait ScanSource {
    fn is_present(&mut self) -> AppResult<bool>;

    /// Valid only right after `is_present` returned true.
    fn read_uid(&mut self) -> AppResult<Option<CardUid>>;

    fn describe(&self) -> String;
}

impl<S: ScanSource + ?Sized> ScanSource for Box<S> {
    fn is_present(&mut self) -> AppResult<bool> {
        (**self).is_present()
    }

    fn read_uid(&mut self) -> AppResult<Option<CardUid>> {
        (**self).read_uid()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Take one sample. Any failure at the reader boundary counts as "absent".
pub fn take_sample<S: ScanSource + ?Sized>(source: &mut S) -> Sample {
    match source.is_present() {
        Ok(true) => match source.read_uid() {
            Ok(uid) => Sample::Present(uid),
            Err(_) => Sample::Absent,
        },
        Ok(false) | Err(_) => Sample::Absent,
    }
}

/// A reader that is configured but not connected. Never reports a card.
#[derive(Debug, Clone)]
pub struct InertSource {
    reason: String,
}

impl InertSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ScanSource for InertSource {
    fn is_present(&mut self) -> AppResult<bool> {
        Ok(false)
    }

    fn read_uid(&mut self) -> AppResult<Option<CardUid>> {
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("inert ({})", self.reason)
    }
}

/// Line-oriented reader: keyboard-wedge devices, FIFOs, piped input.
///
/// Each non-empty line is one tap. The card is reported present for one
/// poll and absent for the next, so the same UID on two consecutive lines
/// counts as two taps. Lines are read on a background thread; when the
/// input ends the source stays absent.
pub struct LineSource {
    label: String,
    lines: Receiver<String>,
    pending: Option<String>,
    lifted: bool,
}

impl LineSource {
    pub fn from_reader<R: BufRead + Send + 'static>(label: &str, reader: R) -> AppResult<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("line-source-{}", label))
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            label: label.to_string(),
            lines: rx,
            pending: None,
            lifted: false,
        })
    }

    pub fn stdin() -> AppResult<Self> {
        Self::from_reader("stdin", BufReader::new(io::stdin()))
    }

    pub fn file(path: &str) -> AppResult<Self> {
        let file = File::open(path)
            .map_err(|e| AppError::ScanSourceUnavailable(format!("{}: {}", path, e)))?;
        Self::from_reader(path, BufReader::new(file))
    }
}

impl ScanSource for LineSource {
    fn is_present(&mut self) -> AppResult<bool> {
        if self.lifted {
            self.lifted = false;
            return Ok(false);
        }
        if self.pending.is_none() {
            match self.lines.try_recv() {
                Ok(line) => self.pending = Some(line),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
        Ok(true)
    }

    fn read_uid(&mut self) -> AppResult<Option<CardUid>> {
        match self.pending.take() {
            Some(raw) => {
                self.lifted = true;
                CardUid::parse(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("line reader ({})", self.label)
    }
}

/// One step of a `ScriptedSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Absent,
    Card(CardUid),
    /// Card present but the UID could not be read this poll.
    Unreadable,
    /// The reader itself failed this poll.
    Fault,
}

/// Replays a fixed sequence of polls, then stays absent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    current: Option<ScriptStep>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            current: None,
        }
    }
}

impl ScanSource for ScriptedSource {
    fn is_present(&mut self) -> AppResult<bool> {
        self.current = self.steps.pop_front();
        match &self.current {
            None | Some(ScriptStep::Absent) => Ok(false),
            Some(ScriptStep::Fault) => Err(AppError::ScanSourceUnavailable(
                "scripted reader fault".into(),
            )),
            Some(ScriptStep::Card(_)) | Some(ScriptStep::Unreadable) => Ok(true),
        }
    }

    fn read_uid(&mut self) -> AppResult<Option<CardUid>> {
        match self.current.take() {
            Some(ScriptStep::Card(uid)) => Ok(Some(uid)),
            _ => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("scripted ({} steps left)", self.steps.len())
    }
}

/// Open the reader described by a config `source` string:
/// `stdin`, `file:<path>` or `none`.
pub fn open_source(source: &str) -> AppResult<Box<dyn ScanSource + Send>> {
    let source = source.trim();
    match source {
        "stdin" => Ok(Box::new(LineSource::stdin()?)),
        "none" | "" => Err(AppError::ScanSourceUnavailable(
            "no reader connected".into(),
        )),
        other => match other.strip_prefix("file:") {
            Some(path) => Ok(Box::new(LineSource::file(path)?)),
            None => Err(AppError::ScanSourceUnavailable(format!(
                "unknown reader source '{}'",
                other
            ))),
        },
    }
}
