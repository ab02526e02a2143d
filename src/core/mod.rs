pub mod correction;
pub mod dedup;
pub mod engine;
pub mod feedback;
pub mod import;
pub mod log;
pub mod monitor;
pub mod scan_source;
pub mod summary;

pub use dedup::{DedupCursor, Sample};
pub use engine::{AttendanceEngine, AttendanceRecorded, DirectionPolicy, RetryPolicy};
pub use feedback::{BellFeedback, FeedbackKind, FeedbackSink, NullFeedback, RecordingFeedback};
pub use monitor::{ChannelPoller, Monitor, ScanReport};
pub use scan_source::{InertSource, LineSource, ScanSource, ScriptStep, ScriptedSource};
