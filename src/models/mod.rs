pub mod card_uid;
pub mod channel;
pub mod direction;
pub mod event;
pub mod instructor;

pub use card_uid::CardUid;
pub use channel::Channel;
pub use direction::Direction;
pub use event::{AttendanceEvent, EventSource, NewEvent};
pub use instructor::Instructor;
