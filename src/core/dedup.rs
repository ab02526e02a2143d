use crate::models::CardUid;

/// One poll of a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    Absent,
    /// A card is on the reader; the UID may be unreadable for this poll.
    Present(Option<CardUid>),
}

/// Per-channel duplicate suppression.
///
/// Remembers the UID last acted upon while the card stays on the reader.
/// An absent sample clears it, so the same card tapped again later counts
/// as a new tap. The cursor is set whatever the outcome of the scan, so a
/// failed write is never retried without a physical re-tap.
#[derive(Debug, Default, Clone)]
pub struct DedupCursor {
    last_acted: Option<CardUid>,
}

impl DedupCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the UID to act upon, if this sample is a new tap.
    pub fn observe(&mut self, sample: &Sample) -> Option<CardUid> {
        match sample {
            Sample::Absent => {
                self.last_acted = None;
                None
            }
            Sample::Present(None) => None,
            Sample::Present(Some(uid)) => {
                if self.last_acted.as_ref() == Some(uid) {
                    return None;
                }
                self.last_acted = Some(uid.clone());
                Some(uid.clone())
            }
        }
    }
}
