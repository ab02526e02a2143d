use crate::errors::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CHANNEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("valid channel pattern"));

/// An independent attendance context with its own ledger and state.
///
/// Two channels are predefined (`class`, `meeting`) but any lowercase
/// name is accepted. The name is only ever bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    pub const CLASS: &'static str = "class";
    pub const MEETING: &'static str = "meeting";

    pub fn parse(name: &str) -> AppResult<Self> {
        let name = name.trim().to_lowercase();
        if !CHANNEL_NAME.is_match(&name) {
            return Err(AppError::InvalidChannel(name));
        }
        Ok(Self(name))
    }

    pub fn class() -> Self {
        Self(Self::CLASS.to_string())
    }

    pub fn meeting() -> Self {
        Self(Self::MEETING.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Channel {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        Channel::parse(&value)
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}
