use crate::errors::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static HEX_UID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-F]+$").expect("valid UID pattern"));

/// Smartcard UID in canonical form: uppercase hex digits, no separators.
///
/// Readers report the same card as `04 12 AB`, `04:12:ab` or `0412AB`;
/// all of them normalize to `0412AB`. The UID is an opaque identifier,
/// never a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardUid(String);

impl CardUid {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if !HEX_UID.is_match(&normalized) {
            return Err(AppError::InvalidUid(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardUid {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        CardUid::parse(&value)
    }
}

impl From<CardUid> for String {
    fn from(uid: CardUid) -> Self {
        uid.0
    }
}
