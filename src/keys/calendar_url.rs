//! `calendarurl:<baseId>:<calendarId>` keys.

use super::{DELIMITER, RegistrationKey, segment, split_components};
use crate::error::KeyError;

/// Address of one calendar: the owning base id plus the calendar id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarUrl {
    base_id: String,
    calendar_id: String,
}

impl CalendarUrl {
    /// Prefix of the encoded key.
    pub const PREFIX: &'static str = "calendarurl";

    /// Validates and builds a calendar URL.
    pub fn new(base_id: &str, calendar_id: &str) -> Result<Self, KeyError> {
        let input = format!("{base_id}{DELIMITER}{calendar_id}");
        Ok(Self {
            base_id: segment(Self::PREFIX, &input, base_id)?,
            calendar_id: segment(Self::PREFIX, &input, calendar_id)?,
        })
    }

    /// Returns the owning base id.
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Returns the calendar id.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    pub(crate) fn components(&self) -> String {
        format!("{}{DELIMITER}{}", self.base_id, self.calendar_id)
    }

    /// Parses the component part (everything after `calendarurl:`).
    pub(crate) fn parse(raw: &str) -> Result<RegistrationKey, KeyError> {
        let parts = split_components(Self::PREFIX, raw, 2)?;
        let input = format!("{}{DELIMITER}{raw}", Self::PREFIX);
        Ok(RegistrationKey::CalendarUrl(Self {
            base_id: segment(Self::PREFIX, &input, parts[0])?,
            calendar_id: segment(Self::PREFIX, &input, parts[1])?,
        }))
    }
}
