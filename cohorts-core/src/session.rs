//! Academic sessions: 1 August to 31 July, written `YYYY/YY`.

use std::fmt;

use chrono::{Datelike, NaiveDate};

/// First session offered by [`session_menu`].
pub const FIRST_MENU_YEAR: i32 = 2020;

/// An academic session identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcademicSession {
    pub start_year: i32,
}

impl AcademicSession {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The session `date` falls in.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= 8 {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    /// Shortname suffix marking a course as belonging to this session,
    /// e.g. `_2024/25`.
    pub fn shortname_suffix(&self) -> String {
        format!("_{self}")
    }
}

impl fmt::Display for AcademicSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

/// Every session from 2020/21 up to the one starting next calendar year,
/// newest first.
pub fn session_menu(today: NaiveDate) -> Vec<AcademicSession> {
    (FIRST_MENU_YEAR..=today.year() + 1)
        .rev()
        .map(AcademicSession::starting)
        .collect()
}
