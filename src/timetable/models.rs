use chrono::DateTime;
use chrono_tz::Tz;

/// Column of the schedule header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Day {
    /// Day's name, i.e.: Monday
    pub name: String,
    /// Date shown under the name, i.e.: 09/22/2025
    pub date: String,
}

/// One class as found in one cell of the schedule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Course {
    /// Course's name
    pub name: String,

    /// Teacher's name
    pub teacher: String,

    /// Room where the course takes place, also used as the event location
    pub room: String,

    /// Time the course starts, as written in the cell
    pub start_time: String,

    /// Time the course ends, as written in the cell
    pub end_time: String,

    /// Name of the day of the column
    pub day_name: String,

    /// Header date of the column
    pub date: String,

    /// Position of the column among the days of the header:
    /// - 0 => first day of the week shown
    /// - 1 => second day
    /// - etc.
    pub day_index: usize,
}

/// A single occurrence of a course, ready for the calendar
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}
