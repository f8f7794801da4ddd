use chrono::{NaiveTime, Weekday};

use crate::error::{Error, Result};

/// Accepted time layouts, tried in order
const TIME_FORMATS: [&str; 2] = ["%I:%M %p", "%H:%M"];

/// Parse a wall-clock time such as `08:00 AM` or `14:30`
pub fn parse_time(time: &str) -> Result<NaiveTime> {
    let time = time.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
        .ok_or_else(|| Error::UnrecognizedTime(time.to_owned()))
}

/// Map a day name from the table header to a weekday
pub fn weekday(day_name: &str) -> Option<Weekday> {
    day_name.trim().parse().ok()
}

/// Non-empty, trimmed lines of every text node
pub fn text_lines<'a, I>(texts: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    texts
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
