use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone};
use chrono_tz::{OffsetComponents, Tz};
use ics::{
    escape_text,
    parameters::TzIDParam,
    properties::{Description, DtEnd, DtStart, Location, Summary},
    Daylight, Event, ICalendar, Standard,
};

use crate::{error::Result, info::Semester, timetable::models};

/// Name of the exported file, relative to the working directory
pub const OUTPUT_FILE: &str = "ala_schedule.ics";

/// Build the calendar, the `VTIMEZONE` covers the offsets `tz` goes through during `semester`
pub fn calendar(events: &[models::Event], tz: Tz, semester: Semester) -> ICalendar<'static> {
    let mut calendar = ICalendar::new("2.0", "-//ps2ics//EN");
    calendar.add_timezone(timezone(tz, semester));

    let dtstamp = dt_ical(chrono::Utc::now().naive_utc()) + "Z";

    // Create events which contains the information regarding the course
    for course in events {
        let mut event = Event::new(uuid::Uuid::new_v4().to_string(), dtstamp.clone());

        // Start time of the course
        let mut date_start = DtStart::new(dt_ical(course.start.naive_local()));
        date_start.add(TzIDParam::new(tz.name()));
        event.push(date_start);

        // End time of the course
        let mut date_end = DtEnd::new(dt_ical(course.end.naive_local()));
        date_end.add(TzIDParam::new(tz.name()));
        event.push(date_end);

        event.push(Summary::new(escape_text(course.title.clone())));
        event.push(Description::new(escape_text(course.description.clone())));
        event.push(Location::new(escape_text(course.location.clone())));

        calendar.add_event(event);
    }

    calendar
}

/// Write the calendar to `path` and return where it landed
pub fn export(events: &[models::Event], tz: Tz, semester: Semester, path: &Path) -> Result<PathBuf> {
    calendar(events, tz, semester).save_file(path)?;

    Ok(std::fs::canonicalize(path)?)
}

fn dt_ical(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

/// Offset rule of the zone starting at `onset`, local time before the change
#[derive(Debug, PartialEq, Eq)]
struct Observance {
    onset: NaiveDateTime,
    from: i32,
    to: i32,
    dst: bool,
}

impl Observance {
    fn standard(&self) -> Standard<'static> {
        Standard::new(dt_ical(self.onset), format_offset(self.from), format_offset(self.to))
    }

    fn daylight(&self) -> Daylight<'static> {
        Daylight::new(dt_ical(self.onset), format_offset(self.from), format_offset(self.to))
    }
}

fn timezone(tz: Tz, semester: Semester) -> ics::TimeZone<'static> {
    let (initial, changes) = observances(tz, semester);

    let mut zone = if initial.dst {
        ics::TimeZone::daylight(tz.name(), initial.daylight())
    } else {
        ics::TimeZone::standard(tz.name(), initial.standard())
    };

    for change in changes {
        if change.dst {
            zone.add_daylight(change.daylight());
        } else {
            zone.add_standard(change.standard());
        }
    }

    zone
}

/// Offset in effect when the semester starts, then every change until it ends
fn observances(tz: Tz, semester: Semester) -> (Observance, Vec<Observance>) {
    // A day of margin on each side covers any UTC offset
    let mut at = semester.start.and_time(NaiveTime::MIN) - TimeDelta::days(1);
    let last = semester.end.and_time(NaiveTime::MIN) + TimeDelta::days(2);

    let (mut current, dst) = offset_at(tz, at);
    let initial = Observance {
        onset: NaiveDateTime::default(),
        from: current,
        to: current,
        dst,
    };

    let mut changes = Vec::new();
    while at < last {
        let next = at + TimeDelta::hours(1);
        let (offset, dst) = offset_at(tz, next);
        if offset != current {
            let instant = first_change(tz, at, next, current);
            changes.push(Observance {
                onset: instant + TimeDelta::seconds(current.into()),
                from: current,
                to: offset,
                dst,
            });
            current = offset;
        }
        at = next;
    }

    (initial, changes)
}

/// First UTC instant in `(before, after]` where the zone leaves `offset`
fn first_change(tz: Tz, mut before: NaiveDateTime, mut after: NaiveDateTime, offset: i32) -> NaiveDateTime {
    while after - before > TimeDelta::seconds(1) {
        let mid = before + (after - before) / 2;
        if offset_at(tz, mid).0 == offset {
            before = mid;
        } else {
            after = mid;
        }
    }

    after
}

/// Seconds east of UTC at the UTC instant `utc`, and whether it's daylight saving time
fn offset_at(tz: Tz, utc: NaiveDateTime) -> (i32, bool) {
    let offset = tz.offset_from_utc_datetime(&utc);
    (
        offset.fix().local_minus_utc(),
        offset.dst_offset() != TimeDelta::zero(),
    )
}

/// i.e.: +0200
fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
}
