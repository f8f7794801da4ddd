use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    info::Semester,
    utils::{parse_time, text_lines, weekday},
};

pub mod models;

/// Id of the schedule matrix in the page
pub const TABLE_ID: &str = "tableStudentSchedMatrix";

// Selectors
static SEL_TABLE: LazyLock<Selector> = LazyLock::new(|| selector(&format!("table#{TABLE_ID}")));
static SEL_TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static SEL_TH: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static SEL_TD: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static SEL_B: LazyLock<Selector> = LazyLock::new(|| selector("b"));

// h1:m1 AM - h2:m2 PM
static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}:\d{2}\s*[AP]M)\s*-\s*(\d{1,2}:\d{2}\s*[AP]M)")
        .expect("time range pattern is valid")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Extract every class of the schedule table
pub fn timetable(html: &str) -> Result<Vec<models::Course>> {
    let document = Html::parse_document(html);

    // Find the timetable
    let table = document
        .select(&SEL_TABLE)
        .next()
        .ok_or(Error::TableNotFound(TABLE_ID))?;

    let days = header(table);

    let mut courses = Vec::new();
    for cell in table.select(&SEL_TD).filter(is_class) {
        let lines = text_lines(cell.text());
        let [name, teacher, room, time_range, ..] = lines.as_slice() else {
            debug!(?lines, "class cell with less than 4 lines, skipped");
            continue;
        };

        let Some(captures) = TIME_RANGE.captures(time_range) else {
            debug!(time_range, "class cell without a time range, skipped");
            continue;
        };

        let Some((day_index, day)) = align_day(cell, &days) else {
            debug!(name, "class cell outside of the day columns, skipped");
            continue;
        };

        courses.push(models::Course {
            name: name.clone(),
            teacher: teacher.clone(),
            room: room.clone(),
            start_time: captures[1].to_owned(),
            end_time: captures[2].to_owned(),
            day_name: day.name.clone(),
            date: day.date.clone(),
            day_index,
        });
    }

    Ok(courses)
}

/// Days of the week shown in the first row, from left to right
fn header(table: ElementRef) -> Vec<models::Day> {
    let Some(row) = table.select(&SEL_TR).next() else {
        return Vec::new();
    };

    let cells = row.select(&SEL_TH).collect::<Vec<_>>();
    // First and last columns are not days
    let Some(inner) = cells.get(1..cells.len().saturating_sub(1)) else {
        return Vec::new();
    };

    inner
        .iter()
        .filter_map(|th| {
            let label = th.select(&SEL_B).next().unwrap_or(*th);
            match text_lines(label.text()).as_slice() {
                [name, date, ..] => Some(models::Day {
                    name: name.clone(),
                    date: date.clone(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Cells carrying a class, empty slots share the same shape
fn is_class(cell: &ElementRef) -> bool {
    cell.value()
        .classes()
        .any(|class| class.contains("scheduleClass"))
}

/// Match a class cell with the day of its column.
///
/// The column is the position of the cell among the `td` of its row, minus the
/// leading time column. Returns `None` when the row is malformed and the
/// position falls outside of the header.
pub fn align_day<'a>(cell: ElementRef, days: &'a [models::Day]) -> Option<(usize, &'a models::Day)> {
    let row = cell
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "tr")?;

    let position = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "td")
        .position(|td| td.id() == cell.id())?;

    let day_index = position.checked_sub(1)?;
    days.get(day_index).map(|day| (day_index, day))
}

/// Build the timetable, one event per week for each course
pub fn build(courses: &[models::Course], semester: Semester, tz: Tz) -> Result<Vec<models::Event>> {
    let mut events = Vec::new();

    for course in courses {
        let Some(day) = weekday(&course.day_name) else {
            warn!(day = course.day_name, course = course.name, "unknown day, course skipped");
            continue;
        };

        // Find the first day of the semester matching the course
        let Some(first) = semester
            .start
            .iter_days()
            .take(7)
            .find(|date| date.weekday() == day && *date <= semester.end)
        else {
            continue;
        };

        let start_time = parse_time(&course.start_time)?;
        let end_time = parse_time(&course.end_time)?;

        for date in first.iter_weeks().take_while(|date| *date <= semester.end) {
            let (Some(start), Some(end)) = (
                localize(tz, date, start_time),
                localize(tz, date, end_time),
            ) else {
                warn!(%date, course = course.name, "time doesn't exist in {tz}, occurrence skipped");
                continue;
            };

            events.push(models::Event {
                title: course.name.clone(),
                description: format!("Teacher: {}\nRoom: {}", course.teacher, course.room),
                location: course.room.clone(),
                start,
                end,
            });
        }
    }

    Ok(events)
}

/// Wall-clock time of a day in the timezone, the earliest one when ambiguous
fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<chrono::DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}
