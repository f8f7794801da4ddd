use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

static FIRST_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"psc_firstDay = parseDate\('(\d{8})'\)").expect("first day pattern is valid")
});
static LAST_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"psc_lastDay = parseDate\('(\d{8})'\)").expect("last day pattern is valid")
});

/// Inclusive range of dates the courses repeat over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Semester {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for Semester {
    /// Used when the page doesn't tell us anything
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 8, 22).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2025, 10, 8).expect("valid date"),
        }
    }
}

/// Where the semester dates come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Found in the scripts of the page
    Page,
    /// The markers are missing, the fallback is in use
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Info {
    pub semester: Semester,
    pub source: Source,
}

/// Find the semester dates embedded in the page, `fallback` otherwise
pub fn info(html: &str, fallback: Semester) -> Info {
    let start = find_date(&FIRST_DAY, html);
    let end = find_date(&LAST_DAY, html);

    match (start, end) {
        (Some(start), Some(end)) if start <= end => Info {
            semester: Semester { start, end },
            source: Source::Page,
        },
        (Some(start), Some(end)) => {
            warn!(%start, %end, "semester ends before it starts, using fallback");
            Info {
                semester: fallback,
                source: Source::Fallback,
            }
        }
        _ => {
            warn!("semester markers not found, using fallback");
            Info {
                semester: fallback,
                source: Source::Fallback,
            }
        }
    }
}

/// Turn the `YYYYMMDD` captured by `re` into a date
fn find_date(re: &Regex, html: &str) -> Option<NaiveDate> {
    let raw = re.captures(html)?.get(1)?.as_str();
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn markers_in_script() {
        let html = r"
            <script>
                var psc_firstDay = parseDate('20250822');
                var psc_lastDay = parseDate('20251008');
            </script>";

        let info = info(html, Semester::default());
        assert_eq!(info.source, Source::Page);
        assert_eq!(info.semester.start, date(2025, 8, 22));
        assert_eq!(info.semester.end, date(2025, 10, 8));
    }

    #[test]
    fn missing_markers_use_fallback_verbatim() {
        let fallback = Semester {
            start: date(2024, 1, 8),
            end: date(2024, 5, 31),
        };

        let info = info("<html><body>nothing here</body></html>", fallback);
        assert_eq!(info.source, Source::Fallback);
        assert_eq!(info.semester, fallback);
    }

    #[test]
    fn one_marker_is_not_enough() {
        let html = "psc_firstDay = parseDate('20260105')";
        let info = info(html, Semester::default());
        assert_eq!(info.source, Source::Fallback);
        assert_eq!(info.semester, Semester::default());
    }

    #[test]
    fn invalid_or_reversed_dates_fall_back() {
        let html = "psc_firstDay = parseDate('20251399') psc_lastDay = parseDate('20251008')";
        assert_eq!(info(html, Semester::default()).source, Source::Fallback);

        let html = "psc_firstDay = parseDate('20251008') psc_lastDay = parseDate('20250822')";
        assert_eq!(info(html, Semester::default()).source, Source::Fallback);
    }

    #[test]
    fn default_window() {
        let semester = Semester::default();
        assert_eq!(semester.start, date(2025, 8, 22));
        assert_eq!(semester.end, date(2025, 10, 8));
    }
}
