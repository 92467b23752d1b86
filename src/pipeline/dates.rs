//! Date parsing for event rows and date formatting for the PG-13.
//!
//! Parsing is strict about shape (`M/D/YYYY` or `M/D/YY`, nothing else in
//! the token) and about the calendar: `2/30/2024` is not a date. A failed
//! parse is how the extractor tells header and blank rows from events, so it
//! returns `Option` rather than an error.

use crate::config::DateFormat;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_LONG_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

static RE_SHORT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})$").unwrap());

impl DateFormat {
    /// Parse `s` in this layout. Surrounding whitespace is ignored.
    pub fn parse(self, s: &str) -> Option<NaiveDate> {
        let re = match self {
            DateFormat::MonthDayYear => &RE_LONG_YEAR,
            DateFormat::MonthDayShortYear => &RE_SHORT_YEAR,
        };
        let caps = re.captures(s.trim())?;
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let year = match self {
            DateFormat::MonthDayYear => year,
            DateFormat::MonthDayShortYear => pivot_short_year(year),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// POSIX `%y` pivot: 69–99 are the 1900s, 00–68 the 2000s.
fn pivot_short_year(yy: i32) -> i32 {
    if yy >= 69 {
        1900 + yy
    } else {
        2000 + yy
    }
}

/// Try each format in order; the first that parses wins.
pub fn parse_date(s: &str, formats: &[DateFormat]) -> Option<NaiveDate> {
    formats.iter().find_map(|f| f.parse(s))
}

/// `MM/DD/YY`, the layout printed on the PG-13.
pub fn format_mmddyy(date: NaiveDate) -> String {
    date.format("%m/%d/%y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: [DateFormat; 2] = [DateFormat::MonthDayYear, DateFormat::MonthDayShortYear];

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn long_and_short_years_agree() {
        assert_eq!(parse_date("3/4/2024", &BOTH), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_date("3/4/24", &BOTH), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_date("03/04/2024", &BOTH), parse_date("3/4/24", &BOTH));
    }

    #[test]
    fn impossible_dates_fail() {
        assert_eq!(parse_date("13/40/2024", &BOTH), None);
        assert_eq!(parse_date("2/30/2024", &BOTH), None);
        assert_eq!(parse_date("0/1/2024", &BOTH), None);
    }

    #[test]
    fn non_dates_fail() {
        assert_eq!(parse_date("DATE", &BOTH), None);
        assert_eq!(parse_date("", &BOTH), None);
        assert_eq!(parse_date("3/4", &BOTH), None);
        assert_eq!(parse_date("3/4/2024 USS COLE", &BOTH), None);
        assert_eq!(parse_date("3/4/202", &BOTH), None);
    }

    #[test]
    fn short_year_pivot() {
        assert_eq!(parse_date("1/1/68", &BOTH), Some(ymd(2068, 1, 1)));
        assert_eq!(parse_date("1/1/69", &BOTH), Some(ymd(1969, 1, 1)));
    }

    #[test]
    fn formats_can_be_restricted() {
        let long_only = [DateFormat::MonthDayYear];
        assert_eq!(parse_date("3/4/24", &long_only), None);
        assert!(parse_date("3/4/2024", &long_only).is_some());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_date("  3/4/2024 ", &BOTH), Some(ymd(2024, 3, 4)));
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_mmddyy(ymd(2024, 3, 4)), "03/04/24");
        assert_eq!(format_mmddyy(ymd(1999, 12, 31)), "12/31/99");
    }
}
