// src/date_range.rs
//
// Calendar-period helpers for the visit analytics. Every boundary is
// computed in Asia/Jakarta regardless of the server's local timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Jakarta;
use chrono_tz::Tz;

pub const INVALID_DATE: &str = "Invalid date";

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Now, in Asia/Jakarta.
pub fn current_date() -> DateTime<Tz> {
    Utc::now().with_timezone(&Jakarta)
}

fn end_of_day_time() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    match Jakarta.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        // Jakarta has a fixed UTC+7 offset in the modern era, so this
        // branch is unreachable in practice.
        chrono::LocalResult::None => Jakarta.from_utc_datetime(&naive),
    }
}

/// Midnight (00:00:00.000) of `date`, in Asia/Jakarta.
pub fn day_start(date: NaiveDate) -> DateTime<Tz> {
    at(date, NaiveTime::MIN)
}

/// Last instant (23:59:59.999) of `date`, in Asia/Jakarta.
pub fn day_end(date: NaiveDate) -> DateTime<Tz> {
    at(date, end_of_day_time())
}

fn week_range_of(today: NaiveDate) -> DateRange {
    // Sunday counts as day 0, so the Monday that opened the week is six
    // days back; every other day rolls back `day - 1`.
    let current_day = i64::from(today.weekday().num_days_from_sunday());
    let back = if current_day == 0 { 6 } else { current_day - 1 };
    let monday = today - Duration::days(back);
    let sunday = monday + Duration::days(6);
    DateRange {
        start: day_start(monday),
        end: day_end(sunday),
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap_or_default() - Duration::days(1)
}

fn month_range_of(year: i32, month: u32) -> DateRange {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    DateRange {
        start: day_start(first),
        end: day_end(last_day_of_month(year, month)),
    }
}

fn year_range_of(year: i32) -> DateRange {
    DateRange {
        start: day_start(NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default()),
        end: day_end(NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or_default()),
    }
}

fn previous_month_of(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Monday 00:00:00.000 through Sunday 23:59:59.999 of the current week.
pub fn current_week_range() -> DateRange {
    week_range_of(current_date().date_naive())
}

pub fn current_month_range() -> DateRange {
    let now = current_date();
    month_range_of(now.year(), now.month())
}

pub fn current_year_range() -> DateRange {
    year_range_of(current_date().year())
}

pub fn previous_week_range() -> DateRange {
    let current = current_week_range();
    DateRange {
        start: current.start - Duration::days(7),
        end: current.end - Duration::days(7),
    }
}

/// Previous calendar month, rolling back to December of the prior year
/// when called in January.
pub fn previous_month_range() -> DateRange {
    let now = current_date();
    let (year, month) = previous_month_of(now.year(), now.month());
    month_range_of(year, month)
}

pub fn previous_year_range() -> DateRange {
    year_range_of(current_date().year() - 1)
}

/// Inclusive on both ends.
pub fn is_in_range(date: DateTime<Tz>, start: DateTime<Tz>, end: DateTime<Tz>) -> bool {
    date >= start && date <= end
}

/// Accepts `YYYY-MM-DD` or RFC 3339 input.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(input.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Jakarta).date_naive())
}

/// "5 Mar 2024"-style Indonesian date, or the literal `"Invalid date"`
/// when the input does not parse. Total, never panics.
pub fn format_date_only(input: &str) -> String {
    match parse_date(input) {
        Some(date) => {
            let abbr = MONTH_ABBR
                .get(date.month0() as usize)
                .copied()
                .unwrap_or("???");
            format!("{} {} {}", date.day(), abbr, date.year())
        }
        None => INVALID_DATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_is_monday_through_sunday_for_every_weekday() {
        // 2024-03-04 is a Monday, 2024-03-10 the following Sunday.
        let monday = ymd(2024, 3, 4);
        let sunday = ymd(2024, 3, 10);
        for offset in 0..7 {
            let today = monday + Duration::days(offset);
            let range = week_range_of(today);
            assert_eq!(range.start.date_naive(), monday, "offset {offset}");
            assert_eq!(range.end.date_naive(), sunday, "offset {offset}");
        }
    }

    #[test]
    fn week_range_boundary_times() {
        let range = week_range_of(ymd(2024, 3, 6));
        assert_eq!(
            (range.start.hour(), range.start.minute(), range.start.second()),
            (0, 0, 0)
        );
        assert_eq!(range.start.timestamp_subsec_millis(), 0);
        assert_eq!(
            (range.end.hour(), range.end.minute(), range.end.second()),
            (23, 59, 59)
        );
        assert_eq!(range.end.timestamp_subsec_millis(), 999);
        assert_eq!((range.end.date_naive() - range.start.date_naive()).num_days(), 6);
    }

    #[test]
    fn sunday_rolls_back_six_days() {
        let range = week_range_of(ymd(2024, 3, 10));
        assert_eq!(range.start.date_naive(), ymd(2024, 3, 4));
    }

    #[test]
    fn previous_month_rolls_over_year_in_january() {
        assert_eq!(previous_month_of(2024, 1), (2023, 12));
        assert_eq!(previous_month_of(2024, 7), (2024, 6));
    }

    #[test]
    fn month_range_handles_leap_february() {
        let range = month_range_of(2024, 2);
        assert_eq!(range.start.date_naive(), ymd(2024, 2, 1));
        assert_eq!(range.end.date_naive(), ymd(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 2), ymd(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 12), ymd(2024, 12, 31));
    }

    #[test]
    fn year_range_spans_full_calendar_year() {
        let range = year_range_of(2024);
        assert_eq!(range.start.date_naive(), ymd(2024, 1, 1));
        assert_eq!(range.end.date_naive(), ymd(2024, 12, 31));
    }

    #[test]
    fn is_in_range_includes_both_ends() {
        let range = week_range_of(ymd(2024, 3, 6));
        assert!(is_in_range(range.start, range.start, range.end));
        assert!(is_in_range(range.end, range.start, range.end));
        assert!(!is_in_range(
            range.start - Duration::milliseconds(1),
            range.start,
            range.end
        ));
        assert!(!is_in_range(
            range.end + Duration::milliseconds(1),
            range.start,
            range.end
        ));
    }

    #[test]
    fn format_date_only_sentinel_on_garbage() {
        assert_eq!(format_date_only("not-a-date"), INVALID_DATE);
        assert_eq!(format_date_only(""), INVALID_DATE);
        assert_eq!(format_date_only("2024-13-40"), INVALID_DATE);
    }

    #[test]
    fn format_date_only_localizes() {
        assert_eq!(format_date_only("2024-03-05"), "5 Mar 2024");
        assert_eq!(format_date_only("2023-08-17"), "17 Agu 2023");
        assert_eq!(format_date_only("2024-05-01"), "1 Mei 2024");
    }

    #[test]
    fn parse_date_accepts_rfc3339() {
        // 18:00 UTC is already past midnight in Jakarta (UTC+7).
        assert_eq!(
            parse_date("2024-03-05T18:00:00Z"),
            Some(ymd(2024, 3, 6))
        );
    }

    #[test]
    fn day_bounds_use_jakarta_offset() {
        use chrono::Offset;
        let start = day_start(ymd(2024, 3, 5));
        assert_eq!(start.offset().fix().local_minus_utc(), 7 * 3600);
    }
}
