//! Calendar windows in a fixed time zone

use jiff::{ToSpan, Zoned, civil::Date, tz::TimeZone};
use switchboard_data::TimeWindow;

/// Month containing `at`, from local midnight on the first to the first of the next month
pub fn month_containing(at: &Zoned) -> Result<(Zoned, Zoned), jiff::Error> {
    let start = at.first_of_month()?.start_of_day()?;
    let end = start.checked_add(1.month())?;
    Ok((start, end))
}

/// Local day containing `at`
pub fn day_containing(at: &Zoned) -> Result<(Zoned, Zoned), jiff::Error> {
    let start = at.start_of_day()?;
    let end = start.checked_add(1.day())?;
    Ok((start, end))
}

/// Window for a calendar month in `tz`
pub fn month_window(year: i16, month: i8, tz: &TimeZone) -> Result<TimeWindow, jiff::Error> {
    let first = Date::new(year, month, 1)?.to_zoned(tz.clone())?;
    let (start, end) = month_containing(&first)?;
    Ok(to_window(&start, &end))
}

/// Window for a calendar day in `tz`
pub fn day_window(date: Date, tz: &TimeZone) -> Result<TimeWindow, jiff::Error> {
    let (start, end) = day_containing(&date.to_zoned(tz.clone())?)?;
    Ok(to_window(&start, &end))
}

pub fn to_window(start: &Zoned, end: &Zoned) -> TimeWindow {
    TimeWindow::new(start.timestamp(), end.timestamp())
}
