use chrono::NaiveDate;

/// Column header format used by the Hopkins feed: no zero padding on
/// month or day, two-digit year (e.g. "3/11/21").
pub const COLUMN_FORMAT: &str = "%-m/%-d/%y";

pub fn column_label(day: NaiveDate) -> String {
    day.format(COLUMN_FORMAT).to_string()
}

pub fn parse_column_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label, COLUMN_FORMAT).ok()
}

/// The immediately preceding calendar day, rolling over month and year
/// boundaries (Jan 1 -> Dec 31 of the prior year, first of a month ->
/// last day of the previous month, leap years included).
pub fn previous_day(day: NaiveDate) -> NaiveDate {
    day.pred_opt()
        .expect("no calendar day precedes chrono's minimum date")
}
