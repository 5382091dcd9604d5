use crate::HarvestError;
use chrono::{Datelike, Months, NaiveDate};

/// Parses a `YYYYMMDD` string into a calendar date
///
/// # Arguments
///
/// * `ymd` - The date string, exactly eight ASCII digits
///
/// # Returns
///
/// * `Ok(NaiveDate)` - The parsed date
/// * `Err(HarvestError::InvalidDate)` - Wrong length, non-digits, or impossible date
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use food_event_harvester::parse_ymd;
///
/// let date = parse_ymd("20000229").unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2000, 2, 29).unwrap());
///
/// assert!(parse_ymd("20010229").is_err());
/// assert!(parse_ymd("2000-01-01").is_err());
/// ```
pub fn parse_ymd(ymd: &str) -> Result<NaiveDate, HarvestError> {
    let trimmed = ymd.trim();

    let invalid = || HarvestError::InvalidDate(ymd.to_string());

    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year: i32 = trimmed[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = trimmed[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = trimmed[6..8].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Formats a calendar date as `YYYYMMDD`
pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Returns the last calendar day of the month containing `date`
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);

    first
        .checked_add_months(Months::new(1))
        .and_then(|next_month| next_month.pred_opt())
        // Only reachable at NaiveDate::MAX
        .unwrap_or(NaiveDate::MAX)
}
