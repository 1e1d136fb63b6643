use chrono::{Datelike, Days, Local, NaiveDate};

use crate::error::{IftaError, Result};

/// First year the backend holds reports for
pub const START_YEAR: i32 = 2023;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

pub(crate) fn check_year(year: i32) -> Result<()> {
    if year < START_YEAR {
        return Err(IftaError::YearOutOfRange {
            year,
            start: START_YEAR,
        });
    }
    Ok(())
}

/// Number of days in `month` of `year`, taken as the day before the 1st of the following month.
pub fn month_length(year: i32, month: u32) -> Result<u32> {
    if !(1..=12).contains(&month) {
        return Err(IftaError::InvalidMonth(month));
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .ok_or_else(|| IftaError::InvalidDate(format!("{year}-{month:02}")))
}

/// Day picker contents: 1..=N for the given month.
pub fn days_in_month(year: i32, month: u32) -> Result<Vec<u32>> {
    Ok((1..=month_length(year, month)?).collect())
}

/// Years offered by the month/year pickers, `START_YEAR` through `current_year`.
pub fn selectable_years(current_year: i32) -> Vec<i32> {
    (START_YEAR..=current_year).collect()
}

/// A validated calendar date picked from the month/year/day selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateQuery {
    date: NaiveDate,
}

impl DateQuery {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        check_year(year)?;
        let max = month_length(year, month)?;
        if day == 0 || day > max {
            return Err(IftaError::InvalidDay {
                year,
                month,
                day,
                max,
            });
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| IftaError::InvalidDate(format!("{year}-{month:02}-{day:02}")))?;
        Ok(Self { date })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| IftaError::InvalidDate(input.to_string()))
}

/// Same calendar day two years back. Feb 29 rolls forward to Mar 1.
fn two_years_before(today: NaiveDate) -> NaiveDate {
    let year = today.year() - 2;
    today
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(NaiveDate::MIN)
}

/// Whether a report run may be requested for `candidate`, relative to `today`.
///
/// Reports are final once three days have passed and are kept for two years,
/// so only dates after `today - 2 years` and up to `today - 3 days` qualify.
pub fn is_date_selectable_on(candidate: NaiveDate, today: NaiveDate) -> bool {
    let three_days_ago = today.checked_sub_days(Days::new(3)).unwrap_or(NaiveDate::MIN);
    let two_years_ago = two_years_before(today);
    candidate > two_years_ago && candidate <= three_days_ago
}

/// [`is_date_selectable_on`] against the local calendar date
pub fn is_date_selectable(candidate: NaiveDate) -> bool {
    is_date_selectable_on(candidate, Local::now().date_naive())
}
