use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Utc, Weekday};

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The company's view of "today".
///
/// Resolver entry points that need a current date take this explicitly
/// instead of reading the system clock, so the same context always produces
/// the same answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarContext {
    today: NaiveDate,
    utc_offset: FixedOffset,
}

impl CalendarContext {
    pub fn new(today: NaiveDate, utc_offset: FixedOffset) -> Self {
        Self { today, utc_offset }
    }

    /// Build a context from an instant, converting it to the company's local
    /// calendar day.
    pub fn from_instant(instant: DateTime<Utc>, utc_offset: FixedOffset) -> Self {
        Self {
            today: instant.with_timezone(&utc_offset).date_naive(),
            utc_offset,
        }
    }

    /// Snapshot the system clock. Only collaborators at the edge call this.
    pub fn now(utc_offset: FixedOffset) -> Self {
        Self::from_instant(Utc::now(), utc_offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }
}

/// Monday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Whole weeks between the Monday-aligned weeks of `from` and `to`.
/// Negative when `to` precedes `from`.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days() / 7
}

/// ISO-8601 week of year (1-53).
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Find the nth occurrence of a weekday in a month
pub fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let lead = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    let date = first.checked_add_days(Days::new(u64::from(lead + (n - 1) * 7)))?;
    (date.month() == month).then_some(date)
}

/// Find the last occurrence of a weekday in a month
pub fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut date = next_month.pred_opt()?; // Last day of the month
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}

/// Ordinal of `date` among the same weekdays of its month (1 for the first
/// Monday, 2 for the second, ...).
pub fn weekday_ordinal(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// True when no later date in the same month shares `date`'s weekday.
pub fn is_last_weekday_of_month(date: NaiveDate) -> bool {
    date.checked_add_days(Days::new(7))
        .is_none_or(|next| next.month() != date.month())
}

/// First date on or after `from` that falls on `weekday`.
pub fn next_weekday_on_or_after(from: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + weekday.num_days_from_monday() - from.weekday().num_days_from_monday()) % 7;
    from.checked_add_days(Days::new(u64::from(ahead)))
}
