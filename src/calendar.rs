use crate::config::ScheduleConfig;
use bdays::HolidayCalendar;
use bdays::calendars::brazil::BRSettlement;
use bdays::calendars::us::USSettlement;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Source of public holidays, keyed by country code and calendar year.
///
/// Returning `None` means the country is not supported; the calendar then
/// degrades to weekends only.
pub trait HolidayProvider {
    fn holidays(&self, country: &str, year: i32) -> Option<BTreeSet<NaiveDate>>;

    /// Cheap up-front support check. Providers that cannot answer without
    /// computing a year keep the default and are checked lazily instead.
    fn supports(&self, _country: &str) -> bool {
        true
    }
}

/// Holiday tables backed by the `bdays` settlement calendars.
#[derive(Debug, Clone, Copy, Default)]
pub struct BdaysHolidays;

impl BdaysHolidays {
    pub const SUPPORTED: [&'static str; 2] = ["US", "BR"];

    fn collect<C>(calendar: &C, year: i32) -> BTreeSet<NaiveDate>
    where
        C: HolidayCalendar<NaiveDate>,
    {
        let mut holidays = BTreeSet::new();
        let Some(mut date) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            return holidays;
        };
        while date.year() == year {
            if calendar.is_holiday(date) {
                holidays.insert(date);
            }
            date += Duration::days(1);
        }
        holidays
    }
}

impl HolidayProvider for BdaysHolidays {
    fn holidays(&self, country: &str, year: i32) -> Option<BTreeSet<NaiveDate>> {
        match country.trim().to_ascii_uppercase().as_str() {
            "US" => Some(Self::collect(&USSettlement, year)),
            "BR" => Some(Self::collect(&BRSettlement, year)),
            _ => None,
        }
    }

    fn supports(&self, country: &str) -> bool {
        let country = country.trim().to_ascii_uppercase();
        Self::SUPPORTED.contains(&country.as_str())
    }
}

/// Explicit per-country holiday table.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    by_country: HashMap<String, BTreeSet<NaiveDate>>,
}

impl FixedHolidays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a country, even with no holidays, so it counts as supported.
    pub fn with_country<I>(mut self, country: &str, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.by_country
            .entry(country.to_ascii_uppercase())
            .or_default()
            .extend(dates);
        self
    }

    pub fn add_holiday(&mut self, country: &str, date: NaiveDate) {
        self.by_country
            .entry(country.to_ascii_uppercase())
            .or_default()
            .insert(date);
    }
}

impl HolidayProvider for FixedHolidays {
    fn holidays(&self, country: &str, year: i32) -> Option<BTreeSet<NaiveDate>> {
        self.by_country
            .get(&country.trim().to_ascii_uppercase())
            .map(|dates| dates.iter().copied().filter(|d| d.year() == year).collect())
    }

    fn supports(&self, country: &str) -> bool {
        self.by_country.contains_key(&country.trim().to_ascii_uppercase())
    }
}

/// Business-day calendar for one country and weekend set.
///
/// Holiday sets are fetched from the provider the first time a date in a
/// given year is queried and cached for the lifetime of the calendar.
pub struct WorkCalendar {
    country: String,
    non_working_days: HashSet<Weekday>,
    provider: Arc<dyn HolidayProvider>,
    holidays_by_year: RefCell<HashMap<i32, HashSet<NaiveDate>>>,
    degraded: Cell<bool>,
}

impl fmt::Debug for WorkCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut weekend: Vec<Weekday> = self.non_working_days.iter().copied().collect();
        weekend.sort_by_key(|wd| wd.num_days_from_monday());
        f.debug_struct("WorkCalendar")
            .field("country", &self.country)
            .field("non_working_days", &weekend)
            .field("cached_years", &self.cached_years())
            .field("degraded", &self.degraded.get())
            .finish()
    }
}

impl WorkCalendar {
    pub fn new<I>(country: impl Into<String>, weekend_days: I, provider: Box<dyn HolidayProvider>) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self::with_shared_provider(country, weekend_days, Arc::from(provider))
    }

    /// Unsupported countries are detected here, before any date is queried.
    pub fn with_shared_provider<I>(
        country: impl Into<String>,
        weekend_days: I,
        provider: Arc<dyn HolidayProvider>,
    ) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let calendar = Self {
            country: country.into(),
            non_working_days: weekend_days.into_iter().collect(),
            provider,
            holidays_by_year: RefCell::new(HashMap::new()),
            degraded: Cell::new(false),
        };
        if !calendar.provider.supports(&calendar.country) {
            calendar.mark_degraded();
        }
        calendar
    }

    /// Calendar backed by the `bdays` holiday tables for the configured country.
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::with_provider(config, Box::new(BdaysHolidays))
    }

    pub fn with_provider(config: &ScheduleConfig, provider: Box<dyn HolidayProvider>) -> Self {
        Self::new(
            config.country_code.clone(),
            config.weekend_days.iter().copied(),
            provider,
        )
    }

    /// Saturday/Sunday weekends and no holidays at all.
    pub fn weekends_only() -> Self {
        Self::new(
            "",
            [Weekday::Sat, Weekday::Sun],
            Box::new(FixedHolidays::new().with_country("", std::iter::empty())),
        )
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// True once a holiday lookup fell back to the weekend-only calendar.
    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    pub fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.holidays_by_year.borrow().keys().copied().collect();
        years.sort_unstable();
        years
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        self.non_working_days.contains(&date.weekday())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let year = date.year();
        if let Some(holidays) = self.holidays_by_year.borrow().get(&year) {
            return holidays.contains(&date);
        }
        let holidays = self.load_year(year);
        let hit = holidays.contains(&date);
        self.holidays_by_year.borrow_mut().insert(year, holidays);
        hit
    }

    fn load_year(&self, year: i32) -> HashSet<NaiveDate> {
        match self.provider.holidays(&self.country, year) {
            Some(holidays) => {
                tracing::debug!(country = %self.country, year, count = holidays.len(), "loaded holiday set");
                holidays.into_iter().collect()
            }
            None => {
                self.mark_degraded();
                HashSet::new()
            }
        }
    }

    fn mark_degraded(&self) {
        if !self.degraded.replace(true) {
            tracing::warn!(
                country = %self.country,
                "unsupported holiday calendar; falling back to weekends only"
            );
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_weekend(date) && !self.is_holiday(date)
    }

    /// Returns `date` itself when it is a working day, otherwise the first
    /// working day after it.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.is_working_day(current) {
            current += Duration::days(1);
        }
        current
    }

    /// First working day strictly after `date`.
    pub fn next_working_day_after(&self, date: NaiveDate) -> NaiveDate {
        self.next_working_day(date + Duration::days(1))
    }

    /// Non-working days in the inclusive range, for rendering weekend and
    /// holiday bands.
    pub fn non_working_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;
        while current <= end {
            if !self.is_working_day(current) {
                days.push(current);
            }
            current += Duration::days(1);
        }
        days
    }

    /// Count working days in the inclusive range.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_working_day(current) {
                count += 1;
            }
            current += Duration::days(1);
        }
        count
    }
}
