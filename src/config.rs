use crate::error::ConfigError;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COUNTRY_CODE: &str = "US";
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;
/// Ten years; keeps placeholder dates inside the representable range.
pub const MAX_LOOKAHEAD_DAYS: i64 = 3650;

/// What happens to a non-done task whose end date already lies in the past.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayPolicy {
    /// Leave the end date where the evidence put it and flag the entry overdue.
    #[default]
    KeepOverdue,
    /// Push the end date forward to "today".
    ExtendToToday,
}

impl DelayPolicy {
    pub fn extends(self) -> bool {
        matches!(self, DelayPolicy::ExtendToToday)
    }
}

/// Run-wide scheduling settings, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minimum start date for independent, non-completed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_date: Option<NaiveDate>,
    /// Holiday calendar country.
    pub country_code: String,
    pub weekend_days: Vec<Weekday>,
    pub delay_policy: DelayPolicy,
    /// Placeholder window used when a task carries no end-date evidence.
    pub lookahead_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            floor_date: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            delay_policy: DelayPolicy::default(),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}

impl ScheduleConfig {
    pub fn with_floor_date(mut self, date: NaiveDate) -> Self {
        self.floor_date = Some(date);
        self
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn with_weekend_days<I>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        self.weekend_days = days.into_iter().collect();
        self
    }

    pub fn with_delay_policy(mut self, policy: DelayPolicy) -> Self {
        self.delay_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut weekend = self.weekend_days.clone();
        weekend.sort_by_key(|wd| wd.num_days_from_monday());
        weekend.dedup();
        if weekend.len() >= 7 {
            return Err(ConfigError::NoWorkingDays);
        }
        if !(1..=MAX_LOOKAHEAD_DAYS).contains(&self.lookahead_days) {
            return Err(ConfigError::InvalidLookahead(self.lookahead_days));
        }
        Ok(())
    }
}
