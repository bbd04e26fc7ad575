use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, OffsetDateTime};

/// Identifies one calendar week, e.g. `"2024-W9"`. Weeks start on Monday and
/// are numbered from 1 within each year. The weekly prize is keyed by this
/// value, so every timestamp inside the same week must map to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekId(String);

impl WeekId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WeekId {
    fn from(raw: String) -> Self {
        WeekId(raw)
    }
}

/// Derives the week bucket for a timestamp. Total over all valid timestamps.
pub fn current_week_id(now: OffsetDateTime) -> WeekId {
    let date = now.date();
    let jan1 = Date::from_ordinal_date(date.year(), 1).expect("every year has a day 1");
    let days = u32::from(date.ordinal()) - 1;
    let offset = u32::from(jan1.weekday().number_days_from_monday());
    let week = (days + offset + 1).div_ceil(7);
    WeekId(format!("{}-W{}", date.year(), week))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_same_week_same_id() {
        let friday = current_week_id(datetime!(2024-03-01 12:00 UTC));
        let sunday = current_week_id(datetime!(2024-03-03 23:59 UTC));
        assert_eq!(friday, sunday);
    }

    #[test]
    fn test_next_week_differs() {
        let friday = current_week_id(datetime!(2024-03-01 12:00 UTC));
        let next_saturday = current_week_id(datetime!(2024-03-09 12:00 UTC));
        assert_ne!(friday, next_saturday);
    }

    #[test]
    fn test_year_starts_at_week_one() {
        assert_eq!(current_week_id(datetime!(2024-01-01 0:00 UTC)).as_str(), "2024-W1");
        assert_eq!(current_week_id(datetime!(2023-01-01 0:00 UTC)).as_str(), "2023-W1");
    }

    #[test]
    fn test_stable_across_times_of_day() {
        let morning = current_week_id(datetime!(2024-03-01 0:00 UTC));
        let night = current_week_id(datetime!(2024-03-01 23:59 UTC));
        assert_eq!(morning, night);
    }
}
