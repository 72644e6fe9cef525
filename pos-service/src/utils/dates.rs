//! Shop-local calendar handling.
//!
//! Bills are stamped in UTC but the shop thinks in local business days, so
//! every "which day" question goes through [`ShopClock`].

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use service_core::error::AppError;

/// Half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShopClock {
    offset: FixedOffset,
}

impl ShopClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Clock for a fixed UTC offset in minutes, falling back to the host's
    /// current offset when none is configured or the value is out of range.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        let offset = minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .unwrap_or_else(|| *Local::now().offset());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    /// UTC instant of local midnight starting `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // A fixed offset has no gaps, so the mapping is always single.
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    /// Range covering the local days `first..=last`.
    pub fn days(&self, first: NaiveDate, last: NaiveDate) -> DateRange {
        DateRange {
            start: self.start_of_day(first),
            end: self.start_of_day(last) + Duration::days(1),
        }
    }

    pub fn day(&self, date: NaiveDate) -> DateRange {
        self.days(date, date)
    }

    /// Parses a calendar date sent by the client: `YYYY-MM-DD`, or a full
    /// RFC 3339 timestamp which is reduced to its shop-local date.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| self.local_date(dt.with_timezone(&Utc)))
        })
    }

    /// Parses a date-valued export cell: RFC 3339, `YYYY-MM-DD`, or epoch
    /// milliseconds.
    pub fn parse_instant(&self, value: &serde_json::Value) -> Option<DateTime<Utc>> {
        match value {
            serde_json::Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| {
                    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                        .ok()
                        .map(|d| self.start_of_day(d))
                }),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        }
    }

    /// `dd/mm/yyyy, HH:MM:SS` in shop time, the receipt and report format.
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%d/%m/%Y, %H:%M:%S")
            .to_string()
    }

    /// Range from optional inclusive `startDate`/`endDate` strings. An open
    /// end runs through today; no dates at all means no filter.
    pub fn optional_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<DateRange>, AppError> {
        let start = start.filter(|s| !s.trim().is_empty());
        let end = end.filter(|s| !s.trim().is_empty());
        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        let first = match start {
            Some(raw) => self.require_date("startDate", raw)?,
            None => NaiveDate::MIN,
        };
        let last = match end {
            Some(raw) => self.require_date("endDate", raw)?,
            None => self.today(),
        };
        if last < first {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "endDate must not be before startDate"
            )));
        }

        if first == NaiveDate::MIN {
            return Ok(Some(DateRange {
                start: DateTime::<Utc>::MIN_UTC,
                end: self.day(last).end,
            }));
        }
        Ok(Some(self.days(first, last)))
    }

    fn require_date(&self, field: &str, raw: &str) -> Result<NaiveDate, AppError> {
        self.parse_date(raw).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Invalid {}: {}", field, raw))
        })
    }
}

/// `dateFilter` values accepted by the deleted-items listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    Today,
    Yesterday,
    Custom,
}

impl std::str::FromStr for DayFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(DayFilter::Today),
            "yesterday" => Ok(DayFilter::Yesterday),
            "custom" => Ok(DayFilter::Custom),
            _ => Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid dateFilter: {}. Must be one of: today, yesterday, custom",
                s
            ))),
        }
    }
}

impl DayFilter {
    pub fn resolve(
        self,
        clock: &ShopClock,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<DateRange>, AppError> {
        let today = clock.today();
        match self {
            DayFilter::Today => Ok(Some(clock.day(today))),
            DayFilter::Yesterday => Ok(Some(clock.day(today - Duration::days(1)))),
            DayFilter::Custom => {
                if start.is_none() || end.is_none() {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "startDate and endDate are required for a custom dateFilter"
                    )));
                }
                clock.optional_range(start, end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> ShopClock {
        ShopClock::from_offset_minutes(Some(330))
    }

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn local_date_uses_shop_offset_not_utc() {
        // 20:00 UTC on the 1st is already the 2nd in India.
        let late = utc("2024-03-01T20:00:00Z");
        assert_eq!(ist().local_date(late), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(
            ShopClock::from_offset_minutes(Some(0)).local_date(late),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn day_range_starts_at_local_midnight() {
        let range = ist().day(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(range.start, utc("2024-03-01T18:30:00Z"));
        assert_eq!(range.end, utc("2024-03-02T18:30:00Z"));
        assert!(range.contains(utc("2024-03-01T20:00:00Z")));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn optional_range_is_inclusive_of_end_day() {
        let clock = ist();
        let range = clock
            .optional_range(Some("2024-03-01"), Some("2024-03-03"))
            .unwrap()
            .unwrap();
        assert_eq!(range, clock.days(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        ));
        assert!(clock.optional_range(None, None).unwrap().is_none());
    }

    #[test]
    fn optional_range_rejects_bad_input() {
        let clock = ist();
        assert!(clock.optional_range(Some("yesterday-ish"), None).is_err());
        assert!(clock
            .optional_range(Some("2024-03-05"), Some("2024-03-01"))
            .is_err());
    }

    #[test]
    fn parse_instant_accepts_common_shapes() {
        let clock = ist();
        assert!(clock.parse_instant(&serde_json::json!("2024-03-01T10:00:00Z")).is_some());
        assert!(clock.parse_instant(&serde_json::json!("2024-03-01")).is_some());
        assert!(clock.parse_instant(&serde_json::json!(1709287200000_i64)).is_some());
        assert!(clock.parse_instant(&serde_json::json!("31/31/2024")).is_none());
        assert!(clock.parse_instant(&serde_json::json!(true)).is_none());
    }

    #[test]
    fn format_renders_shop_time() {
        assert_eq!(ist().format(utc("2024-03-01T20:00:00Z")), "02/03/2024, 01:30:00");
    }

    #[test]
    fn day_filter_parsing_and_custom_requirements() {
        let clock = ist();
        assert_eq!("Today".parse::<DayFilter>().unwrap(), DayFilter::Today);
        assert!("last-week".parse::<DayFilter>().is_err());

        let yesterday = DayFilter::Yesterday.resolve(&clock, None, None).unwrap().unwrap();
        assert_eq!(yesterday.end, clock.day(clock.today()).start);

        assert!(DayFilter::Custom.resolve(&clock, Some("2024-03-01"), None).is_err());
    }
}
