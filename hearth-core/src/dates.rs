use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire format for dates coming in from forms and query strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A half-open stay interval: the guest holds the room from `start`
/// inclusive to `end` exclusive, so departure day is open for the next
/// arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaySpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl StaySpan {
    /// Build a span covering at least one night.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SpanError> {
        if start >= end {
            return Err(SpanError::EmptyOrReversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse `yyyy-mm-dd` strings into a span, reporting which side was
    /// malformed.
    pub fn parse(start: &str, end: &str) -> Result<Self, SpanError> {
        let start = NaiveDate::parse_from_str(start, DATE_FORMAT)
            .map_err(|_| SpanError::BadStart(start.to_string()))?;
        let end = NaiveDate::parse_from_str(end, DATE_FORMAT)
            .map_err(|_| SpanError::BadEnd(end.to_string()))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights covered. Always at least one.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Two half-open spans overlap when each starts before the other ends.
    pub fn overlaps(&self, other: &StaySpan) -> bool {
        self.overlaps_dates(other.start, other.end)
    }

    /// Overlap against a stored `[start, end)` row without building a
    /// second span.
    pub fn overlaps_dates(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpanError {
    #[error("start date is not a valid yyyy-mm-dd date: {0}")]
    BadStart(String),

    #[error("end date is not a valid yyyy-mm-dd date: {0}")]
    BadEnd(String),

    #[error("stay must cover at least one night: {start} to {end}")]
    EmptyOrReversed { start: NaiveDate, end: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rejects_reversed_and_empty_spans() {
        assert!(StaySpan::new(date(2026, 1, 5), date(2026, 1, 5)).is_err());
        assert!(StaySpan::new(date(2026, 1, 6), date(2026, 1, 5)).is_err());
        assert!(StaySpan::new(date(2026, 1, 5), date(2026, 1, 6)).is_ok());
    }

    #[test]
    fn test_back_to_back_spans_do_not_overlap() {
        // Departure day doubles as the next guest's arrival day.
        let first = StaySpan::new(date(2026, 1, 5), date(2026, 1, 8)).unwrap();
        let second = StaySpan::new(date(2026, 1, 8), date(2026, 1, 10)).unwrap();
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = StaySpan::new(date(2026, 1, 5), date(2026, 1, 10)).unwrap();
        let b = StaySpan::new(date(2026, 1, 9), date(2026, 1, 12)).unwrap();
        let inside = StaySpan::new(date(2026, 1, 6), date(2026, 1, 7)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_nights() {
        let span = StaySpan::new(date(2026, 1, 5), date(2026, 1, 8)).unwrap();
        assert_eq!(span.nights(), 3);
        let single = StaySpan::new(date(2026, 1, 5), date(2026, 1, 6)).unwrap();
        assert_eq!(single.nights(), 1);
    }

    #[test]
    fn test_parse_reports_which_side_failed() {
        assert!(matches!(
            StaySpan::parse("not-a-date", "2026-01-06"),
            Err(SpanError::BadStart(_))
        ));
        assert!(matches!(
            StaySpan::parse("2026-01-05", "01/06/2026"),
            Err(SpanError::BadEnd(_))
        ));
        let span = StaySpan::parse("2026-01-05", "2026-01-06").unwrap();
        assert_eq!(span.start(), date(2026, 1, 5));
        assert_eq!(span.end(), date(2026, 1, 6));
    }

    #[test]
    fn test_span_serializes_as_plain_dates() {
        let span = StaySpan::new(date(2026, 1, 5), date(2026, 1, 8)).unwrap();
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["start"], "2026-01-05");
        assert_eq!(json["end"], "2026-01-08");
    }
}
