//! print window guard
//! answers "can a job of N minutes start now without crossing curfew".
//! pure function of the inputs, no io, no side effects. invoked by job
//! submission logic before scheduling, never by the timer loop

use chrono::{Duration, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintWindowReport {
    pub fits: bool,
    /// floor minutes until today's curfew, negative once curfew passed
    pub minutes_until_curfew: i64,
}

pub fn evaluate(
    now: NaiveDateTime,
    curfew_time_of_day: NaiveTime,
    estimated_minutes: i64,
) -> PrintWindowReport {
    let shutdown_instant = now.date().and_time(curfew_time_of_day);
    let end_instant = now + Duration::minutes(estimated_minutes);
    PrintWindowReport {
        fits: end_instant <= shutdown_instant,
        // floor, not truncation: -90s must report -2, callers treat any
        // negative value as "already past curfew"
        minutes_until_curfew: (shutdown_instant - now).num_seconds().div_euclid(60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn curfew() -> NaiveTime {
        NaiveTime::from_hms_opt(20, 0, 0).unwrap()
    }

    #[test]
    fn test_short_job_fits_before_curfew() {
        let report = evaluate(at(19, 45), curfew(), 10);
        assert!(report.fits);
        assert_eq!(report.minutes_until_curfew, 15);
    }

    #[test]
    fn test_long_job_crosses_curfew() {
        let report = evaluate(at(19, 45), curfew(), 20);
        assert!(!report.fits);
        assert_eq!(report.minutes_until_curfew, 15);
    }

    #[test]
    fn test_job_ending_exactly_at_curfew_fits() {
        let report = evaluate(at(19, 45), curfew(), 15);
        assert!(report.fits);
    }

    #[test]
    fn test_past_curfew_reports_negative_minutes() {
        let report = evaluate(at(20, 30), curfew(), 1);
        assert!(!report.fits);
        assert_eq!(report.minutes_until_curfew, -30);
        // even a zero length job does not fit after curfew
        let report = evaluate(at(20, 30), curfew(), 0);
        assert!(!report.fits);
    }

    #[test]
    fn test_minutes_floor_on_partial_minute() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(19, 59, 30)
            .unwrap();
        assert_eq!(evaluate(now, curfew(), 0).minutes_until_curfew, 0);
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(20, 1, 30)
            .unwrap();
        assert_eq!(evaluate(now, curfew(), 0).minutes_until_curfew, -2);
    }

    #[test]
    fn test_minutes_decrease_as_now_advances() {
        let mut previous = i64::MAX;
        for minute in [0u32, 15, 30, 45] {
            let report = evaluate(at(19, minute), curfew(), 5);
            assert!(report.minutes_until_curfew < previous);
            previous = report.minutes_until_curfew;
        }
    }
}
