//! Meeting schedule rules
//!
//! Decides whether the voting window is currently open. The serving layer
//! consults this before accepting vote requests; the core itself stays
//! time-agnostic.

use chrono::{NaiveDateTime, NaiveTime, Weekday};

use crate::config::MeetingConfig;
use crate::errors::{AppError, Result};

fn parse_weekday(name: &str) -> Result<Weekday> {
    match name {
        "Monday" => Ok(Weekday::Mon),
        "Tuesday" => Ok(Weekday::Tue),
        "Wednesday" => Ok(Weekday::Wed),
        "Thursday" => Ok(Weekday::Thu),
        "Friday" => Ok(Weekday::Fri),
        "Saturday" => Ok(Weekday::Sat),
        "Sunday" => Ok(Weekday::Sun),
        other => Err(AppError::Configuration {
            message: format!("unknown meeting day: {}", other),
        }),
    }
}

fn parse_wall_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| AppError::Configuration {
        message: format!("bad {} time {:?}: {}", field, value, e),
    })
}

/// Whether `now` (local wall-clock time) falls inside the voting window on
/// a meeting day.
///
/// The window may wrap midnight (e.g. 21:00 to 10:29 the next morning); the
/// weekday check applies to the day `now` falls on.
pub fn voting_window_active(meeting: &MeetingConfig, now: NaiveDateTime) -> Result<bool> {
    let start = parse_wall_time(&meeting.voting_start, "voting_start")?;
    let end = parse_wall_time(&meeting.voting_end, "voting_end")?;

    let mut meeting_days = Vec::with_capacity(meeting.days.len());
    for day in &meeting.days {
        meeting_days.push(parse_weekday(day)?);
    }

    let t = now.time();
    let in_window = if start <= end {
        start < t && t < end
    } else {
        t > start || t < end
    };

    Ok(in_window && meeting_days.contains(&chrono::Datelike::weekday(&now.date())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeetingConfig;
    use chrono::NaiveDate;

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, 0)
            .unwrap()
    }

    #[test]
    fn test_window_open_on_meeting_morning() {
        let meeting = MeetingConfig::default();
        // 2026-08-07 is a Friday
        assert!(voting_window_active(&meeting, at((2026, 8, 7), (9, 0))).unwrap());
    }

    #[test]
    fn test_window_closed_after_cutoff() {
        let meeting = MeetingConfig::default();
        assert!(!voting_window_active(&meeting, at((2026, 8, 7), (12, 0))).unwrap());
    }

    #[test]
    fn test_window_reopens_in_evening() {
        let meeting = MeetingConfig::default();
        assert!(voting_window_active(&meeting, at((2026, 8, 7), (22, 0))).unwrap());
    }

    #[test]
    fn test_window_closed_on_weekend() {
        let meeting = MeetingConfig::default();
        // 2026-08-08 is a Saturday
        assert!(!voting_window_active(&meeting, at((2026, 8, 8), (9, 0))).unwrap());
    }

    #[test]
    fn test_bad_time_is_configuration_error() {
        let meeting = MeetingConfig {
            voting_start: "25:99".into(),
            ..MeetingConfig::default()
        };
        let err = voting_window_active(&meeting, at((2026, 8, 7), (9, 0))).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_bad_day_is_configuration_error() {
        let meeting = MeetingConfig {
            days: vec!["Caturday".into()],
            ..MeetingConfig::default()
        };
        assert!(voting_window_active(&meeting, at((2026, 8, 7), (9, 0))).is_err());
    }
}
