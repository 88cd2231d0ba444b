//! Time math and shift-level utilities.
//!
//! Everything downstream of validation works on absolute minutes relative to
//! the horizon start (minute 0 = 00:00 of the horizon's first day). Durations
//! wrap past midnight with the `end < start ⇒ +1440` rule; `end == start` is
//! a full 24h shift.

use chrono::{Datelike, NaiveDate};

use crate::domain::{Shift, ShiftFilter};
use crate::dto::ShiftMeta;
use crate::error::SolveError;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parses `HH:MM` (24-hour) into minutes since midnight.
pub fn parse_minutes(value: &str) -> Result<i64, SolveError> {
    let invalid =
        || SolveError::InvalidRequest(format!("Invalid time '{value}': expected HH:MM."));
    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Proleptic-Gregorian day number of an ISO `YYYY-MM-DD` date.
pub fn date_ordinal(value: &str) -> Result<i64, SolveError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| i64::from(date.num_days_from_ce()))
        .map_err(|_| {
            SolveError::InvalidRequest(format!("Invalid date '{value}': expected YYYY-MM-DD."))
        })
}

pub fn shift_duration_minutes(shift: &Shift) -> Result<i64, SolveError> {
    let start = parse_minutes(&shift.start)?;
    let end = parse_minutes(&shift.end)?;
    if end > start {
        Ok(end - start)
    } else if end < start {
        Ok(end + MINUTES_PER_DAY - start)
    } else {
        Ok(MINUTES_PER_DAY)
    }
}

pub fn shift_start_abs_minutes(shift: &Shift, horizon_start_ord: i64) -> Result<i64, SolveError> {
    let day_offset = date_ordinal(&shift.date)? - horizon_start_ord;
    Ok(day_offset * MINUTES_PER_DAY + parse_minutes(&shift.start)?)
}

/// Total order over shifts: `(date ordinal, start minutes, type)`.
pub fn shift_order_key(shift: &Shift) -> Result<(i64, i64, String), SolveError> {
    Ok((
        date_ordinal(&shift.date)?,
        parse_minutes(&shift.start)?,
        shift.shift_type.clone(),
    ))
}

pub fn shift_label(shift: &Shift) -> String {
    format!(
        "{} {} {} ({}-{})",
        shift.day, shift.date, shift.shift_type, shift.start, shift.end
    )
}

pub fn shift_to_meta(shift: &Shift) -> ShiftMeta {
    ShiftMeta {
        day: shift.day.clone(),
        date: shift.date.clone(),
        shift_type: shift.shift_type.clone(),
        start: shift.start.clone(),
        end: shift.end.clone(),
    }
}

pub fn shift_matches_filter(shift: &Shift, filter: &ShiftFilter) -> bool {
    if let Some(date) = &filter.date {
        if shift.date != *date {
            return false;
        }
    }
    if let Some(day) = &filter.day {
        if shift.day != *day {
            return false;
        }
    }
    if let Some(shift_type) = &filter.shift_type {
        if shift.shift_type != *shift_type {
            return false;
        }
    }
    true
}

pub fn find_matching_shift_ids(shifts: &[Shift], filter: &ShiftFilter) -> Vec<usize> {
    shifts
        .iter()
        .enumerate()
        .filter(|(_, shift)| shift_matches_filter(shift, filter))
        .map(|(idx, _)| idx)
        .collect()
}

/// Per-shift minute arrays, computed once after validation and shared by the
/// model builder and the infeasibility analyzer.
#[derive(Debug, Clone)]
pub struct ShiftTimeline {
    pub durations: Vec<i64>,
    pub start_abs: Vec<i64>,
    pub end_abs: Vec<i64>,
    /// Shift indices sorted by [`shift_order_key`].
    pub sorted_indices: Vec<usize>,
}

impl ShiftTimeline {
    pub fn build(shifts: &[Shift], horizon_start: &str) -> Result<Self, SolveError> {
        let horizon_start_ord = date_ordinal(horizon_start)?;
        let durations = shifts
            .iter()
            .map(shift_duration_minutes)
            .collect::<Result<Vec<_>, _>>()?;
        let start_abs = shifts
            .iter()
            .map(|shift| shift_start_abs_minutes(shift, horizon_start_ord))
            .collect::<Result<Vec<_>, _>>()?;
        let end_abs = start_abs
            .iter()
            .zip(&durations)
            .map(|(start, duration)| start + duration)
            .collect();

        let mut keyed = shifts
            .iter()
            .map(shift_order_key)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .enumerate()
            .collect::<Vec<_>>();
        keyed.sort_by(|(_, a), (_, b)| a.cmp(b));
        let sorted_indices = keyed.into_iter().map(|(idx, _)| idx).collect();

        Ok(Self {
            durations,
            start_abs,
            end_abs,
            sorted_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(date: &str, start: &str, end: &str) -> Shift {
        Shift {
            day: "Mon".to_string(),
            date: date.to_string(),
            shift_type: "day".to_string(),
            start: start.to_string(),
            end: end.to_string(),
            required: 1,
            source: None,
        }
    }

    #[test]
    fn parse_minutes_accepts_full_range() {
        assert_eq!(parse_minutes("00:00").unwrap(), 0);
        assert_eq!(parse_minutes("08:30").unwrap(), 510);
        assert_eq!(parse_minutes("23:59").unwrap(), 1439);
    }

    #[test]
    fn parse_minutes_rejects_malformed_input() {
        for bad in ["24:00", "12:60", "8:00", "08-00", "08:0", "ab:cd", "08:00:00", ""] {
            assert!(parse_minutes(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn duration_handles_midnight_wrap() {
        assert_eq!(shift_duration_minutes(&shift("2025-01-06", "08:00", "16:00")).unwrap(), 480);
        assert_eq!(shift_duration_minutes(&shift("2025-01-06", "22:00", "06:00")).unwrap(), 480);
        assert_eq!(shift_duration_minutes(&shift("2025-01-06", "00:00", "00:00")).unwrap(), 1440);
    }

    #[test]
    fn absolute_minutes_offset_by_horizon_day() {
        let ord = date_ordinal("2025-01-06").unwrap();
        let s = shift("2025-01-07", "06:00", "14:00");
        assert_eq!(shift_start_abs_minutes(&s, ord).unwrap(), 1440 + 360);
    }

    #[test]
    fn filter_fields_are_wildcards_when_absent() {
        let s = shift("2025-01-06", "08:00", "16:00");
        assert!(shift_matches_filter(&s, &ShiftFilter::default()));
        let by_type = ShiftFilter {
            shift_type: Some("night".to_string()),
            ..Default::default()
        };
        assert!(!shift_matches_filter(&s, &by_type));
        let by_date = ShiftFilter {
            date: Some("2025-01-06".to_string()),
            ..Default::default()
        };
        assert!(shift_matches_filter(&s, &by_date));
    }

    #[test]
    fn timeline_sorts_by_date_start_and_type() {
        let shifts = vec![
            shift("2025-01-07", "08:00", "16:00"),
            shift("2025-01-06", "16:00", "00:00"),
            shift("2025-01-06", "08:00", "16:00"),
        ];
        let timeline = ShiftTimeline::build(&shifts, "2025-01-06").unwrap();
        assert_eq!(timeline.sorted_indices, vec![2, 1, 0]);
        assert_eq!(timeline.start_abs, vec![1920, 960, 480]);
        assert_eq!(timeline.end_abs, vec![2400, 1440, 960]);
    }
}
