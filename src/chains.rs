//! Chain analysis over the sorted shift list.
//!
//! A chain is a run of shifts where each starts exactly when the previous one
//! ends (gap zero). Two products feed the model builder and the analyzer:
//! capacity-violating windows for the max-worktime rule, and the minimum
//! qualifying chain ending at each shift for the post-chain rest rules.

use std::collections::{BTreeMap, HashSet};

use crate::shifts::ShiftTimeline;

/// Windows (length >= 2) of consecutive shifts whose cumulative duration
/// exceeds `max_worktime_minutes`. For each scan start only the first
/// threshold-exceeding extension is recorded; longer windows contain it and
/// add nothing to the feasible region. Duplicates across scans are dropped.
pub fn compute_max_worktime_violating_windows(
    timeline: &ShiftTimeline,
    max_worktime_minutes: i64,
) -> Vec<Vec<usize>> {
    let sorted = &timeline.sorted_indices;
    let mut windows: Vec<Vec<usize>> = Vec::new();

    for (start_pos, &start_idx) in sorted.iter().enumerate() {
        let mut running_minutes = timeline.durations[start_idx];
        let mut window = vec![start_idx];

        for next_pos in start_pos + 1..sorted.len() {
            let prev_idx = sorted[next_pos - 1];
            let next_idx = sorted[next_pos];
            let gap_minutes = timeline.start_abs[next_idx] - timeline.end_abs[prev_idx];
            if gap_minutes != 0 {
                break;
            }

            window.push(next_idx);
            running_minutes += timeline.durations[next_idx];
            if window.len() >= 2 && running_minutes > max_worktime_minutes {
                windows.push(window.clone());
                break;
            }
        }
    }

    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    windows.retain(|window| seen.insert(window.clone()));
    windows
}

/// For every shift `left`, the shortest zero-gap chain ending at `left` whose
/// cumulative duration reaches `max_chain_minutes`. Shifts with no such chain
/// have no entry.
///
/// The minimum chain is sufficient for the reified "reached max worktime"
/// indicator: any longer qualifying chain ending at `left` contains it, and
/// if the minimum chain is not fully assigned no longer chain can be.
pub fn build_minimal_qualifying_chain_by_left(
    timeline: &ShiftTimeline,
    max_chain_minutes: i64,
) -> BTreeMap<usize, Vec<usize>> {
    let sorted = &timeline.sorted_indices;
    let mut chain_by_left: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for (end_pos, &end_idx) in sorted.iter().enumerate() {
        let mut running_minutes = timeline.durations[end_idx];
        let mut chain = vec![end_idx];
        if running_minutes >= max_chain_minutes {
            chain_by_left.insert(end_idx, chain);
            continue;
        }

        for prev_pos in (0..end_pos).rev() {
            let prev_idx = sorted[prev_pos];
            let next_idx = sorted[prev_pos + 1];
            let gap_minutes = timeline.start_abs[next_idx] - timeline.end_abs[prev_idx];
            if gap_minutes != 0 {
                break;
            }

            chain.insert(0, prev_idx);
            running_minutes += timeline.durations[prev_idx];
            if running_minutes >= max_chain_minutes {
                chain_by_left.insert(end_idx, chain);
                break;
            }
        }
    }

    chain_by_left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Shift;

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

    fn timeline(shifts: &[Shift]) -> ShiftTimeline {
        ShiftTimeline::build(shifts, "2025-01-06").unwrap()
    }

    #[test]
    fn three_adjacent_four_hour_shifts_exceed_eight_hours_together() {
        let shifts = vec![
            shift("2025-01-06", "08:00", "12:00"),
            shift("2025-01-06", "12:00", "16:00"),
            shift("2025-01-06", "16:00", "20:00"),
        ];
        let windows = compute_max_worktime_violating_windows(&timeline(&shifts), 8 * 60);
        // [1, 2] sums to exactly 8h, which does not exceed the cap.
        assert_eq!(windows, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn scan_stops_at_the_first_exceeding_window() {
        let shifts = vec![
            shift("2025-01-06", "08:00", "12:00"),
            shift("2025-01-06", "12:00", "16:00"),
            shift("2025-01-06", "16:00", "20:00"),
        ];
        let windows = compute_max_worktime_violating_windows(&timeline(&shifts), 6 * 60);
        // From 0 the pair [0, 1] already exceeds 6h, so [0, 1, 2] is never
        // recorded; the scan from 1 contributes its own first pair.
        assert_eq!(windows, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn gap_breaks_the_window_scan() {
        let shifts = vec![
            shift("2025-01-06", "08:00", "12:00"),
            shift("2025-01-06", "13:00", "17:00"),
            shift("2025-01-06", "17:00", "21:00"),
        ];
        let windows = compute_max_worktime_violating_windows(&timeline(&shifts), 6 * 60);
        assert_eq!(windows, vec![vec![1, 2]]);
    }

    #[test]
    fn minimal_chain_is_the_shortest_qualifying_suffix() {
        let shifts = vec![
            shift("2025-01-06", "04:00", "08:00"),
            shift("2025-01-06", "08:00", "12:00"),
            shift("2025-01-06", "12:00", "16:00"),
            shift("2025-01-06", "16:00", "20:00"),
        ];
        let chains = build_minimal_qualifying_chain_by_left(&timeline(&shifts), 8 * 60);
        assert!(!chains.contains_key(&0));
        assert_eq!(chains[&1], vec![0, 1]);
        assert_eq!(chains[&2], vec![1, 2]);
        assert_eq!(chains[&3], vec![2, 3]);
    }

    #[test]
    fn single_long_shift_qualifies_alone() {
        let shifts = vec![
            shift("2025-01-06", "08:00", "18:00"),
            shift("2025-01-06", "18:00", "20:00"),
        ];
        let chains = build_minimal_qualifying_chain_by_left(&timeline(&shifts), 8 * 60);
        assert_eq!(chains[&0], vec![0]);
        assert_eq!(chains[&1], vec![0, 1]);
    }

    #[test]
    fn chain_walk_stops_at_a_gap() {
        let shifts = vec![
            shift("2025-01-06", "04:00", "08:00"),
            shift("2025-01-06", "09:00", "13:00"),
        ];
        let chains = build_minimal_qualifying_chain_by_left(&timeline(&shifts), 8 * 60);
        assert!(chains.is_empty());
    }
}
