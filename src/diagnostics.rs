//! Static infeasibility analysis.
//!
//! Runs only when the solver finds no feasible assignment. Looks for direct
//! contradictions between hard constraints, coverage, and the rest rules
//! without touching the solver, and emits up to 10 unique structured
//! reasons. Kept separate from the model builder; a stronger approach (MUS
//! extraction, assumption literals) would replace this module only.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::chains::build_minimal_qualifying_chain_by_left;
use crate::domain::{HardConstraintType, SolverRequest};
use crate::dto::{InfeasibilityReason, ReasonData};
use crate::shifts::{find_matching_shift_ids, shift_label, shift_to_meta, ShiftTimeline};

const MAX_REASONS: usize = 10;

pub fn infer_infeasibility_reasons(
    payload: &SolverRequest,
    timeline: &ShiftTimeline,
    violating_windows: &[Vec<usize>],
) -> Vec<InfeasibilityReason> {
    let num_employees = payload.employees.len();
    let employee_name_by_id: HashMap<&str, &str> = payload
        .employees
        .iter()
        .map(|employee| (employee.id.as_str(), employee.name.as_str()))
        .collect();

    let mut hard_require_by_shift: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); payload.shifts.len()];
    let mut hard_forbid_by_shift: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); payload.shifts.len()];
    let mut hard_require_by_employee: HashMap<&str, HashSet<usize>> = HashMap::new();

    for hard in &payload.constraints.hard {
        for shift_idx in find_matching_shift_ids(&payload.shifts, &hard.filter) {
            match hard.kind {
                HardConstraintType::RequireShift => {
                    hard_require_by_shift[shift_idx].insert(hard.employee_id.as_str());
                    hard_require_by_employee
                        .entry(hard.employee_id.as_str())
                        .or_default()
                        .insert(shift_idx);
                }
                HardConstraintType::ForbidShift => {
                    hard_forbid_by_shift[shift_idx].insert(hard.employee_id.as_str());
                }
            }
        }
    }

    let mut reasons: Vec<InfeasibilityReason> = Vec::new();

    for (shift_idx, shift) in payload.shifts.iter().enumerate() {
        let required_ids = &hard_require_by_shift[shift_idx];
        let forbidden_ids = &hard_forbid_by_shift[shift_idx];

        let overlap: Vec<&str> = required_ids.intersection(forbidden_ids).copied().collect();
        if !overlap.is_empty() {
            let overlap_names = overlap
                .iter()
                .map(|id| *employee_name_by_id.get(id).unwrap_or(id))
                .collect::<Vec<_>>()
                .join(", ");
            reasons.push(InfeasibilityReason {
                code: "hard_conflict_required_and_forbidden",
                message: format!(
                    "{}: same employee(s) are both required and forbidden ({overlap_names}).",
                    shift_label(shift)
                ),
                data: Some(ReasonData::RequiredAndForbidden {
                    shift: shift_to_meta(shift),
                    employee_names: overlap_names,
                }),
            });
        }

        if required_ids.len() > shift.required as usize {
            reasons.push(InfeasibilityReason {
                code: "hard_required_exceeds_shift_coverage",
                message: format!(
                    "{}: {} hard-required employee(s) exceed required coverage {}.",
                    shift_label(shift),
                    required_ids.len(),
                    shift.required
                ),
                data: Some(ReasonData::RequiredExceedsCoverage {
                    shift: shift_to_meta(shift),
                    hard_required_count: required_ids.len(),
                    required_coverage: shift.required,
                }),
            });
        }

        let available_employees = num_employees as i64 - forbidden_ids.len() as i64;
        if i64::from(shift.required) > available_employees {
            reasons.push(InfeasibilityReason {
                code: "coverage_exceeds_available_after_forbids",
                message: format!(
                    "{}: required coverage {} exceeds available employees {available_employees} after forbids.",
                    shift_label(shift),
                    shift.required
                ),
                data: Some(ReasonData::CoverageExceedsAvailable {
                    shift: shift_to_meta(shift),
                    required_coverage: shift.required,
                    available_employees,
                }),
            });
        }
    }

    if payload.feature_toggles.max_worktime_in_row_enabled {
        for window in violating_windows {
            let window_required: i64 = window
                .iter()
                .map(|&shift_idx| i64::from(payload.shifts[shift_idx].required))
                .sum();
            let window_capacity = num_employees as i64 * (window.len() as i64 - 1);
            if window_required > window_capacity {
                let preview = window_preview(payload, window);
                reasons.push(InfeasibilityReason {
                    code: "max_worktime_window_capacity_conflict",
                    message: format!(
                        "Max-worktime window [{preview}] needs {window_required} assignments, but rule allows at most {window_capacity}.",
                    ),
                    data: Some(ReasonData::WindowCapacity {
                        window_preview: preview,
                        required_assignments: window_required,
                        allowed_assignments: window_capacity,
                    }),
                });
            }

            for employee in &payload.employees {
                let required_count = window
                    .iter()
                    .filter(|&&shift_idx| {
                        hard_require_by_employee
                            .get(employee.id.as_str())
                            .is_some_and(|shift_ids| shift_ids.contains(&shift_idx))
                    })
                    .count();
                if required_count > window.len() - 1 {
                    let preview = window_preview(payload, window);
                    reasons.push(InfeasibilityReason {
                        code: "max_worktime_window_employee_overrequired",
                        message: format!(
                            "{} is hard-required on {required_count} shifts inside max-worktime window [{preview}], exceeding allowed {}.",
                            employee.name,
                            window.len() - 1
                        ),
                        data: Some(ReasonData::WindowOverrequired {
                            employee_id: employee.id.clone(),
                            employee_name: employee.name.clone(),
                            hard_required_count: required_count,
                            allowed_assignments: window.len() - 1,
                            window_preview: preview,
                        }),
                    });
                }
            }
        }
    }

    // When the hard rest rule is on, point directly at "require" constraints
    // that force a qualifying chain plus a follow-up shift with less than
    // the configured minimum rest.
    if payload.feature_toggles.min_rest_after_shift_hard_enabled {
        let min_rest_hard_hours = payload.feature_toggles.min_rest_after_shift_hard_hours;
        let min_rest_hard_minutes = i64::from(min_rest_hard_hours) * 60;
        let max_chain_minutes = i64::from(payload.feature_toggles.max_worktime_in_row_hours) * 60;
        let minimal_chain_by_left =
            build_minimal_qualifying_chain_by_left(timeline, max_chain_minutes);

        let mut short_rest_by_left: HashMap<usize, Vec<(usize, i64)>> = HashMap::new();
        for left_idx in 0..payload.shifts.len() {
            let left_end = timeline.end_abs[left_idx];
            for right_idx in 0..payload.shifts.len() {
                if left_idx == right_idx {
                    continue;
                }
                let rest_minutes = timeline.start_abs[right_idx] - left_end;
                if (0..min_rest_hard_minutes).contains(&rest_minutes) {
                    short_rest_by_left
                        .entry(left_idx)
                        .or_default()
                        .push((right_idx, rest_minutes));
                }
            }
        }

        for employee in &payload.employees {
            let Some(required_shift_ids) = hard_require_by_employee.get(employee.id.as_str())
            else {
                continue;
            };

            for (left_idx, minimal_chain) in &minimal_chain_by_left {
                let Some(short_rest_targets) = short_rest_by_left.get(left_idx) else {
                    continue;
                };
                let forced_chain = minimal_chain
                    .iter()
                    .all(|shift_idx| required_shift_ids.contains(shift_idx));
                if !forced_chain {
                    continue;
                }

                for &(right_idx, rest_minutes) in short_rest_targets {
                    if !required_shift_ids.contains(&right_idx) {
                        continue;
                    }
                    let left_shift = &payload.shifts[*left_idx];
                    let right_shift = &payload.shifts[right_idx];
                    let rest_hours = (rest_minutes as f64 / 60.0 * 10.0).round() / 10.0;
                    reasons.push(InfeasibilityReason {
                        code: "hard_min_rest_conflict_on_required_chain",
                        message: format!(
                            "{} is hard-required on {} and {} with only {rest_hours:.1}h rest (< {min_rest_hard_hours}h hard minimum).",
                            employee.name,
                            shift_label(left_shift),
                            shift_label(right_shift)
                        ),
                        data: Some(ReasonData::RestConflict {
                            employee_id: employee.id.clone(),
                            employee_name: employee.name.clone(),
                            left_shift: shift_to_meta(left_shift),
                            right_shift: shift_to_meta(right_shift),
                            rest_hours,
                            min_rest_hours: min_rest_hard_hours,
                        }),
                    });
                }
            }
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<InfeasibilityReason> = Vec::new();
    for reason in reasons {
        // Field order is fixed by the types, so equal content means an
        // equal encoding.
        let Ok(key) = serde_json::to_string(&reason) else {
            continue;
        };
        if seen.insert(key) {
            unique.push(reason);
        }
        if unique.len() == MAX_REASONS {
            break;
        }
    }

    if unique.is_empty() {
        return vec![InfeasibilityReason {
            code: "infeasibility_quick_analysis_inconclusive",
            message: "No direct contradiction was isolated by quick analysis; infeasibility is \
                      likely caused by the combined effect of hard constraints and required coverage."
                .to_string(),
            data: None,
        }];
    }
    unique
}

fn window_preview(payload: &SolverRequest, window: &[usize]) -> String {
    let mut preview = window
        .iter()
        .take(3)
        .map(|&shift_idx| shift_label(&payload.shifts[shift_idx]))
        .collect::<Vec<_>>()
        .join(", ");
    if window.len() > 3 {
        preview.push_str(&format!(", ... ({} shifts)", window.len()));
    }
    preview
}
