//! CP-SAT model construction for one solve request.
//!
//! Decision variables are assignment booleans `x[employee][shift]`. Coverage
//! is a hard equality; everything soft is collected as objective-term
//! descriptors so the response builder can explain each contribution after
//! the solve.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use crate::chains::{build_minimal_qualifying_chain_by_left, compute_max_worktime_violating_windows};
use crate::cpsat::{CpModel, IntVar, LinearExpr};
use crate::domain::{SoftConstraintType, SolverRequest};
use crate::dto::{ShiftMeta, Warning};
use crate::error::SolveError;
use crate::logging::{log_event, Level};
use crate::shifts::{find_matching_shift_ids, shift_to_meta, ShiftTimeline};

/// One maximized objective term: `coefficient · var`, plus what it explains.
#[derive(Debug, Clone)]
pub struct ObjectiveTerm {
    pub var: IntVar,
    pub coefficient: i64,
    pub kind: ObjectiveTermKind,
}

#[derive(Debug, Clone)]
pub enum ObjectiveTermKind {
    UserSoftShift {
        constraint_type: SoftConstraintType,
        employee_id: String,
        employee_name: String,
        weight: i64,
        shift: ShiftMeta,
    },
    RestPair {
        employee_id: String,
        employee_name: String,
        weight: i64,
        rest_minutes: i64,
        required_rest_minutes: i64,
        left_shift: ShiftMeta,
        right_shift: ShiftMeta,
    },
    BalanceSpan {
        weight: i64,
        allowed_span_hours: i64,
        span_multiplier: f64,
        average_shift_duration_minutes: f64,
        vars: BalanceVars,
    },
}

/// Handles needed to read the balance aggregates back out of a solution.
#[derive(Debug, Clone, Copy)]
pub struct BalanceVars {
    pub min_hours: IntVar,
    pub max_hours: IntVar,
    pub span: IntVar,
}

#[derive(Debug)]
pub struct BuiltModel {
    pub model: CpModel,
    /// `assign[employee][shift]` booleans, both in input order.
    pub assign: Vec<Vec<IntVar>>,
    pub objective_terms: Vec<ObjectiveTerm>,
    pub warnings: Vec<Warning>,
    pub enabled_feature_toggles: Vec<&'static str>,
    pub violating_windows: Vec<Vec<usize>>,
}

pub fn build_model(
    payload: &SolverRequest,
    timeline: &ShiftTimeline,
    request_id: &str,
) -> Result<BuiltModel, SolveError> {
    let num_employees = payload.employees.len();
    let num_shifts = payload.shifts.len();
    let employee_idx_by_id: HashMap<&str, usize> = payload
        .employees
        .iter()
        .enumerate()
        .map(|(idx, employee)| (employee.id.as_str(), idx))
        .collect();

    let mut model = CpModel::new();
    let assign = build_assignment_variables(&mut model, num_employees, num_shifts);
    add_shift_coverage_constraints(&mut model, &assign, payload);

    let violating_windows = apply_max_worktime_constraints(payload, timeline, &mut model, &assign);

    let mut warnings = Vec::new();
    let mut objective_terms = Vec::new();

    apply_hard_constraints(
        payload,
        &mut model,
        &assign,
        &employee_idx_by_id,
        &mut warnings,
        request_id,
    )?;
    apply_user_soft_constraints(
        payload,
        &assign,
        &employee_idx_by_id,
        &mut objective_terms,
        &mut warnings,
        request_id,
    )?;
    apply_min_rest_constraints(payload, timeline, &mut model, &assign, &mut objective_terms);
    apply_balance_worked_hours_constraint(
        payload,
        timeline,
        &mut model,
        &assign,
        &mut objective_terms,
    );
    apply_objective(&mut model, &objective_terms);

    Ok(BuiltModel {
        model,
        assign,
        objective_terms,
        warnings,
        enabled_feature_toggles: collect_enabled_feature_toggles(payload),
        violating_windows,
    })
}

pub fn collect_enabled_feature_toggles(payload: &SolverRequest) -> Vec<&'static str> {
    let toggles = &payload.feature_toggles;
    let mut enabled = Vec::new();
    if toggles.max_worktime_in_row_enabled {
        enabled.push("max_worktime_in_row");
    }
    if toggles.min_rest_after_shift_hard_enabled {
        enabled.push("min_rest_after_shift_hard");
    }
    if toggles.min_rest_after_shift_soft_enabled {
        enabled.push("min_rest_after_shift_soft");
    }
    if toggles.balance_worked_hours {
        enabled.push("balance_worked_hours");
    }
    enabled
}

fn build_assignment_variables(
    model: &mut CpModel,
    num_employees: usize,
    num_shifts: usize,
) -> Vec<Vec<IntVar>> {
    (0..num_employees)
        .map(|_| (0..num_shifts).map(|_| model.new_bool_var()).collect())
        .collect()
}

/// Coverage is a hard equality, not an objective: the solver only ever looks
/// at schedules where every shift has exactly its required headcount, and
/// preferences pick among those.
fn add_shift_coverage_constraints(model: &mut CpModel, assign: &[Vec<IntVar>], payload: &SolverRequest) {
    for (shift_idx, shift) in payload.shifts.iter().enumerate() {
        model.add_eq(
            LinearExpr::sum(assign.iter().map(|row| row[shift_idx])),
            i64::from(shift.required),
        );
    }
}

/// The max-worktime rule caps chains of back-to-back shifts, not single
/// shifts: within every violating window each employee must sit out at least
/// one shift.
fn apply_max_worktime_constraints(
    payload: &SolverRequest,
    timeline: &ShiftTimeline,
    model: &mut CpModel,
    assign: &[Vec<IntVar>],
) -> Vec<Vec<usize>> {
    if !payload.feature_toggles.max_worktime_in_row_enabled {
        return Vec::new();
    }

    let max_worktime_minutes = i64::from(payload.feature_toggles.max_worktime_in_row_hours) * 60;
    let violating_windows = compute_max_worktime_violating_windows(timeline, max_worktime_minutes);

    for row in assign {
        for window in &violating_windows {
            model.add_le(
                LinearExpr::sum(window.iter().map(|&shift_idx| row[shift_idx])),
                window.len() as i64 - 1,
            );
        }
    }

    violating_windows
}

fn apply_hard_constraints(
    payload: &SolverRequest,
    model: &mut CpModel,
    assign: &[Vec<IntVar>],
    employee_idx_by_id: &HashMap<&str, usize>,
    warnings: &mut Vec<Warning>,
    request_id: &str,
) -> Result<(), SolveError> {
    for hard in &payload.constraints.hard {
        let Some(&employee_idx) = employee_idx_by_id.get(hard.employee_id.as_str()) else {
            log_event(
                Level::Warn,
                "solve.request.rejected",
                &[
                    ("request_id", json!(request_id)),
                    ("reason", json!("hard_constraint_unknown_employee")),
                    ("employee_id", json!(hard.employee_id)),
                ],
            );
            return Err(SolveError::InvalidRequest(format!(
                "Hard constraint references unknown employee_id '{}'.",
                hard.employee_id
            )));
        };

        let matching_shift_ids = find_matching_shift_ids(&payload.shifts, &hard.filter);
        if matching_shift_ids.is_empty() {
            warnings.push(Warning {
                code: "no_matching_shift_for_hard_constraint",
                constraint_type: hard.kind.as_str(),
                employee_id: hard.employee_id.clone(),
            });
            continue;
        }

        for shift_idx in matching_shift_ids {
            let var = assign[employee_idx][shift_idx];
            match hard.kind {
                crate::domain::HardConstraintType::ForbidShift => {
                    model.add_eq(LinearExpr::term(var, 1), 0)
                }
                crate::domain::HardConstraintType::RequireShift => {
                    model.add_eq(LinearExpr::term(var, 1), 1)
                }
            }
        }
    }
    Ok(())
}

fn apply_user_soft_constraints(
    payload: &SolverRequest,
    assign: &[Vec<IntVar>],
    employee_idx_by_id: &HashMap<&str, usize>,
    objective_terms: &mut Vec<ObjectiveTerm>,
    warnings: &mut Vec<Warning>,
    request_id: &str,
) -> Result<(), SolveError> {
    for soft in &payload.constraints.soft {
        let Some(&employee_idx) = employee_idx_by_id.get(soft.employee_id.as_str()) else {
            log_event(
                Level::Warn,
                "solve.request.rejected",
                &[
                    ("request_id", json!(request_id)),
                    ("reason", json!("soft_constraint_unknown_employee")),
                    ("employee_id", json!(soft.employee_id)),
                ],
            );
            return Err(SolveError::InvalidRequest(format!(
                "Soft constraint references unknown employee_id '{}'.",
                soft.employee_id
            )));
        };

        let matching_shift_ids = find_matching_shift_ids(&payload.shifts, &soft.filter);
        if matching_shift_ids.is_empty() {
            warnings.push(Warning {
                code: "no_matching_shift_for_soft_constraint",
                constraint_type: soft.kind.as_str(),
                employee_id: soft.employee_id.clone(),
            });
            continue;
        }

        let weight = i64::from(soft.weight);
        let coefficient = match soft.kind {
            SoftConstraintType::PreferAssignment => weight,
            SoftConstraintType::AvoidAssignment => -weight,
        };
        let employee = &payload.employees[employee_idx];
        for shift_idx in matching_shift_ids {
            objective_terms.push(ObjectiveTerm {
                var: assign[employee_idx][shift_idx],
                coefficient,
                kind: ObjectiveTermKind::UserSoftShift {
                    constraint_type: soft.kind,
                    employee_id: employee.id.clone(),
                    employee_name: employee.name.clone(),
                    weight,
                    shift: shift_to_meta(&payload.shifts[shift_idx]),
                },
            });
        }
    }
    Ok(())
}

/// Minimum-rest rules fire only once an employee has reached the
/// max-worktime threshold on the chain ending at the left shift. The hard
/// variant forbids the follow-up shift outright; the soft variant keeps it
/// legal but penalized.
fn apply_min_rest_constraints(
    payload: &SolverRequest,
    timeline: &ShiftTimeline,
    model: &mut CpModel,
    assign: &[Vec<IntVar>],
    objective_terms: &mut Vec<ObjectiveTerm>,
) {
    let toggles = &payload.feature_toggles;
    if !(toggles.min_rest_after_shift_hard_enabled || toggles.min_rest_after_shift_soft_enabled) {
        return;
    }

    let num_shifts = payload.shifts.len();
    let min_hard_rest_minutes = i64::from(toggles.min_rest_after_shift_hard_hours) * 60;
    let min_soft_rest_minutes = i64::from(toggles.min_rest_after_shift_soft_hours) * 60;
    let penalty_weight = i64::from(toggles.min_rest_after_shift_soft_weight);
    let max_chain_minutes = i64::from(toggles.max_worktime_in_row_hours) * 60;

    let minimal_chain_by_left = build_minimal_qualifying_chain_by_left(timeline, max_chain_minutes);

    let mut hard_pairs: Vec<(usize, usize)> = Vec::new();
    let mut soft_pairs: Vec<(usize, usize, i64)> = Vec::new();
    for left_idx in 0..num_shifts {
        let left_end = timeline.end_abs[left_idx];
        for right_idx in 0..num_shifts {
            if left_idx == right_idx {
                continue;
            }
            let rest_minutes = timeline.start_abs[right_idx] - left_end;
            if rest_minutes < 0 {
                continue;
            }
            if toggles.min_rest_after_shift_hard_enabled && rest_minutes < min_hard_rest_minutes {
                hard_pairs.push((left_idx, right_idx));
            }
            if toggles.min_rest_after_shift_soft_enabled && rest_minutes < min_soft_rest_minutes {
                soft_pairs.push((left_idx, right_idx, rest_minutes));
            }
        }
    }

    for (employee_idx, employee) in payload.employees.iter().enumerate() {
        let row = &assign[employee_idx];

        // reached[left] == AND over the minimal chain's assignment booleans,
        // reified with the two-inequality pattern.
        let mut reached_by_left: BTreeMap<usize, IntVar> = BTreeMap::new();
        for (&left_idx, minimal_chain) in &minimal_chain_by_left {
            let reached = model.new_bool_var();
            for &shift_idx in minimal_chain {
                let mut le = LinearExpr::term(reached, 1);
                le.add_term(row[shift_idx], -1);
                model.add_le(le, 0);
            }
            let mut ge = LinearExpr::sum(minimal_chain.iter().map(|&shift_idx| row[shift_idx]));
            ge.add_term(reached, -1);
            model.add_le(ge, minimal_chain.len() as i64 - 1);
            reached_by_left.insert(left_idx, reached);
        }

        for &(left_idx, right_idx) in &hard_pairs {
            let Some(&reached) = reached_by_left.get(&left_idx) else {
                continue;
            };
            let mut expr = LinearExpr::term(reached, 1);
            expr.add_term(row[right_idx], 1);
            model.add_le(expr, 1);
        }

        for &(left_idx, right_idx, rest_minutes) in &soft_pairs {
            let Some(&reached) = reached_by_left.get(&left_idx) else {
                continue;
            };

            let short_rest = model.new_bool_var();
            let mut le_reached = LinearExpr::term(short_rest, 1);
            le_reached.add_term(reached, -1);
            model.add_le(le_reached, 0);
            let mut le_right = LinearExpr::term(short_rest, 1);
            le_right.add_term(row[right_idx], -1);
            model.add_le(le_right, 0);
            let mut ge = LinearExpr::term(reached, 1);
            ge.add_term(row[right_idx], 1).add_term(short_rest, -1);
            model.add_le(ge, 1);

            objective_terms.push(ObjectiveTerm {
                var: short_rest,
                coefficient: -penalty_weight,
                kind: ObjectiveTermKind::RestPair {
                    employee_id: employee.id.clone(),
                    employee_name: employee.name.clone(),
                    weight: penalty_weight,
                    rest_minutes,
                    required_rest_minutes: min_soft_rest_minutes,
                    left_shift: shift_to_meta(&payload.shifts[left_idx]),
                    right_shift: shift_to_meta(&payload.shifts[right_idx]),
                },
            });
        }
    }
}

fn apply_balance_worked_hours_constraint(
    payload: &SolverRequest,
    timeline: &ShiftTimeline,
    model: &mut CpModel,
    assign: &[Vec<IntVar>],
    objective_terms: &mut Vec<ObjectiveTerm>,
) {
    let toggles = &payload.feature_toggles;
    if !toggles.balance_worked_hours {
        return;
    }

    let total_shift_minutes: i64 = timeline.durations.iter().sum();
    let max_hours_upper = ((total_shift_minutes + 59) / 60).max(1);

    let mut employee_work_hours = Vec::with_capacity(assign.len());
    for row in assign {
        let work_minutes = model.new_int_var(0, total_shift_minutes);
        let mut minutes_eq = LinearExpr::new();
        for (shift_idx, &var) in row.iter().enumerate() {
            minutes_eq.add_term(var, timeline.durations[shift_idx]);
        }
        minutes_eq.add_term(work_minutes, -1);
        model.add_eq(minutes_eq, 0);

        let work_hours = model.new_int_var(0, max_hours_upper);
        model.add_division_equality(work_hours, work_minutes, 60);
        employee_work_hours.push(work_hours);
    }

    let min_hours = model.new_int_var(0, max_hours_upper);
    let max_hours = model.new_int_var(0, max_hours_upper);
    model.add_min_equality(min_hours, employee_work_hours.iter().copied());
    model.add_max_equality(max_hours, employee_work_hours.iter().copied());

    let span = model.new_int_var(0, max_hours_upper);
    let mut span_eq = LinearExpr::term(max_hours, 1);
    span_eq.add_term(min_hours, -1).add_term(span, -1);
    model.add_eq(span_eq, 0);

    let average_shift_duration_minutes =
        total_shift_minutes as f64 / timeline.durations.len().max(1) as f64;
    let allowed_span_hours = ((average_shift_duration_minutes
        * toggles.balance_worked_hours_max_span_multiplier)
        / 60.0)
        .ceil() as i64;
    let allowed_span_hours = allowed_span_hours.min(max_hours_upper);

    let excess = model.new_int_var(0, max_hours_upper);
    let mut excess_ge = LinearExpr::term(span, 1);
    excess_ge.add_term(excess, -1);
    model.add_le(excess_ge, allowed_span_hours);

    let weight = i64::from(toggles.balance_worked_hours_weight);
    objective_terms.push(ObjectiveTerm {
        var: excess,
        coefficient: -weight,
        kind: ObjectiveTermKind::BalanceSpan {
            weight,
            allowed_span_hours,
            span_multiplier: toggles.balance_worked_hours_max_span_multiplier,
            average_shift_duration_minutes,
            vars: BalanceVars {
                min_hours,
                max_hours,
                span,
            },
        },
    });
}

fn apply_objective(model: &mut CpModel, objective_terms: &[ObjectiveTerm]) {
    if objective_terms.is_empty() {
        return;
    }
    let mut expr = LinearExpr::new();
    for term in objective_terms {
        expr.add_term(term.var, term.coefficient);
    }
    model.maximize(expr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Constraints, Employee, FeatureToggles, HardConstraint, HardConstraintType, Horizon, Shift,
        ShiftFilter, SoftConstraint,
    };

    fn employee(id: &str, name: &str) -> Employee {
        Employee {
            id: id.to_string(),
            name: name.to_string(),
            skills: vec![],
        }
    }

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

    fn request(shifts: Vec<Shift>) -> SolverRequest {
        SolverRequest {
            horizon: Horizon {
                start: "2025-01-06".to_string(),
                days: 7,
            },
            employees: vec![employee("e1", "Ana"), employee("e2", "Bogdan")],
            shifts,
            constraints: Constraints::default(),
            feature_toggles: FeatureToggles::default(),
        }
    }

    fn build(payload: &SolverRequest) -> BuiltModel {
        let timeline = ShiftTimeline::build(&payload.shifts, &payload.horizon.start).unwrap();
        build_model(payload, &timeline, "test").unwrap()
    }

    #[test]
    fn assignment_grid_matches_input_dimensions() {
        let built = build(&request(vec![
            shift("2025-01-06", "08:00", "16:00"),
            shift("2025-01-07", "08:00", "16:00"),
        ]));
        assert_eq!(built.assign.len(), 2);
        assert_eq!(built.assign[0].len(), 2);
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn unknown_employee_in_hard_constraint_rejects() {
        let mut payload = request(vec![shift("2025-01-06", "08:00", "16:00")]);
        payload.constraints.hard.push(HardConstraint {
            kind: HardConstraintType::RequireShift,
            employee_id: "ghost".to_string(),
            filter: ShiftFilter::default(),
        });
        let timeline = ShiftTimeline::build(&payload.shifts, &payload.horizon.start).unwrap();
        let err = build_model(&payload, &timeline, "test").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Hard constraint references unknown employee_id 'ghost'."
        );
    }

    #[test]
    fn zero_matching_filter_becomes_a_warning() {
        let mut payload = request(vec![shift("2025-01-06", "08:00", "16:00")]);
        payload.constraints.hard.push(HardConstraint {
            kind: HardConstraintType::ForbidShift,
            employee_id: "e1".to_string(),
            filter: ShiftFilter {
                date: Some("2030-01-01".to_string()),
                ..Default::default()
            },
        });
        payload.constraints.soft.push(SoftConstraint {
            kind: SoftConstraintType::PreferAssignment,
            employee_id: "e2".to_string(),
            filter: ShiftFilter {
                shift_type: Some("night".to_string()),
                ..Default::default()
            },
            weight: 3,
        });
        let built = build(&payload);
        assert_eq!(built.warnings.len(), 2);
        assert_eq!(built.warnings[0].code, "no_matching_shift_for_hard_constraint");
        assert_eq!(built.warnings[0].constraint_type, "forbid_shift");
        assert_eq!(built.warnings[1].code, "no_matching_shift_for_soft_constraint");
        assert!(built.objective_terms.is_empty());
    }

    #[test]
    fn enabled_toggles_follow_the_request() {
        let mut payload = request(vec![shift("2025-01-06", "08:00", "16:00")]);
        payload.feature_toggles.balance_worked_hours = true;
        payload.feature_toggles.min_rest_after_shift_hard_enabled = true;
        let built = build(&payload);
        assert_eq!(
            built.enabled_feature_toggles,
            vec![
                "max_worktime_in_row",
                "min_rest_after_shift_hard",
                "min_rest_after_shift_soft",
                "balance_worked_hours",
            ]
        );
    }

    #[test]
    fn soft_rest_terms_cover_qualifying_pairs_per_employee() {
        // Three 8h shifts, each reaching the 8h threshold on its own, with
        // rests of 0, 480 and 0 minutes between the ordered pairs. All three
        // pairs sit below the 10h soft minimum, for each of the 2 employees.
        let mut payload = request(vec![
            shift("2025-01-06", "08:00", "16:00"),
            shift("2025-01-06", "16:00", "00:00"),
            shift("2025-01-07", "00:00", "08:00"),
        ]);
        payload.feature_toggles.min_rest_after_shift_soft_enabled = true;
        let built = build(&payload);
        let rest_terms = built
            .objective_terms
            .iter()
            .filter(|term| matches!(term.kind, ObjectiveTermKind::RestPair { .. }))
            .count();
        assert_eq!(rest_terms, 6);
    }
}
