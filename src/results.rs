//! Response assembly after a solve.
//!
//! The objective breakdown explains why the solution scores what it scores:
//! every term is read back from the solver, classified, and summed into
//! reward/penalty points so the caller can surface unmet soft rules.

use std::collections::HashMap;

use crate::constraints::{BuiltModel, ObjectiveTermKind};
use crate::cpsat::CpStatus;
use crate::domain::{SoftConstraintType, SolverRequest};
use crate::dto::{
    AssignedEmployee, EmployeeLoad, InfeasibilityReason, ObjectiveBreakdown, ObjectiveItem,
    ObjectiveItemDetail, ShiftAssignment, SolveResponse, Warning,
};
use crate::solver::SolveRun;

pub fn build_infeasible_response(
    warnings: Vec<Warning>,
    enabled_feature_toggles: Vec<&'static str>,
    infeasibility_reasons: Vec<InfeasibilityReason>,
) -> SolveResponse {
    SolveResponse {
        status: "infeasible",
        objective: None,
        warnings,
        reason: Some("No feasible assignment satisfies current hard constraints and coverage."),
        reason_code: Some("infeasible_no_feasible_assignment"),
        infeasibility_reasons: Some(infeasibility_reasons),
        assignments: Vec::new(),
        employee_load: Vec::new(),
        enabled_feature_toggles,
        objective_breakdown: ObjectiveBreakdown::default(),
        unsatisfied_soft_constraints: Vec::new(),
    }
}

/// Builds the success response. Also returns the total assigned slot count
/// for the orchestrator's completion log line.
pub fn build_feasible_response(
    payload: &SolverRequest,
    run: &SolveRun,
    built: &BuiltModel,
) -> (SolveResponse, usize) {
    let (assignments, employee_load, total_assigned_slots) =
        build_assignments(payload, run, built);
    let (objective_breakdown, unsatisfied_soft_constraints) = build_objective_breakdown(run, built);

    let objective = if built.objective_terms.is_empty() {
        0
    } else {
        run.solver.objective_value()
    };

    let response = SolveResponse {
        status: if run.status == CpStatus::Optimal {
            "optimal"
        } else {
            "feasible"
        },
        objective: Some(objective),
        warnings: built.warnings.clone(),
        reason: None,
        reason_code: None,
        infeasibility_reasons: None,
        assignments,
        employee_load,
        enabled_feature_toggles: built.enabled_feature_toggles.clone(),
        objective_breakdown,
        unsatisfied_soft_constraints,
    };
    (response, total_assigned_slots)
}

fn build_assignments(
    payload: &SolverRequest,
    run: &SolveRun,
    built: &BuiltModel,
) -> (Vec<ShiftAssignment>, Vec<EmployeeLoad>, usize) {
    let mut load_by_employee: HashMap<&str, u32> = HashMap::new();
    let mut assignments = Vec::with_capacity(payload.shifts.len());

    for (shift_idx, shift) in payload.shifts.iter().enumerate() {
        let mut assigned = Vec::new();
        for (employee_idx, employee) in payload.employees.iter().enumerate() {
            if run.solver.value(built.assign[employee_idx][shift_idx]) == 1 {
                assigned.push(AssignedEmployee {
                    employee_id: employee.id.clone(),
                    employee_name: employee.name.clone(),
                });
                *load_by_employee.entry(employee.id.as_str()).or_default() += 1;
            }
        }
        assignments.push(ShiftAssignment {
            day: shift.day.clone(),
            date: shift.date.clone(),
            shift_type: shift.shift_type.clone(),
            start: shift.start.clone(),
            end: shift.end.clone(),
            required: shift.required,
            assigned,
        });
    }

    let employee_load = payload
        .employees
        .iter()
        .map(|employee| EmployeeLoad {
            employee_id: employee.id.clone(),
            employee_name: employee.name.clone(),
            assigned_count: load_by_employee
                .get(employee.id.as_str())
                .copied()
                .unwrap_or(0),
        })
        .collect();

    let total_assigned_slots = assignments
        .iter()
        .map(|assignment| assignment.assigned.len())
        .sum();
    (assignments, employee_load, total_assigned_slots)
}

fn build_objective_breakdown(
    run: &SolveRun,
    built: &BuiltModel,
) -> (ObjectiveBreakdown, Vec<ObjectiveItem>) {
    let mut items = Vec::with_capacity(built.objective_terms.len());
    let mut unsatisfied = Vec::new();
    let mut reward_points = 0i64;
    let mut penalty_points = 0i64;

    for term in &built.objective_terms {
        let value = run.solver.value(term.var);
        let active = value > 0;
        let contribution = term.coefficient * value;
        reward_points += contribution.max(0);
        penalty_points += contribution.min(0);

        let item = match &term.kind {
            ObjectiveTermKind::UserSoftShift {
                constraint_type,
                employee_id,
                employee_name,
                weight,
                shift,
            } => {
                let status = match constraint_type {
                    SoftConstraintType::PreferAssignment => {
                        if active {
                            "satisfied"
                        } else {
                            "unmet"
                        }
                    }
                    SoftConstraintType::AvoidAssignment => {
                        if active {
                            "violated"
                        } else {
                            "satisfied"
                        }
                    }
                };
                ObjectiveItem {
                    source: "user_soft_constraint",
                    constraint_type: constraint_type.as_str(),
                    employee_id: employee_id.clone(),
                    employee_name: employee_name.clone(),
                    weight: *weight,
                    status,
                    contribution,
                    active,
                    value,
                    detail: ObjectiveItemDetail::UserShift {
                        shift: shift.clone(),
                    },
                }
            }
            ObjectiveTermKind::RestPair {
                employee_id,
                employee_name,
                weight,
                rest_minutes,
                required_rest_minutes,
                left_shift,
                right_shift,
            } => ObjectiveItem {
                source: "feature_toggle",
                constraint_type: "min_rest_after_shift",
                employee_id: employee_id.clone(),
                employee_name: employee_name.clone(),
                weight: *weight,
                status: if active { "violated" } else { "satisfied" },
                contribution,
                active,
                value,
                detail: ObjectiveItemDetail::RestPair {
                    rest_minutes: *rest_minutes,
                    required_rest_minutes: *required_rest_minutes,
                    left_shift: left_shift.clone(),
                    right_shift: right_shift.clone(),
                },
            },
            ObjectiveTermKind::BalanceSpan {
                weight,
                allowed_span_hours,
                span_multiplier,
                average_shift_duration_minutes,
                vars,
            } => ObjectiveItem {
                source: "feature_toggle",
                constraint_type: "balance_worked_hours",
                employee_id: "all".to_string(),
                employee_name: "All employees".to_string(),
                weight: *weight,
                status: if active {
                    "over_allowed_span"
                } else {
                    "within_allowed_span"
                },
                contribution,
                active,
                value,
                detail: ObjectiveItemDetail::BalanceSpan {
                    excess_hours: value,
                    min_employee_hours: run.solver.value(vars.min_hours),
                    max_employee_hours: run.solver.value(vars.max_hours),
                    hours_span: run.solver.value(vars.span),
                    allowed_span_hours: *allowed_span_hours,
                    span_multiplier: *span_multiplier,
                    average_shift_duration_minutes: *average_shift_duration_minutes,
                },
            },
        };

        if item.is_unsatisfied() {
            unsatisfied.push(item.clone());
        }
        items.push(item);
    }

    let breakdown = ObjectiveBreakdown {
        reward_points,
        penalty_points,
        unsatisfied_count: unsatisfied.len(),
        items,
    };
    (breakdown, unsatisfied)
}
