//! Request validation (rejects with 422 semantics before any model is built).
//!
//! Everything after this module assumes the invariants checked here: at
//! least one employee and shift, unique employee ids, coverage within the
//! employee count, parseable dates and times, and all numeric fields inside
//! their contract ranges.

use std::collections::HashSet;

use serde_json::json;

use crate::domain::SolverRequest;
use crate::error::SolveError;
use crate::logging::{log_event, Level};
use crate::shifts::{date_ordinal, parse_minutes};

fn reject(request_id: &str, reason: &str, detail: String) -> SolveError {
    log_event(
        Level::Warn,
        "solve.request.rejected",
        &[("request_id", json!(request_id)), ("reason", json!(reason))],
    );
    SolveError::InvalidRequest(detail)
}

pub fn validate_solver_request(payload: &SolverRequest, request_id: &str) -> Result<(), SolveError> {
    if payload.employees.is_empty() {
        return Err(reject(
            request_id,
            "no_employees",
            "At least one employee is required.".to_string(),
        ));
    }

    if payload.shifts.is_empty() {
        return Err(reject(
            request_id,
            "no_shifts",
            "At least one shift is required.".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    if !payload.employees.iter().all(|e| seen_ids.insert(&e.id)) {
        return Err(reject(
            request_id,
            "duplicate_employee_ids",
            "Employee IDs must be unique.".to_string(),
        ));
    }

    if !(1..=31).contains(&payload.horizon.days) {
        return Err(reject(
            request_id,
            "horizon_days_out_of_range",
            "Horizon days must be between 1 and 31.".to_string(),
        ));
    }
    date_ordinal(&payload.horizon.start).map_err(|err| {
        reject(request_id, "invalid_horizon_start", err.to_string())
    })?;

    for shift in &payload.shifts {
        if u32::try_from(payload.employees.len())
            .map(|employees| shift.required > employees)
            .unwrap_or(false)
        {
            log_event(
                Level::Warn,
                "solve.request.rejected",
                &[
                    ("request_id", json!(request_id)),
                    ("reason", json!("required_exceeds_available_employees")),
                    ("shift_date", json!(shift.date)),
                    ("shift_type", json!(shift.shift_type)),
                    ("required", json!(shift.required)),
                    ("employees", json!(payload.employees.len())),
                ],
            );
            return Err(SolveError::InvalidRequest(format!(
                "Shift '{} {}' requires {} employees, but only {} are available.",
                shift.date,
                shift.shift_type,
                shift.required,
                payload.employees.len(),
            )));
        }

        if shift.required > 100 {
            return Err(reject(
                request_id,
                "required_out_of_range",
                format!(
                    "Shift '{} {}' required must be between 0 and 100.",
                    shift.date, shift.shift_type
                ),
            ));
        }

        let shift_context = |err: SolveError| {
            reject(
                request_id,
                "invalid_shift_fields",
                format!("Shift '{} {}': {}", shift.date, shift.shift_type, err),
            )
        };
        date_ordinal(&shift.date).map_err(shift_context)?;
        parse_minutes(&shift.start).map_err(shift_context)?;
        parse_minutes(&shift.end).map_err(shift_context)?;
    }

    for soft in &payload.constraints.soft {
        if !(1..=10_000).contains(&soft.weight) {
            return Err(reject(
                request_id,
                "soft_weight_out_of_range",
                format!(
                    "Soft constraint weight {} for employee_id '{}' must be between 1 and 10000.",
                    soft.weight, soft.employee_id
                ),
            ));
        }
    }

    let toggles = &payload.feature_toggles;
    let hour_fields = [
        ("max_worktime_in_row_hours", toggles.max_worktime_in_row_hours),
        (
            "min_rest_after_shift_hard_hours",
            toggles.min_rest_after_shift_hard_hours,
        ),
        (
            "min_rest_after_shift_soft_hours",
            toggles.min_rest_after_shift_soft_hours,
        ),
    ];
    for (name, hours) in hour_fields {
        if !(1..=24).contains(&hours) {
            return Err(reject(
                request_id,
                "feature_toggle_out_of_range",
                format!("{name} must be between 1 and 24."),
            ));
        }
    }
    let weight_fields = [
        (
            "min_rest_after_shift_soft_weight",
            toggles.min_rest_after_shift_soft_weight,
        ),
        (
            "balance_worked_hours_weight",
            toggles.balance_worked_hours_weight,
        ),
    ];
    for (name, weight) in weight_fields {
        if !(1..=100).contains(&weight) {
            return Err(reject(
                request_id,
                "feature_toggle_out_of_range",
                format!("{name} must be between 1 and 100."),
            ));
        }
    }
    let multiplier = toggles.balance_worked_hours_max_span_multiplier;
    if !(0.1..=10.0).contains(&multiplier) {
        return Err(reject(
            request_id,
            "feature_toggle_out_of_range",
            "balance_worked_hours_max_span_multiplier must be between 0.1 and 10.0.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraints, Employee, FeatureToggles, Horizon, Shift};

    fn base_request() -> SolverRequest {
        SolverRequest {
            horizon: Horizon {
                start: "2025-01-06".to_string(),
                days: 7,
            },
            employees: vec![
                Employee {
                    id: "e1".to_string(),
                    name: "Ana".to_string(),
                    skills: vec![],
                },
                Employee {
                    id: "e2".to_string(),
                    name: "Bogdan".to_string(),
                    skills: vec![],
                },
            ],
            shifts: vec![Shift {
                day: "Mon".to_string(),
                date: "2025-01-06".to_string(),
                shift_type: "day".to_string(),
                start: "08:00".to_string(),
                end: "16:00".to_string(),
                required: 1,
                source: None,
            }],
            constraints: Constraints::default(),
            feature_toggles: FeatureToggles::default(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_solver_request(&base_request(), "t").is_ok());
    }

    #[test]
    fn empty_employees_rejected() {
        let mut req = base_request();
        req.employees.clear();
        let err = validate_solver_request(&req, "t").unwrap_err();
        assert_eq!(err.to_string(), "At least one employee is required.");
    }

    #[test]
    fn empty_shifts_rejected() {
        let mut req = base_request();
        req.shifts.clear();
        let err = validate_solver_request(&req, "t").unwrap_err();
        assert_eq!(err.to_string(), "At least one shift is required.");
    }

    #[test]
    fn duplicate_employee_ids_rejected() {
        let mut req = base_request();
        req.employees[1].id = "e1".to_string();
        let err = validate_solver_request(&req, "t").unwrap_err();
        assert_eq!(err.to_string(), "Employee IDs must be unique.");
    }

    #[test]
    fn coverage_beyond_employee_count_rejected() {
        let mut req = base_request();
        req.shifts[0].required = 3;
        let err = validate_solver_request(&req, "t").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Shift '2025-01-06 day' requires 3 employees, but only 2 are available."
        );
    }

    #[test]
    fn malformed_shift_time_rejected() {
        let mut req = base_request();
        req.shifts[0].end = "25:00".to_string();
        assert!(validate_solver_request(&req, "t").is_err());
    }

    #[test]
    fn out_of_range_toggles_rejected() {
        let mut req = base_request();
        req.feature_toggles.max_worktime_in_row_hours = 0;
        assert!(validate_solver_request(&req, "t").is_err());

        let mut req = base_request();
        req.feature_toggles.balance_worked_hours_max_span_multiplier = 11.0;
        assert!(validate_solver_request(&req, "t").is_err());
    }
}
