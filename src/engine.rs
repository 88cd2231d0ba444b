//! Solve orchestration: validation, timeline arrays, model build, solve,
//! then either the infeasibility analyzer or the response builder.

use std::time::Instant;

use serde_json::json;

use crate::constraints::build_model;
use crate::diagnostics::infer_infeasibility_reasons;
use crate::domain::SolverRequest;
use crate::dto::SolveResponse;
use crate::error::SolveError;
use crate::logging::{log_event, Level};
use crate::results::{build_feasible_response, build_infeasible_response};
use crate::shifts::ShiftTimeline;
use crate::solver;
use crate::validate::validate_solver_request;

/// Runs one solve end to end. `request_id` and `started_at` come from the
/// HTTP layer so log lines and elapsed times cover the whole request.
pub fn solve_schedule_request(
    payload: &SolverRequest,
    request_id: &str,
    started_at: Instant,
) -> Result<SolveResponse, SolveError> {
    let toggles = &payload.feature_toggles;
    log_event(
        Level::Info,
        "solve.request.start",
        &[
            ("request_id", json!(request_id)),
            ("horizon_start", json!(payload.horizon.start)),
            ("days", json!(payload.horizon.days)),
            ("employees", json!(payload.employees.len())),
            ("shifts", json!(payload.shifts.len())),
            ("hard", json!(payload.constraints.hard.len())),
            ("soft", json!(payload.constraints.soft.len())),
            ("max_worktime_enabled", json!(toggles.max_worktime_in_row_enabled)),
            ("max_worktime_hours", json!(toggles.max_worktime_in_row_hours)),
            (
                "min_rest_hard_enabled",
                json!(toggles.min_rest_after_shift_hard_enabled),
            ),
            (
                "min_rest_soft_enabled",
                json!(toggles.min_rest_after_shift_soft_enabled),
            ),
            ("balance_worked_hours", json!(toggles.balance_worked_hours)),
        ],
    );

    validate_solver_request(payload, request_id)?;
    let timeline = ShiftTimeline::build(&payload.shifts, &payload.horizon.start)?;
    let built = build_model(payload, &timeline, request_id)?;
    let run = solver::run(&built.model);

    if !run.has_solution() {
        let infeasibility_reasons =
            infer_infeasibility_reasons(payload, &timeline, &built.violating_windows);
        let warning_count = built.warnings.len();
        let response = build_infeasible_response(
            built.warnings,
            built.enabled_feature_toggles,
            infeasibility_reasons,
        );
        log_event(
            Level::Info,
            "solve.request.done",
            &[
                ("request_id", json!(request_id)),
                ("status", json!("infeasible")),
                ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
                ("warnings", json!(warning_count)),
            ],
        );
        return Ok(response);
    }

    let (response, total_assigned_slots) = build_feasible_response(payload, &run, &built);
    log_event(
        Level::Info,
        "solve.request.done",
        &[
            ("request_id", json!(request_id)),
            ("status", json!(response.status)),
            ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
            ("objective", json!(response.objective)),
            ("assigned_slots", json!(total_assigned_slots)),
            ("warnings", json!(response.warnings.len())),
            (
                "feature_toggles",
                json!(response.enabled_feature_toggles),
            ),
        ],
    );
    Ok(response)
}
