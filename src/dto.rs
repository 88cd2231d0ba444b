//! Response model for the solve endpoint.
//!
//! The objective breakdown and the infeasibility reasons are heterogeneous
//! records on the wire; both use a flattened tagged enum so the engine never
//! shuffles dynamic maps around.

use serde::Serialize;

/// Structured shift reference echoed in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftMeta {
    pub day: String,
    pub date: String,
    #[serde(rename = "type")]
    pub shift_type: String,
    pub start: String,
    pub end: String,
}

/// A well-formed constraint whose filter matched zero shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub constraint_type: &'static str,
    pub employee_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedEmployee {
    pub employee_id: String,
    pub employee_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShiftAssignment {
    pub day: String,
    pub date: String,
    #[serde(rename = "type")]
    pub shift_type: String,
    pub start: String,
    pub end: String,
    pub required: u32,
    pub assigned: Vec<AssignedEmployee>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeLoad {
    pub employee_id: String,
    pub employee_name: String,
    pub assigned_count: u32,
}

/// One solved objective term with its contribution accounting.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveItem {
    pub source: &'static str,
    pub constraint_type: &'static str,
    pub employee_id: String,
    pub employee_name: String,
    pub weight: i64,
    pub status: &'static str,
    pub contribution: i64,
    pub active: bool,
    pub value: i64,
    #[serde(flatten)]
    pub detail: ObjectiveItemDetail,
}

impl ObjectiveItem {
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self.status, "unmet" | "violated" | "over_allowed_span")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ObjectiveItemDetail {
    UserShift {
        shift: ShiftMeta,
    },
    RestPair {
        rest_minutes: i64,
        required_rest_minutes: i64,
        left_shift: ShiftMeta,
        right_shift: ShiftMeta,
    },
    BalanceSpan {
        excess_hours: i64,
        min_employee_hours: i64,
        max_employee_hours: i64,
        hours_span: i64,
        allowed_span_hours: i64,
        span_multiplier: f64,
        average_shift_duration_minutes: f64,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectiveBreakdown {
    pub reward_points: i64,
    pub penalty_points: i64,
    pub unsatisfied_count: usize,
    pub items: Vec<ObjectiveItem>,
}

/// Machine-readable infeasibility cause.
#[derive(Debug, Clone, Serialize)]
pub struct InfeasibilityReason {
    pub code: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<ReasonData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReasonData {
    RequiredAndForbidden {
        shift: ShiftMeta,
        employee_names: String,
    },
    RequiredExceedsCoverage {
        shift: ShiftMeta,
        hard_required_count: usize,
        required_coverage: u32,
    },
    CoverageExceedsAvailable {
        shift: ShiftMeta,
        required_coverage: u32,
        available_employees: i64,
    },
    WindowCapacity {
        window_preview: String,
        required_assignments: i64,
        allowed_assignments: i64,
    },
    WindowOverrequired {
        employee_id: String,
        employee_name: String,
        hard_required_count: usize,
        allowed_assignments: usize,
        window_preview: String,
    },
    RestConflict {
        employee_id: String,
        employee_name: String,
        left_shift: ShiftMeta,
        right_shift: ShiftMeta,
        rest_hours: f64,
        min_rest_hours: u32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveResponse {
    pub status: &'static str,
    pub objective: Option<i64>,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infeasibility_reasons: Option<Vec<InfeasibilityReason>>,
    pub assignments: Vec<ShiftAssignment>,
    pub employee_load: Vec<EmployeeLoad>,
    pub enabled_feature_toggles: Vec<&'static str>,
    pub objective_breakdown: ObjectiveBreakdown,
    pub unsatisfied_soft_constraints: Vec<ObjectiveItem>,
}
