//! Request model for the shift-assignment solver.
//!
//! These types mirror the solver wire contract; all fields use the
//! `snake_case` names callers send. Range checks live in [`crate::validate`],
//! not here.

use serde::{Deserialize, Serialize};

/// Planning window; minute 0 of the engine's time axis is 00:00 of `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Horizon {
    /// ISO `YYYY-MM-DD` calendar date.
    pub start: String,
    /// Number of days covered, 1..=31.
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Part of the contract; currently unused by the engine.
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A dated interval requiring `required` employees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    /// Display label, e.g. a weekday name.
    pub day: String,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    /// Free-form tag such as "day" or "night".
    #[serde(rename = "type")]
    pub shift_type: String,
    /// `HH:MM`, 24-hour wall clock.
    pub start: String,
    /// `HH:MM`; an `end` at or before `start` wraps past midnight
    /// (equal means a full 24h).
    pub end: String,
    #[serde(default = "default_required")]
    pub required: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_required() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardConstraintType {
    ForbidShift,
    RequireShift,
}

impl HardConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardConstraintType::ForbidShift => "forbid_shift",
            HardConstraintType::RequireShift => "require_shift",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftConstraintType {
    PreferAssignment,
    AvoidAssignment,
}

impl SoftConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoftConstraintType::PreferAssignment => "prefer_assignment",
            SoftConstraintType::AvoidAssignment => "avoid_assignment",
        }
    }
}

/// Shift selector shared by hard and soft constraints. A `None` field is a
/// wildcard; a shift matches iff every provided field equals the shift's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardConstraint {
    #[serde(rename = "type")]
    pub kind: HardConstraintType,
    pub employee_id: String,
    #[serde(flatten)]
    pub filter: ShiftFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftConstraint {
    #[serde(rename = "type")]
    pub kind: SoftConstraintType,
    pub employee_id: String,
    #[serde(flatten)]
    pub filter: ShiftFilter,
    /// Objective contribution per matching (employee, shift) pair, 1..=10_000.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub hard: Vec<HardConstraint>,
    #[serde(default)]
    pub soft: Vec<SoftConstraint>,
}

/// Switches for the default regulatory-style rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureToggles {
    #[serde(default = "default_true")]
    pub max_worktime_in_row_enabled: bool,
    #[serde(default = "default_max_worktime_hours")]
    pub max_worktime_in_row_hours: u32,
    #[serde(default)]
    pub min_rest_after_shift_hard_enabled: bool,
    #[serde(default = "default_min_rest_hours")]
    pub min_rest_after_shift_hard_hours: u32,
    #[serde(default = "default_true")]
    pub min_rest_after_shift_soft_enabled: bool,
    #[serde(default = "default_min_rest_hours")]
    pub min_rest_after_shift_soft_hours: u32,
    #[serde(default = "default_min_rest_weight")]
    pub min_rest_after_shift_soft_weight: u32,
    #[serde(default)]
    pub balance_worked_hours: bool,
    #[serde(default = "default_balance_weight")]
    pub balance_worked_hours_weight: u32,
    #[serde(default = "default_span_multiplier")]
    pub balance_worked_hours_max_span_multiplier: f64,
}

fn default_true() -> bool {
    true
}

fn default_max_worktime_hours() -> u32 {
    8
}

fn default_min_rest_hours() -> u32 {
    10
}

fn default_min_rest_weight() -> u32 {
    5
}

fn default_balance_weight() -> u32 {
    2
}

fn default_span_multiplier() -> f64 {
    1.5
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            max_worktime_in_row_enabled: true,
            max_worktime_in_row_hours: default_max_worktime_hours(),
            min_rest_after_shift_hard_enabled: false,
            min_rest_after_shift_hard_hours: default_min_rest_hours(),
            min_rest_after_shift_soft_enabled: true,
            min_rest_after_shift_soft_hours: default_min_rest_hours(),
            min_rest_after_shift_soft_weight: default_min_rest_weight(),
            balance_worked_hours: false,
            balance_worked_hours_weight: default_balance_weight(),
            balance_worked_hours_max_span_multiplier: default_span_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverRequest {
    pub horizon: Horizon,
    pub employees: Vec<Employee>,
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub feature_toggles: FeatureToggles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_deserializes_with_defaults() {
        let json = r#"{
            "horizon": {"start": "2025-01-06", "days": 7},
            "employees": [{"id": "e1", "name": "Ana"}],
            "shifts": [{"day": "Mon", "date": "2025-01-06", "type": "day",
                        "start": "08:00", "end": "16:00"}]
        }"#;
        let req: SolverRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.shifts[0].required, 1);
        assert!(req.constraints.hard.is_empty());
        assert!(req.feature_toggles.max_worktime_in_row_enabled);
        assert!(!req.feature_toggles.min_rest_after_shift_hard_enabled);
        assert!(req.feature_toggles.min_rest_after_shift_soft_enabled);
        assert_eq!(req.feature_toggles.min_rest_after_shift_soft_weight, 5);
    }

    #[test]
    fn constraint_filters_flatten_on_the_wire() {
        let json = r#"{"type": "forbid_shift", "employee_id": "e1", "date": "2025-01-07"}"#;
        let hard: HardConstraint = serde_json::from_str(json).unwrap();
        assert_eq!(hard.kind, HardConstraintType::ForbidShift);
        assert_eq!(hard.filter.date.as_deref(), Some("2025-01-07"));
        assert!(hard.filter.day.is_none());
    }
}
