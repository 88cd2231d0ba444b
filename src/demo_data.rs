//! Demo request generators.
//!
//! Deterministic (seeded) sample `SolverRequest`s for the demo endpoints and
//! the bench binary.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{
    Constraints, Employee, FeatureToggles, HardConstraint, HardConstraintType, Horizon, Shift,
    ShiftFilter, SoftConstraint, SoftConstraintType, SolverRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                employee_count: 4,
                days: 5,
                shift_templates: vec![("day", "08:00", "16:00"), ("night", "16:00", "00:00")],
                soft_constraint_count: 3,
                forbid_count: 1,
            },
            DemoData::Large => DemoDataParameters {
                employee_count: 6,
                days: 7,
                shift_templates: vec![
                    ("early", "00:00", "08:00"),
                    ("day", "08:00", "16:00"),
                    ("night", "16:00", "00:00"),
                ],
                soft_constraint_count: 6,
                forbid_count: 2,
            },
        }
    }
}

struct DemoDataParameters {
    employee_count: usize,
    days: u32,
    shift_templates: Vec<(&'static str, &'static str, &'static str)>,
    soft_constraint_count: usize,
    forbid_count: usize,
}

const EMPLOYEE_NAMES: &[&str] = &[
    "Amy Cole",
    "Beth Fox",
    "Chad Green",
    "Dan Jones",
    "Elsa Li",
    "Flo Hay",
    "Gus Poe",
    "Hugo Rye",
];

pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Generates a demo request for the given size. Same size, same request.
pub fn generate(demo: DemoData) -> SolverRequest {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let start_date = NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid demo start date");

    let employees: Vec<Employee> = (0..params.employee_count)
        .map(|idx| Employee {
            id: format!("e{}", idx + 1),
            name: EMPLOYEE_NAMES[idx % EMPLOYEE_NAMES.len()].to_string(),
            skills: vec![],
        })
        .collect();

    let mut shifts = Vec::new();
    for day_offset in 0..params.days {
        let date = start_date + Duration::days(i64::from(day_offset));
        for &(shift_type, start, end) in &params.shift_templates {
            // Day shifts occasionally need two people; never more than the
            // roster minus one so forbids stay satisfiable.
            let required = if shift_type == "day" && rng.gen_bool(0.5) {
                2
            } else {
                1
            };
            shifts.push(Shift {
                day: date.format("%a").to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                shift_type: shift_type.to_string(),
                start: start.to_string(),
                end: end.to_string(),
                required,
                source: Some("demo".to_string()),
            });
        }
    }

    let mut hard = Vec::new();
    for _ in 0..params.forbid_count {
        let employee = employees.choose(&mut rng).expect("employees not empty");
        let shift = shifts.choose(&mut rng).expect("shifts not empty");
        hard.push(HardConstraint {
            kind: HardConstraintType::ForbidShift,
            employee_id: employee.id.clone(),
            filter: ShiftFilter {
                date: Some(shift.date.clone()),
                shift_type: Some(shift.shift_type.clone()),
                ..Default::default()
            },
        });
    }

    let mut soft = Vec::new();
    for idx in 0..params.soft_constraint_count {
        let employee = employees.choose(&mut rng).expect("employees not empty");
        let shift = shifts.choose(&mut rng).expect("shifts not empty");
        let kind = if idx % 2 == 0 {
            SoftConstraintType::PreferAssignment
        } else {
            SoftConstraintType::AvoidAssignment
        };
        soft.push(SoftConstraint {
            kind,
            employee_id: employee.id.clone(),
            filter: ShiftFilter {
                date: Some(shift.date.clone()),
                shift_type: Some(shift.shift_type.clone()),
                ..Default::default()
            },
            weight: rng.gen_range(1..=10),
        });
    }

    SolverRequest {
        horizon: Horizon {
            start: start_date.format("%Y-%m-%d").to_string(),
            days: params.days,
        },
        employees,
        shifts,
        constraints: Constraints { hard, soft },
        feature_toggles: FeatureToggles::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_solver_request;

    #[test]
    fn demo_requests_are_valid_and_deterministic() {
        for demo in [DemoData::Small, DemoData::Large] {
            let first = generate(demo);
            assert!(validate_solver_request(&first, "demo").is_ok());
            let second = generate(demo);
            assert_eq!(
                serde_json::to_value(&first).unwrap(),
                serde_json::to_value(&second).unwrap()
            );
        }
    }

    #[test]
    fn small_demo_covers_every_day() {
        let request = generate(DemoData::Small);
        assert_eq!(request.shifts.len(), 5 * 2);
        assert!(request.shifts.iter().all(|shift| shift.required >= 1));
    }
}
