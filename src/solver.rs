//! Solver driver: fixed backend parameters and status interpretation.

use crate::cpsat::{CpModel, CpSolver, CpStatus};

/// Wall-clock budget per solve; part of the backend contract.
pub const MAX_TIME_IN_SECONDS: f64 = 10.0;
/// Upper bound on backend-owned search parallelism.
pub const NUM_SEARCH_WORKERS: u32 = 8;

pub struct SolveRun {
    pub solver: CpSolver,
    pub status: CpStatus,
}

impl SolveRun {
    /// Anything other than optimal/feasible is reported as infeasible to the
    /// caller; timeouts and unknowns share that response shape.
    pub fn has_solution(&self) -> bool {
        matches!(self.status, CpStatus::Optimal | CpStatus::Feasible)
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            CpStatus::Optimal => "optimal",
            CpStatus::Feasible => "feasible",
            _ => "infeasible",
        }
    }
}

pub fn run(model: &CpModel) -> SolveRun {
    let mut solver = CpSolver::new();
    solver.parameters.max_time_in_seconds = MAX_TIME_IN_SECONDS;
    solver.parameters.num_search_workers = NUM_SEARCH_WORKERS;
    let status = solver.solve(model);
    SolveRun { solver, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpsat::LinearExpr;

    #[test]
    fn driver_reports_solution_statuses() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        model.add_eq(LinearExpr::term(a, 1), 1);
        let run = run(&model);
        assert!(run.has_solution());
        assert_eq!(run.status_text(), "optimal");
        assert_eq!(run.solver.value(a), 1);
    }

    #[test]
    fn driver_maps_infeasible_to_text() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        model.add_eq(LinearExpr::term(a, 1), 0);
        model.add_eq(LinearExpr::term(a, 1), 1);
        let run = run(&model);
        assert!(!run.has_solution());
        assert_eq!(run.status_text(), "infeasible");
    }
}
