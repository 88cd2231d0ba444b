//! CP-SAT-style integer model and solver.
//!
//! The engine builds against this backend contract: boolean and
//! bounded-integer variables, linear equality/inequality constraints,
//! min/max/floor-division equalities, a linear maximization objective,
//! `max_time_in_seconds`/`num_search_workers` parameter knobs, and value
//! readback by variable handle.
//!
//! The solver is a depth-first branch-and-bound with bounds-consistency
//! propagation: smallest-domain-first variable selection, objective-guided
//! value order, and an admissible objective bound for pruning. Search is
//! single-threaded and deterministic; `num_search_workers` is recorded as an
//! upper bound on backend-owned parallelism. `Optimal` means the search
//! space was exhausted within the time limit; hitting the limit downgrades
//! the result to `Feasible` (solution in hand) or `Unknown`.

use std::time::{Duration, Instant};

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntVar(usize);

/// Integer-coefficient linear expression `Σ coefficient·var + constant`.
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<(IntVar, i64)>,
    constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(var: IntVar, coefficient: i64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0,
        }
    }

    pub fn sum(vars: impl IntoIterator<Item = IntVar>) -> Self {
        Self {
            terms: vars.into_iter().map(|var| (var, 1)).collect(),
            constant: 0,
        }
    }

    pub fn add_term(&mut self, var: IntVar, coefficient: i64) -> &mut Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn add_constant(&mut self, constant: i64) -> &mut Self {
        self.constant += constant;
        self
    }
}

#[derive(Debug, Clone)]
struct LinearConstraint {
    terms: Vec<(IntVar, i64)>,
    lb: i64,
    ub: i64,
}

#[derive(Debug, Clone)]
enum FuncConstraint {
    Min { target: IntVar, vars: Vec<IntVar> },
    Max { target: IntVar, vars: Vec<IntVar> },
    Div { target: IntVar, numerator: IntVar, divisor: i64 },
}

/// Constraint model under construction.
#[derive(Debug, Default)]
pub struct CpModel {
    domains: Vec<(i64, i64)>,
    linears: Vec<LinearConstraint>,
    funcs: Vec<FuncConstraint>,
    objective: Option<LinearExpr>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool_var(&mut self) -> IntVar {
        self.new_int_var(0, 1)
    }

    pub fn new_int_var(&mut self, lb: i64, ub: i64) -> IntVar {
        self.domains.push((lb, ub));
        IntVar(self.domains.len() - 1)
    }

    fn add_linear(&mut self, expr: LinearExpr, lb: i64, ub: i64) {
        self.linears.push(LinearConstraint {
            terms: expr.terms,
            lb: lb.saturating_sub(expr.constant),
            ub: ub.saturating_sub(expr.constant),
        });
    }

    pub fn add_eq(&mut self, expr: LinearExpr, value: i64) {
        self.add_linear(expr, value, value);
    }

    pub fn add_le(&mut self, expr: LinearExpr, value: i64) {
        self.add_linear(expr, i64::MIN / 4, value);
    }

    pub fn add_ge(&mut self, expr: LinearExpr, value: i64) {
        self.add_linear(expr, value, i64::MAX / 4);
    }

    /// `target == min(vars)`.
    pub fn add_min_equality(&mut self, target: IntVar, vars: impl IntoIterator<Item = IntVar>) {
        self.funcs.push(FuncConstraint::Min {
            target,
            vars: vars.into_iter().collect(),
        });
    }

    /// `target == max(vars)`.
    pub fn add_max_equality(&mut self, target: IntVar, vars: impl IntoIterator<Item = IntVar>) {
        self.funcs.push(FuncConstraint::Max {
            target,
            vars: vars.into_iter().collect(),
        });
    }

    /// `target == numerator / divisor` (floor division, positive divisor).
    pub fn add_division_equality(&mut self, target: IntVar, numerator: IntVar, divisor: i64) {
        self.funcs.push(FuncConstraint::Div {
            target,
            numerator,
            divisor,
        });
    }

    pub fn maximize(&mut self, expr: LinearExpr) {
        self.objective = Some(expr);
    }

    fn is_valid(&self) -> bool {
        if self.domains.iter().any(|(lb, ub)| lb > ub) {
            return false;
        }
        self.funcs.iter().all(|func| match func {
            FuncConstraint::Min { vars, .. } | FuncConstraint::Max { vars, .. } => !vars.is_empty(),
            FuncConstraint::Div { divisor, .. } => *divisor > 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
    ModelInvalid,
}

#[derive(Debug, Clone, Copy)]
pub struct SolverParameters {
    pub max_time_in_seconds: f64,
    /// Upper bound on backend-owned search parallelism.
    pub num_search_workers: u32,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            max_time_in_seconds: f64::INFINITY,
            num_search_workers: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct CpSolver {
    pub parameters: SolverParameters,
    best_values: Option<Vec<i64>>,
    best_objective: i64,
}

impl CpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self, model: &CpModel) -> CpStatus {
        self.best_values = None;
        self.best_objective = 0;

        if !model.is_valid() {
            return CpStatus::ModelInvalid;
        }

        let deadline = if self.parameters.max_time_in_seconds.is_finite() {
            Instant::now().checked_add(Duration::from_secs_f64(
                self.parameters.max_time_in_seconds.max(0.0),
            ))
        } else {
            None
        };

        let mut search = Search {
            model,
            deadline,
            timed_out: false,
            best: None,
        };
        let lows: Vec<i64> = model.domains.iter().map(|(lb, _)| *lb).collect();
        let highs: Vec<i64> = model.domains.iter().map(|(_, ub)| *ub).collect();
        search.explore(lows, highs);

        let found = search.best.is_some();
        if let Some((values, objective)) = search.best {
            self.best_values = Some(values);
            self.best_objective = objective;
        }

        match (found, search.timed_out) {
            (true, false) => CpStatus::Optimal,
            (true, true) => CpStatus::Feasible,
            (false, false) => CpStatus::Infeasible,
            (false, true) => CpStatus::Unknown,
        }
    }

    /// Value of `var` in the best solution. Only meaningful after a solve
    /// that returned `Optimal` or `Feasible`; 0 otherwise.
    pub fn value(&self, var: IntVar) -> i64 {
        self.best_values
            .as_ref()
            .map(|values| values[var.0])
            .unwrap_or(0)
    }

    pub fn objective_value(&self) -> i64 {
        self.best_objective
    }
}

struct Search<'a> {
    model: &'a CpModel,
    deadline: Option<Instant>,
    timed_out: bool,
    best: Option<(Vec<i64>, i64)>,
}

impl Search<'_> {
    fn explore(&mut self, mut lows: Vec<i64>, mut highs: Vec<i64>) {
        if self.timed_out {
            return;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
                return;
            }
        }

        if !propagate(self.model, &mut lows, &mut highs) {
            return;
        }

        // Admissible bound: best completion of the objective under current
        // bounds. Equal-objective solutions never replace the incumbent, so
        // ties resolve deterministically to the first one found.
        if let (Some(objective), Some((_, best))) = (&self.model.objective, &self.best) {
            if objective_upper_bound(objective, &lows, &highs) <= *best {
                return;
            }
        }

        let branch_var = (0..lows.len())
            .filter(|&idx| lows[idx] < highs[idx])
            .min_by_key(|&idx| (highs[idx] - lows[idx], idx));

        let Some(var) = branch_var else {
            if final_check(self.model, &lows) {
                let objective = self
                    .model
                    .objective
                    .as_ref()
                    .map(|expr| evaluate(expr, &lows))
                    .unwrap_or(0);
                match &self.best {
                    Some((_, best)) if *best >= objective => {}
                    _ => self.best = Some((lows, objective)),
                }
            }
            return;
        };

        // Try the objective-improving bound first.
        let coefficient = self
            .model
            .objective
            .as_ref()
            .map(|expr| {
                expr.terms
                    .iter()
                    .filter(|(v, _)| v.0 == var)
                    .map(|(_, c)| *c)
                    .sum::<i64>()
            })
            .unwrap_or(0);
        let high_first = coefficient > 0;

        // First branch fixes the preferred bound; the second excludes it and
        // re-enters the search on the remaining domain.
        let mut child_lows = lows.clone();
        let mut child_highs = highs.clone();
        if high_first {
            child_lows[var] = highs[var];
        } else {
            child_highs[var] = lows[var];
        }
        self.explore(child_lows, child_highs);
        if self.timed_out {
            return;
        }
        // Feasibility-only search stops at the first solution; any solution
        // is optimal when there is no objective.
        if self.model.objective.is_none() && self.best.is_some() {
            return;
        }

        if high_first {
            highs[var] -= 1;
        } else {
            lows[var] += 1;
        }
        if lows[var] <= highs[var] {
            self.explore(lows, highs);
        }
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let quotient = a / b;
    if a % b != 0 && ((a % b < 0) != (b < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -floor_div(-a, b)
}

fn objective_upper_bound(expr: &LinearExpr, lows: &[i64], highs: &[i64]) -> i64 {
    let mut bound = expr.constant;
    for &(var, coefficient) in &expr.terms {
        bound += if coefficient > 0 {
            coefficient * highs[var.0]
        } else {
            coefficient * lows[var.0]
        };
    }
    bound
}

fn evaluate(expr: &LinearExpr, values: &[i64]) -> i64 {
    expr.constant
        + expr
            .terms
            .iter()
            .map(|&(var, coefficient)| coefficient * values[var.0])
            .sum::<i64>()
}

/// Bounds-consistency propagation to fixpoint. Returns false on a wipeout.
fn propagate(model: &CpModel, lows: &mut [i64], highs: &mut [i64]) -> bool {
    loop {
        let mut changed = false;

        for linear in &model.linears {
            let mut sum_min = 0i64;
            let mut sum_max = 0i64;
            for &(var, coefficient) in &linear.terms {
                if coefficient > 0 {
                    sum_min += coefficient * lows[var.0];
                    sum_max += coefficient * highs[var.0];
                } else {
                    sum_min += coefficient * highs[var.0];
                    sum_max += coefficient * lows[var.0];
                }
            }
            if sum_min > linear.ub || sum_max < linear.lb {
                return false;
            }

            for &(var, coefficient) in &linear.terms {
                let (term_min, term_max) = if coefficient > 0 {
                    (coefficient * lows[var.0], coefficient * highs[var.0])
                } else {
                    (coefficient * highs[var.0], coefficient * lows[var.0])
                };
                let rest_min = sum_min - term_min;
                let rest_max = sum_max - term_max;
                // rest_min + c·x ≤ ub and rest_max + c·x ≥ lb
                let (new_low, new_high) = if coefficient > 0 {
                    (
                        ceil_div(linear.lb - rest_max, coefficient),
                        floor_div(linear.ub - rest_min, coefficient),
                    )
                } else {
                    (
                        ceil_div(linear.ub - rest_min, coefficient),
                        floor_div(linear.lb - rest_max, coefficient),
                    )
                };
                if new_low > lows[var.0] {
                    lows[var.0] = new_low;
                    changed = true;
                }
                if new_high < highs[var.0] {
                    highs[var.0] = new_high;
                    changed = true;
                }
                if lows[var.0] > highs[var.0] {
                    return false;
                }
            }
        }

        for func in &model.funcs {
            match func {
                FuncConstraint::Min { target, vars } => {
                    let min_low = vars.iter().map(|v| lows[v.0]).min().unwrap_or(0);
                    let min_high = vars.iter().map(|v| highs[v.0]).min().unwrap_or(0);
                    if !tighten(*target, min_low, min_high, lows, highs, &mut changed) {
                        return false;
                    }
                    for var in vars {
                        let target_low = lows[target.0];
                        if !tighten(*var, target_low, highs[var.0], lows, highs, &mut changed) {
                            return false;
                        }
                    }
                }
                FuncConstraint::Max { target, vars } => {
                    let max_low = vars.iter().map(|v| lows[v.0]).max().unwrap_or(0);
                    let max_high = vars.iter().map(|v| highs[v.0]).max().unwrap_or(0);
                    if !tighten(*target, max_low, max_high, lows, highs, &mut changed) {
                        return false;
                    }
                    for var in vars {
                        let target_high = highs[target.0];
                        if !tighten(*var, lows[var.0], target_high, lows, highs, &mut changed) {
                            return false;
                        }
                    }
                }
                FuncConstraint::Div {
                    target,
                    numerator,
                    divisor,
                } => {
                    let target_low = floor_div(lows[numerator.0], *divisor);
                    let target_high = floor_div(highs[numerator.0], *divisor);
                    if !tighten(*target, target_low, target_high, lows, highs, &mut changed) {
                        return false;
                    }
                    let numerator_low = lows[target.0] * divisor;
                    let numerator_high = highs[target.0] * divisor + divisor - 1;
                    if !tighten(
                        *numerator,
                        numerator_low,
                        numerator_high,
                        lows,
                        highs,
                        &mut changed,
                    ) {
                        return false;
                    }
                }
            }
        }

        if !changed {
            return true;
        }
    }
}

/// Narrows `var` to `[low, high] ∩ current`. Returns false on wipeout.
fn tighten(
    var: IntVar,
    low: i64,
    high: i64,
    lows: &mut [i64],
    highs: &mut [i64],
    changed: &mut bool,
) -> bool {
    if low > lows[var.0] {
        lows[var.0] = low;
        *changed = true;
    }
    if high < highs[var.0] {
        highs[var.0] = high;
        *changed = true;
    }
    lows[var.0] <= highs[var.0]
}

fn final_check(model: &CpModel, values: &[i64]) -> bool {
    for linear in &model.linears {
        let sum: i64 = linear
            .terms
            .iter()
            .map(|&(var, coefficient)| coefficient * values[var.0])
            .sum();
        if sum < linear.lb || sum > linear.ub {
            return false;
        }
    }
    for func in &model.funcs {
        let holds = match func {
            FuncConstraint::Min { target, vars } => {
                vars.iter().map(|v| values[v.0]).min() == Some(values[target.0])
            }
            FuncConstraint::Max { target, vars } => {
                vars.iter().map(|v| values[v.0]).max() == Some(values[target.0])
            }
            FuncConstraint::Div {
                target,
                numerator,
                divisor,
            } => floor_div(values[numerator.0], *divisor) == values[target.0],
        };
        if !holds {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasibility_only_model_is_optimal() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        model.add_eq(LinearExpr::sum([a, b]), 1);

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        assert_eq!(solver.value(a) + solver.value(b), 1);
    }

    #[test]
    fn ge_and_constants_bound_from_below() {
        let mut model = CpModel::new();
        let x = model.new_int_var(0, 10);
        let mut expr = LinearExpr::term(x, 1);
        expr.add_constant(2);
        model.add_ge(expr, 7);
        let mut objective = LinearExpr::term(x, -1);
        objective.add_constant(1);
        model.maximize(objective);

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        assert_eq!(solver.value(x), 5);
        assert_eq!(solver.objective_value(), -4);
    }

    #[test]
    fn contradictory_bounds_are_infeasible() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        model.add_eq(LinearExpr::term(a, 1), 0);
        model.add_eq(LinearExpr::term(a, 1), 1);

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Infeasible);
    }

    #[test]
    fn maximize_picks_the_weighted_variable() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        model.add_eq(LinearExpr::sum([a, b]), 1);
        let mut objective = LinearExpr::new();
        objective.add_term(a, 3).add_term(b, 7);
        model.maximize(objective);

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        assert_eq!(solver.value(b), 1);
        assert_eq!(solver.objective_value(), 7);
    }

    #[test]
    fn negative_coefficients_prefer_inactivity() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        // Conjunction indicator: both == a ∧ b.
        let both = model.new_bool_var();
        let mut le_a = LinearExpr::term(both, 1);
        le_a.add_term(a, -1);
        model.add_le(le_a, 0);
        let mut le_b = LinearExpr::term(both, 1);
        le_b.add_term(b, -1);
        model.add_le(le_b, 0);
        let mut ge = LinearExpr::term(a, 1);
        ge.add_term(b, 1).add_term(both, -1);
        model.add_le(ge, 1);
        model.add_eq(LinearExpr::term(a, 1), 1);
        let mut objective = LinearExpr::term(b, 2);
        objective.add_term(both, -5);
        model.maximize(objective);

        // Taking b would earn 2 but cost 5 through the conjunction.
        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        assert_eq!(solver.value(b), 0);
        assert_eq!(solver.value(both), 0);
        assert_eq!(solver.objective_value(), 0);
    }

    #[test]
    fn min_max_division_equalities_propagate() {
        let mut model = CpModel::new();
        let x = model.new_int_var(0, 1000);
        let y = model.new_int_var(0, 1000);
        model.add_eq(LinearExpr::term(x, 1), 150);
        model.add_eq(LinearExpr::term(y, 1), 480);

        let x_hours = model.new_int_var(0, 100);
        let y_hours = model.new_int_var(0, 100);
        model.add_division_equality(x_hours, x, 60);
        model.add_division_equality(y_hours, y, 60);

        let min_h = model.new_int_var(0, 100);
        let max_h = model.new_int_var(0, 100);
        model.add_min_equality(min_h, [x_hours, y_hours]);
        model.add_max_equality(max_h, [x_hours, y_hours]);

        let mut span = LinearExpr::term(max_h, 1);
        span.add_term(min_h, -1);
        let span_var = model.new_int_var(0, 100);
        let mut span_eq = span;
        span_eq.add_term(span_var, -1);
        model.add_eq(span_eq, 0);

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        assert_eq!(solver.value(x_hours), 2);
        assert_eq!(solver.value(y_hours), 8);
        assert_eq!(solver.value(span_var), 6);
    }

    #[test]
    fn invalid_model_is_reported_not_solved() {
        let mut model = CpModel::new();
        let x = model.new_int_var(5, 3);
        let _ = x;
        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::ModelInvalid);

        let mut model = CpModel::new();
        let t = model.new_int_var(0, 10);
        let n = model.new_int_var(0, 10);
        model.add_division_equality(t, n, 0);
        assert_eq!(solver.solve(&model), CpStatus::ModelInvalid);
    }

    #[test]
    fn time_limit_zero_reports_unknown() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        model.add_eq(LinearExpr::term(a, 1), 1);
        let mut solver = CpSolver::new();
        solver.parameters.max_time_in_seconds = 0.0;
        assert_eq!(solver.solve(&model), CpStatus::Unknown);
    }

    #[test]
    fn chain_capacity_bound_blocks_full_window() {
        // Two employees, three shifts, window capacity 2 per employee.
        let mut model = CpModel::new();
        let mut assign = Vec::new();
        for _ in 0..2 {
            let row: Vec<IntVar> = (0..3).map(|_| model.new_bool_var()).collect();
            model.add_le(LinearExpr::sum(row.iter().copied()), 2);
            assign.push(row);
        }
        for shift in 0..3 {
            model.add_eq(
                LinearExpr::sum(assign.iter().map(|row| row[shift])),
                1,
            );
        }

        let mut solver = CpSolver::new();
        assert_eq!(solver.solve(&model), CpStatus::Optimal);
        for row in &assign {
            let count: i64 = row.iter().map(|&v| solver.value(v)).sum();
            assert!(count <= 2);
        }
    }
}
