use crate::model::{ConstraintId, Model, VarId};

use log::{debug, warn};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Outcome of the set covering search.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SolveStatus {
    /// The selection is the best one the search found within its node budget.
    Optimal,

    /// The search found nothing within its node budget and the selection was repaired
    /// from a select-everything start. Constraints are not re-checked after the repair.
    Feasible,

    /// No selection could be produced. The repair step currently never reports this.
    Infeasible,
}

/// Values of all variables of a model, as chosen by [`solve`].
#[derive(Clone, Debug)]
pub(crate) struct Solution {
    pub(crate) status: SolveStatus,
    pub(crate) values: Vec<bool>,
    pub(crate) objective: f64,
    pub(crate) nodes: u64,
}

impl Solution {
    pub(crate) fn value(&self, var: VarId) -> bool {
        self.values[var.0]
    }
}

// Slack for comparing accumulated objective bounds.
const BOUND_EPSILON: f64 = 1e-9;

struct BranchAndBound<'m> {
    model: &'m Model,
    constraints_by_var: Vec<Vec<ConstraintId>>,

    // Sum of the positive objective coefficients of variables `i..`.
    optimistic_suffix: Vec<f64>,

    node_budget: u64,
    nodes: u64,

    assignment: Vec<Option<bool>>,
    fixed_objective: f64,
    best: Option<(f64, Vec<bool>)>,
}

impl<'m> BranchAndBound<'m> {
    fn new(model: &'m Model, node_budget: u64) -> Self {
        let n = model.num_vars();
        let mut optimistic_suffix = vec![0.0; n + 1];
        for i in (0..n).rev() {
            optimistic_suffix[i] =
                optimistic_suffix[i + 1] + model.objective_coefficient(VarId(i)).max(0.0);
        }

        Self {
            model,
            constraints_by_var: model.constraints_by_var(),
            optimistic_suffix,
            node_budget,
            nodes: 0,
            assignment: vec![None; n],
            fixed_objective: 0.0,
            best: None,
        }
    }

    fn exhausted(&self) -> bool {
        self.nodes >= self.node_budget
    }

    fn root_is_consistent(&self) -> bool {
        self.model.constraints().iter().all(|constraint| {
            let (min, max) = constraint.bounds(&self.assignment);
            max >= constraint.lower && min <= constraint.upper
        })
    }

    /// Whether the constraints touching `var` can still be satisfied.
    fn is_consistent(&self, var: VarId) -> bool {
        self.constraints_by_var[var.0].iter().all(|&id| {
            let constraint = self.model.constraint(id);
            let (min, max) = constraint.bounds(&self.assignment);
            max >= constraint.lower && min <= constraint.upper
        })
    }

    /// Fixes variable `index` to `value`, unless that makes a constraint unsatisfiable.
    fn fix(&mut self, index: usize, value: bool) -> bool {
        self.assignment[index] = Some(value);
        if value {
            self.fixed_objective += self.model.objective_coefficient(VarId(index));
        }

        if self.is_consistent(VarId(index)) {
            true
        } else {
            self.unfix(index);
            false
        }
    }

    /// Frees variable `index` again and returns the value it was fixed to.
    fn unfix(&mut self, index: usize) -> bool {
        let value = self.assignment[index].take() == Some(true);
        if value {
            self.fixed_objective -= self.model.objective_coefficient(VarId(index));
        }
        value
    }

    fn record_leaf(&mut self) {
        let values: Vec<bool> = self.assignment.iter().map(|v| v.unwrap_or(false)).collect();
        let objective = self.model.objective_value(&values);
        if self.best.as_ref().map_or(true, |(best, _)| objective > *best) {
            self.best = Some((objective, values));
        }
    }

    /// Whether nothing below the node at `depth` can beat the best leaf found so far.
    fn bounded_out(&self, depth: usize) -> bool {
        match &self.best {
            Some((best, _)) => {
                self.fixed_objective + self.optimistic_suffix[depth] + BOUND_EPSILON <= *best
            }
            None => false,
        }
    }

    /// Depth first search with an explicit trail instead of recursion, since there is one
    /// level per candidate pattern. Variables are fixed in index order, so `depth` is also
    /// the next variable to fix.
    fn search(&mut self) {
        let n = self.assignment.len();
        let mut depth = 0;

        'nodes: loop {
            if self.exhausted() {
                return;
            }
            self.nodes += 1;

            let expand = if depth == n {
                self.record_leaf();
                false
            } else {
                !self.bounded_out(depth)
            };

            if expand && (self.fix(depth, true) || self.fix(depth, false)) {
                depth += 1;
                continue;
            }

            // Backtrack to the deepest variable whose 0 branch is still untried.
            loop {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                if self.unfix(depth) && self.fix(depth, false) {
                    depth += 1;
                    continue 'nodes;
                }
            }
        }
    }
}

/// Start from every variable selected and deselect variables, last first, until each
/// violated constraint is back within its bounds. Each constraint is repaired once, in
/// model order, so a later repair may break an earlier constraint again.
fn repair(model: &Model) -> Vec<bool> {
    let mut values = vec![true; model.num_vars()];

    for constraint in model.constraints() {
        let mut sum = constraint.sum(&values);
        for &(var, coefficient) in constraint.terms.iter().rev() {
            let value = &mut values[var.0];
            let flip = if sum > constraint.upper {
                (coefficient > 0) == *value
            } else if sum < constraint.lower {
                (coefficient > 0) != *value
            } else {
                break;
            };

            if flip && coefficient != 0 {
                sum += if *value { -coefficient } else { coefficient };
                *value = !*value;
            }
        }
    }

    values
}

/// Maximizes the objective of `model` with a depth first branch-and-bound search that
/// visits at most `node_budget` nodes, trying 1 before 0 for every variable.
pub(crate) fn solve(model: &Model, node_budget: u64) -> Solution {
    let mut search = BranchAndBound::new(model, node_budget);

    if search.root_is_consistent() {
        search.search();
    }

    let nodes = search.nodes;
    if search.exhausted() {
        warn!(
            "search stopped after {} nodes, best objective so far: {:?}",
            nodes,
            search.best.as_ref().map(|(objective, _)| *objective)
        );
    }

    match search.best {
        Some((objective, values)) => {
            debug!("search visited {} nodes, objective {:.3}", nodes, objective);
            Solution {
                status: SolveStatus::Optimal,
                values,
                objective,
                nodes,
            }
        }
        None => {
            let values = repair(model);
            if !model.constraints().iter().all(|c| c.is_satisfied(&values)) {
                warn!("repaired selection still violates a constraint");
            }
            let objective = model.objective_value(&values);
            Solution {
                status: SolveStatus::Feasible,
                values,
                objective,
                nodes,
            }
        }
    }
}
