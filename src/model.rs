//! A small constraint model of boolean decision variables, linear constraints over them,
//! and a linear objective to maximize.

/// Handle to a variable of a [`Model`].
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct VarId(pub(crate) usize);

/// Handle to a constraint of a [`Model`].
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct ConstraintId(pub(crate) usize);

/// A linear constraint `lower <= sum(coefficient * var) <= upper`.
#[derive(Clone, Debug)]
pub(crate) struct LinearConstraint {
    pub(crate) terms: Vec<(VarId, i64)>,
    pub(crate) lower: i64,
    pub(crate) upper: i64,
}

impl LinearConstraint {
    /// Smallest and largest value the left hand side can take, given the values fixed
    /// so far. Unfixed variables may take either 0 or 1.
    pub(crate) fn bounds(&self, assignment: &[Option<bool>]) -> (i64, i64) {
        self.terms
            .iter()
            .fold((0, 0), |(min, max), &(var, coefficient)| {
                match assignment[var.0] {
                    Some(value) => {
                        let fixed = coefficient * value as i64;
                        (min + fixed, max + fixed)
                    }
                    None if coefficient > 0 => (min, max + coefficient),
                    None => (min + coefficient, max),
                }
            })
    }

    /// Left hand side under a complete assignment.
    pub(crate) fn sum(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .map(|&(var, coefficient)| coefficient * values[var.0] as i64)
            .sum()
    }

    pub(crate) fn is_satisfied(&self, values: &[bool]) -> bool {
        let sum = self.sum(values);
        sum >= self.lower && sum <= self.upper
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Model {
    names: Vec<String>,
    objective: Vec<f64>,
    constraints: Vec<LinearConstraint>,
}

impl Model {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    /// Adds a boolean variable with an objective coefficient of 0.
    pub(crate) fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.names.push(name.into());
        self.objective.push(0.0);
        VarId(self.names.len() - 1)
    }

    pub(crate) fn add_linear_constraint(
        &mut self,
        terms: Vec<(VarId, i64)>,
        lower: i64,
        upper: i64,
    ) -> ConstraintId {
        self.constraints.push(LinearConstraint {
            terms,
            lower,
            upper,
        });
        ConstraintId(self.constraints.len() - 1)
    }

    /// Adds `coefficient` to the objective coefficient of `var`.
    pub(crate) fn add_objective_term(&mut self, var: VarId, coefficient: f64) {
        self.objective[var.0] += coefficient;
    }

    pub(crate) fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn name(&self, var: VarId) -> &str {
        &self.names[var.0]
    }

    pub(crate) fn objective_coefficient(&self, var: VarId) -> f64 {
        self.objective[var.0]
    }

    pub(crate) fn constraint(&self, id: ConstraintId) -> &LinearConstraint {
        &self.constraints[id.0]
    }

    pub(crate) fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub(crate) fn objective_value(&self, values: &[bool]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .filter(|(_, &value)| value)
            .map(|(coefficient, _)| coefficient)
            .sum()
    }

    /// For each variable, the constraints it appears in.
    pub(crate) fn constraints_by_var(&self) -> Vec<Vec<ConstraintId>> {
        let mut by_var = vec![Vec::new(); self.num_vars()];
        for (i, constraint) in self.constraints.iter().enumerate() {
            for &(var, _) in &constraint.terms {
                if !by_var[var.0].contains(&ConstraintId(i)) {
                    by_var[var.0].push(ConstraintId(i));
                }
            }
        }
        by_var
    }
}
