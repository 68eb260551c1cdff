use super::*;
use crate::model::{Model, VarId};
use crate::pattern::CandidatePattern;

use fnv::FnvHashMap;

/// Bonus added to the objective fulfillment score of an order when a pattern cuts
/// exactly the slits the order asks for.
const EXACT_REQUIRED_BONUS: f64 = 25.0;

/// A candidate pattern together with the coil it is cut from and the line it runs on.
#[derive(Clone, Debug)]
pub(crate) struct Candidate<'a> {
    pub(crate) coil: &'a Coil,
    pub(crate) line: &'a LineSpec,
    pub(crate) pattern: CandidatePattern,
}

/// The set covering model: one variable per candidate, at most one selected per coil.
pub(crate) struct ObjectiveModel {
    pub(crate) model: Model,

    /// Variable of each candidate, by candidate index.
    pub(crate) vars: Vec<VarId>,

    /// Objective coefficient of each candidate, by candidate index.
    pub(crate) scores: Vec<f64>,
}

/// Fulfillment of the orders' full slit counts, rewarding exact matches.
fn slit_fulfillment_score(pattern: &CandidatePattern, orders: &[Order]) -> f64 {
    pattern
        .slit_counts
        .iter()
        .map(|&(order, count)| {
            let required = orders[order].required_slits();
            let ratio = (count as f64 / required as f64).min(1.0);
            let bonus = if count == required {
                EXACT_REQUIRED_BONUS
            } else {
                0.0
            };
            ratio * 100.0 + bonus
        })
        .sum()
}

/// Weighted score of selecting `candidate`.
pub(crate) fn pattern_score(candidate: &Candidate, orders: &[Order], weights: &Weights) -> f64 {
    let pattern = &candidate.pattern;

    let yield_score = pattern.yield_percent(candidate.coil.width) * (weights.yield_weight / 100.0);
    let order_score = slit_fulfillment_score(pattern, orders) * (weights.slit_fulfillment / 100.0);
    let scrap_penalty = (pattern.waste / 100.0) * (weights.scrap_penalty / 100.0);
    let setup_penalty = pattern.knife_count() as f64 * (weights.setup_penalty / 100.0);

    yield_score + order_score - scrap_penalty - setup_penalty
}

/// Builds the set covering model over all candidates.
pub(crate) fn build_model(
    candidates: &[Candidate],
    orders: &[Order],
    weights: &Weights,
) -> ObjectiveModel {
    let mut model = Model::new();
    let mut vars = Vec::with_capacity(candidates.len());
    let mut scores = Vec::with_capacity(candidates.len());

    // Coils in order of first appearance, with the terms of their patterns.
    let mut coil_index: FnvHashMap<&str, usize> = FnvHashMap::default();
    let mut coil_terms: Vec<Vec<(VarId, i64)>> = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let var = model.new_bool_var(format!("pattern_{}", i));

        let score = pattern_score(candidate, orders, weights);
        model.add_objective_term(var, score);

        let group = *coil_index
            .entry(candidate.coil.coil_id.as_str())
            .or_insert_with(|| {
                coil_terms.push(Vec::new());
                coil_terms.len() - 1
            });
        coil_terms[group].push((var, 1));

        vars.push(var);
        scores.push(score);
    }

    for terms in coil_terms {
        model.add_linear_constraint(terms, 0, 1);
    }

    ObjectiveModel {
        model,
        vars,
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{generate_patterns, Demand};
    use crate::tests::{coil, line, order};

    fn candidates<'a>(coil: &'a Coil, line: &'a LineSpec, orders: &[Order]) -> Vec<Candidate<'a>> {
        let demands: Vec<Demand> = orders
            .iter()
            .enumerate()
            .map(|(i, o)| Demand {
                order: i,
                width: o.required_width,
                required: o.required_slits(),
                remaining: o.required_slits(),
            })
            .collect();

        generate_patterns(coil.width, &demands, line, &Limits::default())
            .into_iter()
            .map(|pattern| Candidate {
                coil,
                line,
                pattern,
            })
            .collect()
    }

    #[test]
    fn score_of_exact_two_slit_pattern() {
        let c = coil("C1", MaterialClass::Hr, 1250.0, &[LINE_1]);
        let l = line(LINE_1, 10);
        let orders = [order("O1", MaterialClass::Hr, 600.0, Some(2))];
        let candidates = candidates(&c, &l, &orders);

        let score = pattern_score(&candidates[0], &orders, &Weights::default());

        // 96 * 0.40 + 125 * 0.35 - 0.5 * 0.15 - 2 * 0.10
        let expected = 38.4 + 43.75 - 0.075 - 0.2;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_give_zero_score() {
        let c = coil("C1", MaterialClass::Hr, 1250.0, &[LINE_1]);
        let l = line(LINE_1, 10);
        let orders = [order("O1", MaterialClass::Hr, 600.0, Some(2))];
        let candidates = candidates(&c, &l, &orders);
        let weights = Weights {
            yield_weight: 0.0,
            slit_fulfillment: 0.0,
            scrap_penalty: 0.0,
            setup_penalty: 0.0,
        };

        assert!(candidates
            .iter()
            .all(|c| pattern_score(c, &orders, &weights) == 0.0));
    }

    #[test]
    fn one_constraint_per_coil() {
        let c1 = coil("C1", MaterialClass::Hr, 1250.0, &[LINE_1]);
        let c2 = coil("C2", MaterialClass::Hr, 1000.0, &[LINE_1]);
        let l = line(LINE_1, 10);
        let orders = [order("O1", MaterialClass::Hr, 300.0, Some(2))];

        let mut all = candidates(&c1, &l, &orders);
        let first_coil = all.len();
        all.extend(candidates(&c2, &l, &orders));

        let objective = build_model(&all, &orders, &Weights::default());

        assert_eq!(objective.vars.len(), all.len());
        assert_eq!(objective.scores.len(), all.len());
        assert_eq!(objective.model.constraints().len(), 2);

        let first = &objective.model.constraints()[0];
        assert_eq!(first.terms.len(), first_coil);
        assert_eq!((first.lower, first.upper), (0, 1));
        for (var, score) in objective.vars.iter().zip(&objective.scores) {
            assert_eq!(objective.model.objective_coefficient(*var), *score);
        }
    }
}
