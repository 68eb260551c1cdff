use super::*;
use crate::balance::balance_lines;
use crate::compat::{compatible_pairs, CompatiblePair};
use crate::greedy::greedy_patterns;
use crate::metrics::{line_loads, summarize};
use crate::objective::{build_model, Candidate, ObjectiveModel};
use crate::pattern::{generate_patterns, Demand};
use crate::solver::{solve, Solution};

use fnv::FnvHashSet;
use log::{debug, info, warn};

/// Patterns selected from a solution, with the slits they assign per order index.
/// Built as a fold over the selected candidates.
struct Extraction<'a> {
    patterns: Vec<SlittingPattern>,
    used_coils: FnvHashSet<&'a str>,
    slits_assigned: Vec<u32>,
}

impl<'a> Extraction<'a> {
    fn new(num_orders: usize) -> Self {
        Self {
            patterns: Vec::new(),
            used_coils: Default::default(),
            slits_assigned: vec![0; num_orders],
        }
    }

    /// Adds the pattern of `candidate`, unless its coil already has one.
    fn select(mut self, candidate: &'a Candidate, score: f64, orders: &[Order]) -> Self {
        let coil = candidate.coil;
        if !self.used_coils.insert(coil.coil_id.as_str()) {
            return self;
        }

        let pattern = &candidate.pattern;
        let mut slit_widths: Vec<SlitWidth> = Vec::new();
        for (&width, &order) in pattern.widths.iter().zip(&pattern.orders) {
            match slit_widths.iter_mut().find(|s| s.width == width) {
                Some(slit) => slit.quantity += 1,
                None => slit_widths.push(SlitWidth {
                    width,
                    order_id: orders[order].order_id.clone(),
                    quantity: 1,
                }),
            }
            self.slits_assigned[order] += 1;
        }

        self.patterns.push(SlittingPattern {
            coil_id: coil.coil_id.clone(),
            pattern_id: format!("P-OR-{}", self.patterns.len() + 1),
            slit_widths,
            scrap_width: pattern.waste,
            yield_percent: pattern.yield_percent(coil.width),
            score,
            assigned_line: candidate.line.line_name.clone(),
        });

        self
    }
}

fn extract<'a>(
    candidates: &'a [Candidate],
    objective: &ObjectiveModel,
    solution: &Solution,
    orders: &[Order],
) -> Extraction<'a> {
    candidates
        .iter()
        .zip(&objective.vars)
        .zip(&objective.scores)
        .filter(|((_, var), _)| solution.value(**var))
        .fold(Extraction::new(orders.len()), |extraction, ((candidate, _), score)| {
            extraction.select(candidate, *score, orders)
        })
}

/// Candidate patterns of every coil, in coil order.
fn generate_candidates<'a>(
    pairs: &[CompatiblePair<'a>],
    orders: &[Order],
    limits: &Limits,
) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();

    for pair in pairs {
        // Nothing is assigned before the search, so every order still needs all its slits.
        let demands: Vec<Demand> = pair
            .orders
            .iter()
            .map(|&i| Demand {
                order: i,
                width: orders[i].required_width,
                required: orders[i].required_slits(),
                remaining: orders[i].required_slits(),
            })
            .collect();

        let patterns = generate_patterns(pair.coil.width, &demands, pair.line, limits);
        debug!(
            "coil {}: {} candidate patterns on {}",
            pair.coil.coil_id,
            patterns.len(),
            pair.line.line_name
        );

        candidates.extend(patterns.into_iter().map(|pattern| Candidate {
            coil: pair.coil,
            line: pair.line,
            pattern,
        }));
    }

    candidates
}

/// Selects patterns with the set covering search, or returns `None` when it selects none.
fn set_covering(
    candidates: &[Candidate],
    orders: &[Order],
    weights: &Weights,
    limits: &Limits,
) -> Option<(Vec<SlittingPattern>, Vec<u32>, SolveStatus)> {
    if candidates.is_empty() {
        return None;
    }

    let objective = build_model(candidates, orders, weights);
    debug!(
        "model has {} variables and {} constraints",
        objective.model.num_vars(),
        objective.model.constraints().len()
    );

    let solution = solve(&objective.model, limits.node_budget);
    debug!(
        "{:?} after {} nodes, objective {:.3}",
        solution.status, solution.nodes, solution.objective
    );
    let extraction = extract(candidates, &objective, &solution, orders);

    for var in objective.vars.iter().filter(|var| solution.value(**var)) {
        debug!("selected {}", objective.model.name(*var));
    }

    if extraction.patterns.is_empty() {
        None
    } else {
        Some((extraction.patterns, extraction.slits_assigned, solution.status))
    }
}

fn finish(
    mut patterns: Vec<SlittingPattern>,
    slits_assigned: &[u32],
    orders: &[Order],
    line_specs: &[LineSpec],
    strategy: Strategy,
) -> OptimizationResult {
    balance_lines(&mut patterns, line_specs);

    let summary = summarize(&patterns, orders, slits_assigned);
    let line_loads = line_loads(&patterns, line_specs);

    info!(
        "{} patterns via {:?}: yield {:.2}%, scrap {:.1}, {}/{} orders covered",
        patterns.len(),
        strategy,
        summary.total_yield,
        summary.total_scrap,
        summary.orders_covered,
        orders.len()
    );

    OptimizationResult {
        patterns,
        total_yield: summary.total_yield,
        total_scrap: summary.total_scrap,
        orders_covered: summary.orders_covered,
        total_orders: orders.len(),
        partially_fulfilled_orders: summary.partially_fulfilled_orders,
        unfulfilled_orders: summary.unfulfilled_orders,
        order_slits_assigned: summary.order_slits_assigned,
        line_loads,
        strategy,
    }
}

/// Runs the whole pipeline: compatibility, pattern generation, set covering search,
/// greedy fallback, line balancing and metrics.
pub(crate) fn run(
    coils: &[Coil],
    orders: &[Order],
    line_specs: &[LineSpec],
    weights: &Weights,
    limits: &Limits,
) -> OptimizationResult {
    if coils.is_empty() || orders.is_empty() || line_specs.is_empty() {
        return finish(
            Vec::new(),
            &vec![0; orders.len()],
            orders,
            line_specs,
            Strategy::Empty,
        );
    }

    let pairs = compatible_pairs(coils, orders, line_specs);
    debug!("{} of {} coils have compatible orders and a line", pairs.len(), coils.len());

    let candidates = generate_candidates(&pairs, orders, limits);

    match set_covering(&candidates, orders, weights, limits) {
        Some((patterns, slits_assigned, status)) => finish(
            patterns,
            &slits_assigned,
            orders,
            line_specs,
            Strategy::SetCovering(status),
        ),
        None => {
            warn!(
                "set covering selected no pattern from {} candidates, packing greedily",
                candidates.len()
            );
            let plan = greedy_patterns(coils, orders, line_specs);
            finish(
                plan.patterns,
                &plan.slits_assigned,
                orders,
                line_specs,
                Strategy::Greedy,
            )
        }
    }
}
