use super::*;

use log::{debug, warn};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Bonus added to the ranking score of an order when a pattern cuts exactly the slits
/// the order still needs.
const EXACT_REMAINING_BONUS: f64 = 20.0;

/// An order as seen while generating patterns for one coil.
#[derive(Clone, Debug)]
pub(crate) struct Demand {
    /// Index into the order list.
    pub(crate) order: usize,
    pub(crate) width: f64,
    pub(crate) required: u32,
    pub(crate) remaining: u32,
}

/// A feasible combination of slits for one coil.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CandidatePattern {
    /// Slit widths in the order they were chosen.
    pub(crate) widths: SmallVec<[f64; 8]>,

    /// Order index of each slit in `widths`.
    pub(crate) orders: SmallVec<[usize; 8]>,

    /// Slits per order index, in order of first appearance.
    pub(crate) slit_counts: SmallVec<[(usize, u32); 4]>,

    pub(crate) used_width: f64,

    /// Unused width including edge trim on both sides.
    pub(crate) waste: f64,
}

impl CandidatePattern {
    pub(crate) fn knife_count(&self) -> usize {
        self.widths.len()
    }

    pub(crate) fn yield_percent(&self, coil_width: f64) -> f64 {
        if coil_width > 0.0 {
            self.used_width / coil_width * 100.0
        } else {
            0.0
        }
    }
}

/// Ranking score of a pattern: how far it goes towards each order's slit count,
/// with a bonus for orders it completes exactly.
fn fulfillment_score(slit_counts: &[u32], demands: &[Demand]) -> f64 {
    slit_counts
        .iter()
        .zip(demands)
        .filter(|(count, _)| **count > 0)
        .map(|(&count, demand)| {
            let ratio = (count as f64 / demand.required as f64).min(1.0);
            let bonus = if count == demand.remaining {
                EXACT_REMAINING_BONUS
            } else {
                0.0
            };
            ratio * 100.0 + bonus
        })
        .sum()
}

/// Most slits a single pattern may hold, whatever the line's knife count.
pub(crate) const MAX_PATTERN_KNIVES: usize = 256;

/// Candidates are ranked and cut back to the pattern limit whenever this many pile up.
const PRUNE_BATCH: usize = 1024;

/// Sorts by ranking score, best first, then by least waste. The sort is stable, so equally
/// ranked patterns keep their enumeration order.
fn rank(candidates: &mut Vec<(f64, CandidatePattern)>, pattern_limit: usize) {
    candidates.sort_by(|(a_score, a), (b_score, b)| match b_score.total_cmp(a_score) {
        Ordering::Equal => a.waste.total_cmp(&b.waste),
        ordering => ordering,
    });
    candidates.truncate(pattern_limit);
}

/// A node of the enumeration: the next demand to try and the width still free.
struct Frame {
    next: usize,
    remaining: f64,
}

/// Depth first enumeration of slit combinations for a single coil.
struct PatternGenerator<'a> {
    demands: &'a [Demand],
    line: &'a LineSpec,
    edge_trim: f64,
    max_knives: usize,
    enumeration_limit: usize,
    pattern_limit: usize,
    prune_at: usize,
    visited: usize,

    // The partial pattern being extended.
    widths: SmallVec<[f64; 8]>,
    demand_indices: SmallVec<[usize; 8]>,
    slit_counts: Vec<u32>,

    candidates: Vec<(f64, CandidatePattern)>,
}

impl<'a> PatternGenerator<'a> {
    fn new(demands: &'a [Demand], line: &'a LineSpec, limits: &Limits) -> Self {
        Self {
            demands,
            line,
            edge_trim: line.scrap_edge_min * 2.0,
            max_knives: (line.max_knives as usize).min(MAX_PATTERN_KNIVES),
            enumeration_limit: limits.enumeration_limit,
            pattern_limit: limits.pattern_limit,
            prune_at: limits.pattern_limit.saturating_mul(2).max(PRUNE_BATCH),
            visited: 0,
            widths: SmallVec::new(),
            demand_indices: SmallVec::new(),
            slit_counts: vec![0; demands.len()],
            candidates: Vec::new(),
        }
    }

    fn truncated(&self) -> bool {
        self.visited >= self.enumeration_limit
    }

    fn fits(&self, i: usize, remaining: f64) -> bool {
        let demand = &self.demands[i];
        demand.width <= remaining
            && self.line.accepts_slit(demand.width)
            && self.slit_counts[i] < demand.remaining
    }

    /// Visits the current partial pattern and returns the first demand its children may
    /// use, or the number of demands when it gets no children.
    fn visit(&mut self, remaining: f64, start: usize) -> usize {
        self.visited += 1;

        if !self.widths.is_empty() {
            self.record(remaining);
        }

        if self.widths.len() >= self.max_knives || self.truncated() {
            self.demands.len()
        } else {
            start
        }
    }

    /// Extends the partial pattern only with slits of its last demand or later ones, so
    /// every combination is produced once. Uses an explicit stack, since a pattern may
    /// hold many slits.
    fn enumerate(&mut self, usable_width: f64) {
        let root = self.visit(usable_width, 0);
        let mut stack = vec![Frame {
            next: root,
            remaining: usable_width,
        }];

        while let Some(frame) = stack.last_mut() {
            let remaining = frame.remaining;
            let found = if self.truncated() {
                None
            } else {
                (frame.next..self.demands.len()).find(|&i| self.fits(i, remaining))
            };

            match found {
                Some(i) => {
                    frame.next = i + 1;

                    let width = self.demands[i].width;
                    self.widths.push(width);
                    self.demand_indices.push(i);
                    self.slit_counts[i] += 1;

                    let next = self.visit(remaining - width, i);
                    stack.push(Frame {
                        next,
                        remaining: remaining - width,
                    });
                }
                None => {
                    stack.pop();
                    if let Some(i) = self.demand_indices.pop() {
                        self.widths.pop();
                        self.slit_counts[i] -= 1;
                    }
                }
            }
        }
    }

    fn record(&mut self, remaining: f64) {
        let mut slit_counts: SmallVec<[(usize, u32); 4]> = SmallVec::new();
        for &i in &self.demand_indices {
            let order = self.demands[i].order;
            if !slit_counts.iter().any(|(o, _)| *o == order) {
                slit_counts.push((order, self.slit_counts[i]));
            }
        }

        let pattern = CandidatePattern {
            widths: self.widths.clone(),
            orders: self
                .demand_indices
                .iter()
                .map(|&i| self.demands[i].order)
                .collect(),
            slit_counts,
            used_width: self.widths.iter().sum(),
            waste: remaining + self.edge_trim,
        };

        let score = fulfillment_score(&self.slit_counts, self.demands);
        self.candidates.push((score, pattern));

        if self.candidates.len() >= self.prune_at {
            rank(&mut self.candidates, self.pattern_limit);
        }
    }
}

/// Generates the best ranked cutting patterns for a coil of `coil_width` on `line`.
///
/// Patterns are ranked by how well they fulfill the slit counts of the demands, then by
/// least waste, and only the first `limits.pattern_limit` are kept. An empty list means
/// no slit fits on the coil.
pub(crate) fn generate_patterns(
    coil_width: f64,
    demands: &[Demand],
    line: &LineSpec,
    limits: &Limits,
) -> Vec<CandidatePattern> {
    let mut generator = PatternGenerator::new(demands, line, limits);
    let usable_width = coil_width - generator.edge_trim;

    if line.max_knives as usize > MAX_PATTERN_KNIVES {
        warn!(
            "{} allows {} knives, patterns are limited to {} slits",
            line.line_name, line.max_knives, MAX_PATTERN_KNIVES
        );
    }

    generator.enumerate(usable_width);

    if generator.truncated() {
        warn!(
            "pattern enumeration stopped after {} partial patterns, keeping {} candidates",
            generator.visited,
            generator.candidates.len()
        );
    }

    let mut candidates = generator.candidates;
    debug!(
        "enumerated {} patterns for usable width {:.1}",
        candidates.len(),
        usable_width
    );

    rank(&mut candidates, limits.pattern_limit);

    candidates.into_iter().map(|(_, pattern)| pattern).collect()
}
