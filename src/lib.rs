//! coil-slitter is an optimizer library that decides how raw steel coils should be slit into
//! customer slit widths, and on which slitter line, to get the most usable material out of each
//! coil while meeting the number of slits every order asks for.
//! It enumerates cutting patterns per coil, selects among them with a budgeted
//! branch-and-bound search, and falls back to a greedy packer when the search selects nothing.

#![deny(missing_docs)]

mod balance;
mod compat;
mod engine;
mod greedy;
mod metrics;
mod model;
mod objective;
mod pattern;
mod solver;


use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

pub use solver::SolveStatus;

/// Name of the first slitter line.
pub const LINE_1: &str = "Line-1";

/// Name of the second slitter line.
pub const LINE_2: &str = "Line-2";

/// Rolling process a coil or order belongs to.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaterialClass {
    /// Hot rolled.
    #[cfg_attr(feature = "serialize", serde(rename = "HR"))]
    Hr,

    /// Cold rolled.
    #[cfg_attr(feature = "serialize", serde(rename = "CR"))]
    Cr,
}

/// Priority of an order. `High` sorts before `Medium`, which sorts before `Low`.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    /// Scheduled first by the greedy packer.
    High,

    /// Normal priority.
    Medium,

    /// Scheduled last by the greedy packer.
    Low,
}

/// A raw coil that is available to be slit.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Coil {
    /// ID used to match result patterns with this coil.
    pub coil_id: String,

    /// Material class of the coil.
    pub material: MaterialClass,

    /// Steel grade, for example `"SS304"`. Must match an order's grade exactly.
    pub grade: String,

    /// Thickness in millimetres.
    pub thickness: f64,

    /// Width in millimetres.
    pub width: f64,

    /// Weight of the coil. Carried for the caller, not used by the optimizer.
    pub weight: f64,

    /// Names of the slitter lines this coil may run on.
    pub line_compatibility: Vec<String>,
}

/// A customer order for slits of a single width.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    /// ID used to match result slits with this order.
    pub order_id: String,

    /// Material class the slits must be cut from.
    pub material: MaterialClass,

    /// Steel grade the slits must be cut from.
    pub grade: String,

    /// Thickness in millimetres.
    pub thickness: f64,

    /// Width of each slit in millimetres.
    pub required_width: f64,

    /// Accepted width deviation. Carried for the caller, not used by the optimizer.
    pub width_tolerance: f64,

    /// Ordered weight. Carried for the caller, not used by the optimizer.
    pub weight: f64,

    /// Number of slits required. `None` means a single slit.
    pub slit_count: Option<u32>,

    /// Priority of this order.
    pub priority: Priority,

    /// Due date of this order.
    pub due_date: NaiveDate,
}

impl Order {
    /// Number of slits required to fulfill this order. Never less than 1.
    pub fn required_slits(&self) -> u32 {
        match self.slit_count {
            Some(count) if count > 0 => count,
            _ => 1,
        }
    }
}

/// Capabilities of a slitter line.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct LineSpec {
    /// Name of the line, usually [`LINE_1`] or [`LINE_2`].
    pub line_name: String,

    /// Narrowest slit the line can produce.
    pub min_slit_width: f64,

    /// Widest slit the line can produce.
    pub max_slit_width: f64,

    /// Maximum number of slits in one pattern.
    pub max_knives: u32,

    /// Minimum edge trim on each side of the coil.
    pub scrap_edge_min: f64,

    /// Maximum edge trim on each side of the coil.
    pub scrap_edge_max: f64,

    /// Cost of a setup change.
    pub setup_cost: f64,

    /// Minutes needed for a setup change.
    pub setup_time: f64,

    /// Whether the line can run hot rolled coils.
    pub hr_capability: bool,

    /// Whether the line can run cold rolled coils.
    pub cr_capability: bool,
}

impl LineSpec {
    /// Returns whether this line can process coils of the given material class.
    pub fn supports(&self, material: MaterialClass) -> bool {
        match material {
            MaterialClass::Hr => self.hr_capability,
            MaterialClass::Cr => self.cr_capability,
        }
    }

    /// Returns whether a slit of `width` is within this line's slit range.
    pub fn accepts_slit(&self, width: f64) -> bool {
        width >= self.min_slit_width && width <= self.max_slit_width
    }
}

/// Multipliers for the terms of the pattern score, given as percentages.
/// They are independent of each other and need not sum to 100.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Weights {
    /// Reward for yield percentage.
    pub yield_weight: f64,

    /// Reward for fulfilling the slit counts of orders.
    pub slit_fulfillment: f64,

    /// Penalty for scrap width.
    pub scrap_penalty: f64,

    /// Penalty per knife used.
    pub setup_penalty: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            yield_weight: 40.0,
            slit_fulfillment: 35.0,
            scrap_penalty: 15.0,
            setup_penalty: 10.0,
        }
    }
}

/// A group of identical slits in a pattern.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct SlitWidth {
    /// Width of each slit.
    pub width: f64,

    /// Order the slits are cut for.
    pub order_id: String,

    /// Number of slits of this width.
    pub quantity: u32,
}

/// A cutting pattern selected for one coil.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct SlittingPattern {
    /// ID of the coil this pattern is cut from.
    pub coil_id: String,

    /// ID of this pattern within the result.
    pub pattern_id: String,

    /// Slits cut from the coil, grouped by width.
    pub slit_widths: Vec<SlitWidth>,

    /// Unused width of the coil, edge trim included.
    pub scrap_width: f64,

    /// Used width as a percentage of the coil width.
    pub yield_percent: f64,

    /// Score of the pattern.
    pub score: f64,

    /// Line the pattern is assigned to.
    pub assigned_line: String,
}

impl SlittingPattern {
    /// Total width of all slits in this pattern.
    pub fn used_width(&self) -> f64 {
        self.slit_widths
            .iter()
            .map(|s| s.width * s.quantity as f64)
            .sum()
    }

    /// Number of slits in this pattern.
    pub fn slit_count(&self) -> u32 {
        self.slit_widths.iter().map(|s| s.quantity).sum()
    }
}

/// How the patterns of a result were produced.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// Some input collection was empty, so nothing was optimized.
    Empty,

    /// Patterns were selected by the set covering search.
    SetCovering(SolveStatus),

    /// The search selected nothing and the greedy packer was used.
    Greedy,
}

/// Load summary for one slitter line.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct LineLoad {
    /// Name of the line.
    pub line_name: String,

    /// Number of coils assigned to the line.
    pub coils: usize,

    /// Number of setup changes between consecutive coils.
    pub setup_changes: usize,

    /// Estimated run time in minutes.
    pub estimated_minutes: f64,
}

/// Result of an optimization.
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// Selected patterns. Each coil appears at most once.
    pub patterns: Vec<SlittingPattern>,

    /// Average yield percentage of the selected patterns, 0 if there are none.
    pub total_yield: f64,

    /// Sum of the scrap widths of the selected patterns.
    pub total_scrap: f64,

    /// Number of orders that got all of their required slits.
    pub orders_covered: usize,

    /// Number of orders given to the optimizer.
    pub total_orders: usize,

    /// Number of orders that got some, but not all, of their required slits.
    pub partially_fulfilled_orders: usize,

    /// Number of orders that got no slits.
    pub unfulfilled_orders: usize,

    /// Slits assigned per order ID. Orders without slits are absent.
    ///
    /// Set covering plans every coil against the order's full slit count, so an order
    /// served by several coils can get more slits than it requires.
    pub order_slits_assigned: BTreeMap<String, u32>,

    /// Load on each known line.
    pub line_loads: Vec<LineLoad>,

    /// How the patterns were produced.
    pub strategy: Strategy,
}

impl OptimizationResult {
    /// Percentage of orders that were fully covered, 0 if there were no orders.
    pub fn completion_percent(&self) -> f64 {
        if self.total_orders == 0 {
            0.0
        } else {
            self.orders_covered as f64 / self.total_orders as f64 * 100.0
        }
    }
}

/// Malformed input rejected before optimizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A width, thickness, weight or similar quantity was negative or not finite.
    #[error("{entity} {id}: {field} must be a finite, non-negative number")]
    NegativeValue {
        /// Kind of input, for example `"coil"`.
        entity: &'static str,
        /// ID of the offending input.
        id: String,
        /// Name of the offending field.
        field: &'static str,
    },

    /// An order asked for zero slits.
    #[error("order {order_id}: slit count must be at least 1")]
    InvalidSlitCount {
        /// ID of the offending order.
        order_id: String,
    },

    /// A line's minimum slit width is larger than its maximum.
    #[error("line {line}: minimum slit width exceeds maximum slit width")]
    InvalidSlitRange {
        /// Name of the offending line.
        line: String,
    },

    /// A coil references a line that has no line spec.
    #[error("coil {coil_id}: unknown line {line}")]
    UnknownLine {
        /// ID of the offending coil.
        coil_id: String,
        /// Name of the unknown line.
        line: String,
    },

    /// One of the objective weights was negative or not finite.
    #[error("weight {name} must be a finite, non-negative number")]
    InvalidWeight {
        /// Name of the offending weight.
        name: &'static str,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// Limits that keep a run bounded and deterministic.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Limits {
    pub(crate) node_budget: u64,
    pub(crate) pattern_limit: usize,
    pub(crate) enumeration_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            node_budget: 200_000,
            pattern_limit: 50,
            enumeration_limit: 200_000,
        }
    }
}

/// Optimize slitting patterns for `coils` against `orders` on the lines in `line_specs`.
///
/// Inputs are not validated. Use [`Optimizer`] to reject malformed inputs first.
pub fn optimize(
    coils: &[Coil],
    orders: &[Order],
    line_specs: &[LineSpec],
    weights: &Weights,
) -> OptimizationResult {
    engine::run(coils, orders, line_specs, weights, &Limits::default())
}

/// Optimizer for slitting coils into order widths.
#[derive(Default)]
pub struct Optimizer {
    coils: Vec<Coil>,
    orders: Vec<Order>,
    line_specs: Vec<LineSpec>,
    weights: Weights,
    limits: Limits,
}

impl Optimizer {
    /// Create a new optimizer.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a coil that the optimizer can slit.
    pub fn add_coil(&mut self, coil: Coil) -> &mut Self {
        self.coils.push(coil);
        self
    }

    /// Add coils that the optimizer can slit.
    pub fn add_coils<I>(&mut self, coils: I) -> &mut Self
    where
        I: IntoIterator<Item = Coil>,
    {
        self.coils.extend(coils);
        self
    }

    /// Add an order to cut slits for.
    pub fn add_order(&mut self, order: Order) -> &mut Self {
        self.orders.push(order);
        self
    }

    /// Add orders to cut slits for.
    pub fn add_orders<I>(&mut self, orders: I) -> &mut Self
    where
        I: IntoIterator<Item = Order>,
    {
        self.orders.extend(orders);
        self
    }

    /// Add a slitter line.
    pub fn add_line_spec(&mut self, line_spec: LineSpec) -> &mut Self {
        self.line_specs.push(line_spec);
        self
    }

    /// Add slitter lines.
    pub fn add_line_specs<I>(&mut self, line_specs: I) -> &mut Self
    where
        I: IntoIterator<Item = LineSpec>,
    {
        self.line_specs.extend(line_specs);
        self
    }

    /// Set the multipliers used to score patterns.
    pub fn set_weights(&mut self, weights: Weights) -> &mut Self {
        self.weights = weights;
        self
    }

    /// Set how many search nodes the branch-and-bound search may visit. When the budget
    /// runs out the best selection found so far is used. The same inputs and budget
    /// always give the same result.
    pub fn set_node_budget(&mut self, node_budget: u64) -> &mut Self {
        self.limits.node_budget = node_budget;
        self
    }

    /// Set how many of the best ranked candidate patterns are kept per coil.
    pub fn set_pattern_limit(&mut self, pattern_limit: usize) -> &mut Self {
        self.limits.pattern_limit = pattern_limit;
        self
    }

    /// Set how many partial patterns may be visited while enumerating the patterns of a
    /// single coil.
    pub fn set_enumeration_limit(&mut self, enumeration_limit: usize) -> &mut Self {
        self.limits.enumeration_limit = enumeration_limit;
        self
    }

    /// Perform optimization
    pub fn optimize(&self) -> Result<OptimizationResult> {
        self.validate()?;
        Ok(engine::run(
            &self.coils,
            &self.orders,
            &self.line_specs,
            &self.weights,
            &self.limits,
        ))
    }

    fn validate(&self) -> Result<()> {
        fn check(value: f64, entity: &'static str, id: &str, field: &'static str) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::NegativeValue {
                    entity,
                    id: id.to_string(),
                    field,
                })
            }
        }

        for line in &self.line_specs {
            let id = line.line_name.as_str();
            check(line.min_slit_width, "line", id, "min_slit_width")?;
            check(line.max_slit_width, "line", id, "max_slit_width")?;
            check(line.scrap_edge_min, "line", id, "scrap_edge_min")?;
            check(line.scrap_edge_max, "line", id, "scrap_edge_max")?;
            check(line.setup_cost, "line", id, "setup_cost")?;
            check(line.setup_time, "line", id, "setup_time")?;
            if line.min_slit_width > line.max_slit_width {
                return Err(Error::InvalidSlitRange {
                    line: line.line_name.clone(),
                });
            }
        }

        for coil in &self.coils {
            let id = coil.coil_id.as_str();
            check(coil.width, "coil", id, "width")?;
            check(coil.thickness, "coil", id, "thickness")?;
            check(coil.weight, "coil", id, "weight")?;
            if let Some(line) = coil
                .line_compatibility
                .iter()
                .find(|name| !self.line_specs.iter().any(|l| &l.line_name == *name))
            {
                return Err(Error::UnknownLine {
                    coil_id: coil.coil_id.clone(),
                    line: line.clone(),
                });
            }
        }

        for order in &self.orders {
            let id = order.order_id.as_str();
            check(order.required_width, "order", id, "required_width")?;
            check(order.width_tolerance, "order", id, "width_tolerance")?;
            check(order.thickness, "order", id, "thickness")?;
            check(order.weight, "order", id, "weight")?;
            if order.slit_count == Some(0) {
                return Err(Error::InvalidSlitCount {
                    order_id: order.order_id.clone(),
                });
            }
        }

        let weights = [
            ("yield_weight", self.weights.yield_weight),
            ("slit_fulfillment", self.weights.slit_fulfillment),
            ("scrap_penalty", self.weights.scrap_penalty),
            ("setup_penalty", self.weights.setup_penalty),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidWeight { name });
            }
        }

        Ok(())
    }
}
