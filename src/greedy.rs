use super::*;
use crate::compat::{is_compatible, line_for_coil};

use std::cmp::Ordering;

/// Patterns from the greedy packer with the slits it assigned per order index.
#[derive(Clone, Debug)]
pub(crate) struct GreedyPlan {
    pub(crate) patterns: Vec<SlittingPattern>,
    pub(crate) slits_assigned: Vec<u32>,
}

/// High priority first, then orders needing more slits, then wider orders.
fn order_precedence(a: &Order, b: &Order) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.required_slits().cmp(&a.required_slits()))
        .then_with(|| b.required_width.total_cmp(&a.required_width))
}

/// Packs orders onto coils without search. Coils are taken widest first and filled with
/// as many slits of each compatible order, in precedence order, as width and knives
/// allow, never assigning an order more slits than it requires across all coils.
pub(crate) fn greedy_patterns(coils: &[Coil], orders: &[Order], line_specs: &[LineSpec]) -> GreedyPlan {
    let mut sorted_coils: Vec<&Coil> = coils.iter().collect();
    sorted_coils.sort_by(|a, b| b.width.total_cmp(&a.width));

    let mut sorted_orders: Vec<usize> = (0..orders.len()).collect();
    sorted_orders.sort_by(|&a, &b| order_precedence(&orders[a], &orders[b]));

    let mut slits_assigned = vec![0u32; orders.len()];
    let mut patterns = Vec::new();

    for coil in sorted_coils {
        let line = match line_for_coil(coil, line_specs) {
            Some(line) => line,
            None => continue,
        };

        let mut remaining_width = coil.width - line.scrap_edge_min * 2.0;
        let mut knives = 0u32;
        let mut slit_widths: Vec<SlitWidth> = Vec::new();

        for &i in &sorted_orders {
            if knives >= line.max_knives {
                break;
            }

            let order = &orders[i];
            if !is_compatible(coil, order) || !line.accepts_slit(order.required_width) {
                continue;
            }

            let needed = order.required_slits().saturating_sub(slits_assigned[i]);
            if needed == 0 {
                continue;
            }

            let fit_by_width = (remaining_width / order.required_width).floor().max(0.0) as u32;
            let count = fit_by_width.min(line.max_knives - knives).min(needed);

            if count > 0 {
                slit_widths.push(SlitWidth {
                    width: order.required_width,
                    order_id: order.order_id.clone(),
                    quantity: count,
                });
                remaining_width -= order.required_width * count as f64;
                knives += count;
                slits_assigned[i] += count;
            }
        }

        if slit_widths.is_empty() {
            continue;
        }

        let used_width: f64 = slit_widths
            .iter()
            .map(|s| s.width * s.quantity as f64)
            .sum();
        let yield_percent = if coil.width > 0.0 {
            used_width / coil.width * 100.0
        } else {
            0.0
        };

        patterns.push(SlittingPattern {
            coil_id: coil.coil_id.clone(),
            pattern_id: format!("P-G-{}", patterns.len() + 1),
            slit_widths,
            scrap_width: coil.width - used_width,
            yield_percent,
            score: yield_percent,
            assigned_line: line.line_name.clone(),
        });
    }

    GreedyPlan {
        patterns,
        slits_assigned,
    }
}
