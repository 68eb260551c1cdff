use super::*;

/// Estimated minutes to slit one coil, setup changes not included.
const MINUTES_PER_COIL: f64 = 20.0;

/// Summary statistics of a set of patterns.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) total_yield: f64,
    pub(crate) total_scrap: f64,
    pub(crate) orders_covered: usize,
    pub(crate) partially_fulfilled_orders: usize,
    pub(crate) unfulfilled_orders: usize,
    pub(crate) order_slits_assigned: BTreeMap<String, u32>,
}

/// Summarizes `patterns`, classifying each order by the slits assigned to it.
/// `slits_assigned` is indexed like `orders`.
pub(crate) fn summarize(
    patterns: &[SlittingPattern],
    orders: &[Order],
    slits_assigned: &[u32],
) -> Summary {
    let total_yield = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.yield_percent).sum::<f64>() / patterns.len() as f64
    };
    let total_scrap = patterns.iter().map(|p| p.scrap_width).sum();

    let mut summary = Summary {
        total_yield,
        total_scrap,
        orders_covered: 0,
        partially_fulfilled_orders: 0,
        unfulfilled_orders: 0,
        order_slits_assigned: BTreeMap::new(),
    };

    for (order, &assigned) in orders.iter().zip(slits_assigned) {
        if assigned >= order.required_slits() {
            summary.orders_covered += 1;
        } else if assigned > 0 {
            summary.partially_fulfilled_orders += 1;
        } else {
            summary.unfulfilled_orders += 1;
        }

        if assigned > 0 {
            *summary
                .order_slits_assigned
                .entry(order.order_id.clone())
                .or_insert(0) += assigned;
        }
    }

    summary
}

/// Load of [`LINE_1`] and [`LINE_2`], for each that has a line spec.
pub(crate) fn line_loads(patterns: &[SlittingPattern], line_specs: &[LineSpec]) -> Vec<LineLoad> {
    [LINE_1, LINE_2]
        .iter()
        .filter_map(|&name| {
            let spec = line_specs.iter().find(|l| l.line_name == name)?;
            let coils = patterns.iter().filter(|p| p.assigned_line == name).count();
            let setup_changes = coils.saturating_sub(1);

            Some(LineLoad {
                line_name: name.to_string(),
                coils,
                setup_changes,
                estimated_minutes: coils as f64 * MINUTES_PER_COIL
                    + setup_changes as f64 * spec.setup_time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{line, order};

    fn pattern(coil_id: &str, line: &str, yield_percent: f64, scrap_width: f64) -> SlittingPattern {
        SlittingPattern {
            coil_id: coil_id.to_string(),
            pattern_id: "P-OR-1".to_string(),
            slit_widths: Vec::new(),
            scrap_width,
            yield_percent,
            score: 0.0,
            assigned_line: line.to_string(),
        }
    }

    #[test]
    fn empty_patterns() {
        let orders = [order("O1", MaterialClass::Hr, 600.0, Some(2))];
        let summary = summarize(&[], &orders, &[0]);

        assert_eq!(summary.total_yield, 0.0);
        assert_eq!(summary.total_scrap, 0.0);
        assert_eq!(summary.orders_covered, 0);
        assert_eq!(summary.unfulfilled_orders, 1);
        assert!(summary.order_slits_assigned.is_empty());
    }

    #[test]
    fn classifies_orders() {
        let orders = [
            order("full", MaterialClass::Hr, 600.0, Some(2)),
            order("over", MaterialClass::Hr, 300.0, None),
            order("partial", MaterialClass::Hr, 200.0, Some(4)),
            order("none", MaterialClass::Hr, 100.0, Some(1)),
        ];
        let patterns = [
            pattern("C1", LINE_1, 96.0, 50.0),
            pattern("C2", LINE_2, 80.0, 200.0),
        ];

        let summary = summarize(&patterns, &orders, &[2, 2, 1, 0]);

        assert_eq!(summary.total_yield, 88.0);
        assert_eq!(summary.total_scrap, 250.0);
        assert_eq!(summary.orders_covered, 2);
        assert_eq!(summary.partially_fulfilled_orders, 1);
        assert_eq!(summary.unfulfilled_orders, 1);
        assert_eq!(
            summary.order_slits_assigned.into_iter().collect::<Vec<_>>(),
            vec![
                ("full".to_string(), 2),
                ("over".to_string(), 2),
                ("partial".to_string(), 1)
            ]
        );
    }

    #[test]
    fn loads_per_line() {
        let lines = [line(LINE_1, 12), line(LINE_2, 8)];
        let patterns = [
            pattern("C1", LINE_1, 90.0, 10.0),
            pattern("C2", LINE_1, 90.0, 10.0),
            pattern("C3", LINE_1, 90.0, 10.0),
        ];

        let loads = line_loads(&patterns, &lines);

        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0].line_name, LINE_1);
        assert_eq!(loads[0].coils, 3);
        assert_eq!(loads[0].setup_changes, 2);
        assert_eq!(loads[0].estimated_minutes, 60.0 + 2.0 * lines[0].setup_time);
        assert_eq!(loads[1].coils, 0);
        assert_eq!(loads[1].setup_changes, 0);
        assert_eq!(loads[1].estimated_minutes, 0.0);
    }

    #[test]
    fn loads_skip_unknown_lines() {
        let loads = line_loads(&[], &[line(LINE_2, 8)]);

        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].line_name, LINE_2);
    }
}
