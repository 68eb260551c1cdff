use super::*;

use log::debug;

/// Evens out the number of patterns on [`LINE_1`] and [`LINE_2`].
///
/// When the counts differ by more than one and a spec for [`LINE_2`] exists, every pattern
/// is reassigned by alternating between the lines. The alternation does not check the
/// line's material capability, so a pattern can end up on a line that cannot run its
/// coil. Returns whether the patterns were reassigned.
pub(crate) fn balance_lines(patterns: &mut [SlittingPattern], line_specs: &[LineSpec]) -> bool {
    let count = |name: &str| patterns.iter().filter(|p| p.assigned_line == name).count();
    let line_1 = count(LINE_1);
    let line_2 = count(LINE_2);

    let has_line_2 = line_specs.iter().any(|l| l.line_name == LINE_2);
    if line_1.abs_diff(line_2) <= 1 || !has_line_2 {
        return false;
    }

    debug!(
        "rebalancing {} patterns ({} on {}, {} on {})",
        patterns.len(),
        line_1,
        LINE_1,
        line_2,
        LINE_2
    );

    for (i, pattern) in patterns.iter_mut().enumerate() {
        let line = if i % 2 == 0 { LINE_1 } else { LINE_2 };
        pattern.assigned_line = line.to_string();
    }

    true
}
