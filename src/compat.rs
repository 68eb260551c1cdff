use super::*;

/// Coils and orders whose thicknesses differ by this much or more are not compatible.
pub(crate) const THICKNESS_TOLERANCE: f64 = 0.1;

/// A coil together with the orders it can be slit for and the line it will run on.
#[derive(Clone, Debug)]
pub(crate) struct CompatiblePair<'a> {
    pub(crate) coil: &'a Coil,

    /// Indices into the order list, in input order.
    pub(crate) orders: Vec<usize>,

    pub(crate) line: &'a LineSpec,
}

/// Returns whether slits for `order` can be cut from `coil`.
pub(crate) fn is_compatible(coil: &Coil, order: &Order) -> bool {
    order.material == coil.material
        && order.grade == coil.grade
        && (order.thickness - coil.thickness).abs() < THICKNESS_TOLERANCE
}

/// Returns the first line that the coil may run on and that can process its material.
pub(crate) fn line_for_coil<'a>(coil: &Coil, line_specs: &'a [LineSpec]) -> Option<&'a LineSpec> {
    line_specs.iter().find(|line| {
        coil.line_compatibility
            .iter()
            .any(|name| *name == line.line_name)
            && line.supports(coil.material)
    })
}

/// Pairs every coil with its compatible orders and a line. Coils without compatible
/// orders or without a usable line are left out.
pub(crate) fn compatible_pairs<'a>(
    coils: &'a [Coil],
    orders: &[Order],
    line_specs: &'a [LineSpec],
) -> Vec<CompatiblePair<'a>> {
    coils
        .iter()
        .filter_map(|coil| {
            let compatible: Vec<usize> = orders
                .iter()
                .enumerate()
                .filter(|(_, order)| is_compatible(coil, order))
                .map(|(i, _)| i)
                .collect();

            if compatible.is_empty() {
                return None;
            }

            line_for_coil(coil, line_specs).map(|line| CompatiblePair {
                coil,
                orders: compatible,
                line,
            })
        })
        .collect()
}
