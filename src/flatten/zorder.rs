//! Stacking order: larger boxes go underneath smaller ones.

use crate::unit::VisualUnit;
use std::collections::HashSet;

/// A unit with its assigned stacking rank
#[derive(Debug, Clone, PartialEq)]
pub struct StackedUnit {
    /// Rank in the area-sorted list; 0 is the largest unit, drawn at the bottom
    pub z_index: usize,
    pub area: f64,
    pub unit: VisualUnit,
}

/// Sort by area (largest first, ties keep input order) and rank.
///
/// Every input unit is kept.
pub fn stack(units: &[VisualUnit]) -> Vec<StackedUnit> {
    sorted(units.iter().cloned())
        .into_iter()
        .enumerate()
        .map(|(z_index, (area, unit))| StackedUnit {
            z_index,
            area,
            unit,
        })
        .collect()
}

/// The units themselves in stacking order.
pub fn order(units: Vec<VisualUnit>) -> Vec<VisualUnit> {
    sorted(units).into_iter().map(|(_, unit)| unit).collect()
}

/// Keep the first unit for each source node of one document. Units without
/// a source ordinal are never merged.
pub fn dedup_sources(units: Vec<VisualUnit>) -> Vec<VisualUnit> {
    let mut seen = HashSet::new();
    units
        .into_iter()
        .filter(|u| match u.source_ordinal {
            Some(ordinal) => seen.insert(ordinal),
            None => true,
        })
        .collect()
}

fn sorted<I>(units: I) -> Vec<(f64, VisualUnit)>
where
    I: IntoIterator<Item = VisualUnit>,
{
    let mut ranked: Vec<(f64, VisualUnit)> = units
        .into_iter()
        .map(|u| {
            let area = u.area();
            (if area.is_finite() { area } else { 0.0 }, u)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(ordinal: Option<usize>, w: f64, h: f64) -> VisualUnit {
        VisualUnit {
            width: w,
            height: h,
            source_ordinal: ordinal,
            ..Default::default()
        }
    }

    #[test]
    fn larger_areas_get_lower_ranks() {
        let stacked = stack(&[unit(Some(1), 10.0, 10.0), unit(Some(2), 100.0, 50.0), unit(Some(3), 20.0, 20.0)]);
        let ordinals: Vec<_> = stacked.iter().map(|s| s.unit.source_ordinal).collect();
        assert_eq!(ordinals, vec![Some(2), Some(3), Some(1)]);
        let ranks: Vec<_> = stacked.iter().map(|s| s.z_index).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(stacked[0].area, 5000.0);
    }

    #[test]
    fn equal_areas_keep_input_order() {
        let ordered = order(vec![unit(Some(4), 5.0, 5.0), unit(Some(2), 5.0, 5.0), unit(Some(9), 1.0, 25.0)]);
        let ordinals: Vec<_> = ordered.iter().map(|u| u.source_ordinal).collect();
        assert_eq!(ordinals, vec![Some(4), Some(2), Some(9)]);
    }

    #[test]
    fn repeated_sources_are_dropped_but_anonymous_units_are_kept() {
        let kept = dedup_sources(vec![
            unit(Some(1), 5.0, 5.0),
            unit(Some(1), 50.0, 5.0),
            unit(None, 1.0, 1.0),
            unit(None, 1.0, 1.0),
        ]);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].width, 5.0);
    }

    #[test]
    fn stacking_keeps_units_that_share_an_ordinal() {
        let stacked = stack(&[unit(Some(3), 5.0, 5.0), unit(Some(3), 50.0, 5.0)]);
        assert_eq!(stacked.len(), 2);
        assert_eq!(stacked[0].unit.width, 50.0);
        assert_eq!(stacked[1].z_index, 1);
    }

    #[test]
    fn non_finite_areas_sink_to_the_top_of_the_stack() {
        let stacked = stack(&[unit(None, f64::NAN, 1.0), unit(None, 2.0, 2.0)]);
        assert_eq!(stacked[0].area, 4.0);
        assert_eq!(stacked[1].area, 0.0);
    }
}
