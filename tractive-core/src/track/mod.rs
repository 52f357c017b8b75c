//! Track-side inputs: grade profile, speed limits, scheduled stops, supply voltage and
//! traction-rate restrictions.  All of them are read once per computation and derived per
//! direction of travel; none of them is mutated during a run.

mod profile;
mod speed_limit;
mod stop;
mod traction_rate;
mod voltage;

pub use profile::*;
pub use speed_limit::*;
pub use stop::*;
pub use traction_rate::*;
pub use voltage::*;

use crate::imports::*;

#[duplicate_item(Entry; [SpeedLimit]; [Stop]; [TractionRate]; [VoltagePoint])]
impl GetCoordinate for Entry {
    fn get_coordinate(&self) -> f64 {
        self.coordinate
    }
}

/// Mirrors a list of closing breakpoints, where each `(coordinate, value)` pair holds `value` on
/// the section that ends at `coordinate`.  After mirroring the coordinates are negated and the
/// final section, which was open toward lower coordinates, becomes open-ended.
pub(crate) fn mirror_sections(sections: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut mirrored = Vec::with_capacity(sections.len());
    for i in (1..sections.len()).rev() {
        mirrored.push((-sections[i - 1].0, sections[i].1));
    }
    if let Some(first) = sections.first() {
        mirrored.push((f64::INFINITY, first.1));
    }
    mirrored
}

/// Index of the section that contains `coordinate` for closing breakpoints, walking forward
/// from `idx`.
pub(crate) fn section_idx<T: GetCoordinate>(sections: &[T], coordinate: f64, mut idx: usize) -> usize {
    while idx + 1 < sections.len() && sections[idx].get_coordinate() < coordinate {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_sections() {
        let sections = [(2.0, 60.0), (5.0, 80.0), (9.0, 40.0)];
        let mirrored = mirror_sections(&sections);
        assert_eq!(
            mirrored,
            vec![(-5.0, 40.0), (-2.0, 80.0), (f64::INFINITY, 60.0)]
        );
    }

    #[test]
    fn test_section_idx() {
        let sections = [
            SpeedLimit::new(2.0, 60.0),
            SpeedLimit::new(5.0, 80.0),
            SpeedLimit::new(9.0, 40.0),
        ];
        assert_eq!(section_idx(&sections, 0.0, 0), 0);
        assert_eq!(section_idx(&sections, 2.0, 0), 0);
        assert_eq!(section_idx(&sections, 2.1, 0), 1);
        assert_eq!(section_idx(&sections, 50.0, 1), 2);
        // the hint never moves backward
        assert_eq!(section_idx(&sections, 0.0, 2), 2);
    }
}
