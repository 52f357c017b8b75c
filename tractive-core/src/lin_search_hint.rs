use crate::imports::*;

/// Has method that returns the coordinate, in km, at which an entry begins
pub trait GetCoordinate {
    /// Returns the coordinate, in km
    fn get_coordinate(&self) -> f64;
}

/// Contains method to calculate the index immediately before `coordinate` given the previous
/// calculated index, `idx`.  Coordinates only ever grow during a run, so the search only walks
/// forward from the hint.
pub trait LinSearchHint {
    /// Calculate the index of the last entry whose coordinate is less than or equal to
    /// `coordinate`, starting the walk at `idx`.
    fn calc_idx(&self, coordinate: f64, idx: usize) -> anyhow::Result<usize>;
}

impl<T: GetCoordinate> LinSearchHint for [T] {
    /// # Arguments
    /// - `coordinate`: position of the train along the direction of travel
    /// - `idx`: index found on the previous call, or 0
    fn calc_idx(&self, coordinate: f64, mut idx: usize) -> anyhow::Result<usize> {
        ensure!(!self.is_empty(), "{}\nCannot search an empty slice!", format_dbg!());
        ensure!(
            idx < self.len(),
            "{}\nHint index {} is out of bounds for length {}!",
            format_dbg!(),
            idx,
            self.len()
        );
        while idx + 1 < self.len() && self[idx + 1].get_coordinate() <= coordinate {
            idx += 1;
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mark(f64);

    impl GetCoordinate for Mark {
        fn get_coordinate(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_calc_idx_walks_forward() {
        let marks = [Mark(0.0), Mark(1.0), Mark(2.5), Mark(4.0)];
        assert_eq!(marks.calc_idx(0.5, 0).unwrap(), 0);
        assert_eq!(marks.calc_idx(2.5, 0).unwrap(), 2);
        assert_eq!(marks.calc_idx(3.9, 1).unwrap(), 2);
        assert_eq!(marks.calc_idx(100.0, 2).unwrap(), 3);
        // the hint never moves backward
        assert_eq!(marks.calc_idx(0.0, 2).unwrap(), 2);
    }

    #[test]
    fn test_calc_idx_rejects_bad_hint() {
        let marks = [Mark(0.0)];
        assert!(marks.calc_idx(0.0, 3).is_err());
        let empty: [Mark; 0] = [];
        assert!(empty.calc_idx(0.0, 0).is_err());
    }
}
