//! Immutable, coordinate-ordered sequence.

use crate::imports::*;
use std::ops::Deref;

/// A sequence of entries whose coordinates never decrease.  The ordering is checked when the
/// sequence is built (or initialized after deserialization) and the wrapper only hands out
/// shared slices, so it cannot be broken afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedSeq<T>(Vec<T>);

impl<T: GetCoordinate> OrderedSeq<T> {
    pub fn new(items: Vec<T>) -> anyhow::Result<Self> {
        let seq = Self(items);
        seq.check_order()?;
        Ok(seq)
    }

    fn check_order(&self) -> Result<(), Error> {
        if let Some(w) = self
            .0
            .windows(2)
            .find(|w| !(w[0].get_coordinate() <= w[1].get_coordinate()))
        {
            return Err(Error::Validation(format!(
                "coordinates must be ordered ascending, found {} before {}",
                w[0].get_coordinate(),
                w[1].get_coordinate()
            )));
        }
        Ok(())
    }

    /// Consumes the sequence and returns the inner entries
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for OrderedSeq<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for OrderedSeq<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T: GetCoordinate> Init for OrderedSeq<T> {
    fn init(&mut self) -> Result<(), Error> {
        self.check_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Mark(f64);

    impl GetCoordinate for Mark {
        fn get_coordinate(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_ordered_seq_accepts_sorted() {
        let seq = OrderedSeq::new(vec![Mark(0.0), Mark(0.0), Mark(3.0)]).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[2], Mark(3.0));
    }

    #[test]
    fn test_ordered_seq_rejects_unsorted() {
        let err = OrderedSeq::new(vec![Mark(1.0), Mark(0.5)]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Validation(_))
        ));
    }

    #[test]
    fn test_ordered_seq_rejects_nan() {
        assert!(OrderedSeq::new(vec![Mark(0.0), Mark(f64::NAN)]).is_err());
    }
}
