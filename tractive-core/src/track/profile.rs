use crate::imports::*;
use crate::ordered::OrderedSeq;

#[readonly::make]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Track segment of constant grade
pub struct ProfileElement {
    /// Coordinate at which the segment begins, km
    pub start_coordinate: f64,
    /// Segment length, km
    pub length: f64,
    /// Longitudinal grade, ‰ (equal to N/kN of grade resistance), positive uphill toward
    /// increasing coordinate
    pub grade: f64,
    /// Curve resistance expressed as an equivalent grade, ‰
    #[serde(default)]
    pub curve_equivalent_grade: f64,
    /// Reduced grade, i.e. `grade + curve_equivalent_grade`, in N/kN
    #[serde(default)]
    pub specific_resistance_from_grade: f64,
}

impl ProfileElement {
    pub fn new(start_coordinate: f64, length: f64, grade: f64, curve_equivalent_grade: f64) -> Self {
        Self {
            start_coordinate,
            length,
            grade,
            curve_equivalent_grade,
            specific_resistance_from_grade: grade + curve_equivalent_grade,
        }
    }

    /// Coordinate at which the segment ends, km
    pub fn end_coordinate(&self) -> f64 {
        self.start_coordinate + self.length
    }

    /// Same segment seen by a train running toward decreasing coordinate, with coordinates
    /// mirrored so that the run still advances toward increasing values.
    pub fn mirrored(&self) -> Self {
        Self::new(
            -self.end_coordinate(),
            self.length,
            -self.grade,
            self.curve_equivalent_grade,
        )
    }
}

impl GetCoordinate for ProfileElement {
    fn get_coordinate(&self) -> f64 {
        self.start_coordinate
    }
}

impl Init for ProfileElement {
    fn init(&mut self) -> Result<(), Error> {
        if ![
            self.start_coordinate,
            self.length,
            self.grade,
            self.curve_equivalent_grade,
        ]
        .iter()
        .all(|v| v.is_finite())
        {
            return Err(Error::Validation(format!(
                "profile element at {} km has non-finite values",
                self.start_coordinate
            )));
        }
        if self.length <= 0.0 {
            return Err(Error::Validation(format!(
                "profile element at {} km must have positive length",
                self.start_coordinate
            )));
        }
        self.specific_resistance_from_grade = self.grade + self.curve_equivalent_grade;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Ordered, gap-free list of [ProfileElement]s
pub struct Profile {
    elements: OrderedSeq<ProfileElement>,
}

/// Allowed mismatch between the end of one element and the start of the next, km
const CONTIGUITY_TOL: f64 = 1e-6;

impl Profile {
    pub fn new(elements: Vec<ProfileElement>) -> anyhow::Result<Self> {
        let mut profile = Self {
            elements: OrderedSeq::new(elements)?,
        };
        profile.init()?;
        Ok(profile)
    }

    pub fn elements(&self) -> &[ProfileElement] {
        &self.elements
    }

    /// Coordinate of the beginning of the first element, km
    pub fn start(&self) -> f64 {
        self.elements
            .first()
            .map(|e| e.start_coordinate)
            .unwrap_or_default()
    }

    /// Coordinate of the end of the last element, km
    pub fn end(&self) -> f64 {
        self.elements
            .last()
            .map(|e| e.end_coordinate())
            .unwrap_or_default()
    }

    /// Whether the profile covers the travel interval between `from` and `to`, in either order
    pub fn covers(&self, from: f64, to: f64) -> bool {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        !self.elements.is_empty()
            && self.start() <= lo + CONTIGUITY_TOL
            && hi <= self.end() + CONTIGUITY_TOL
    }

    /// Profile for travel toward decreasing coordinate, expressed in mirrored coordinates
    pub fn reversed(&self) -> anyhow::Result<Self> {
        Self::new(self.elements.iter().rev().map(|e| e.mirrored()).collect())
    }

    /// Element containing `coordinate`; coordinates outside of the profile map to the first or
    /// last element.
    pub fn element_at(&self, coordinate: f64) -> Option<&ProfileElement> {
        let idx = self
            .elements
            .partition_point(|e| e.start_coordinate <= coordinate)
            .saturating_sub(1);
        self.elements.get(idx)
    }

    /// Hinted lookup of the index of the element containing `coordinate`, for forward travel
    pub fn idx_at(&self, coordinate: f64, hint: usize) -> anyhow::Result<usize> {
        self.elements.calc_idx(coordinate, hint)
    }
}

impl Init for Profile {
    fn init(&mut self) -> Result<(), Error> {
        if self.elements.is_empty() {
            return Err(Error::Validation("profile must not be empty".into()));
        }
        self.elements.init()?;
        let mut elements = self.elements.to_vec();
        for element in elements.iter_mut() {
            element.init()?;
        }
        if let Some(w) = elements
            .windows(2)
            .find(|w| (w[0].end_coordinate() - w[1].start_coordinate).abs() > CONTIGUITY_TOL)
        {
            return Err(Error::Validation(format!(
                "profile has a gap or overlap between {} km and {} km",
                w[0].end_coordinate(),
                w[1].start_coordinate
            )));
        }
        self.elements = OrderedSeq::new(elements).map_err(|err| Error::Init(err.to_string()))?;
        Ok(())
    }
}
impl SerdeAPI for Profile {}

impl Valid for Profile {
    /// 10 km line: level, a 6 ‰ climb with a curve, level, and a 4 ‰ descent
    fn valid() -> Self {
        Self {
            elements: OrderedSeq::new(vec![
                ProfileElement::new(0.0, 2.0, 0.0, 0.0),
                ProfileElement::new(2.0, 3.0, 6.0, 0.4),
                ProfileElement::new(5.0, 2.0, 0.0, 0.0),
                ProfileElement::new(7.0, 3.0, -4.0, 0.0),
            ])
            .unwrap(),
        }
    }
}
