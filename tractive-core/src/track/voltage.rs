use crate::imports::*;
use crate::ordered::OrderedSeq;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltagePoint {
    /// km
    pub coordinate: f64,
    /// Catenary voltage, V
    pub voltage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Measured or computed catenary voltage along the track.  Between points the voltage is
/// interpolated linearly and it is held constant beyond the ends.
pub struct RealVoltage {
    points: OrderedSeq<VoltagePoint>,
}

impl RealVoltage {
    pub fn new(points: Vec<VoltagePoint>) -> anyhow::Result<Self> {
        let mut voltage = Self {
            points: OrderedSeq::new(points)?,
        };
        voltage.init()?;
        Ok(voltage)
    }

    pub fn points(&self) -> &[VoltagePoint] {
        &self.points
    }

    /// Voltage at `coordinate`, V
    pub fn voltage_at(&self, coordinate: f64) -> anyhow::Result<f64> {
        let x: Vec<f64> = self.points.iter().map(|p| p.coordinate).collect();
        let y: Vec<f64> = self.points.iter().map(|p| p.voltage).collect();
        interp1d(coordinate, &x, &y, false)
    }

    /// Ratio of the real voltage at `coordinate` to `nominal`
    pub fn ratio_at(&self, coordinate: f64, nominal: f64) -> anyhow::Result<f64> {
        ensure!(nominal > 0.0, format_dbg!(nominal));
        Ok(self.voltage_at(coordinate)? / nominal)
    }

    /// Same points in mirrored coordinates, for travel toward decreasing coordinate
    pub fn reversed(&self) -> anyhow::Result<Self> {
        Self::new(
            self.points
                .iter()
                .rev()
                .map(|p| VoltagePoint {
                    coordinate: -p.coordinate,
                    voltage: p.voltage,
                })
                .collect(),
        )
    }
}

impl Init for RealVoltage {
    fn init(&mut self) -> Result<(), Error> {
        self.points.init()?;
        if self.points.is_empty() {
            return Err(Error::Validation("voltage profile must not be empty".into()));
        }
        if self.points.iter().any(|p| !(p.voltage > 0.0)) {
            return Err(Error::Validation("voltages must be positive".into()));
        }
        Ok(())
    }
}
impl SerdeAPI for RealVoltage {}
