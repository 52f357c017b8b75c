use super::*;
use crate::averaging::TractiveResult;
use crate::imports::*;
use crate::track::*;
use rayon::prelude::*;

/// Hard bound on the number of steps of one run
pub const MAX_STEPS: usize = 10_000_000;
/// Initial step of the throttle search
pub const THROTTLE_STEP_INIT: f64 = 0.005;
/// Smallest step of the throttle search
pub const THROTTLE_STEP_MIN: f64 = 0.001;
/// Iteration bound of the throttle search
pub const THROTTLE_MAX_ITER: usize = 2000;
/// Speed below which a train near a stop counts as arrived, km/h
pub(crate) const STOP_ARRIVAL_SPEED: f64 = 1.0;
/// Distance to a stop within which a slow train counts as arrived, km
const STOP_ARRIVAL_DISTANCE: f64 = 0.05;
/// Shortfall below the braking curve that still counts as following it, km/h
const BRAKE_FOLLOW_TOLERANCE: f64 = 0.5;

fn default_initial_overheat() -> f64 {
    thermal::AMBIENT_OVERHEAT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Everything needed to compute the motion of one train over a stretch of line.
/// Coordinates are real track coordinates in km and speeds are in km/h.
pub struct TractionInputs {
    pub profile: Profile,
    pub speed_limits: SpeedLimits,
    pub start_coordinate: f64,
    pub finish_coordinate: f64,
    #[serde(default)]
    pub track_type: TrackType,
    #[serde(default)]
    pub start_speed: f64,
    /// Initial throttle position; selects the notch of notched locomotives
    #[serde(default)]
    pub start_throttle: f64,
    pub tractive_positions: TractivePositions,
    /// Width of the regulation band, km/h
    pub speed_zone: f64,
    /// Auxiliary current of the train, A
    #[serde(default)]
    pub aux_amperage: f64,
    #[serde(default)]
    pub recuperation_enabled: bool,
    pub adhesion_coefficient: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recuperation_positions: Option<TractivePositions>,
    pub locomotive: Locomotive,
    #[serde(default)]
    pub current_type: CurrentType,
    /// Travel toward decreasing real coordinate
    #[serde(default)]
    pub reverse_direction: bool,
    /// Coast ahead of lower limits along the idle curve
    #[serde(default)]
    pub idle_optimization: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<RealVoltage>,
    pub train: Train,
    #[serde(default)]
    pub stops: Vec<Stop>,
    pub time_slot: si::Time,
    #[serde(default)]
    pub traction_rates: TractionRates,
    pub thermal: ThermalCharacteristic,
    /// °C
    #[serde(default = "default_initial_overheat")]
    pub initial_overheat: f64,
}

impl Init for TractionInputs {
    fn init(&mut self) -> Result<(), Error> {
        self.profile.init()?;
        self.speed_limits.init()?;
        self.tractive_positions.init()?;
        self.recuperation_positions.init()?;
        self.locomotive.init()?;
        self.voltage.init()?;
        self.train.init()?;
        self.stops.init()?;
        self.traction_rates.init()?;
        self.thermal.init()?;
        if !(self.time_slot > si::Time::ZERO) {
            return Err(Error::Validation("time slot must be positive".into()));
        }
        if !(self.adhesion_coefficient > 0.0 && self.adhesion_coefficient <= 1.0) {
            return Err(Error::Validation(format!(
                "adhesion coefficient must be in (0, 1], got {}",
                self.adhesion_coefficient
            )));
        }
        if !(self.speed_zone >= 0.0) {
            return Err(Error::Validation("speed zone must not be negative".into()));
        }
        if !(self.start_speed >= 0.0) {
            return Err(Error::Validation("start speed must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.start_throttle) {
            return Err(Error::Validation(format!(
                "start throttle must be in [0, 1], got {}",
                self.start_throttle
            )));
        }
        let forward = self.finish_coordinate > self.start_coordinate;
        let backward = self.finish_coordinate < self.start_coordinate;
        if !(forward && !self.reverse_direction || backward && self.reverse_direction) {
            return Err(Error::Validation(format!(
                "travel from {} km to {} km does not match reverse_direction = {}",
                self.start_coordinate, self.finish_coordinate, self.reverse_direction
            )));
        }
        if !self
            .profile
            .covers(self.start_coordinate, self.finish_coordinate)
        {
            return Err(Error::Validation(format!(
                "profile [{}, {}] km does not cover travel from {} km to {} km",
                self.profile.start(),
                self.profile.end(),
                self.start_coordinate,
                self.finish_coordinate
            )));
        }
        let last_limit = self
            .speed_limits
            .limits()
            .last()
            .map(|l| l.coordinate)
            .unwrap_or(f64::NEG_INFINITY);
        if last_limit < self.start_coordinate.max(self.finish_coordinate) {
            return Err(Error::Validation(format!(
                "speed limits end at {} km before the end of travel",
                last_limit
            )));
        }
        if self.current_type == CurrentType::Ac {
            self.tractive_positions.require_full_amperage()?;
            if let Some(rec) = &self.recuperation_positions {
                rec.require_full_amperage()?;
            }
        }
        Ok(())
    }
}
impl SerdeAPI for TractionInputs {}

impl Default for TractionInputs {
    fn default() -> Self {
        Self {
            profile: Default::default(),
            speed_limits: Default::default(),
            start_coordinate: 0.0,
            finish_coordinate: 0.0,
            track_type: Default::default(),
            start_speed: 0.0,
            start_throttle: 0.0,
            tractive_positions: Default::default(),
            speed_zone: 5.0,
            aux_amperage: 0.0,
            recuperation_enabled: false,
            adhesion_coefficient: 1.0,
            recuperation_positions: None,
            locomotive: Default::default(),
            current_type: Default::default(),
            reverse_direction: false,
            idle_optimization: false,
            voltage: None,
            train: Default::default(),
            stops: vec![],
            time_slot: uc::S,
            traction_rates: Default::default(),
            thermal: Default::default(),
            initial_overheat: thermal::AMBIENT_OVERHEAT,
        }
    }
}

impl Valid for TractionInputs {
    fn valid() -> Self {
        Self {
            profile: Profile::valid(),
            speed_limits: SpeedLimits::valid(),
            start_coordinate: 0.0,
            finish_coordinate: 10.0,
            tractive_positions: TractivePositions::valid(),
            aux_amperage: 20.0,
            adhesion_coefficient: 0.9,
            locomotive: Locomotive::valid(),
            train: Train::valid(),
            thermal: ThermalCharacteristic::valid(),
            ..Self::default()
        }
    }
}

impl TractionInputs {
    /// Validates the inputs and prepares a simulation in internal coordinates
    pub fn make_tractive_sim(&self) -> anyhow::Result<TractiveSim> {
        let mut inputs = self.clone();
        inputs.init().with_context(|| format_dbg!())?;
        let sign = if inputs.reverse_direction { -1.0 } else { 1.0 };
        let start = sign * inputs.start_coordinate;
        let finish = sign * inputs.finish_coordinate;

        let mut stop_coords: Vec<f64> = inputs
            .stops
            .iter()
            .map(|s| sign * s.coordinate)
            .filter(|&c| {
                let inside = c > start && c < finish;
                #[cfg(feature = "logging")]
                if !inside {
                    log::debug!("ignoring stop at {} km outside of the run", sign * c);
                }
                inside
            })
            .collect();
        stop_coords.sort_by(|a, b| a.total_cmp(b));

        let profile = if inputs.reverse_direction {
            inputs.profile.reversed()?
        } else {
            inputs.profile.clone()
        };
        let limits = inputs
            .speed_limits
            .for_travel(inputs.reverse_direction, &stop_coords)?;
        let rates = inputs
            .traction_rates
            .for_travel(inputs.reverse_direction)?;
        let voltage = match (&inputs.voltage, inputs.reverse_direction) {
            (Some(v), true) => Some(v.reversed()?),
            (v, false) => v.clone(),
            (None, true) => None,
        };
        let resistance =
            RunningResistance::new(&inputs.locomotive, &inputs.train, inputs.track_type)?;
        let weight = total_weight(&inputs.locomotive, &inputs.train);
        let recuperation = if inputs.recuperation_enabled {
            inputs.recuperation_positions.clone()
        } else {
            None
        };
        // squared speed shed per km of full service braking on level track, (km/h)²/km
        let reach = 7200.0
            * ZETA
            * inputs.adhesion_coefficient
            * inputs.train.standard_brake_force;
        let targets = (0..limits.len())
            .map(|idx| limits.target(idx, reach))
            .collect();
        let notch = inputs.tractive_positions.notch(inputs.start_throttle);
        let mut state =
            SimulationState::new(start, inputs.start_speed, inputs.start_throttle, notch);
        state.limit_idx = limits.section_idx(start, 0);
        state.profile_idx = profile.idx_at(start, 0)?;

        Ok(TractiveSim {
            reverse: inputs.reverse_direction,
            finish,
            profile,
            limits,
            targets,
            rates,
            voltage,
            nominal_voltage: inputs.locomotive.nominal_voltage,
            positions: inputs.tractive_positions.clone(),
            recuperation,
            resistance,
            weight,
            loco_count: inputs.locomotive.count as f64,
            generator_power: inputs.train.generator_power,
            brake_force: inputs.train.standard_brake_force,
            adhesion: inputs.adhesion_coefficient,
            speed_zone: inputs.speed_zone,
            aux_amperage: inputs.aux_amperage,
            current_type: inputs.current_type,
            idle_optimization: inputs.idle_optimization,
            stops: inputs.stops.clone(),
            time_slot: inputs.time_slot,
            reference_mass: inputs.locomotive.total_mass() + inputs.train.mass,
            thermal: ThermalModel::new(inputs.thermal.clone(), inputs.initial_overheat),
            idle_curve: None,
            brake_curve: None,
            curve_limit: f64::NAN,
            state,
            history: Vec::new(),
        })
    }
}

/// Forces and currents chosen for one step
#[derive(Debug, Clone, Copy)]
struct StepForces {
    /// N/kN
    specific_force: f64,
    /// kN per locomotive
    force: f64,
    throttle: f64,
    load: Load,
    motor_amperage: f64,
    /// Motors carry current and heat up
    loaded: bool,
    /// Stop coordinate at which the train comes to rest within the step
    halt: Option<f64>,
}

#[derive(Debug, Clone)]
/// Time-stepped traction calculation for one train.  Built by
/// [TractionInputs::make_tractive_sim]; [TractiveSim::walk] fills [TractiveSim::history].
pub struct TractiveSim {
    reverse: bool,
    finish: f64,
    profile: Profile,
    limits: SpeedLimits,
    /// Lookahead target of each speed-limit section
    targets: Vec<Option<SpeedLimit>>,
    rates: TractionRates,
    voltage: Option<RealVoltage>,
    nominal_voltage: f64,
    positions: TractivePositions,
    recuperation: Option<TractivePositions>,
    resistance: RunningResistance,
    /// kN
    weight: f64,
    loco_count: f64,
    generator_power: f64,
    brake_force: f64,
    adhesion: f64,
    speed_zone: f64,
    aux_amperage: f64,
    current_type: CurrentType,
    idle_optimization: bool,
    stops: Vec<Stop>,
    time_slot: si::Time,
    reference_mass: si::Mass,
    thermal: ThermalModel,
    idle_curve: Option<LookaheadCurve>,
    brake_curve: Option<LookaheadCurve>,
    /// Section limit the curves were generated under
    curve_limit: f64,
    pub state: SimulationState,
    pub history: Vec<Element>,
}

impl TractiveSim {
    /// Real coordinate of internal coordinate `coordinate`
    fn real(&self, coordinate: f64) -> f64 {
        if self.reverse {
            -coordinate
        } else {
            coordinate
        }
    }

    fn dt(&self) -> f64 {
        self.time_slot.get::<si::second>()
    }

    pub fn reference_mass(&self) -> si::Mass {
        self.reference_mass
    }

    pub fn peak_overheat(&self) -> f64 {
        self.thermal.peak()
    }

    fn retardation(&self) -> Retardation<'_> {
        Retardation {
            profile: &self.profile,
            resistance: &self.resistance,
            weight: self.weight,
            generator_power: self.generator_power,
            adhesion: self.adhesion,
            brake_force: self.brake_force,
        }
    }

    fn voltage_ratio(&self, coordinate: f64) -> anyhow::Result<f64> {
        match &self.voltage {
            Some(v) => v.ratio_at(coordinate, self.nominal_voltage),
            None => Ok(1.0),
        }
    }

    fn target(&self, limit_idx: usize) -> Option<SpeedLimit> {
        self.targets.get(limit_idx).copied().flatten()
    }

    fn aux_load(&self) -> Result<Load, Error> {
        Load::new(self.current_type, self.aux_amperage, Some(self.aux_amperage))
    }

    /// Steps until the train reaches the finish coordinate
    pub fn walk(&mut self) -> anyhow::Result<()> {
        while self.state.coordinate < self.finish {
            self.step()?;
        }
        #[cfg(feature = "logging")]
        log::info!(
            "traction run finished at {} km after {} steps, peak overheat {} °C",
            self.real(self.state.coordinate).format_eng(Some(6)),
            self.history.len(),
            self.thermal.peak().format_eng(Some(4))
        );
        Ok(())
    }

    pub fn step(&mut self) -> anyhow::Result<()> {
        if self.state.i >= MAX_STEPS {
            bail!(Error::Validation(format!(
                "run did not finish within {MAX_STEPS} steps, stuck at {} km",
                self.real(self.state.coordinate)
            )));
        }
        self.solve_step()
            .map_err(|err| err.context(format!("time step: {}", self.state.i)))?;
        self.state.i += 1;
        Ok(())
    }

    pub fn solve_step(&mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.pending_stop() {
            return self.stop_at(stop);
        }
        let x = self.state.coordinate;
        let v = self.state.speed;
        let dt = self.dt();

        self.state.limit_idx = self.limits.section_idx(x, self.state.limit_idx);
        let limit = self
            .limits
            .get(self.state.limit_idx)
            .map(|l| l.limit)
            .with_context(|| format_dbg!(self.state.limit_idx))?;
        let target = self.target(self.state.limit_idx);
        self.update_curves(target, limit);

        self.state.profile_idx = self.profile.idx_at(x, self.state.profile_idx)?;
        let grade = self.profile.elements()[self.state.profile_idx].specific_resistance_from_grade;
        let (rate, rate_idx) = self.rates.rate_at(x, self.state.rate_idx);
        self.state.rate_idx = rate_idx;

        let (vt, vc) = band(limit, grade, self.speed_zone);
        let mut regime = self.select_regime(limit, target, vt, vc);
        let mut forces = match regime {
            Regime::Traction => self.traction(grade, rate, vt, vc)?,
            Regime::Coast => StepForces {
                specific_force: -(self.resistance.idle(v)
                    + grade
                    + self.retardation().generator(v)),
                force: 0.0,
                throttle: 0.0,
                load: self.aux_load()?,
                motor_amperage: 0.0,
                loaded: false,
                halt: None,
            },
            Regime::Braking => self.braking(grade, vc, target)?,
        };
        if regime != Regime::Braking && self.crosses_brake_curve(target, forces.specific_force) {
            regime = Regime::Braking;
            forces = self.braking(grade, vc, target)?;
        }
        #[cfg(feature = "logging")]
        if regime != self.state.regime {
            log::debug!(
                "{} -> {} at {} km, {} km/h",
                self.state.regime,
                regime,
                self.real(x).format_eng(Some(6)),
                v.format_eng(Some(4))
            );
        }

        let mut dv = forces.specific_force * ZETA * dt;
        if regime == Regime::Braking {
            // brakes stop the train, they do not reverse it
            dv = dv.max(-v);
        }
        let new_speed = v + dv;
        if new_speed < 0.0 && limit > 0.0 {
            bail!(Error::InsufficientPower {
                coordinate: self.real(x)
            });
        }
        let new_coordinate = forces
            .halt
            .unwrap_or(x + (v + dv / 2.0) * dt / 3600.0);

        let overheat = self.thermal.step(
            forces.loaded.then_some(forces.motor_amperage),
            self.time_slot,
            self.real(new_coordinate),
        )?;
        self.history.push(Element {
            coordinate: self.real(new_coordinate),
            speed: new_speed,
            load: forces.load,
            regime,
            force: forces.force,
            throttle_position: forces.throttle,
            speed_limit: limit,
            motor_temperature: overheat,
            motor_amperage: forces.motor_amperage,
        });
        self.state.coordinate = new_coordinate;
        self.state.speed = new_speed;
        self.state.regime = regime;
        Ok(())
    }

    /// Coordinate of the stop the train has just reached, if any
    fn pending_stop(&self) -> Option<f64> {
        let target = self.target(self.state.limit_idx)?;
        let x = self.state.coordinate;
        let arrived = x >= target.coordinate
            || (self.state.speed <= STOP_ARRIVAL_SPEED
                && target.coordinate - x <= STOP_ARRIVAL_DISTANCE);
        (target.limit == 0.0 && arrived).then_some(target.coordinate)
    }

    /// Halts the train at the stop and emits the standing elements.  A train that ran past the
    /// stop stands where it is.
    fn stop_at(&mut self, stop: f64) -> anyhow::Result<()> {
        let at = self.state.coordinate.max(stop);
        let real = self.real(at);
        let duration = stop_duration(&self.stops, self.real(stop));
        let overheat = self.thermal.step(None, duration, real)?;
        let standing = (duration / self.time_slot).get::<si::ratio>().round() as usize;
        #[cfg(feature = "logging")]
        log::debug!(
            "stop at {} km for {} s",
            real.format_eng(Some(6)),
            duration.get::<si::second>().format_eng(Some(4))
        );
        let load = self.aux_load()?;
        for _ in 0..standing {
            self.history.push(Element {
                coordinate: real,
                speed: 0.0,
                load,
                regime: Regime::Coast,
                force: 0.0,
                throttle_position: 0.0,
                speed_limit: 0.0,
                motor_temperature: overheat,
                motor_amperage: 0.0,
            });
        }
        self.state.coordinate = at;
        self.state.speed = 0.0;
        self.state.regime = Regime::Coast;
        self.state.brake_held = false;
        self.state.limit_idx = self.limits.idx_after(stop);
        self.idle_curve = None;
        self.brake_curve = None;
        Ok(())
    }

    /// Regenerates both lookahead curves when the upcoming target or the section limit changes
    fn update_curves(&mut self, target: Option<SpeedLimit>, limit: f64) {
        let current = self.brake_curve.as_ref().map(|c| c.target());
        if target == current && limit == self.curve_limit {
            return;
        }
        self.curve_limit = limit;
        let (idle, brake) = match target {
            Some(target) => {
                let retardation = self.retardation();
                let from = self.state.coordinate;
                (
                    Some(LookaheadCurve::generate(
                        CurveKind::Idle,
                        target,
                        limit,
                        from,
                        &retardation,
                        self.time_slot,
                    )),
                    Some(LookaheadCurve::generate(
                        CurveKind::Brake,
                        target,
                        limit,
                        from,
                        &retardation,
                        self.time_slot,
                    )),
                )
            }
            None => (None, None),
        };
        #[cfg(feature = "logging")]
        if let Some(target) = target {
            log::debug!(
                "lookahead curves for {} km/h at {} km",
                target.limit.format_eng(Some(4)),
                self.real(target.coordinate).format_eng(Some(6))
            );
        }
        self.idle_curve = idle;
        self.brake_curve = brake;
    }

    fn select_regime(
        &mut self,
        limit: f64,
        target: Option<SpeedLimit>,
        vt: f64,
        vc: f64,
    ) -> Regime {
        let x = self.state.coordinate;
        let v = self.state.speed;
        let prev = self.state.regime;
        if self.state.brake_held {
            if v > vc {
                return Regime::Braking;
            }
            self.state.brake_held = false;
        }
        if v >= limit + OVERSPEED_MARGIN {
            self.state.brake_held = true;
            return Regime::Braking;
        }
        if target.is_some_and(|t| v > t.limit) {
            if let Some(vb) = self.brake_curve.as_mut().and_then(|c| c.speed_at(x)) {
                // once on the curve, keep following it down to the target
                if v >= vb || (prev == Regime::Braking && v >= vb - BRAKE_FOLLOW_TOLERANCE) {
                    return Regime::Braking;
                }
            }
            if self.idle_optimization {
                if let Some(vi) = self.idle_curve.as_mut().and_then(|c| c.speed_at(x)) {
                    if v >= vi {
                        return Regime::Coast;
                    }
                }
            }
        }
        if v < vt {
            Regime::Traction
        } else if v <= vc {
            if prev == Regime::Traction {
                Regime::Traction
            } else {
                Regime::Coast
            }
        } else {
            Regime::Coast
        }
    }

    /// Whether a step under `specific_force` would leave the train above the braking curve
    fn crosses_brake_curve(&mut self, target: Option<SpeedLimit>, specific_force: f64) -> bool {
        let (x, v, dt) = (self.state.coordinate, self.state.speed, self.dt());
        let dv = specific_force * ZETA * dt;
        let speed = v + dv;
        let coordinate = x + (v + dv / 2.0) * dt / 3600.0;
        target.is_some_and(|t| speed > t.limit)
            && self
                .brake_curve
                .as_mut()
                .and_then(|c| c.speed_at(coordinate))
                .is_some_and(|vb| speed > vb)
    }

    /// Finds the throttle position that keeps the speed inside the band
    fn traction(&mut self, grade: f64, rate: f64, vt: f64, vc: f64) -> anyhow::Result<StepForces> {
        let x = self.state.coordinate;
        let v = self.state.speed;
        let dt = self.dt();
        let ratio = self.voltage_ratio(x)?;
        let natural = self.resistance.motion(v) + grade + self.retardation().generator(v);
        let specific =
            |force: f64| self.adhesion * 1000.0 * force * self.loco_count / self.weight - natural;

        let (sample, throttle) = if self.positions.is_notched() {
            let top = (self.positions.len() - 1) as f64;
            let throttle = self.state.notch as f64 / top;
            let sample = self
                .positions
                .get_fktu(v, throttle, self.adhesion, ratio)?
                .scaled(rate);
            (sample, throttle)
        } else {
            let mut p = self.state.throttle.clamp(0.0, rate);
            let mut step = THROTTLE_STEP_INIT;
            let mut converged = false;
            for _ in 0..THROTTLE_MAX_ITER {
                let trial = self.positions.get_fktu(v, p, self.adhesion, ratio)?;
                let new_speed = v + specific(trial.force) * ZETA * dt;
                if new_speed > vc && p > 0.0 {
                    p = (p - step).max(0.0);
                } else if new_speed < vt && p < rate {
                    p = (p + step).min(rate);
                } else {
                    converged = true;
                    break;
                }
                step = (step / 2.0).max(THROTTLE_STEP_MIN);
            }
            #[cfg(feature = "logging")]
            if !converged {
                log::warn!(
                    "throttle search hit {THROTTLE_MAX_ITER} iterations at {} km, using {}",
                    self.real(x).format_eng(Some(6)),
                    p.format_eng(Some(4))
                );
            }
            #[cfg(not(feature = "logging"))]
            let _ = converged;
            (self.positions.get_fktu(v, p, self.adhesion, ratio)?, p)
        };
        let specific_force = specific(sample.force);
        self.state.throttle = throttle;

        let active = self.loco_count * sample.active_amperage + self.aux_amperage;
        let full = sample
            .full_amperage
            .map(|full| self.loco_count * full + self.aux_amperage);
        Ok(StepForces {
            specific_force,
            force: sample.force,
            throttle,
            load: Load::new(self.current_type, active, full)?,
            motor_amperage: sample.motor_amperage,
            loaded: true,
            halt: None,
        })
    }

    /// Braking toward the lower of the braking curve and the band, recuperating when possible.
    /// Approaching a stop the deceleration is never below the constant one that ends exactly at it.
    fn braking(
        &mut self,
        grade: f64,
        vc: f64,
        target: Option<SpeedLimit>,
    ) -> anyhow::Result<StepForces> {
        let x = self.state.coordinate;
        let v = self.state.speed;
        let dt = self.dt();
        let generator = self.retardation().generator(v);
        let natural = self.resistance.idle(v) + grade + generator;
        let predicted = x + v * dt / 3600.0;
        let stop = target
            .filter(|t| t.limit == 0.0 && predicted >= t.coordinate)
            .map(|t| t.coordinate);
        let curve_speed = self
            .brake_curve
            .as_mut()
            .and_then(|c| c.speed_at(predicted));
        let target_speed = curve_speed.map_or(vc, |c| c.min(vc)).max(0.0);
        let mut required = (v - target_speed) / (ZETA * dt);
        // constant deceleration that ends exactly at the stop
        if let Some(t) = target.filter(|t| t.limit == 0.0 && x < t.coordinate) {
            required = required.max(v * v / (7200.0 * (t.coordinate - x)) / ZETA);
        }
        let braking_term = (required - natural).max(0.0);
        let specific_force = (-natural - braking_term)
            .min(0.0)
            .max(-natural - self.adhesion * self.brake_force);
        // specific brake force actually applied, N/kN
        let applied = (-specific_force - natural).max(0.0);
        let demanded = applied * self.weight / (1000.0 * self.loco_count);

        let mut forces = StepForces {
            specific_force,
            force: -demanded,
            throttle: 0.0,
            load: self.aux_load()?,
            motor_amperage: 0.0,
            loaded: false,
            halt: stop.filter(|_| -specific_force * ZETA * dt >= v),
        };
        if let Some(recuperation) = &self.recuperation {
            let ratio = self.voltage_ratio(x)?;
            let ceiling = recuperation.get_fktu(v, 1.0, self.adhesion, ratio)?;
            if ceiling.force > 0.0 && demanded > 0.0 {
                let used = demanded.min(ceiling.force);
                let share = used / ceiling.force;
                let active =
                    self.aux_amperage - self.loco_count * ceiling.active_amperage.abs() * share;
                let full = ceiling
                    .full_amperage
                    .map(|full| self.aux_amperage + self.loco_count * full.abs() * share);
                forces.load = Load::new(self.current_type, active, full)?;
                forces.motor_amperage = ceiling.motor_amperage * share;
                forces.loaded = true;
            }
        }
        Ok(forces)
    }
}

/// Computes the step trace of one train
pub fn simulate_traction(inputs: &TractionInputs) -> anyhow::Result<Vec<Element>> {
    let mut sim = inputs.make_tractive_sim()?;
    sim.walk()?;
    Ok(sim.history)
}

/// Computes the step trace of one train and averages it over `averaging_period`
pub fn compute_tractive_result(
    inputs: &TractionInputs,
    averaging_period: si::Time,
) -> anyhow::Result<TractiveResult> {
    let mut sim = inputs.make_tractive_sim()?;
    sim.walk()?;
    TractiveResult::from_elements(
        &sim.history,
        inputs.time_slot,
        averaging_period,
        sim.reference_mass(),
    )
}

/// Runs independent traction calculations, on the rayon thread pool when `parallelize` is set
pub fn run_tractive_sims(
    inputs: &[TractionInputs],
    parallelize: bool,
) -> anyhow::Result<Vec<Vec<Element>>> {
    if parallelize {
        inputs.par_iter().map(simulate_traction).collect()
    } else {
        inputs.iter().map(simulate_traction).collect()
    }
}
