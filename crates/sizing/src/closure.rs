use std::collections::BTreeMap;

use evtol_airfoil::AirfoilCatalog;
use evtol_config::{CaseConfig, SolverConfig, SolverMethod, ToleranceKind};
use evtol_core::{AtmosphereState, compute_constants_named};
use evtol_mission::{Mission, MissionEnergy, Segment};
use log::{debug, info, warn};
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

use crate::breakdown::{ComponentModels, PeakPower};
use crate::{RotorRole, SegmentPerformance, SizingError, Vehicle, WeightBreakdown, segment_performance};

/// Relative step of the central difference taken on segment power.
const POWER_FD_RELATIVE_STEP: f64 = 1e-4;

/// Vehicle, mission and per-segment atmosphere: everything one closure needs.
#[derive(Debug, Clone)]
pub struct ClosureProblem {
    vehicle: Vehicle,
    mission: Mission,
    atmospheres: Vec<AtmosphereState>,
}

/// One evaluation of the closure map `W -> F(W)`.
#[derive(Debug, Clone)]
pub struct ClosureStep {
    /// Take-off mass the step was evaluated at (kg).
    pub takeoff_mass_kg: f64,
    pub performance: Vec<SegmentPerformance>,
    pub energy: MissionEnergy,
    /// Masses rebuilt from the step; `breakdown.takeoff_kg` is `F(W)`.
    pub breakdown: WeightBreakdown,
    models: ComponentModels,
    /// Segment index at which each group reaches its peak power.
    peak_segments: Vec<(RotorRole, usize)>,
}

impl ClosureStep {
    pub fn updated_mass_kg(&self) -> f64 {
        self.breakdown.takeoff_kg
    }

    /// `F(W) - W` (kg).
    pub fn residual_kg(&self) -> f64 {
        self.updated_mass_kg() - self.takeoff_mass_kg
    }
}

/// Airfoil catalog for a case: the built-in sections plus any files in `airfoil_dir`.
pub fn case_catalog(case: &CaseConfig) -> Result<AirfoilCatalog, SizingError> {
    let mut catalog = AirfoilCatalog::with_builtins();
    if let Some(dir) = &case.airfoil_dir {
        let added = catalog.load_dir(dir)?;
        debug!("loaded {} airfoil table(s) from {}", added.len(), dir.display());
    }
    Ok(catalog)
}

impl ClosureProblem {
    pub fn new(
        vehicle: Vehicle,
        mission: Mission,
        atmospheres: Vec<AtmosphereState>,
    ) -> Result<Self, SizingError> {
        if atmospheres.len() != mission.len() {
            return Err(SizingError::Configuration(format!(
                "expected {} atmosphere states, got {}",
                mission.len(),
                atmospheres.len()
            )));
        }
        Ok(Self {
            vehicle,
            mission,
            atmospheres,
        })
    }

    /// Assemble vehicle and mission from a case, resolving the atmosphere at every
    /// segment altitude.
    pub fn from_case(case: &CaseConfig, catalog: &AirfoilCatalog) -> Result<Self, SizingError> {
        let vehicle = Vehicle::from_config(&case.vehicle, catalog, &case.solver)?;
        let segments = case
            .mission
            .iter()
            .map(|segment| segment.to_segment())
            .collect::<Result<Vec<Segment>, _>>()?;
        let mission = Mission::new(segments)?;
        let atmospheres = mission
            .segments()
            .iter()
            .map(|segment| compute_constants_named(segment.altitude_m, &case.environment.atmosphere))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(vehicle, mission, atmospheres)
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn atmospheres(&self) -> &[AtmosphereState] {
        &self.atmospheres
    }

    /// Trimmed performance of every segment at `takeoff_mass_kg`.
    pub fn performance(&self, takeoff_mass_kg: f64) -> Result<Vec<SegmentPerformance>, SizingError> {
        self.mission
            .segments()
            .iter()
            .zip(&self.atmospheres)
            .map(|(segment, atmosphere)| {
                segment_performance(&self.vehicle, segment, atmosphere, takeoff_mass_kg)
            })
            .collect()
    }

    /// Evaluate powers, energy and every component mass at `takeoff_mass_kg`.
    pub fn step(&self, takeoff_mass_kg: f64) -> Result<ClosureStep, SizingError> {
        let performance = self.performance(takeoff_mass_kg)?;
        let powers: Vec<f64> = performance.iter().map(|p| p.power_w).collect();
        let energy = self.mission.required_energy(&powers)?;

        let mut peaks = Vec::new();
        let mut peak_segments = Vec::new();
        for group in self.vehicle.rotor_groups() {
            let peak = performance
                .iter()
                .enumerate()
                .filter_map(|(index, segment)| {
                    segment
                        .group(group.role)
                        .map(|g| (index, g.power_per_rotor_w))
                })
                .fold(None, |best: Option<(usize, f64)>, (index, power)| match best {
                    Some((_, best_power)) if best_power >= power => best,
                    _ => Some((index, power)),
                });
            let Some((index, power_w)) = peak else {
                return Err(SizingError::Configuration(format!(
                    "{} never operates during the mission",
                    group.role
                )));
            };
            peaks.push(PeakPower {
                role: group.role,
                count: group.count as f64,
                diameter_m: group.diameter_m(),
                blades: group.blade_count() as f64,
                power_w,
            });
            peak_segments.push((group.role, index));
        }

        let models = ComponentModels::new(&self.vehicle, takeoff_mass_kg, energy.total_j, &peaks);
        let breakdown = models.breakdown(self.vehicle.payload_kg)?;
        Ok(ClosureStep {
            takeoff_mass_kg,
            performance,
            energy,
            breakdown,
            models,
            peak_segments,
        })
    }

    /// Newton residual at `x = (take-off mass, battery mass)`:
    /// `R1 = W - (non-battery mass(W) + W_batt)`, `R2 = W_batt - battery(E(W))`.
    pub fn residual(&self, x: Vector2<f64>) -> Result<Vector2<f64>, SizingError> {
        Ok(newton_residual(&self.step(x[0])?, x[1]))
    }

    /// Jacobian of [`residual`](Self::residual) with respect to `x`.
    pub fn jacobian(&self, x: Vector2<f64>) -> Result<Matrix2<f64>, SizingError> {
        self.jacobian_at(&self.step(x[0])?)
    }

    fn jacobian_at(&self, step: &ClosureStep) -> Result<Matrix2<f64>, SizingError> {
        let w = step.takeoff_mass_kg;
        let h = POWER_FD_RELATIVE_STEP * w;
        let (above, below, span) = match (self.performance(w + h), self.performance(w - h)) {
            (Ok(above), Ok(below)) => (above, below, 2.0 * h),
            (Ok(above), Err(err)) if err.is_recoverable() => {
                debug!("backward power difference at {w:.3} kg failed ({err}); using forward");
                (above, step.performance.clone(), h)
            }
            (Err(err), Ok(below)) if err.is_recoverable() => {
                debug!("forward power difference at {w:.3} kg failed ({err}); using backward");
                (step.performance.clone(), below, h)
            }
            (Err(err), _) | (_, Err(err)) => return Err(err),
        };

        let power_slope = |index: usize, role: RotorRole| -> f64 {
            let per_rotor = |perf: &[SegmentPerformance]| {
                perf[index]
                    .group(role)
                    .map_or(0.0, |g| g.power_per_rotor_w)
            };
            (per_rotor(&above) - per_rotor(&below)) / span
        };
        let peak_slopes: Vec<(RotorRole, f64)> = step
            .peak_segments
            .iter()
            .map(|&(role, index)| (role, power_slope(index, role)))
            .collect();

        let energy_slope: f64 = self
            .mission
            .segments()
            .iter()
            .zip(above.iter().zip(&below))
            .map(|(segment, (up, down))| {
                segment.duration_s * (up.power_w - down.power_w) / span
            })
            .sum();

        let other_slope = step.models.non_battery_derivative(&peak_slopes)?;
        let battery_slope = step.models.battery_energy_slope()? * energy_slope;
        Ok(Matrix2::new(
            1.0 - other_slope,
            -1.0,
            -battery_slope,
            1.0,
        ))
    }
}

fn newton_residual(step: &ClosureStep, battery_kg: f64) -> Vector2<f64> {
    Vector2::new(
        step.takeoff_mass_kg - (step.breakdown.non_battery_kg() + battery_kg),
        battery_kg - step.breakdown.battery_kg,
    )
}

/// Clean fixed-point steps after which a reduced relaxation is doubled again.
const RELAXATION_RECOVERY_STEPS: usize = 3;

/// Fixed-point step length: halved on a failed trial, doubled back toward the configured
/// value after [`RELAXATION_RECOVERY_STEPS`] consecutive clean steps.
#[derive(Debug, Clone, Copy)]
struct Relaxation {
    nominal: f64,
    current: f64,
    clean_steps: usize,
}

impl Relaxation {
    fn new(nominal: f64) -> Self {
        Self {
            nominal,
            current: nominal,
            clean_steps: 0,
        }
    }

    fn value(&self) -> f64 {
        self.current
    }

    fn cut(&mut self) -> f64 {
        self.current *= 0.5;
        self.clean_steps = 0;
        self.current
    }

    fn succeeded(&mut self) {
        if self.current >= self.nominal {
            return;
        }
        self.clean_steps += 1;
        if self.clean_steps >= RELAXATION_RECOVERY_STEPS {
            self.current = (2.0 * self.current).min(self.nominal);
            self.clean_steps = 0;
            debug!("relaxation restored to {}", self.current);
        }
    }
}

/// Progress of a closure solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverState {
    Initialized,
    Iterating,
    Converged,
    Diverged,
    MaxIterExceeded,
}

/// One row of the iteration history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub takeoff_mass_kg: f64,
    pub updated_mass_kg: f64,
    pub residual_kg: f64,
    /// Step length accepted after this evaluation; zero on the final row.
    pub relaxation: f64,
    pub state: SolverState,
}

/// Converged design and how it was reached.
#[derive(Debug, Clone)]
pub struct SizingResult {
    pub method: SolverMethod,
    pub iterations: usize,
    /// `F(W) - W` at the converged point (kg).
    pub residual_kg: f64,
    pub breakdown: WeightBreakdown,
    pub performance: Vec<SegmentPerformance>,
    pub energy: MissionEnergy,
    pub history: Vec<IterationRecord>,
}

impl SizingResult {
    pub fn takeoff_mass_kg(&self) -> f64 {
        self.breakdown.takeoff_kg
    }

    /// Flat `quantity -> value` table of the converged design.
    pub fn to_table(&self) -> BTreeMap<String, f64> {
        let mut table = self.breakdown.to_table();
        for segment in &self.performance {
            let name = &segment.segment;
            for group in &segment.groups {
                let role = group.role;
                table.insert(format!("Power|{role}|{name}"), group.total_power_w());
                table.insert(format!("Thrust|{role}|{name}"), group.thrust_per_rotor_n);
                table.insert(format!("RPM|{role}|{name}"), group.rpm);
                table.insert(format!("Collective|{role}|{name}"), group.collective_deg);
                table.insert(format!("DiskLoading|{role}|{name}"), group.disk_loading_n_m2);
                table.insert(format!("TipSpeed|{role}|{name}"), group.tip_speed_m_s);
                if group.figure_of_merit.is_finite() {
                    table.insert(format!("FigureOfMerit|{role}|{name}"), group.figure_of_merit);
                }
            }
            table.insert(format!("Power|total|{name}"), segment.power_w);
            table.insert(format!("Drag|{name}"), segment.drag_n);
        }
        for (name, energy) in &self.energy.segments {
            table.insert(format!("Energy|{name}"), *energy);
        }
        table.insert("Energy|total".to_string(), self.energy.total_j);
        table.insert("Solver|iterations".to_string(), self.iterations as f64);
        table.insert("Solver|residual".to_string(), self.residual_kg);
        table
    }
}

/// Drives a [`ClosureProblem`] to a self-consistent take-off mass.
#[derive(Debug, Clone)]
pub struct ClosureSolver {
    config: SolverConfig,
    state: SolverState,
    history: Vec<IterationRecord>,
}

impl ClosureSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            state: SolverState::Initialized,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// History of the last solve, kept after a failure.
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn solve(&mut self, problem: &ClosureProblem) -> Result<SizingResult, SizingError> {
        self.check_config()?;
        self.state = SolverState::Initialized;
        self.history.clear();
        let outcome = match self.config.method {
            SolverMethod::FixedPoint => self.fixed_point(problem),
            SolverMethod::Newton => self.newton(problem),
        };
        self.state = match &outcome {
            Ok(_) => SolverState::Converged,
            Err(SizingError::MaxIterExceeded { .. }) => SolverState::MaxIterExceeded,
            Err(SizingError::Diverged { .. }) => SolverState::Diverged,
            Err(_) => self.state,
        };
        if let Some(last) = self.history.last_mut() {
            last.state = self.state;
        }
        outcome
    }

    fn check_config(&self) -> Result<(), SizingError> {
        let c = &self.config;
        let positive = [
            ("initial take-off mass", c.initial_takeoff_mass_kg),
            ("tolerance", c.tolerance),
            ("maximum take-off mass", c.max_takeoff_mass_kg),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SizingError::Configuration(format!(
                    "solver {name} {value} must be positive"
                )));
            }
        }
        if !(c.relaxation > 0.0 && c.relaxation <= 1.0) {
            return Err(SizingError::Configuration(format!(
                "relaxation {} must lie in (0, 1]",
                c.relaxation
            )));
        }
        if !(c.min_relaxation > 0.0 && c.min_relaxation <= c.relaxation) {
            return Err(SizingError::Configuration(format!(
                "minimum relaxation {} must lie in (0, {}]",
                c.min_relaxation, c.relaxation
            )));
        }
        if c.max_iterations == 0 {
            return Err(SizingError::Configuration(
                "solver needs at least one iteration".into(),
            ));
        }
        if c.initial_takeoff_mass_kg > c.max_takeoff_mass_kg {
            return Err(SizingError::Configuration(format!(
                "initial take-off mass {} kg exceeds the {} kg limit",
                c.initial_takeoff_mass_kg, c.max_takeoff_mass_kg
            )));
        }
        Ok(())
    }

    fn within_tolerance(&self, residual_kg: f64, takeoff_mass_kg: f64) -> bool {
        let limit = match self.config.tolerance_kind {
            ToleranceKind::Absolute => self.config.tolerance,
            ToleranceKind::Relative => self.config.tolerance * takeoff_mass_kg.abs(),
        };
        residual_kg.abs() <= limit
    }

    fn record(&mut self, step: &ClosureStep, relaxation: f64) {
        self.state = SolverState::Iterating;
        let record = IterationRecord {
            iteration: self.history.len() + 1,
            takeoff_mass_kg: step.takeoff_mass_kg,
            updated_mass_kg: step.updated_mass_kg(),
            residual_kg: step.residual_kg(),
            relaxation,
            state: self.state,
        };
        debug!(
            "closure iteration {}: W = {:.6} kg, F(W) = {:.6} kg, residual = {:.3e} kg",
            record.iteration, record.takeoff_mass_kg, record.updated_mass_kg, record.residual_kg
        );
        self.history.push(record);
    }

    fn diverged(&self, takeoff_mass_kg: f64, reason: String) -> SizingError {
        SizingError::Diverged {
            iterations: self.history.len(),
            takeoff_mass_kg,
            reason,
        }
    }

    /// Reject a trial mass that is non-finite, non-positive or above the limit.
    fn check_trial(&self, trial_kg: f64) -> Result<(), SizingError> {
        if !trial_kg.is_finite() {
            return Err(self.diverged(trial_kg, "take-off mass is not finite".into()));
        }
        if trial_kg <= 0.0 {
            return Err(self.diverged(trial_kg, "take-off mass became non-positive".into()));
        }
        if trial_kg > self.config.max_takeoff_mass_kg {
            return Err(self.diverged(
                trial_kg,
                format!(
                    "take-off mass exceeds the {} kg limit",
                    self.config.max_takeoff_mass_kg
                ),
            ));
        }
        Ok(())
    }

    fn finish(&self, step: ClosureStep) -> SizingResult {
        info!(
            "closure converged in {} iterations: take-off mass {:.3} kg",
            self.history.len(),
            step.updated_mass_kg()
        );
        SizingResult {
            method: self.config.method,
            iterations: self.history.len(),
            residual_kg: step.residual_kg(),
            breakdown: step.breakdown,
            performance: step.performance,
            energy: step.energy,
            history: self.history.clone(),
        }
    }

    fn exhausted(&self, step: &ClosureStep) -> SizingError {
        warn!(
            "closure stopped after {} iterations with residual {:.3e} kg",
            self.history.len(),
            step.residual_kg()
        );
        SizingError::MaxIterExceeded {
            iterations: self.history.len(),
            takeoff_mass_kg: step.takeoff_mass_kg,
            residual_kg: step.residual_kg(),
        }
    }

    fn fixed_point(&mut self, problem: &ClosureProblem) -> Result<SizingResult, SizingError> {
        let mut relaxation = Relaxation::new(self.config.relaxation);
        let mut step = problem.step(self.config.initial_takeoff_mass_kg)?;

        loop {
            if self.within_tolerance(step.residual_kg(), step.takeoff_mass_kg) {
                self.record(&step, 0.0);
                return Ok(self.finish(step));
            }
            if self.history.len() + 1 >= self.config.max_iterations {
                self.record(&step, 0.0);
                return Err(self.exhausted(&step));
            }

            let next = loop {
                let trial = step.takeoff_mass_kg + relaxation.value() * step.residual_kg();
                self.check_trial(trial)?;
                match problem.step(trial) {
                    Ok(next) => break next,
                    Err(err) if err.is_recoverable() => {
                        let cut = relaxation.cut();
                        warn!("closure step to {trial:.3} kg failed ({err}); relaxation cut to {cut}");
                        if cut < self.config.min_relaxation {
                            return Err(self.diverged(
                                step.takeoff_mass_kg,
                                format!("relaxation fell below {}: {err}", self.config.min_relaxation),
                            ));
                        }
                    }
                    Err(err) => return Err(err),
                }
            };
            self.record(&step, relaxation.value());
            relaxation.succeeded();
            step = next;
        }
    }

    fn newton(&mut self, problem: &ClosureProblem) -> Result<SizingResult, SizingError> {
        let mut step = problem.step(self.config.initial_takeoff_mass_kg)?;
        let mut battery_kg = step.breakdown.battery_kg;

        loop {
            let residual = newton_residual(&step, battery_kg);
            if self.within_tolerance(step.residual_kg(), step.takeoff_mass_kg)
                && self.within_tolerance(residual[1], step.takeoff_mass_kg)
            {
                self.record(&step, 0.0);
                return Ok(self.finish(step));
            }
            if self.history.len() + 1 >= self.config.max_iterations {
                self.record(&step, 0.0);
                return Err(self.exhausted(&step));
            }

            let jacobian = problem.jacobian_at(&step)?;
            let delta = jacobian.lu().solve(&(-residual)).ok_or_else(|| {
                self.diverged(step.takeoff_mass_kg, "singular closure Jacobian".into())
            })?;

            let x = Vector2::new(step.takeoff_mass_kg, battery_kg);
            let norm = residual.norm();
            let mut lambda = self.config.relaxation;
            let (next, next_battery_kg) = loop {
                let trial = x + delta * lambda;
                self.check_trial(trial[0])?;
                match problem.step(trial[0]) {
                    Ok(next) if newton_residual(&next, trial[1]).norm() < norm => {
                        break (next, trial[1]);
                    }
                    Ok(_) => debug!("Newton step {lambda} did not reduce the residual"),
                    Err(err) if err.is_recoverable() => {
                        warn!("Newton step to {:.3} kg failed ({err})", trial[0]);
                    }
                    Err(err) => return Err(err),
                }
                lambda *= 0.5;
                if lambda < self.config.min_relaxation {
                    return Err(self.diverged(
                        step.takeoff_mass_kg,
                        format!("line search fell below {}", self.config.min_relaxation),
                    ));
                }
            };
            self.record(&step, lambda);
            step = next;
            battery_kg = next_battery_kg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxation_recovers_after_clean_steps() {
        let mut relaxation = Relaxation::new(1.0);
        relaxation.succeeded();
        assert_eq!(relaxation.value(), 1.0);

        assert_eq!(relaxation.cut(), 0.5);
        assert_eq!(relaxation.cut(), 0.25);
        for _ in 0..RELAXATION_RECOVERY_STEPS - 1 {
            relaxation.succeeded();
        }
        assert_eq!(relaxation.value(), 0.25);
        relaxation.succeeded();
        assert_eq!(relaxation.value(), 0.5);

        relaxation.succeeded();
        assert_eq!(relaxation.cut(), 0.25);
        for _ in 0..2 * RELAXATION_RECOVERY_STEPS {
            relaxation.succeeded();
        }
        assert_eq!(relaxation.value(), 1.0);
    }

    #[test]
    fn relaxation_never_exceeds_the_configured_value() {
        let mut relaxation = Relaxation::new(0.6);
        relaxation.cut();
        for _ in 0..4 * RELAXATION_RECOVERY_STEPS {
            relaxation.succeeded();
        }
        assert_eq!(relaxation.value(), 0.6);
    }
}
