use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use evtol_airfoil::AirfoilCatalog;
use evtol_config::{CaseConfig, DesignVariableConfig, TopologyKind};
use evtol_mission::SegmentKind;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::closure::case_catalog;
use crate::{ClosureProblem, ClosureSolver, ErrorKind, RotorRole, SizingError, SizingResult};

/// Objective reported for a design point that cannot be evaluated.
pub const PENALTY_OBJECTIVE: f64 = 1e10;

/// Named design-variable values, as an optimizer hands them over.
pub type DesignVariables = BTreeMap<String, f64>;

/// Case quantities an optimizer may vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DesignVariable {
    WingArea,
    WingAspectRatio,
    LiftRotorRadius,
    PropellerRadius,
    LiftRotorAdvanceRatio,
    PropellerAdvanceRatio,
    CruiseSpeed,
}

impl DesignVariable {
    pub const ALL: [DesignVariable; 7] = [
        Self::WingArea,
        Self::WingAspectRatio,
        Self::LiftRotorRadius,
        Self::PropellerRadius,
        Self::LiftRotorAdvanceRatio,
        Self::PropellerAdvanceRatio,
        Self::CruiseSpeed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::WingArea => "wing_area",
            Self::WingAspectRatio => "wing_aspect_ratio",
            Self::LiftRotorRadius => "lift_rotor_radius",
            Self::PropellerRadius => "propeller_radius",
            Self::LiftRotorAdvanceRatio => "lift_rotor_advance_ratio",
            Self::PropellerAdvanceRatio => "propeller_advance_ratio",
            Self::CruiseSpeed => "cruise_speed",
        }
    }

    /// Whether the variable exists on a vehicle of this topology. Lift rotors of a
    /// lift-plus-cruise vehicle only hover, so their advance ratio is meaningless.
    pub fn applies_to(self, topology: TopologyKind) -> bool {
        match self {
            Self::WingArea
            | Self::WingAspectRatio
            | Self::PropellerRadius
            | Self::PropellerAdvanceRatio => topology == TopologyKind::LiftPlusCruise,
            Self::LiftRotorAdvanceRatio => topology == TopologyKind::Multirotor,
            Self::LiftRotorRadius | Self::CruiseSpeed => true,
        }
    }

    /// Write `value` into `case`.
    ///
    /// A cruise-speed override keeps each cruise segment's distance when one was given
    /// and re-derives the duration; otherwise the duration is kept. An advance-ratio
    /// override releases the group's RPM pins on forward-flight segments.
    pub fn apply(self, case: &mut CaseConfig, value: f64) -> Result<(), SizingError> {
        let topology = case.vehicle.topology;
        if !self.applies_to(topology) {
            return Err(SizingError::Configuration(format!(
                "design variable `{self}` does not apply to a {} vehicle",
                topology.name()
            )));
        }
        let missing = |section: &str| {
            SizingError::Configuration(format!("design variable `{self}` needs a {section} section"))
        };
        let vehicle = &mut case.vehicle;
        match self {
            Self::WingArea => vehicle.wing.as_mut().ok_or_else(|| missing("wing"))?.area_m2 = value,
            Self::WingAspectRatio => {
                vehicle.wing.as_mut().ok_or_else(|| missing("wing"))?.aspect_ratio = value
            }
            Self::LiftRotorRadius => vehicle.lift_rotor.radius_m = value,
            Self::PropellerRadius => {
                vehicle.propeller.as_mut().ok_or_else(|| missing("propeller"))?.radius_m = value
            }
            Self::LiftRotorAdvanceRatio => {
                vehicle.lift_rotor.advance_ratio = Some(value);
                for segment in case.mission.iter_mut().filter(|s| !s.kind.is_hover()) {
                    segment.lift_rotor_rpm = None;
                }
            }
            Self::PropellerAdvanceRatio => {
                vehicle
                    .propeller
                    .as_mut()
                    .ok_or_else(|| missing("propeller"))?
                    .advance_ratio = Some(value);
                for segment in case.mission.iter_mut().filter(|s| !s.kind.is_hover()) {
                    segment.propeller_rpm = None;
                }
            }
            Self::CruiseSpeed => {
                let cruise: Vec<_> = case
                    .mission
                    .iter_mut()
                    .filter(|segment| segment.kind == SegmentKind::Cruise)
                    .collect();
                if cruise.is_empty() {
                    return Err(missing("cruise segment"));
                }
                for segment in cruise {
                    segment.speed_m_s = Some(value);
                    if segment.distance_m.is_some() {
                        segment.duration_s = None;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DesignVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DesignVariable {
    type Err = SizingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|variable| variable.name() == name)
            .ok_or_else(|| SizingError::Configuration(format!("unknown design variable `{name}`")))
    }
}

/// Closed interval for one design variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    pub variable: DesignVariable,
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// A design-variable value outside its bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundViolation {
    pub name: String,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl BoundViolation {
    /// Distance past the violated bound; zero for a non-finite value.
    pub fn amount(&self) -> f64 {
        let excess = (self.lower - self.value).max(self.value - self.upper);
        if excess.is_finite() { excess.max(0.0) } else { 0.0 }
    }
}

/// Validated set of bounded design variables for one topology.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DesignSpace {
    bounds: Vec<Bound>,
}

impl DesignSpace {
    pub fn new(topology: TopologyKind, variables: &[DesignVariableConfig]) -> Result<Self, SizingError> {
        let mut bounds: Vec<Bound> = Vec::with_capacity(variables.len());
        for config in variables {
            let variable: DesignVariable = config.name.parse()?;
            if !variable.applies_to(topology) {
                return Err(SizingError::Configuration(format!(
                    "design variable `{variable}` does not apply to a {} vehicle",
                    topology.name()
                )));
            }
            if bounds.iter().any(|b| b.variable == variable) {
                return Err(SizingError::Configuration(format!(
                    "design variable `{variable}` is listed twice"
                )));
            }
            if !(config.lower.is_finite() && config.upper.is_finite() && config.lower <= config.upper) {
                return Err(SizingError::Configuration(format!(
                    "design variable `{variable}` has invalid bounds [{}, {}]",
                    config.lower, config.upper
                )));
            }
            bounds.push(Bound {
                variable,
                lower: config.lower,
                upper: config.upper,
            });
        }
        Ok(Self { bounds })
    }

    pub fn from_case(case: &CaseConfig) -> Result<Self, SizingError> {
        Self::new(case.vehicle.topology, &case.design.variables)
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn bound(&self, variable: DesignVariable) -> Option<&Bound> {
        self.bounds.iter().find(|b| b.variable == variable)
    }

    /// Every bounded variable in `values` lying outside its interval. Values are not clamped.
    pub fn validate(&self, values: &DesignVariables) -> Vec<BoundViolation> {
        self.bounds
            .iter()
            .filter_map(|bound| {
                let value = *values.get(bound.variable.name())?;
                (!bound.contains(value)).then(|| BoundViolation {
                    name: bound.variable.name().to_string(),
                    value,
                    lower: bound.lower,
                    upper: bound.upper,
                })
            })
            .collect()
    }

    /// Names in `values` with no declared bound, recognised or not.
    pub fn unbounded<'a>(&self, values: &'a DesignVariables) -> Vec<&'a str> {
        values
            .keys()
            .map(String::as_str)
            .filter(|name| !self.bounds.iter().any(|b| b.variable.name() == *name))
            .collect()
    }
}

/// Baseline case and airfoil data shared by every design point.
#[derive(Debug, Clone)]
pub struct DesignProblem {
    pub case: CaseConfig,
    pub catalog: AirfoilCatalog,
}

impl DesignProblem {
    /// Load the case's airfoil catalog and check its design space.
    pub fn new(case: CaseConfig) -> Result<Self, SizingError> {
        let catalog = case_catalog(&case)?;
        DesignSpace::from_case(&case)?;
        let limits = &case.design.constraints;
        for (name, limit) in [
            ("disk loading", limits.max_disk_loading_n_m2),
            ("tip speed", limits.max_tip_speed_m_s),
        ] {
            if let Some(limit) = limit.filter(|l| !(l.is_finite() && *l > 0.0)) {
                return Err(SizingError::Configuration(format!(
                    "{name} limit {limit} must be positive"
                )));
            }
        }
        Ok(Self { case, catalog })
    }

    pub fn with_catalog(case: CaseConfig, catalog: AirfoilCatalog) -> Self {
        Self { case, catalog }
    }

    pub fn design_space(&self) -> Result<DesignSpace, SizingError> {
        DesignSpace::from_case(&self.case)
    }

    /// Baseline case with `values` applied.
    pub fn case_with(&self, values: &DesignVariables) -> Result<CaseConfig, SizingError> {
        let mut case = self.case.clone();
        for (name, &value) in values {
            name.parse::<DesignVariable>()?.apply(&mut case, value)?;
        }
        Ok(case)
    }

    /// Size the baseline case with `values` applied.
    pub fn size(&self, values: &DesignVariables) -> Result<SizingResult, SizingError> {
        let case = self.case_with(values)?;
        let problem = ClosureProblem::from_case(&case, &self.catalog)?;
        ClosureSolver::new(case.solver.clone()).solve(&problem)
    }
}

/// Outcome of one design point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Take-off mass (kg), or the penalty.
    pub objective: f64,
    /// Normalised constraint values; feasible when `<= 0`.
    pub constraints: BTreeMap<String, f64>,
    pub feasible: bool,
    pub penalized: bool,
    pub table: BTreeMap<String, f64>,
    pub violations: Vec<BoundViolation>,
    pub message: Option<String>,
}

impl Evaluation {
    fn penalty(violations: Vec<BoundViolation>, message: String) -> Self {
        let objective = PENALTY_OBJECTIVE + violations.iter().map(BoundViolation::amount).sum::<f64>();
        Self {
            objective,
            constraints: BTreeMap::new(),
            feasible: false,
            penalized: true,
            table: BTreeMap::new(),
            violations,
            message: Some(message),
        }
    }
}

/// Evaluate one design point.
///
/// Configuration, domain, segment and airfoil problems, as well as out-of-bound or
/// unbounded values, produce a penalised [`Evaluation`]. Closure failures (divergence,
/// iteration cap, trim convergence) are returned as errors.
pub fn evaluate_design_point(
    problem: &DesignProblem,
    values: &DesignVariables,
) -> Result<Evaluation, SizingError> {
    let space = match problem.design_space() {
        Ok(space) => space,
        Err(err) => return penalize(err),
    };
    let violations = space.validate(values);
    if !violations.is_empty() {
        let names: Vec<&str> = violations.iter().map(|v| v.name.as_str()).collect();
        let message = format!("design variables out of bounds: {}", names.join(", "));
        debug!("{message}");
        return Ok(Evaluation::penalty(violations, message));
    }
    let unbounded = space.unbounded(values);
    if !unbounded.is_empty() {
        let message = format!("design variables without declared bounds: {}", unbounded.join(", "));
        debug!("{message}");
        return Ok(Evaluation::penalty(Vec::new(), message));
    }

    let result = match problem.size(values) {
        Ok(result) => result,
        Err(err) => return penalize(err),
    };

    let constraints = constraint_values(problem, &result);
    let feasible = constraints.values().all(|&c| c <= 0.0);
    Ok(Evaluation {
        objective: result.takeoff_mass_kg(),
        constraints,
        feasible,
        penalized: false,
        table: result.to_table(),
        violations: Vec::new(),
        message: None,
    })
}

/// Evaluate independent design points in parallel; order follows `points`.
pub fn evaluate_population(
    problem: &DesignProblem,
    points: &[DesignVariables],
) -> Vec<Result<Evaluation, SizingError>> {
    points
        .par_iter()
        .map(|values| evaluate_design_point(problem, values))
        .collect()
}

fn penalize(err: SizingError) -> Result<Evaluation, SizingError> {
    match err.kind() {
        ErrorKind::Configuration
        | ErrorKind::Domain
        | ErrorKind::UnderspecifiedSegment
        | ErrorKind::InconsistentSegment
        | ErrorKind::UnknownAirfoil => {
            debug!("design point penalised: {err}");
            Ok(Evaluation::penalty(Vec::new(), err.to_string()))
        }
        ErrorKind::Convergence | ErrorKind::Diverged | ErrorKind::MaxIterExceeded => Err(err),
    }
}

fn constraint_values(problem: &DesignProblem, result: &SizingResult) -> BTreeMap<String, f64> {
    let limits = &problem.case.design.constraints;
    let lift_rotor = || {
        result
            .performance
            .iter()
            .filter_map(|segment| segment.group(RotorRole::LiftRotor).map(|g| (segment, g)))
    };
    let mut constraints = BTreeMap::new();
    if let Some(limit) = limits.max_disk_loading_n_m2 {
        let peak = lift_rotor()
            .filter(|(segment, _)| segment.kind.is_hover())
            .map(|(_, g)| g.disk_loading_n_m2)
            .fold(0.0, f64::max);
        constraints.insert("disk_loading".to_string(), peak / limit - 1.0);
    }
    if let Some(limit) = limits.max_tip_speed_m_s {
        let peak = lift_rotor().map(|(_, g)| g.tip_speed_m_s).fold(0.0, f64::max);
        constraints.insert("tip_speed".to_string(), peak / limit - 1.0);
    }
    constraints
}
