use std::f64::consts::PI;

use evtol_airfoil::{AirfoilSample, EvalMethod};
use evtol_core::units::rpm_to_rad_s;
use evtol_core::{AtmosphereState, BrentOptions, RootError, brent};

use crate::{RotorError, RotorGeometry};

const MIN_TIP_LOSS: f64 = 1e-4;
const MAX_BRACKET_DOUBLINGS: usize = 60;

/// Operating condition of a rotor disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowCondition {
    /// Freestream speed relative to the disk (m/s).
    pub speed_m_s: f64,
    pub rpm: f64,
    /// Angle between the freestream and the disk plane: 90° is axial, 0° edgewise.
    pub incidence_deg: f64,
    pub density_kg_m3: f64,
    pub dynamic_viscosity_pa_s: f64,
}

impl FlowCondition {
    /// Axial flow through the disk at the given atmosphere.
    pub fn axial(speed_m_s: f64, rpm: f64, atmosphere: &AtmosphereState) -> Self {
        Self {
            speed_m_s,
            rpm,
            incidence_deg: 90.0,
            density_kg_m3: atmosphere.density_kg_m3,
            dynamic_viscosity_pa_s: atmosphere.dynamic_viscosity_pa_s,
        }
    }

    pub fn hover(rpm: f64, atmosphere: &AtmosphereState) -> Self {
        Self::axial(0.0, rpm, atmosphere)
    }

    pub fn with_rpm(mut self, rpm: f64) -> Self {
        self.rpm = rpm;
        self
    }

    pub fn with_speed(mut self, speed_m_s: f64) -> Self {
        self.speed_m_s = speed_m_s;
        self
    }

    pub fn with_incidence(mut self, incidence_deg: f64) -> Self {
        self.incidence_deg = incidence_deg;
        self
    }

    fn validate(&self) -> Result<(), RotorError> {
        if !(self.rpm.is_finite() && self.rpm > 0.0) {
            return Err(RotorError::Domain(format!("rpm {} must be positive", self.rpm)));
        }
        if !self.speed_m_s.is_finite() {
            return Err(RotorError::Domain(format!(
                "freestream speed {} m/s must be finite",
                self.speed_m_s
            )));
        }
        if !self.incidence_deg.is_finite() {
            return Err(RotorError::Domain("disk incidence must be finite".into()));
        }
        if !(self.density_kg_m3.is_finite() && self.density_kg_m3 > 0.0) {
            return Err(RotorError::Domain(format!(
                "air density {} kg/m^3 must be positive",
                self.density_kg_m3
            )));
        }
        if !(self.dynamic_viscosity_pa_s.is_finite() && self.dynamic_viscosity_pa_s > 0.0) {
            return Err(RotorError::Domain("dynamic viscosity must be positive".into()));
        }
        Ok(())
    }
}

/// Converged state of one blade station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationResult {
    pub radius_m: f64,
    pub induced_velocity_m_s: f64,
    pub inflow_angle_deg: f64,
    pub alpha_deg: f64,
    pub cl: f64,
    pub cd: f64,
    pub reynolds: f64,
    pub tip_loss: f64,
    /// Thrust per unit span, all blades (N/m).
    pub thrust_per_span_n_m: f64,
    /// Torque per unit span, all blades (N·m/m).
    pub torque_per_span_nm_m: f64,
    pub method: EvalMethod,
    /// No sign change was found for the inflow residual; the bracket edge was used.
    pub clamped: bool,
}

/// Integrated rotor loads.
#[derive(Debug, Clone, PartialEq)]
pub struct BemtResult {
    pub thrust_n: f64,
    pub torque_nm: f64,
    pub power_w: f64,
    /// `T^1.5 / sqrt(2ρA) / P`; NaN unless thrust and power are positive.
    pub figure_of_merit: f64,
    /// `T·V / P`; NaN without forward speed or positive power.
    pub propulsive_efficiency: f64,
    pub stations: Vec<StationResult>,
}

impl BemtResult {
    pub fn clamped_stations(&self) -> usize {
        self.stations.iter().filter(|s| s.clamped).count()
    }
}

/// Blade-element momentum solver bound to one rotor geometry.
#[derive(Debug, Clone)]
pub struct Bemt {
    geometry: RotorGeometry,
    inflow: BrentOptions,
}

struct StationLoads {
    thrust: f64,
    torque: f64,
    residual: f64,
    phi: f64,
    alpha_deg: f64,
    w: f64,
    tip_loss: f64,
    sample: AirfoilSample,
}

impl Bemt {
    pub fn new(geometry: RotorGeometry) -> Self {
        Self {
            geometry,
            inflow: BrentOptions {
                x_tolerance: 1e-12,
                f_tolerance: 0.0,
                max_iterations: 200,
            },
        }
    }

    pub fn with_inflow_options(mut self, options: BrentOptions) -> Self {
        self.inflow = options;
        self
    }

    pub fn geometry(&self) -> &RotorGeometry {
        &self.geometry
    }

    /// Analyse the rotor at its geometric collective.
    pub fn run(&self, flow: &FlowCondition) -> Result<BemtResult, RotorError> {
        self.run_with_collective(flow, self.geometry.collective_deg())
    }

    /// Analyse the rotor with the collective replaced by `collective_deg`.
    pub fn run_with_collective(
        &self,
        flow: &FlowCondition,
        collective_deg: f64,
    ) -> Result<BemtResult, RotorError> {
        flow.validate()?;
        if !collective_deg.is_finite() {
            return Err(RotorError::Domain("collective must be finite".into()));
        }

        let omega = rpm_to_rad_s(flow.rpm);
        let mut thrust = 0.0;
        let mut torque = 0.0;
        let mut stations = Vec::with_capacity(self.geometry.stations().len());
        for (index, &dr) in self.geometry.element_widths_m().iter().enumerate() {
            let station = self.solve_station(index, flow, omega, collective_deg)?;
            thrust += station.thrust_per_span_n_m * dr;
            torque += station.torque_per_span_nm_m * dr;
            stations.push(station);
        }

        let power = torque * omega;
        let area = self.geometry.disk_area_m2();
        let figure_of_merit = if thrust > 0.0 && power > 0.0 {
            thrust.powf(1.5) / (2.0 * flow.density_kg_m3 * area).sqrt() / power
        } else {
            f64::NAN
        };
        let propulsive_efficiency = if flow.speed_m_s > 0.0 && power > 0.0 {
            thrust * flow.speed_m_s / power
        } else {
            f64::NAN
        };

        Ok(BemtResult {
            thrust_n: thrust,
            torque_nm: torque,
            power_w: power,
            figure_of_merit,
            propulsive_efficiency,
            stations,
        })
    }

    fn solve_station(
        &self,
        index: usize,
        flow: &FlowCondition,
        omega: f64,
        collective_deg: f64,
    ) -> Result<StationResult, RotorError> {
        let radius = self.geometry.radius_m();
        let incidence = flow.incidence_deg.to_radians();
        let axial = flow.speed_m_s * incidence.sin();
        let residual = |v: f64| {
            self.station_loads(index, flow, omega, collective_deg, v)
                .residual
        };

        let mut upper = (0.5 * omega * radius).max(1.0);
        let mut f_upper = residual(upper);
        let mut doublings = 0;
        while f_upper > 0.0 && doublings < MAX_BRACKET_DOUBLINGS {
            upper *= 2.0;
            f_upper = residual(upper);
            doublings += 1;
        }
        let lower = if axial <= 0.0 { -upper } else { -0.5 * axial };
        let f_lower = residual(lower);
        let (v, clamped) = if f_upper > 0.0 {
            (upper, true)
        } else if f_lower < 0.0 {
            (lower, true)
        } else {
            let root = brent(
                |v| Ok::<f64, RootError>(residual(v)),
                lower,
                upper,
                &self.inflow,
            )?;
            (root.x, false)
        };

        let station = &self.geometry.stations()[index];
        let loads = self.station_loads(index, flow, omega, collective_deg, v);
        Ok(StationResult {
            radius_m: station.radius_m,
            induced_velocity_m_s: v,
            inflow_angle_deg: loads.phi.to_degrees(),
            alpha_deg: loads.alpha_deg,
            cl: loads.sample.cl,
            cd: loads.sample.cd,
            reynolds: flow.density_kg_m3 * loads.w * station.chord_m / flow.dynamic_viscosity_pa_s,
            tip_loss: loads.tip_loss,
            thrust_per_span_n_m: loads.thrust,
            torque_per_span_nm_m: loads.torque,
            method: loads.sample.method,
            clamped,
        })
    }

    fn station_loads(
        &self,
        index: usize,
        flow: &FlowCondition,
        omega: f64,
        collective_deg: f64,
        induced: f64,
    ) -> StationLoads {
        let station = &self.geometry.stations()[index];
        let r = station.radius_m;
        let blades = self.geometry.blade_count() as f64;
        let rho = flow.density_kg_m3;
        let (sin_i, cos_i) = flow.incidence_deg.to_radians().sin_cos();
        let axial = flow.speed_m_s * sin_i;
        let in_plane = flow.speed_m_s * cos_i;

        let u_t = omega * r;
        let u_p = axial + induced;
        let w2 = u_t * u_t + u_p * u_p;
        let phi = u_p.atan2(u_t);
        let alpha_deg = station.pitch_deg + collective_deg - phi.to_degrees();
        let sample = station.airfoil.evaluate(alpha_deg);

        let (sin_phi, cos_phi) = phi.sin_cos();
        let k = blades * 0.5 * rho * w2 * station.chord_m;
        let thrust = k * (sample.cl * cos_phi - sample.cd * sin_phi);
        let torque = k * (sample.cl * sin_phi + sample.cd * cos_phi) * r;

        let tip_loss = self.tip_loss(r, sin_phi);
        let momentum = if flow.speed_m_s == 0.0 {
            4.0 * PI * rho * r * tip_loss * induced * induced.abs()
        } else {
            let skewed = (in_plane * in_plane + u_p * u_p).sqrt();
            4.0 * PI * rho * r * tip_loss * induced * skewed
        };

        StationLoads {
            thrust,
            torque,
            residual: thrust - momentum,
            phi,
            alpha_deg,
            w: w2.sqrt(),
            tip_loss,
            sample,
        }
    }

    /// Prandtl tip and hub loss factor.
    fn tip_loss(&self, r: f64, sin_phi: f64) -> f64 {
        let blades = self.geometry.blade_count() as f64;
        let tip = self.geometry.radius_m();
        let hub = self.geometry.hub_radius_m();
        let s = sin_phi.abs().max(1e-12);
        let f_tip = blades * (tip - r) / (2.0 * r * s);
        let mut factor = 2.0 / PI * (-f_tip).exp().acos();
        if hub > 0.0 {
            let f_hub = (blades * (r - hub) / (2.0 * hub * s)).min(700.0);
            factor *= 2.0 / PI * (-f_hub).exp().acos();
        }
        factor.max(MIN_TIP_LOSS)
    }
}
