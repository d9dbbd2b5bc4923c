use std::f64::consts::PI;
use std::sync::Arc;

use evtol_airfoil::Airfoil;

use crate::RotorError;

/// One spanwise blade station.
#[derive(Debug, Clone)]
pub struct BladeStation {
    pub radius_m: f64,
    pub chord_m: f64,
    /// Geometric pitch, before the collective offset (degrees).
    pub pitch_deg: f64,
    pub airfoil: Arc<dyn Airfoil>,
}

/// Linear chord taper and twist between hub and tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBlade {
    pub root_chord_m: f64,
    pub tip_chord_m: f64,
    pub root_pitch_deg: f64,
    pub tip_pitch_deg: f64,
    pub station_count: usize,
}

/// Validated rotor geometry with precomputed integration widths.
#[derive(Debug, Clone)]
pub struct RotorGeometry {
    blade_count: usize,
    diameter_m: f64,
    hub_radius_m: f64,
    collective_deg: f64,
    stations: Vec<BladeStation>,
    element_widths_m: Vec<f64>,
}

impl RotorGeometry {
    pub fn new(
        blade_count: usize,
        diameter_m: f64,
        hub_radius_m: f64,
        collective_deg: f64,
        stations: Vec<BladeStation>,
    ) -> Result<Self, RotorError> {
        if blade_count == 0 {
            return Err(RotorError::Domain("blade count must be positive".into()));
        }
        if !(diameter_m.is_finite() && diameter_m > 0.0) {
            return Err(RotorError::Domain(format!(
                "rotor diameter {diameter_m} m must be positive"
            )));
        }
        let tip = 0.5 * diameter_m;
        if !(hub_radius_m.is_finite() && (0.0..tip).contains(&hub_radius_m)) {
            return Err(RotorError::Domain(format!(
                "hub radius {hub_radius_m} m must lie in [0, {tip})"
            )));
        }
        if !collective_deg.is_finite() {
            return Err(RotorError::Domain("collective must be finite".into()));
        }
        if stations.is_empty() {
            return Err(RotorError::Domain("at least one blade station is required".into()));
        }
        let mut previous = hub_radius_m;
        for station in &stations {
            if !(station.radius_m > previous && station.radius_m < tip) {
                return Err(RotorError::Domain(format!(
                    "station radius {} m must increase strictly inside ({hub_radius_m}, {tip}) m",
                    station.radius_m
                )));
            }
            if !(station.chord_m.is_finite() && station.chord_m > 0.0) {
                return Err(RotorError::Domain(format!(
                    "chord {} m at r = {} m must be positive",
                    station.chord_m, station.radius_m
                )));
            }
            if !station.pitch_deg.is_finite() {
                return Err(RotorError::Domain(format!(
                    "pitch at r = {} m must be finite",
                    station.radius_m
                )));
            }
            previous = station.radius_m;
        }

        let element_widths_m = element_widths(hub_radius_m, tip, &stations);
        Ok(Self {
            blade_count,
            diameter_m,
            hub_radius_m,
            collective_deg,
            stations,
            element_widths_m,
        })
    }

    /// Stations at the centres of equal-width elements between hub and tip, with chord and
    /// pitch interpolated linearly.
    pub fn from_linear(
        blade_count: usize,
        diameter_m: f64,
        hub_radius_m: f64,
        blade: &LinearBlade,
        airfoil: Arc<dyn Airfoil>,
    ) -> Result<Self, RotorError> {
        if blade.station_count == 0 {
            return Err(RotorError::Domain("station count must be positive".into()));
        }
        let tip = 0.5 * diameter_m;
        let n = blade.station_count as f64;
        let stations = (0..blade.station_count)
            .map(|i| {
                let fraction = (i as f64 + 0.5) / n;
                BladeStation {
                    radius_m: hub_radius_m + (tip - hub_radius_m) * fraction,
                    chord_m: blade.root_chord_m + (blade.tip_chord_m - blade.root_chord_m) * fraction,
                    pitch_deg: blade.root_pitch_deg
                        + (blade.tip_pitch_deg - blade.root_pitch_deg) * fraction,
                    airfoil: Arc::clone(&airfoil),
                }
            })
            .collect();
        Self::new(blade_count, diameter_m, hub_radius_m, 0.0, stations)
    }

    /// Copy with a different global pitch offset.
    pub fn with_collective(mut self, collective_deg: f64) -> Self {
        self.collective_deg = collective_deg;
        self
    }

    pub fn blade_count(&self) -> usize {
        self.blade_count
    }

    pub fn diameter_m(&self) -> f64 {
        self.diameter_m
    }

    pub fn radius_m(&self) -> f64 {
        0.5 * self.diameter_m
    }

    pub fn hub_radius_m(&self) -> f64 {
        self.hub_radius_m
    }

    pub fn collective_deg(&self) -> f64 {
        self.collective_deg
    }

    pub fn disk_area_m2(&self) -> f64 {
        PI * self.radius_m() * self.radius_m()
    }

    pub fn stations(&self) -> &[BladeStation] {
        &self.stations
    }

    /// Spanwise width attributed to each station by the midpoint rule.
    pub fn element_widths_m(&self) -> &[f64] {
        &self.element_widths_m
    }

    /// Blade area over disk area.
    pub fn solidity(&self) -> f64 {
        let blade_area: f64 = self
            .stations
            .iter()
            .zip(&self.element_widths_m)
            .map(|(s, dr)| s.chord_m * dr)
            .sum();
        self.blade_count as f64 * blade_area / self.disk_area_m2()
    }
}

fn element_widths(hub: f64, tip: f64, stations: &[BladeStation]) -> Vec<f64> {
    let mut edges = Vec::with_capacity(stations.len() + 1);
    edges.push(hub);
    edges.extend(
        stations
            .windows(2)
            .map(|pair| 0.5 * (pair[0].radius_m + pair[1].radius_m)),
    );
    edges.push(tip);
    edges.windows(2).map(|pair| pair[1] - pair[0]).collect()
}
