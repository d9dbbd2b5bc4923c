//! Case-file models and loaders for the eVTOL sizing workspace.
//!
//! A case bundles the vehicle, mission, environment, solver settings and design space.
//! Files are YAML or TOML; unknown keys are rejected so misspellings fail at load time.

use std::fs::File;
use std::path::{Path, PathBuf};

use evtol_mission::{MissionError, Segment, SegmentKind, SegmentSpec};
use serde::Deserialize;
use thiserror::Error;

/// Complete sizing case.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    pub name: String,
    pub vehicle: VehicleConfig,
    pub mission: Vec<SegmentConfig>,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub design: DesignConfig,
    /// Directory of airfoil tables, relative to the case file.
    #[serde(default)]
    pub airfoil_dir: Option<PathBuf>,
}

/// Vehicle layout selector.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    /// Lift rotors fly every segment; the disks tilt forward in cruise.
    Multirotor,
    /// Lift rotors for hover, propellers and a wing for wing-borne flight.
    LiftPlusCruise,
}

impl TopologyKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Multirotor => "multirotor",
            Self::LiftPlusCruise => "lift_plus_cruise",
        }
    }
}

/// Vehicle description. Topology-specific sections are optional here and checked when the
/// vehicle is assembled.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VehicleConfig {
    pub topology: TopologyKind,
    pub passengers: u32,
    pub payload_kg: f64,
    pub fuselage: FuselageConfig,
    pub battery: BatteryConfig,
    #[serde(default = "default_load_factor")]
    pub ultimate_load_factor: f64,
    pub controller_specific_power_w_kg: f64,
    pub avionics_uninstalled_kg: f64,
    #[serde(default)]
    pub technology: TechnologyConfig,
    pub lift_rotor: RotorConfig,
    /// Multirotor equivalent flat-plate drag area (m²).
    #[serde(default)]
    pub flat_plate_area_m2: Option<f64>,
    /// Multirotor span added to the rotor footprint for the flight-control estimate (m).
    #[serde(default)]
    pub span_margin_m: Option<f64>,
    #[serde(default)]
    pub wing: Option<WingConfig>,
    #[serde(default)]
    pub propeller: Option<RotorConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FuselageConfig {
    pub length_m: f64,
    pub perimeter_m: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatteryConfig {
    pub specific_energy_wh_kg: f64,
    #[serde(default = "default_battery_efficiency")]
    pub efficiency: f64,
    #[serde(default = "default_depth_of_discharge")]
    pub depth_of_discharge: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WingConfig {
    pub area_m2: f64,
    pub aspect_ratio: f64,
    pub cd0: f64,
    #[serde(default = "default_oswald")]
    pub oswald_efficiency: f64,
}

/// Rotor group: identical rotors with a linearly tapered and twisted blade.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RotorConfig {
    pub count: u32,
    pub blades: u32,
    pub radius_m: f64,
    #[serde(default = "default_hub_fraction")]
    pub hub_fraction: f64,
    pub root_chord_m: f64,
    pub tip_chord_m: f64,
    pub root_pitch_deg: f64,
    pub tip_pitch_deg: f64,
    #[serde(default = "default_stations")]
    pub stations: usize,
    #[serde(default = "default_airfoil")]
    pub airfoil: String,
    #[serde(default = "default_rpm_range")]
    pub rpm_range: [f64; 2],
    #[serde(default = "default_collective_range")]
    pub collective_range_deg: [f64; 2],
    /// Forward-flight advance ratio; pins the RPM outside hover when set.
    #[serde(default)]
    pub advance_ratio: Option<f64>,
}

/// Multiplicative weight discounts, one per component model.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TechnologyConfig {
    pub fuselage: f64,
    pub wing: f64,
    pub landing_gear: f64,
    pub battery: f64,
    pub motor: f64,
    pub controller: f64,
    pub rotor: f64,
    pub avionics: f64,
    pub flight_control: f64,
    pub furnishings: f64,
    pub anti_icing: f64,
}

impl Default for TechnologyConfig {
    fn default() -> Self {
        Self {
            fuselage: 1.0,
            wing: 1.0,
            landing_gear: 1.0,
            battery: 1.0,
            motor: 1.0,
            controller: 1.0,
            rotor: 1.0,
            avionics: 1.0,
            flight_control: 1.0,
            furnishings: 1.0,
            anti_icing: 1.0,
        }
    }
}

/// One mission segment as written in a case file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SegmentConfig {
    pub name: String,
    pub kind: SegmentKind,
    #[serde(default)]
    pub speed_m_s: Option<f64>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub climb_angle_deg: Option<f64>,
    #[serde(default)]
    pub lift_rotor_rpm: Option<f64>,
    #[serde(default)]
    pub propeller_rpm: Option<f64>,
}

impl SegmentConfig {
    pub fn to_segment(&self) -> Result<Segment, MissionError> {
        Segment::new(
            self.name.clone(),
            self.kind,
            SegmentSpec {
                speed_m_s: self.speed_m_s,
                distance_m: self.distance_m,
                duration_s: self.duration_s,
                altitude_m: self.altitude_m,
                climb_angle_deg: self.climb_angle_deg,
                lift_rotor_rpm: self.lift_rotor_rpm,
                propeller_rpm: self.propeller_rpm,
            },
        )
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Atmosphere model name, resolved case-insensitively.
    pub atmosphere: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            atmosphere: "US_Standard_1976".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    #[default]
    FixedPoint,
    Newton,
}

impl SolverMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::FixedPoint => "fixed_point",
            Self::Newton => "newton",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceKind {
    Absolute,
    #[default]
    Relative,
}

/// Weight/energy closure settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub method: SolverMethod,
    pub initial_takeoff_mass_kg: f64,
    pub tolerance: f64,
    pub tolerance_kind: ToleranceKind,
    pub max_iterations: usize,
    pub relaxation: f64,
    pub min_relaxation: f64,
    /// Iterates above this mass are treated as divergence.
    pub max_takeoff_mass_kg: f64,
    /// Relative thrust tolerance used by every rotor trim inside the loop.
    pub trim_rel_tol: f64,
    pub trim_max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::FixedPoint,
            initial_takeoff_mass_kg: 2_000.0,
            tolerance: 1e-6,
            tolerance_kind: ToleranceKind::Relative,
            max_iterations: 100,
            relaxation: 1.0,
            min_relaxation: 1.0 / 64.0,
            max_takeoff_mass_kg: 50_000.0,
            trim_rel_tol: 1e-10,
            trim_max_iterations: 100,
        }
    }
}

/// Design variables exposed to an external optimizer.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DesignConfig {
    pub variables: Vec<DesignVariableConfig>,
    /// Constraint limits checked on the converged design.
    pub constraints: ConstraintConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DesignVariableConfig {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ConstraintConfig {
    /// Upper limit on hover disk loading (N/m²).
    pub max_disk_loading_n_m2: Option<f64>,
    /// Upper limit on lift-rotor tip speed (m/s).
    pub max_tip_speed_m_s: Option<f64>,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{path} contains {count} cases; expected exactly one")]
    NotSingle { path: PathBuf, count: usize },
}

/// Load exactly one case from a YAML or TOML file.
pub fn load_case<P: AsRef<Path>>(path: P) -> Result<CaseConfig, ConfigError> {
    let path = path.as_ref();
    let mut cases = load_cases(path)?;
    if cases.len() != 1 {
        return Err(ConfigError::NotSingle {
            path: path.to_path_buf(),
            count: cases.len(),
        });
    }
    Ok(cases.remove(0))
}

/// Load every case from a file (one record or a list) or a directory of case files.
///
/// Relative `airfoil_dir` entries are resolved against the directory of the file that
/// declared them.
pub fn load_cases<P: AsRef<Path>>(path: P) -> Result<Vec<CaseConfig>, ConfigError> {
    let path = path.as_ref();
    if path.is_dir() {
        let mut cases = Vec::new();
        for file in case_files(path)? {
            cases.extend(load_cases(&file)?);
        }
        return Ok(cases);
    }
    let mut cases: Vec<CaseConfig> = load_records(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for case in &mut cases {
        if let Some(dir) = case.airfoil_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
    Ok(cases)
}

/// Parse a case from YAML text; relative paths stay as written.
pub fn parse_case_yaml(text: &str) -> Result<CaseConfig, ConfigError> {
    Ok(serde_yaml::from_str(text)?)
}

fn load_records<T>(path: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if is_toml(path) {
        let contents = std::fs::read_to_string(path).map_err(io_error)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path).map_err(io_error)?;
        let value: serde_yaml::Value = serde_yaml::from_reader(reader)?;
        if value.is_sequence() {
            Ok(serde_yaml::from_value(value)?)
        } else {
            Ok(vec![serde_yaml::from_value(value)?])
        }
    }
}

fn case_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext == "toml" || ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
        .collect();
    entries.sort();
    Ok(entries)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn default_load_factor() -> f64 {
    5.7
}

fn default_battery_efficiency() -> f64 {
    0.9
}

fn default_depth_of_discharge() -> f64 {
    0.8
}

fn default_oswald() -> f64 {
    0.8
}

fn default_hub_fraction() -> f64 {
    0.15
}

fn default_stations() -> usize {
    20
}

fn default_airfoil() -> String {
    "NACA0012".to_string()
}

fn default_rpm_range() -> [f64; 2] {
    [20.0, 3_000.0]
}

fn default_collective_range() -> [f64; 2] {
    [-15.0, 30.0]
}
