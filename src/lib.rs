//! Conceptual sizing of battery-electric eVTOL aircraft.
//!
//! The physics lives in the workspace crates; this facade re-exports them so front-ends
//! (the `evtol-size` CLI, external optimizers) depend on a single library.

pub use evtol_airfoil as airfoil;
pub use evtol_config as config;
pub use evtol_core as common;
pub use evtol_export as export;
pub use evtol_mission as mission;
pub use evtol_rotor as rotor;
pub use evtol_sizing as sizing;
pub use evtol_weights as weights;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
