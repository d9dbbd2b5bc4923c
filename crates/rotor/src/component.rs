use evtol_core::{Component, Vars};

use crate::{Bemt, FlowCondition, RotorError, TrimOptions};

/// RPM-trimmed rotor as a uniform component.
///
/// Inputs `thrust` (N) and `speed` (m/s); outputs `rpm`, `power` (W) and `torque` (N·m).
/// The freestream direction and air properties come from `flow`.
#[derive(Debug, Clone)]
pub struct RotorComponent {
    pub bemt: Bemt,
    pub flow: FlowCondition,
    pub trim: TrimOptions,
}

impl RotorComponent {
    pub fn new(bemt: Bemt, flow: FlowCondition, trim: TrimOptions) -> Self {
        Self { bemt, flow, trim }
    }
}

impl Component for RotorComponent {
    type Error = RotorError;

    fn input_names(&self) -> Vec<&'static str> {
        vec!["thrust", "speed"]
    }

    fn evaluate(&self, inputs: &Vars) -> Result<Vars, Self::Error> {
        let thrust = inputs.require("thrust")?;
        let speed = inputs.require("speed")?;
        let trim = self
            .bemt
            .trim_rpm(thrust, &self.flow.with_speed(speed), &self.trim)?;
        Ok(Vars::new()
            .with("rpm", trim.rpm)
            .with("power", trim.result.power_w)
            .with("torque", trim.result.torque_nm))
    }
}
