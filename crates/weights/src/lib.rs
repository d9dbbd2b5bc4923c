//! Component weight models.
//!
//! Every model takes SI inputs and returns a mass in kilograms, together with the exact
//! partial derivative of that mass with respect to each input. Regressions calibrated in
//! pounds and feet convert at their boundary using `evtol_core::units`. All models scale
//! linearly with a technology factor in (0, 1].

mod models;

use std::collections::BTreeMap;
use std::fmt;

use evtol_core::{Component, MissingVariable, Partials, Vars};
use thiserror::Error;

pub use models::{
    AntiIcingWeight, AvionicsWeight, BatteryWeight, ControllerWeight, FlightControlWeight,
    FurnishingsWeight, FuselageWeight, LandingGearWeight, MotorWeight, RotorWeight, WingWeight,
};

/// Input name shared by every model for its technology factor.
pub const TECHNOLOGY_FACTOR: &str = "technology_factor";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeightError {
    #[error("domain error in {model} weight: {reason}")]
    Domain { model: &'static str, reason: String },
    #[error("{model} weight has no input `{name}`")]
    UnknownInput { model: &'static str, name: String },
    #[error(transparent)]
    MissingInput(#[from] MissingVariable),
}

/// Empirical mass estimate with analytic partials.
pub trait WeightModel: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn technology_factor(&self) -> f64;

    /// Named scalar inputs, technology factor included.
    fn inputs(&self) -> Vec<(&'static str, f64)>;

    fn set_input(&mut self, name: &str, value: f64) -> Result<(), WeightError>;

    /// Reject inputs outside the regression's domain.
    fn validate(&self) -> Result<(), WeightError>;

    /// Mass at a technology factor of one (kg). Only meaningful after [`validate`](Self::validate).
    fn nominal_weight(&self) -> f64;

    /// Derivatives of [`nominal_weight`](Self::nominal_weight) with respect to every input
    /// except the technology factor.
    fn nominal_partials(&self) -> BTreeMap<&'static str, f64>;

    /// Mass in kilograms.
    fn weight(&self) -> Result<f64, WeightError> {
        self.checked()?;
        Ok(self.technology_factor() * self.nominal_weight())
    }

    /// `∂weight/∂input` for every input, in kg per SI unit of the input.
    fn partials(&self) -> Result<BTreeMap<&'static str, f64>, WeightError> {
        self.checked()?;
        let tf = self.technology_factor();
        let mut partials: BTreeMap<&'static str, f64> = self
            .nominal_partials()
            .into_iter()
            .map(|(name, value)| (name, tf * value))
            .collect();
        partials.insert(TECHNOLOGY_FACTOR, self.nominal_weight());
        Ok(partials)
    }

    #[doc(hidden)]
    fn checked(&self) -> Result<(), WeightError> {
        let tf = self.technology_factor();
        if !(tf > 0.0 && tf <= 1.0) {
            return Err(WeightError::Domain {
                model: self.name(),
                reason: format!("technology factor {tf} must lie in (0, 1]"),
            });
        }
        self.validate()
    }
}

/// Fail unless `value` is finite and strictly positive.
pub(crate) fn positive(model: &'static str, name: &str, value: f64) -> Result<(), WeightError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WeightError::Domain {
            model,
            reason: format!("{name} = {value} must be positive"),
        })
    }
}

/// Fail unless `value` is finite and non-negative.
pub(crate) fn non_negative(
    model: &'static str,
    name: &str,
    value: f64,
) -> Result<(), WeightError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(WeightError::Domain {
            model,
            reason: format!("{name} = {value} must be non-negative"),
        })
    }
}

/// Any weight model as a uniform component: all model inputs in, `weight` out.
#[derive(Debug, Clone)]
pub struct WeightComponent<M> {
    pub model: M,
}

impl<M: WeightModel + Clone> WeightComponent<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    fn bind(&self, inputs: &Vars) -> Result<M, WeightError> {
        let mut model = self.model.clone();
        for (name, _) in self.model.inputs() {
            model.set_input(name, inputs.require(name)?)?;
        }
        Ok(model)
    }
}

impl<M: WeightModel + Clone> Component for WeightComponent<M> {
    type Error = WeightError;

    fn input_names(&self) -> Vec<&'static str> {
        self.model.inputs().into_iter().map(|(name, _)| name).collect()
    }

    fn evaluate(&self, inputs: &Vars) -> Result<Vars, Self::Error> {
        let model = self.bind(inputs)?;
        Ok(Vars::new().with("weight", model.weight()?))
    }

    fn jacobian(&self, inputs: &Vars) -> Result<Partials, Self::Error> {
        let model = self.bind(inputs)?;
        let mut partials = Partials::new();
        for (name, value) in model.partials()? {
            partials.set("weight", name, value);
        }
        Ok(partials)
    }
}

/// Generates `inputs` and `set_input` from a list of `"name" => field` pairs.
macro_rules! weight_inputs {
    ($($input:literal => $field:ident),+ $(,)?) => {
        fn inputs(&self) -> Vec<(&'static str, f64)> {
            vec![$(($input, self.$field)),+]
        }

        fn set_input(&mut self, name: &str, value: f64) -> Result<(), WeightError> {
            match name {
                $($input => self.$field = value,)+
                _ => {
                    return Err(WeightError::UnknownInput {
                        model: self.name(),
                        name: name.to_string(),
                    });
                }
            }
            Ok(())
        }
    };
}

pub(crate) use weight_inputs;
