//! Uniform function-object interface for analysis components.
//!
//! A component maps named scalar inputs to named scalar outputs and exposes partial
//! derivatives of every output with respect to every input. Components that have no
//! analytic partials inherit a central finite-difference Jacobian.

use std::collections::BTreeMap;

use thiserror::Error;

/// Named scalar values passed into and out of a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vars(BTreeMap<String, f64>);

/// A required variable was not supplied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing variable `{0}`")]
pub struct MissingVariable(pub String);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<f64, MissingVariable> {
        self.get(name)
            .ok_or_else(|| MissingVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for Vars {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Partial derivatives keyed by `(output, input)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partials(BTreeMap<(String, String), f64>);

impl Partials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, output: impl Into<String>, input: impl Into<String>, value: f64) {
        self.0.insert((output.into(), input.into()), value);
    }

    pub fn get(&self, output: &str, input: &str) -> Option<f64> {
        self.0
            .get(&(output.to_string(), input.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.0
            .iter()
            .map(|((out, inp), v)| (out.as_str(), inp.as_str(), *v))
    }
}

/// Relative step used by the default finite-difference Jacobian.
pub const FD_RELATIVE_STEP: f64 = 1e-6;

/// Analysis component with an `evaluate` / `jacobian` pair.
pub trait Component {
    type Error: From<MissingVariable>;

    /// Inputs the component reads, in a stable order.
    fn input_names(&self) -> Vec<&'static str>;

    /// Map inputs to outputs.
    fn evaluate(&self, inputs: &Vars) -> Result<Vars, Self::Error>;

    /// Partial derivatives of all outputs with respect to all inputs.
    fn jacobian(&self, inputs: &Vars) -> Result<Partials, Self::Error> {
        central_difference(self, inputs, FD_RELATIVE_STEP)
    }
}

/// Central finite-difference Jacobian of `component` around `inputs`.
pub fn central_difference<C>(
    component: &C,
    inputs: &Vars,
    relative_step: f64,
) -> Result<Partials, C::Error>
where
    C: Component + ?Sized,
{
    let mut partials = Partials::new();
    for name in component.input_names() {
        let x = inputs.require(name)?;
        let h = relative_step * x.abs().max(1.0);
        let mut plus = inputs.clone();
        plus.set(name, x + h);
        let mut minus = inputs.clone();
        minus.set(name, x - h);
        let up = component.evaluate(&plus)?;
        let down = component.evaluate(&minus)?;
        for (output, value_up) in up.iter() {
            if let Some(value_down) = down.get(output) {
                partials.set(output, name, (value_up - value_down) / (2.0 * h));
            }
        }
    }
    Ok(partials)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Square;

    impl Component for Square {
        type Error = MissingVariable;

        fn input_names(&self) -> Vec<&'static str> {
            vec!["x"]
        }

        fn evaluate(&self, inputs: &Vars) -> Result<Vars, Self::Error> {
            let x = inputs.require("x")?;
            Ok(Vars::new().with("y", x * x))
        }
    }

    #[test]
    fn default_jacobian_is_central_difference() {
        let partials = Square.jacobian(&Vars::new().with("x", 3.0)).unwrap();
        let dy_dx = partials.get("y", "x").unwrap();
        assert!((dy_dx - 6.0).abs() < 1e-6);
    }

    #[test]
    fn missing_input_is_reported() {
        let err = Square.evaluate(&Vars::new()).unwrap_err();
        assert_eq!(err, MissingVariable("x".to_string()));
    }
}
