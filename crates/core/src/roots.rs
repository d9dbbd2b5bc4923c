//! Bracketing scalar root finder shared by the rotor trim and inflow solvers.

use thiserror::Error;

/// Converged root together with its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    pub residual: f64,
    pub iterations: usize,
}

/// Termination criteria for [`brent`].
#[derive(Debug, Clone, Copy)]
pub struct BrentOptions {
    /// Absolute tolerance on the abscissa.
    pub x_tolerance: f64,
    /// Absolute tolerance on the residual; the search stops as soon as `|f| <= f_tolerance`.
    pub f_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for BrentOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-12,
            f_tolerance: 0.0,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RootError {
    #[error("root not bracketed: f({a}) = {fa}, f({b}) = {fb}")]
    NotBracketed { a: f64, b: f64, fa: f64, fb: f64 },
    #[error("root finder did not converge after {iterations} iterations (x = {x}, f = {residual})")]
    MaxIterations {
        iterations: usize,
        x: f64,
        residual: f64,
    },
    #[error("residual is not finite at x = {x}")]
    NonFinite { x: f64 },
}

/// Brent's method on `[a, b]`.
///
/// The residual closure is fallible so callers can propagate model errors from inside
/// the search; bracketing and convergence failures are reported through `E: From<RootError>`.
pub fn brent<F, E>(mut f: F, a: f64, b: f64, options: &BrentOptions) -> Result<Root, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<RootError>,
{
    let mut a = a;
    let mut b = b;
    let mut fa = finite(a, f(a)?)?;
    let mut fb = finite(b, f(b)?)?;

    if fa == 0.0 {
        return Ok(Root {
            x: a,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fb == 0.0 {
        return Ok(Root {
            x: b,
            residual: 0.0,
            iterations: 0,
        });
    }
    if fa.signum() == fb.signum() {
        return Err(RootError::NotBracketed { a, b, fa, fb }.into());
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=options.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * options.x_tolerance;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 || fb.abs() <= options.f_tolerance {
            return Ok(Root {
                x: b,
                residual: fb,
                iterations: iteration,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * m * s, 1.0 - s)
            } else {
                // inverse quadratic interpolation
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = d;
            }
        } else {
            d = m;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = finite(b, f(b)?)?;
    }

    Err(RootError::MaxIterations {
        iterations: options.max_iterations,
        x: b,
        residual: fb,
    }
    .into())
}

fn finite(x: f64, value: f64) -> Result<f64, RootError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RootError::NonFinite { x })
    }
}
