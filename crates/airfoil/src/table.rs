use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::{Airfoil, AirfoilError, AirfoilSample, EvalMethod, normalize_name, wrap_degrees};

const DEFAULT_ASPECT_RATIO: f64 = 10.0;

/// Measured polar with Viterna–Corrigan post-stall extension.
#[derive(Debug, Clone)]
pub struct TabulatedAirfoil {
    name: String,
    alpha_deg: Vec<f64>,
    cl: Vec<f64>,
    cd: Vec<f64>,
    cd_max: f64,
    cd_180: f64,
    upper: ViternaBranch,
    lower: ViternaBranch,
}

#[derive(Debug, Clone, Copy)]
struct ViternaBranch {
    a1: f64,
    a2: f64,
    b1: f64,
    b2: f64,
}

impl ViternaBranch {
    fn anchored_at(alpha_deg: f64, cl: f64, cd: f64, cd_max: f64) -> Self {
        let (s, c) = alpha_deg.to_radians().sin_cos();
        Self {
            a1: 0.5 * cd_max,
            a2: (cl - cd_max * s * c) * s / (c * c),
            b1: cd_max,
            b2: (cd - cd_max * s * s) / c,
        }
    }

    fn evaluate(&self, alpha_deg: f64) -> (f64, f64) {
        let alpha = alpha_deg.to_radians();
        let (s, c) = alpha.sin_cos();
        let cl = self.a1 * (2.0 * alpha).sin() + self.a2 * c * c / s;
        let cd = self.b1 * s * s + self.b2 * c;
        (cl, cd)
    }
}

impl TabulatedAirfoil {
    /// Build from parallel arrays using the default blade aspect ratio for `cd_max`.
    pub fn new(
        name: &str,
        alpha_deg: Vec<f64>,
        cl: Vec<f64>,
        cd: Vec<f64>,
    ) -> Result<Self, AirfoilError> {
        Self::with_aspect_ratio(name, alpha_deg, cl, cd, DEFAULT_ASPECT_RATIO)
    }

    pub fn with_aspect_ratio(
        name: &str,
        alpha_deg: Vec<f64>,
        cl: Vec<f64>,
        cd: Vec<f64>,
        aspect_ratio: f64,
    ) -> Result<Self, AirfoilError> {
        let name = normalize_name(name);
        let invalid = |reason: String| AirfoilError::InvalidDomain {
            name: name.clone(),
            reason,
        };
        if alpha_deg.len() != cl.len() || alpha_deg.len() != cd.len() {
            return Err(invalid(format!(
                "column lengths differ (alpha {}, cl {}, cd {})",
                alpha_deg.len(),
                cl.len(),
                cd.len()
            )));
        }
        if alpha_deg.len() < 2 {
            return Err(invalid("at least two rows are required".to_string()));
        }
        let rows = alpha_deg.iter().zip(&cl).zip(&cd);
        if let Some((row, ((a, l), d))) = rows
            .enumerate()
            .find(|(_, ((a, l), d))| !(a.is_finite() && l.is_finite() && d.is_finite()))
        {
            return Err(invalid(format!(
                "row {} ({a}, {l}, {d}) is not finite",
                row + 1
            )));
        }
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            return Err(invalid(format!("aspect ratio {aspect_ratio} must be positive")));
        }
        for (index, pair) in alpha_deg.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(AirfoilError::OutOfOrder {
                    name,
                    line: (index + 2) as u64,
                    alpha: pair[1],
                    previous: pair[0],
                });
            }
        }
        let first = alpha_deg[0];
        let last = alpha_deg[alpha_deg.len() - 1];
        if !(first > -90.0 && first < 0.0 && last > 0.0 && last < 90.0) {
            return Err(invalid(format!(
                "table [{first}, {last}] deg must straddle 0 deg inside (-90, 90)"
            )));
        }

        let cd_max = 1.11 + 0.018 * aspect_ratio;
        let n = alpha_deg.len() - 1;
        let upper = ViternaBranch::anchored_at(last, cl[n], cd[n], cd_max);
        let lower = ViternaBranch::anchored_at(first, cl[0], cd[0], cd_max);
        let cd_180 = interpolate(&alpha_deg, &cd, 0.0);

        Ok(Self {
            name,
            alpha_deg,
            cl,
            cd,
            cd_max,
            cd_180,
            upper,
            lower,
        })
    }

    /// Angle range covered by measured data (degrees).
    pub fn table_range(&self) -> (f64, f64) {
        (self.alpha_deg[0], self.alpha_deg[self.alpha_deg.len() - 1])
    }

    pub fn cd_max(&self) -> f64 {
        self.cd_max
    }
}

impl Airfoil for TabulatedAirfoil {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, alpha_deg: f64) -> AirfoilSample {
        let alpha = wrap_degrees(alpha_deg);
        let (low, high) = self.table_range();
        if alpha.abs() >= 90.0 {
            let (s, c) = alpha.to_radians().sin_cos();
            return AirfoilSample {
                cl: self.cd_max * s * c,
                cd: self.cd_max * s * s + self.cd_180 * c.abs(),
                method: EvalMethod::FlatPlate,
            };
        }
        let (cl, cd, method) = if alpha > high {
            let (cl, cd) = self.upper.evaluate(alpha);
            (cl, cd, EvalMethod::Viterna)
        } else if alpha < low {
            let (cl, cd) = self.lower.evaluate(alpha);
            (cl, cd, EvalMethod::Viterna)
        } else {
            (
                interpolate(&self.alpha_deg, &self.cl, alpha),
                interpolate(&self.alpha_deg, &self.cd, alpha),
                EvalMethod::Interpolated,
            )
        };
        AirfoilSample { cl, cd, method }
    }
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let upper = xs.partition_point(|&v| v < x).clamp(1, xs.len() - 1);
    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Parse a delimited `alpha, cl, cd` table.
///
/// Columns may be separated by commas, semicolons, tabs or runs of spaces. Lines starting
/// with `#` are comments and a single leading header line is skipped.
pub fn parse_table(name: &str, text: &str) -> Result<TabulatedAirfoil, AirfoilError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let mut alpha = Vec::new();
    let mut cl = Vec::new();
    let mut cd = Vec::new();
    let mut header_allowed = true;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        let values = match parsed {
            Ok(values) => values,
            Err(_) if header_allowed => {
                header_allowed = false;
                continue;
            }
            Err(err) => {
                return Err(AirfoilError::MalformedTable {
                    name: normalize_name(name),
                    line,
                    reason: format!("non-numeric field: {err}"),
                });
            }
        };
        header_allowed = false;
        if values.len() != 3 {
            return Err(AirfoilError::MalformedTable {
                name: normalize_name(name),
                line,
                reason: format!("expected 3 columns, found {}", values.len()),
            });
        }
        if let Some(value) = values.iter().find(|v| !v.is_finite()) {
            return Err(AirfoilError::MalformedTable {
                name: normalize_name(name),
                line,
                reason: format!("non-finite value {value}"),
            });
        }
        if let Some(&previous) = alpha.last() {
            if values[0] <= previous {
                return Err(AirfoilError::OutOfOrder {
                    name: normalize_name(name),
                    line,
                    alpha: values[0],
                    previous,
                });
            }
        }
        alpha.push(values[0]);
        cl.push(values[1]);
        cd.push(values[2]);
    }

    TabulatedAirfoil::new(name, alpha, cl, cd)
}

/// Load a table file; the airfoil is named after the file stem.
pub fn load_table_file<P: AsRef<Path>>(path: P) -> Result<TabulatedAirfoil, AirfoilError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| AirfoilError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_table(&name, &text)
}

fn detect_delimiter(text: &str) -> u8 {
    let sample = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or("");
    if sample.contains(',') {
        b','
    } else if sample.contains(';') {
        b';'
    } else if sample.contains('\t') {
        b'\t'
    } else {
        b' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_skips_comments() {
        assert_eq!(detect_delimiter("# a, b\n0;1;2\n"), b';');
        assert_eq!(detect_delimiter("0\t1\t2"), b'\t');
        assert_eq!(detect_delimiter("  0   1  2"), b' ');
    }

    #[test]
    fn interpolation_hits_nodes() {
        let xs = [-2.0, 0.0, 4.0];
        let ys = [1.0, 2.0, 10.0];
        assert_eq!(interpolate(&xs, &ys, 0.0), 2.0);
        assert_eq!(interpolate(&xs, &ys, 2.0), 6.0);
        assert_eq!(interpolate(&xs, &ys, -2.0), 1.0);
        assert_eq!(interpolate(&xs, &ys, 4.0), 10.0);
    }
}
