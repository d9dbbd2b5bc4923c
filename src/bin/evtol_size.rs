use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use evtol_mdo::config::{SolverMethod, load_case};
use evtol_mdo::export::{Report, save_report_json, save_table_csv};
use evtol_mdo::sizing::{DesignProblem, DesignVariables};
use log::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Size an eVTOL case to a self-consistent take-off mass"
)]
struct Cli {
    /// Case file (YAML or TOML)
    case: PathBuf,

    /// Closure method (defaults to the case's solver setting)
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Write the result table as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the result table and iteration history as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Design-variable override as `name=value`; repeatable
    #[arg(long = "design", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    design: Vec<(String, f64)>,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Method {
    FixedPoint,
    Newton,
}

impl From<Method> for SolverMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::FixedPoint => SolverMethod::FixedPoint,
            Method::Newton => SolverMethod::Newton,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid value for `{}`: {err}", name.trim()))?;
    Ok((name.trim().to_string(), value))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut case = load_case(&cli.case)
        .with_context(|| format!("failed to load case {}", cli.case.display()))?;
    if let Some(method) = cli.method {
        case.solver.method = method.into();
    }
    let case_name = case.name.clone();
    let method = case.solver.method;

    let problem = DesignProblem::new(case)?;
    let values: DesignVariables = cli.design.into_iter().collect();
    let space = problem.design_space()?;
    if let Some(name) = space.unbounded(&values).first() {
        bail!("design variable `{name}` has no declared bounds in the case");
    }
    let violations = space.validate(&values);
    if let Some(first) = violations.first() {
        bail!(
            "design variable `{}` = {} lies outside [{}, {}]",
            first.name,
            first.value,
            first.lower,
            first.upper
        );
    }

    let result = problem
        .size(&values)
        .with_context(|| format!("sizing case `{case_name}` failed"))?;
    info!(
        "case `{case_name}` sized with {} in {} iterations",
        method.name(),
        result.iterations
    );

    let table = result.to_table();
    println!("Case: {case_name} ({})", method.name());
    for (quantity, value) in &table {
        println!("{quantity:<48} {value:>18.6}");
    }

    if let Some(path) = &cli.csv {
        save_table_csv(path, &table)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &cli.json {
        let report = Report {
            case: &case_name,
            method: method.name(),
            table: &table,
            history: &result.history,
        };
        save_report_json(path, &report)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
