use std::env;
use std::path::PathBuf;

use forecast_bench::evaluation::SignificanceTest;
use forecast_bench::protocol::{MAX_LEVEL, parse_levels};

/// Naive baseline selected with `--season`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonArg {
    Daily,
    Weekly,
    /// Weekday-dependent lag; the first weekday comes from the data.
    Epf,
    Lag(usize),
}

impl SeasonArg {
    fn parse(text: &str) -> Result<Self, String> {
        match text {
            "daily" => Ok(SeasonArg::Daily),
            "weekly" => Ok(SeasonArg::Weekly),
            "epf" => Ok(SeasonArg::Epf),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|lag| *lag > 0)
                .map(SeasonArg::Lag)
                .ok_or_else(|| {
                    format!(
                        "--season value \"{other}\" must be daily, weekly, epf or a positive lag"
                    )
                }),
        }
    }
}

pub struct ServeOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub port: Option<u16>,
}

pub struct PredictOptions {
    pub history: PathBuf,
    pub horizon: usize,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub levels: Option<Vec<u32>>,
    pub out: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub struct EvaluateOptions {
    pub real: PathBuf,
    pub pred: PathBuf,
    pub periods_per_day: Option<usize>,
    pub season: Option<SeasonArg>,
}

pub struct CompareOptions {
    pub real: PathBuf,
    /// `(model name, csv path)`.
    pub forecasts: Vec<(String, PathBuf)>,
    pub test: SignificanceTest,
    pub norm: u8,
    pub periods_per_day: Option<usize>,
    pub out: Option<PathBuf>,
    pub tui: bool,
}

pub enum Command {
    Serve(ServeOptions),
    Predict(PredictOptions),
    Evaluate(EvaluateOptions),
    Compare(CompareOptions),
    Help,
}

pub fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<Command, String> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    if rest.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }
    match command.as_str() {
        "serve" => parse_serve(rest).map(Command::Serve),
        "predict" => parse_predict(rest).map(Command::Predict),
        "evaluate" => parse_evaluate(rest).map(Command::Evaluate),
        "compare" => parse_compare(rest).map(Command::Compare),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_serve(args: &[String]) -> Result<ServeOptions, String> {
    let mut i = 0usize;
    let mut config = None;
    let mut preset = None;
    let mut port = None;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--port" => {
                i += 1;
                port = Some(parse_number(args.next_or_err(i, "missing value for --port")?, "--port")?);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if config.is_some() && preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(ServeOptions {
        config,
        preset,
        port,
    })
}

fn parse_predict(args: &[String]) -> Result<PredictOptions, String> {
    let mut i = 0usize;
    let mut history = None;
    let mut horizon = None;
    let mut host = None;
    let mut port = None;
    let mut level_values: Vec<&str> = Vec::new();
    let mut out = None;
    let mut config = None;

    while i < args.len() {
        match args[i].as_str() {
            "--history" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --history (expected a CSV file path)")?;
                history = Some(PathBuf::from(path));
            }
            "--horizon" => {
                i += 1;
                let value: usize = parse_number(args.next_or_err(i, "missing value for --horizon")?, "--horizon")?;
                if value == 0 {
                    return Err("--horizon must be positive".to_string());
                }
                horizon = Some(value);
            }
            "--host" => {
                i += 1;
                host = Some(args.next_or_err(i, "missing value for --host")?.to_string());
            }
            "--port" => {
                i += 1;
                port = Some(parse_number(args.next_or_err(i, "missing value for --port")?, "--port")?);
            }
            "--level" => {
                i += 1;
                level_values.push(args.next_or_err(i, "missing value for --level (e.g. 80 or 10,90)")?);
            }
            "--out" => {
                i += 1;
                out = Some(PathBuf::from(args.next_or_err(i, "missing value for --out")?));
            }
            "--config" => {
                i += 1;
                config = Some(PathBuf::from(args.next_or_err(i, "missing value for --config")?));
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let levels = if level_values.is_empty() {
        None
    } else {
        let mut levels = parse_levels(level_values).map_err(|e| e.to_string())?;
        if let Some(bad) = levels.iter().find(|l| **l > MAX_LEVEL) {
            return Err(format!("--level {bad} is outside 0..={MAX_LEVEL}"));
        }
        levels.sort_unstable();
        levels.dedup();
        Some(levels)
    };

    Ok(PredictOptions {
        history: history.ok_or("--history is required")?,
        horizon: horizon.ok_or("--horizon is required")?,
        host,
        port,
        levels,
        out,
        config,
    })
}

fn parse_evaluate(args: &[String]) -> Result<EvaluateOptions, String> {
    let mut i = 0usize;
    let mut real = None;
    let mut pred = None;
    let mut periods_per_day = None;
    let mut season = None;

    while i < args.len() {
        match args[i].as_str() {
            "--real" => {
                i += 1;
                real = Some(PathBuf::from(args.next_or_err(i, "missing value for --real")?));
            }
            "--pred" => {
                i += 1;
                pred = Some(PathBuf::from(args.next_or_err(i, "missing value for --pred")?));
            }
            "--periods-per-day" => {
                i += 1;
                periods_per_day = Some(parse_positive(
                    args.next_or_err(i, "missing value for --periods-per-day")?,
                    "--periods-per-day",
                )?);
            }
            "--season" => {
                i += 1;
                season = Some(SeasonArg::parse(args.next_or_err(i, "missing value for --season")?)?);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if matches!(season, Some(SeasonArg::Daily | SeasonArg::Weekly | SeasonArg::Epf))
        && periods_per_day.is_none()
    {
        return Err("--season daily, weekly and epf need --periods-per-day".to_string());
    }

    Ok(EvaluateOptions {
        real: real.ok_or("--real is required")?,
        pred: pred.ok_or("--pred is required")?,
        periods_per_day,
        season,
    })
}

fn parse_compare(args: &[String]) -> Result<CompareOptions, String> {
    let mut i = 0usize;
    let mut real = None;
    let mut forecasts = Vec::new();
    let mut test = SignificanceTest::DieboldMariano;
    let mut norm = 1u8;
    let mut periods_per_day = None;
    let mut out = None;
    let mut tui = false;

    while i < args.len() {
        match args[i].as_str() {
            "--real" => {
                i += 1;
                real = Some(PathBuf::from(args.next_or_err(i, "missing value for --real")?));
            }
            "--forecasts" => {
                i += 1;
                let list = args.next_or_err(i, "missing value for --forecasts (expected [name=]path,...)")?;
                for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    forecasts.push(named_path(entry));
                }
            }
            "--test" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --test (dm or gw)")?;
                test = SignificanceTest::from_name(name)
                    .ok_or_else(|| format!("--test value \"{name}\" must be dm or gw"))?;
            }
            "--norm" => {
                i += 1;
                norm = parse_number(args.next_or_err(i, "missing value for --norm (1 or 2)")?, "--norm")?;
                if norm != 1 && norm != 2 {
                    return Err(format!("--norm must be 1 or 2, got {norm}"));
                }
            }
            "--periods-per-day" => {
                i += 1;
                periods_per_day = Some(parse_positive(
                    args.next_or_err(i, "missing value for --periods-per-day")?,
                    "--periods-per-day",
                )?);
            }
            "--out" => {
                i += 1;
                out = Some(PathBuf::from(args.next_or_err(i, "missing value for --out")?));
            }
            "--tui" => tui = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if forecasts.len() < 2 {
        return Err("--forecasts needs at least two forecast files".to_string());
    }

    Ok(CompareOptions {
        real: real.ok_or("--real is required")?,
        forecasts,
        test,
        norm,
        periods_per_day,
        out,
        tui,
    })
}

/// `name=path`, or a bare path named after its file stem.
fn named_path(entry: &str) -> (String, PathBuf) {
    if let Some((name, path)) = entry.split_once('=') {
        return (name.to_string(), PathBuf::from(path));
    }
    let path = PathBuf::from(entry);
    let name = path
        .file_stem()
        .map_or_else(|| entry.to_string(), |s| s.to_string_lossy().into_owned());
    (name, path)
}

fn parse_number<T: std::str::FromStr>(text: &str, flag: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("{flag} value \"{text}\" is not a valid number"))
}

fn parse_positive(text: &str, flag: &str) -> Result<usize, String> {
    match parse_number::<usize>(text, flag)? {
        0 => Err(format!("{flag} must be positive")),
        n => Ok(n),
    }
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("forecast-bench: evaluate, compare and serve forecasting models");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  forecast-bench serve [--config <path> | --preset <name>] [--port <u16>]");
    eprintln!(
        "  forecast-bench predict --history <csv> --horizon <n> [--host <host>] [--port <u16>] [--level <l,...>] [--out <csv>] [--config <path>]"
    );
    eprintln!(
        "  forecast-bench evaluate --real <csv> --pred <csv> [--periods-per-day <n>] [--season daily|weekly|epf|<lag>]"
    );
    eprintln!(
        "  forecast-bench compare --real <csv> --forecasts <[name=]csv,...> [--test dm|gw] [--norm 1|2] [--periods-per-day <n>] [--out <csv>] [--tui]"
    );
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG                 log filter (default: forecast_bench=info)");
    eprintln!("  FORECAST_BENCH_*         overrides for serve (MODEL, SEASON, PORT, ...)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn supports_serve_with_preset() {
        let Ok(Command::Serve(opts)) =
            parse_args_from(args(&["serve", "--preset", "weekly_profile", "--port", "8080"]))
        else {
            panic!("expected serve");
        };
        assert_eq!(opts.preset.as_deref(), Some("weekly_profile"));
        assert_eq!(opts.port, Some(8080));
        assert!(opts.config.is_none());
    }

    #[test]
    fn serve_sources_are_exclusive() {
        let result = parse_args_from(args(&["serve", "--config", "a.toml", "--preset", "x"]));
        assert!(result.is_err());
    }

    #[test]
    fn predict_collects_levels() {
        let Ok(Command::Predict(opts)) = parse_args_from(args(&[
            "predict", "--history", "y.csv", "--horizon", "24", "--level", "90,10", "--level", "50",
        ])) else {
            panic!("expected predict");
        };
        assert_eq!(opts.horizon, 24);
        assert_eq!(opts.levels, Some(vec![10, 50, 90]));
    }

    #[test]
    fn predict_requires_history() {
        let result = parse_args_from(args(&["predict", "--horizon", "24"]));
        assert_eq!(result.err().as_deref(), Some("--history is required"));
    }

    #[test]
    fn predict_rejects_zero_horizon() {
        let result = parse_args_from(args(&["predict", "--history", "y.csv", "--horizon", "0"]));
        assert!(result.is_err());
    }

    #[test]
    fn evaluate_parses_season() {
        let Ok(Command::Evaluate(opts)) = parse_args_from(args(&[
            "evaluate", "--real", "r.csv", "--pred", "p.csv", "--periods-per-day", "24", "--season", "epf",
        ])) else {
            panic!("expected evaluate");
        };
        assert_eq!(opts.season, Some(SeasonArg::Epf));
        assert_eq!(opts.periods_per_day, Some(24));
    }

    #[test]
    fn named_seasons_need_periods() {
        let result = parse_args_from(args(&[
            "evaluate", "--real", "r.csv", "--pred", "p.csv", "--season", "weekly",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn compare_names_forecasts() {
        let Ok(Command::Compare(opts)) = parse_args_from(args(&[
            "compare",
            "--real",
            "r.csv",
            "--forecasts",
            "naive=out/a.csv,out/lear.csv",
            "--test",
            "GW",
            "--norm",
            "2",
        ])) else {
            panic!("expected compare");
        };
        assert_eq!(opts.forecasts[0], ("naive".to_string(), PathBuf::from("out/a.csv")));
        assert_eq!(opts.forecasts[1].0, "lear");
        assert_eq!(opts.test, SignificanceTest::GiacominiWhite);
        assert_eq!(opts.norm, 2);
    }

    #[test]
    fn compare_needs_two_forecasts() {
        let result = parse_args_from(args(&["compare", "--real", "r.csv", "--forecasts", "a.csv"]));
        assert!(result.is_err());
    }

    #[test]
    fn no_arguments_prints_help() {
        assert!(matches!(parse_args_from(Vec::new()), Ok(Command::Help)));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_args_from(args(&["train"])).is_err());
    }
}
