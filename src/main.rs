//! forecast-bench entry point: CLI wiring for the server, client and evaluation commands.

mod cli;

use std::error::Error;
use std::path::Path;
use std::process;

use chrono::Datelike;
use tracing::{error, info};

use cli::{Command, CompareOptions, EvaluateOptions, PredictOptions, SeasonArg, ServeOptions};
use forecast_bench::config::ServiceConfig;
use forecast_bench::evaluation::{
    MetricReport, Norm, Prices, Seasonality, TestConfig, significance_matrix,
};
use forecast_bench::frame::{FORECAST_COLUMN, Frame};
use forecast_bench::io::csv::{export_matrix_csv, read_frame_file};
use forecast_bench::logging;

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    logging::init();

    let command = match cli::parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    let result = match command {
        Command::Help => {
            cli::print_usage();
            Ok(())
        }
        Command::Serve(opts) => serve(opts),
        Command::Predict(opts) => predict(opts),
        Command::Evaluate(opts) => evaluate(opts),
        Command::Compare(opts) => compare(opts),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

/// Loads the service configuration: `--config` file, `--preset`, or defaults.
fn load_config(path: Option<&Path>, preset: Option<&str>) -> Result<ServiceConfig, Box<dyn Error>> {
    Ok(match (path, preset) {
        (Some(path), _) => ServiceConfig::from_toml_file(path)?,
        (None, Some(name)) => ServiceConfig::from_preset(name)?,
        (None, None) => ServiceConfig::default(),
    })
}

#[cfg(feature = "server")]
fn serve(opts: ServeOptions) -> CliResult {
    use std::sync::Arc;

    use forecast_bench::models;
    use forecast_bench::protocol::server::{self, ModelServer};

    let mut config = load_config(opts.config.as_deref(), opts.preset.as_deref())?;
    let mut errors = config.apply_process_env();
    if let Some(port) = opts.port {
        config.server.port = port;
    }
    errors.extend(config.validate());
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    let addr = config.server.socket_addr()?;
    let model = models::from_config(&config.model)?;
    let model_server =
        ModelServer::from_boxed(model).with_body_limit(config.server.body_limit_bytes());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(Arc::new(model_server), addr))?;
    Ok(())
}

#[cfg(not(feature = "server"))]
fn serve(_opts: ServeOptions) -> CliResult {
    Err("this binary was built without the `server` feature".into())
}

#[cfg(feature = "client")]
fn predict(opts: PredictOptions) -> CliResult {
    use forecast_bench::io::csv::{export_frame_csv, write_frame};
    use forecast_bench::protocol::client::ForecastClient;

    let config = load_config(opts.config.as_deref(), None)?;
    let mut client_config = config.client;
    if let Some(host) = opts.host {
        client_config.host = host;
    }
    if let Some(port) = opts.port {
        client_config.port = port;
    }

    let client = ForecastClient::from_config(&client_config)?;
    let history = read_frame_file(&opts.history)?;
    let forecast = client.predict(opts.horizon, &history, opts.levels.as_deref())?;

    match opts.out {
        Some(path) => {
            export_frame_csv(&forecast, &path)?;
            info!(path = %path.display(), rows = forecast.len(), "forecast written");
        }
        None => write_frame(&forecast, std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(not(feature = "client"))]
fn predict(_opts: PredictOptions) -> CliResult {
    Err("this binary was built without the `client` feature".into())
}

/// Forecast column of a prediction file: `yhat`, else its target column.
fn forecast_values(frame: &Frame) -> Result<&[f64], Box<dyn Error>> {
    match frame.column(FORECAST_COLUMN) {
        Some(values) => Ok(values),
        None => Ok(frame.target()?),
    }
}

fn evaluate(opts: EvaluateOptions) -> CliResult {
    let real = read_frame_file(&opts.real)?;
    let pred = read_frame_file(&opts.pred)?;

    let seasonality = match (opts.season, opts.periods_per_day) {
        (None, _) => None,
        (Some(SeasonArg::Lag(lag)), _) => Some(Seasonality::Lag(lag)),
        (Some(SeasonArg::Daily), Some(p)) => Some(Seasonality::daily(p)),
        (Some(SeasonArg::Weekly), Some(p)) => Some(Seasonality::weekly(p)),
        (Some(SeasonArg::Epf), Some(periods_per_day)) => {
            let first = real
                .first_timestamp()
                .ok_or("--real has no observations")?;
            Some(Seasonality::Epf {
                periods_per_day,
                first_day: first.weekday(),
            })
        }
        (Some(_), None) => return Err("--season needs --periods-per-day".into()),
    };

    let report = MetricReport::compute(
        Prices::Flat(real.target()?),
        Prices::Flat(forecast_values(&pred)?),
        seasonality,
    )?;
    println!("{report}");
    Ok(())
}

fn compare(opts: CompareOptions) -> CliResult {
    let real = read_frame_file(&opts.real)?;
    let frames = opts
        .forecasts
        .iter()
        .map(|(name, path)| Ok((name.as_str(), read_frame_file(path)?)))
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;
    let forecasts = frames
        .iter()
        .map(|(name, frame)| Ok((*name, Prices::Flat(forecast_values(frame)?))))
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;

    let config = TestConfig {
        norm: Norm::from_order(opts.norm)?,
        periods_per_day: opts.periods_per_day,
        ..TestConfig::default()
    };
    let matrix = significance_matrix(Prices::Flat(real.target()?), &forecasts, opts.test, &config)?;
    println!("{matrix}");

    let dominant = matrix.dominant_models(0.05);
    if !dominant.is_empty() {
        println!("Significantly better than all others at 5%: {}", dominant.join(", "));
    }

    if let Some(path) = &opts.out {
        export_matrix_csv(&matrix, path)?;
        info!(path = %path.display(), "p-value matrix written");
    }

    if opts.tui {
        show_matrix(&matrix)?;
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn show_matrix(matrix: &forecast_bench::evaluation::SignificanceMatrix) -> CliResult {
    forecast_bench::tui::run(matrix)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn show_matrix(_matrix: &forecast_bench::evaluation::SignificanceMatrix) -> CliResult {
    Err("this binary was built without the `tui` feature".into())
}
