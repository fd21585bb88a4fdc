use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use jma_forecast::config::parse_timeout;
use jma_forecast::{
    load_env_file, select_region, write_catalog_listing, Endpoints, ForecastApp, JmaClient,
    SelectorStyle, Settings, CATALOG_LOAD_FAILED_MESSAGE,
};

#[derive(Parser, Debug)]
#[command(name = "jma-forecast")]
#[command(about = "Browse Japan Meteorological Agency forecasts by region")]
struct Args {
    /// Area catalog URL (overrides JMA_AREA_URL)
    #[arg(long, global = true)]
    area_url: Option<String>,

    /// Forecast URL template containing {region_code} (overrides JMA_FORECAST_URL)
    #[arg(long, global = true)]
    forecast_url: Option<String>,

    /// HTTP timeout in seconds (overrides JMA_HTTP_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<String>,

    /// Font file with Japanese glyphs (overrides JMA_FONT_PATH)
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the desktop window (default)
    Gui {
        #[arg(long, value_enum, default_value_t = SelectorStyle::Tree)]
        selector: SelectorStyle,
    },
    /// Print every center and the offices listed under it
    List,
    /// Print the forecast label for one office
    Show { office_code: String },
}

fn resolve_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if args.area_url.is_some() || args.forecast_url.is_some() {
        let area_url = args
            .area_url
            .clone()
            .unwrap_or_else(|| settings.endpoints.area_url.clone());
        let forecast_url = args
            .forecast_url
            .clone()
            .unwrap_or_else(|| settings.endpoints.forecast_template().to_string());
        settings.endpoints = Endpoints::new(area_url, forecast_url)?;
    }
    if let Some(raw) = &args.timeout_secs {
        settings.timeout = parse_timeout("--timeout-secs", raw)?;
    }
    if let Some(font) = &args.font {
        settings.font_path = Some(font.clone());
    }
    Ok(settings)
}

fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = resolve_settings(&args)?;
    let client = JmaClient::from_settings(&settings)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match args.command.unwrap_or(Command::Gui {
        selector: SelectorStyle::Tree,
    }) {
        Command::Gui { selector } => {
            let handle = runtime.handle().clone();
            let native_options = eframe::NativeOptions {
                initial_window_size: Some(egui::vec2(960.0, 640.0)),
                ..Default::default()
            };
            eframe::run_native(
                "天気予報アプリ",
                native_options,
                Box::new(move |cc| {
                    Box::new(ForecastApp::new(
                        cc,
                        client,
                        handle,
                        selector,
                        settings.font_path.as_deref(),
                    ))
                }),
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let catalog = runtime.block_on(client.load_area_catalog());
            if let Err(e) = &catalog {
                error!(error = %e, "area catalog load failed");
            }
            let listed = write_catalog_listing(&catalog, &mut std::io::stdout().lock())?;
            Ok(if listed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Show { office_code } => {
            let catalog = match runtime.block_on(client.load_area_catalog()) {
                Ok(catalog) => catalog,
                Err(e) => {
                    error!(error = %e, "area catalog load failed");
                    println!("{CATALOG_LOAD_FAILED_MESSAGE}");
                    return Ok(ExitCode::FAILURE);
                }
            };
            let outcome = runtime.block_on(select_region(&client, &catalog, &office_code));
            println!("{}", outcome.label());
            Ok(if outcome.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn main() -> ExitCode {
    // .env may carry RUST_LOG, so it has to be loaded before the filter is built
    let env_file = load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    env_file.log();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
