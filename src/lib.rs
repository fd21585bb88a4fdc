//! Japan Meteorological Agency forecast viewer.
//!
//! Loads the JMA area catalog once, then fetches the headline forecast for
//! whichever office the user picks.

pub mod app;
pub mod area;
pub mod client;
pub mod config;
pub mod error;
pub mod forecast;
pub mod selection;
pub mod weather_type;

pub use app::{ForecastApp, SelectorStyle};
pub use area::{
    parse_area_catalog, write_catalog_listing, AreaCatalog, Center, Office,
    CATALOG_LOAD_FAILED_MESSAGE,
};
pub use client::JmaClient;
pub use config::{load_env_file, EnvFileReport, Endpoints, Settings};
pub use error::{ConfigError, ErrorKind, FetchError};
pub use forecast::{extract_weather, parse_forecast, ForecastReport};
pub use selection::{select_region, ForecastOutcome, SelectionQueue};
pub use weather_type::WeatherType;
