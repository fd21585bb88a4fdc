//! Turning a region selection into something the label can show.

use std::collections::VecDeque;

use tracing::warn;

use crate::area::AreaCatalog;
use crate::client::JmaClient;
use crate::error::{ErrorKind, FetchError};
use crate::weather_type::WeatherType;

/// Label shown before the first selection in the dropdown layout.
pub const INITIAL_LABEL: &str = "選択した地域の天気がここに表示されます";
/// Label shown before the first selection in the tree layout.
pub const TREE_INITIAL_LABEL: &str = "Active View";
pub const FORECAST_FAILED_PREFIX: &str = "天気情報の取得に失敗しました";

/// Result of one selection: a forecast or a failure, never both in one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastOutcome {
    Forecast {
        office_name: String,
        weather: String,
        weather_type: WeatherType,
    },
    Failed {
        office_name: String,
        kind: ErrorKind,
        message: String,
    },
}

impl ForecastOutcome {
    pub fn from_result(office_name: impl Into<String>, result: Result<String, FetchError>) -> Self {
        let office_name = office_name.into();
        match result {
            Ok(weather) => ForecastOutcome::Forecast {
                weather_type: WeatherType::from_description(&weather),
                office_name,
                weather,
            },
            Err(e) => ForecastOutcome::Failed {
                office_name,
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn office_name(&self) -> &str {
        match self {
            ForecastOutcome::Forecast { office_name, .. }
            | ForecastOutcome::Failed { office_name, .. } => office_name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ForecastOutcome::Failed { .. })
    }

    pub fn weather_type(&self) -> Option<WeatherType> {
        match self {
            ForecastOutcome::Forecast { weather_type, .. } => Some(*weather_type),
            ForecastOutcome::Failed { .. } => None,
        }
    }

    /// `<office>の天気:\n<weather>`, with the error text in place of the
    /// weather on failure.
    pub fn label(&self) -> String {
        match self {
            ForecastOutcome::Forecast {
                office_name,
                weather,
                ..
            } => format!("{office_name}の天気:\n{weather}"),
            ForecastOutcome::Failed {
                office_name,
                message,
                ..
            } => format!("{office_name}の天気:\n{FORECAST_FAILED_PREFIX}: {message}"),
        }
    }
}

/// Fetches the forecast for `office_code` once and tags the result.
///
/// Codes missing from the catalog fail without a request.
pub async fn select_region(
    client: &JmaClient,
    catalog: &AreaCatalog,
    office_code: &str,
) -> ForecastOutcome {
    let Some(office_name) = catalog.office_name(office_code) else {
        warn!(office_code, "selection not in catalog");
        return ForecastOutcome::from_result(
            office_code,
            Err(FetchError::UnknownRegion(office_code.to_string())),
        );
    };

    let result = client.fetch_forecast(office_code).await;
    if let Err(e) = &result {
        warn!(office_code, timeout = e.is_timeout(), error = %e, "forecast fetch failed");
    }
    ForecastOutcome::from_result(office_name, result)
}

/// Orders selection events so that each one gets exactly one fetch, and
/// each result is shown before the next fetch starts.
#[derive(Debug, Default)]
pub struct SelectionQueue {
    in_flight: Option<String>,
    pending: VecDeque<String>,
}

impl SelectionQueue {
    /// Records a selection. Returns the code to fetch now when nothing is in
    /// flight; otherwise the code waits its turn.
    pub fn push(&mut self, office_code: String) -> Option<String> {
        if self.in_flight.is_some() {
            self.pending.push_back(office_code);
            return None;
        }
        self.in_flight = Some(office_code.clone());
        Some(office_code)
    }

    /// Marks the in-flight fetch as displayed and hands out the next
    /// waiting selection, if any.
    pub fn complete(&mut self) -> Option<String> {
        self.in_flight = self.pending.pop_front();
        self.in_flight.clone()
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_label() {
        let outcome = ForecastOutcome::from_result("Tokyo", Ok("Sunny".to_string()));
        assert_eq!(outcome.label(), "Tokyoの天気:\nSunny");
        assert!(!outcome.is_error());
        assert_eq!(outcome.weather_type(), Some(WeatherType::Clear));
    }

    #[test]
    fn failure_label_carries_error() {
        let outcome =
            ForecastOutcome::from_result("東京都", Err(FetchError::MissingField("areas")));
        assert!(outcome.is_error());
        assert_eq!(outcome.office_name(), "東京都");
        assert_eq!(outcome.weather_type(), None);
        assert_eq!(
            outcome.label(),
            "東京都の天気:\n天気情報の取得に失敗しました: forecast has no `areas` entry"
        );
        match outcome {
            ForecastOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::Parse),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn idle_queue_dispatches_immediately() {
        let mut queue = SelectionQueue::default();
        assert_eq!(queue.push("O1".into()).as_deref(), Some("O1"));
        assert_eq!(queue.in_flight(), Some("O1"));
        assert_eq!(queue.complete(), None);
        assert!(!queue.is_busy());
    }

    #[test]
    fn selections_during_a_fetch_wait_their_turn() {
        let mut queue = SelectionQueue::default();
        assert_eq!(queue.push("O1".into()).as_deref(), Some("O1"));
        assert_eq!(queue.push("O2".into()), None);
        assert_eq!(queue.push("O1".into()), None);
        assert_eq!(queue.pending(), 2);

        // every event is fetched once, in click order
        assert_eq!(queue.complete().as_deref(), Some("O2"));
        assert_eq!(queue.in_flight(), Some("O2"));
        assert_eq!(queue.complete().as_deref(), Some("O1"));
        assert_eq!(queue.complete(), None);
        assert_eq!(queue.pending(), 0);
        assert!(!queue.is_busy());
    }
}
