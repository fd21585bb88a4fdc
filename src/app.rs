use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use eframe::{egui, App, Frame};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::area::{AreaCatalog, CATALOG_LOAD_FAILED_MESSAGE};
use crate::client::JmaClient;
use crate::error::FetchError;
use crate::selection::{
    select_region, ForecastOutcome, SelectionQueue, INITIAL_LABEL, TREE_INITIAL_LABEL,
};
use crate::weather_type::WeatherType;

/// How regions are offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SelectorStyle {
    /// Collapsible center headers, each listing its offices.
    #[default]
    Tree,
    /// One combo box over every office.
    Dropdown,
}

impl SelectorStyle {
    /// Label text before anything has been selected.
    pub fn initial_label(self) -> &'static str {
        match self {
            SelectorStyle::Tree => TREE_INITIAL_LABEL,
            SelectorStyle::Dropdown => INITIAL_LABEL,
        }
    }
}

#[derive(Debug)]
pub(crate) enum CatalogState {
    Loading,
    Failed,
    Ready(Arc<AreaCatalog>),
}

impl CatalogState {
    pub(crate) fn from_result(result: Result<AreaCatalog, FetchError>) -> Self {
        match result {
            Ok(catalog) => CatalogState::Ready(Arc::new(catalog)),
            Err(_) => CatalogState::Failed,
        }
    }

    /// Text shown in place of the region selector, if any.
    pub(crate) fn status_text(&self) -> Option<&'static str> {
        match self {
            CatalogState::Loading => Some("地域データを読み込んでいます..."),
            CatalogState::Failed => Some(CATALOG_LOAD_FAILED_MESSAGE),
            CatalogState::Ready(_) => None,
        }
    }
}

pub struct ForecastApp {
    client: JmaClient,
    runtime: Handle,
    style: SelectorStyle,
    catalog: CatalogState,
    catalog_result: Arc<Mutex<Option<Result<AreaCatalog, FetchError>>>>,
    queue: SelectionQueue,
    forecast_result: Arc<Mutex<Option<ForecastOutcome>>>,
    outcome: Option<ForecastOutcome>,
    selected: Option<String>,
    animation_time: f64,
}

impl ForecastApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        client: JmaClient,
        runtime: Handle,
        style: SelectorStyle,
        font_path: Option<&Path>,
    ) -> Self {
        if let Some(path) = font_path {
            match install_font(&cc.egui_ctx, path) {
                Ok(()) => info!(path = %path.display(), "installed UI font"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not load UI font"),
            }
        }

        let app = Self {
            client,
            runtime,
            style,
            catalog: CatalogState::Loading,
            catalog_result: Arc::new(Mutex::new(None)),
            queue: SelectionQueue::default(),
            forecast_result: Arc::new(Mutex::new(None)),
            outcome: None,
            selected: None,
            animation_time: 0.0,
        };
        app.spawn_catalog_load(cc.egui_ctx.clone());
        app
    }

    fn spawn_catalog_load(&self, ctx: egui::Context) {
        let client = self.client.clone();
        let slot = Arc::clone(&self.catalog_result);
        self.runtime.spawn(async move {
            let result = client.load_area_catalog().await;
            if let Err(e) = &result {
                error!(error = %e, "area catalog load failed");
            }
            // a poisoned slot still gets the result, or the UI would spin forever
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
            ctx.request_repaint();
        });
    }

    /// Queues a selection event; it is fetched now if nothing is in flight,
    /// otherwise once the outcomes before it have been shown.
    fn select(&mut self, ctx: &egui::Context, catalog: &Arc<AreaCatalog>, office_code: String) {
        if let Some(code) = self.queue.push(office_code) {
            self.dispatch(ctx, catalog, code);
        } else {
            debug!(waiting = self.queue.pending(), "selection queued behind running fetch");
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, catalog: &Arc<AreaCatalog>, office_code: String) {
        self.selected = Some(office_code.clone());

        let client = self.client.clone();
        let catalog = Arc::clone(catalog);
        let slot = Arc::clone(&self.forecast_result);
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let outcome = select_region(&client, &catalog, &office_code).await;
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
            ctx.request_repaint();
        });
    }

    fn poll_results(&mut self, ctx: &egui::Context) {
        // Catalog arrives once; after that the state never changes.
        if let Some(result) = take_slot(&self.catalog_result) {
            self.catalog = CatalogState::from_result(result);
        }

        // Show the finished forecast first, then start the next queued one so
        // every result is on screen before the following fetch begins.
        if let Some(outcome) = take_slot(&self.forecast_result) {
            self.outcome = Some(outcome);
            if let Some(next) = self.queue.complete() {
                if let CatalogState::Ready(catalog) = &self.catalog {
                    let catalog = Arc::clone(catalog);
                    self.dispatch(ctx, &catalog, next);
                }
            }
        }
    }

    fn region_tree(&self, ui: &mut egui::Ui, catalog: &AreaCatalog) -> Option<String> {
        let mut clicked = None;
        ui.heading("地域を選択");
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (center_code, center) in catalog.centers() {
                egui::CollapsingHeader::new(center.name.as_str())
                    .id_source(center_code)
                    .show(ui, |ui| {
                        // dangling child codes are already filtered out here
                        for (code, office) in catalog.center_offices(center_code) {
                            let selected = self.selected.as_deref() == Some(code);
                            if ui.selectable_label(selected, office.name.as_str()).clicked() {
                                clicked = Some(code.to_string());
                            }
                        }
                    });
            }
        });
        clicked
    }

    fn region_dropdown(&self, ui: &mut egui::Ui, catalog: &AreaCatalog) -> Option<String> {
        let mut clicked = None;
        let current = self
            .selected
            .as_deref()
            .and_then(|code| catalog.office_name(code))
            .unwrap_or("地域を選択")
            .to_owned();
        egui::ComboBox::from_id_source("region_dropdown")
            .selected_text(current)
            .width(300.0)
            .show_ui(ui, |ui| {
                for (code, office) in catalog.offices() {
                    let selected = self.selected.as_deref() == Some(code);
                    if ui.selectable_label(selected, office.name.as_str()).clicked() {
                        clicked = Some(code.to_string());
                    }
                }
            });
        clicked
    }

    fn forecast_view(&self, ui: &mut egui::Ui) {
        let (text, color) = match &self.outcome {
            Some(outcome) if outcome.is_error() => (outcome.label(), egui::Color32::RED),
            Some(outcome) => (outcome.label(), egui::Color32::DARK_BLUE),
            None => (self.style.initial_label().to_string(), egui::Color32::GRAY),
        };

        ui.add_space(20.0);
        ui.label(egui::RichText::new(text).size(24.0).strong().color(color));
        if self.queue.is_busy() {
            ui.spinner();
        }

        if let Some(weather_type) = self.outcome.as_ref().and_then(ForecastOutcome::weather_type) {
            ui.add_space(20.0);
            let (rect, _) = ui.allocate_exact_size(egui::vec2(200.0, 200.0), egui::Sense::hover());
            draw_weather_icon(ui.painter(), rect, weather_type, self.animation_time);
        }
    }
}

impl App for ForecastApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_results(ctx);

        // Keep repainting only while an icon is animating
        self.animation_time += ctx.input(|i| i.unstable_dt) as f64;
        if self.outcome.as_ref().is_some_and(|o| !o.is_error()) {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("title").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new("天気予報")
                        .size(32.0)
                        .strong()
                        .color(egui::Color32::from_rgb(30, 100, 220)),
                );
            });
        });

        // Loading and failed catalogs replace the whole body; a failed load
        // is terminal and offers no region list.
        let catalog = match &self.catalog {
            CatalogState::Ready(catalog) => Arc::clone(catalog),
            state => {
                let failed = matches!(state, CatalogState::Failed);
                let text = state.status_text().unwrap_or_default();
                egui::CentralPanel::default().show(ctx, |ui| {
                    if failed {
                        ui.colored_label(egui::Color32::RED, text);
                    } else {
                        ui.spinner();
                        ui.label(text);
                    }
                });
                return;
            }
        };

        // Panels only report the click; the fetch starts after layout.
        let mut clicked = None;
        match self.style {
            SelectorStyle::Tree => {
                egui::SidePanel::left("regions")
                    .default_width(300.0)
                    .show(ctx, |ui| clicked = self.region_tree(ui, &catalog));
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| self.forecast_view(ui));
                });
            }
            SelectorStyle::Dropdown => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        clicked = self.region_dropdown(ui, &catalog);
                        ui.separator();
                        self.forecast_view(ui);
                    });
                });
            }
        }

        if let Some(code) = clicked {
            self.select(ctx, &catalog, code);
        }
    }
}

fn install_font(ctx: &egui::Context, path: &Path) -> std::io::Result<()> {
    let bytes = std::fs::read(path)?;
    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("jp".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts.families.entry(family).or_default().insert(0, "jp".to_owned());
    }
    ctx.set_fonts(fonts);
    Ok(())
}

fn draw_weather_icon(painter: &egui::Painter, rect: egui::Rect, kind: WeatherType, time: f64) {
    let center = rect.center();
    let r = rect.width().min(rect.height()) * 0.4;
    let sun = egui::Color32::from_rgb(255, 200, 0);
    let cloud_top = center + egui::vec2(0.0, -r * 0.3);

    match kind {
        WeatherType::Clear => {
            for i in 0..8 {
                let angle = i as f64 / 8.0 * std::f64::consts::TAU + time * 0.5;
                let dir = egui::vec2(angle.cos() as f32, angle.sin() as f32);
                painter.line_segment(
                    [center + dir * r * 0.6, center + dir * r * 0.85],
                    egui::Stroke::new(3.0, sun),
                );
            }
            painter.circle_filled(center, r * 0.5, sun);
        }
        WeatherType::PartlyCloudy => {
            painter.circle_filled(center + egui::vec2(-r * 0.3, -r * 0.3), r * 0.35, sun);
            let drift = (time * 0.8).sin() as f32 * r * 0.05;
            draw_cloud(painter, center + egui::vec2(r * 0.1 + drift, r * 0.1), r * 0.35);
        }
        WeatherType::Cloudy => {
            draw_cloud(painter, center + egui::vec2(-r * 0.25, -r * 0.1), r * 0.35);
            draw_cloud(painter, center + egui::vec2(r * 0.25, r * 0.1), r * 0.35);
        }
        WeatherType::Rain | WeatherType::Thunderstorm => {
            for i in 0..12 {
                let x = center.x + (i % 6) as f32 * r * 0.25 - r * 0.6;
                let fall = ((time * 1.5 + i as f64 * 0.17) % 1.0) as f32;
                let top = egui::pos2(x, cloud_top.y + r * 0.3 + fall * r);
                painter.line_segment(
                    [top, top + egui::vec2(0.0, r * 0.12)],
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(90, 140, 255)),
                );
            }
            if kind == WeatherType::Thunderstorm && (time * 2.0) as i64 % 2 == 0 {
                let bolt = [
                    center + egui::vec2(0.0, 0.0),
                    center + egui::vec2(-r * 0.15, r * 0.35),
                    center + egui::vec2(r * 0.05, r * 0.35),
                    center + egui::vec2(-r * 0.1, r * 0.75),
                ];
                for pair in bolt.windows(2) {
                    painter.line_segment([pair[0], pair[1]], egui::Stroke::new(4.0, sun));
                }
            }
            draw_cloud(painter, cloud_top, r * 0.4);
        }
        WeatherType::Snow => {
            for i in 0..10 {
                let sway = (time + i as f64).sin() as f32 * r * 0.08;
                let x = center.x + (i % 5) as f32 * r * 0.3 - r * 0.6 + sway;
                let fall = ((time * 0.5 + i as f64 * 0.23) % 1.0) as f32;
                let flake = egui::pos2(x, cloud_top.y + r * 0.3 + fall * r);
                painter.circle_filled(flake, r * 0.05, egui::Color32::WHITE);
            }
            draw_cloud(painter, cloud_top, r * 0.4);
        }
        WeatherType::Fog => {
            for i in 0..4 {
                let y = center.y - r * 0.45 + i as f32 * r * 0.3;
                let shift = (time * 0.6 + i as f64).sin() as f32 * r * 0.15;
                painter.line_segment(
                    [egui::pos2(center.x - r + shift, y), egui::pos2(center.x + r + shift, y)],
                    egui::Stroke::new(r * 0.12, egui::Color32::from_rgb(200, 200, 200)),
                );
            }
        }
    }
}

fn draw_cloud(painter: &egui::Painter, center: egui::Pos2, size: f32) {
    let light = egui::Color32::from_rgb(205, 205, 210);
    let shade = egui::Color32::from_rgb(180, 180, 188);
    painter.circle_filled(center + egui::vec2(0.0, size * 0.35), size * 0.7, shade);
    painter.circle_filled(center, size, light);
    painter.circle_filled(center + egui::vec2(-size * 0.7, size * 0.2), size * 0.7, light);
    painter.circle_filled(center + egui::vec2(size * 0.7, size * 0.2), size * 0.7, light);
}

/// Empties a result slot, recovering from a poisoned lock.
fn take_slot<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_catalog_shows_only_the_failure_message() {
        let state = CatalogState::from_result(Err(FetchError::Status {
            url: "http://127.0.0.1/area.json".into(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        }));
        assert!(matches!(state, CatalogState::Failed));
        assert_eq!(state.status_text(), Some(CATALOG_LOAD_FAILED_MESSAGE));
    }

    #[test]
    fn loaded_catalog_shows_the_selector() {
        let state = CatalogState::from_result(Ok(AreaCatalog::default()));
        assert!(matches!(state, CatalogState::Ready(_)));
        assert_eq!(state.status_text(), None);
        assert!(CatalogState::Loading.status_text().is_some());
    }

    #[test]
    fn initial_label_follows_selector_style() {
        assert_eq!(SelectorStyle::Tree.initial_label(), "Active View");
        assert_eq!(
            SelectorStyle::Dropdown.initial_label(),
            "選択した地域の天気がここに表示されます"
        );
    }

    #[test]
    fn poisoned_slot_still_delivers_its_result() {
        let slot = Arc::new(Mutex::new(None));
        let writer = Arc::clone(&slot);
        let _ = std::thread::spawn(move || {
            let mut guard = writer.lock().unwrap();
            *guard = Some("Tokyoの天気:\nSunny".to_string());
            panic!("writer died holding the lock");
        })
        .join();

        assert!(slot.is_poisoned());
        assert_eq!(take_slot(&slot).as_deref(), Some("Tokyoの天気:\nSunny"));
        assert_eq!(take_slot(&slot), None);
    }
}
