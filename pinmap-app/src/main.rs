use anyhow::Context as _;
use pinmap::{
    geolocation::IpLocator,
    runtime::EffectRunner,
    tiles::TileCache,
    MapConfig, MapController, MapStyle, MapView, NominatimGeocoder, Notice, SceneBackend, UiEvent,
};
use std::sync::Arc;

/// Standalone map viewer application.
///
/// Usage: `pinmap-app [config.json]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            MapConfig::from_json_str(&json).with_context(|| format!("parsing config {}", path))?
        }
        None => MapConfig::default(),
    };

    let geocoder = NominatimGeocoder::new(config.geocoder.clone())?;
    let controller = MapController::new(SceneBackend::new(), config)?;
    let handle = tokio::runtime::Handle::current();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("pinmap"),
        ..Default::default()
    };

    eframe::run_native(
        "pinmap-app",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let runner = EffectRunner::new(handle, Arc::new(geocoder), Arc::new(IpLocator::new()))
                .with_waker(move || ctx.request_repaint());
            Box::new(PinmapApp::new(controller, runner))
        }),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {}", e))?;

    Ok(())
}

/// The main application struct
struct PinmapApp {
    controller: MapController<SceneBackend>,
    runner: EffectRunner,
    map_view: MapView,
    search: String,
    notices: Vec<Notice>,
}

impl PinmapApp {
    fn new(controller: MapController<SceneBackend>, runner: EffectRunner) -> Self {
        Self {
            controller,
            runner,
            map_view: MapView::new(TileCache::default()),
            search: String::new(),
            notices: Vec::new(),
        }
    }

    fn handle(&mut self, event: UiEvent) {
        match self.controller.handle(event) {
            Ok(outcome) => {
                self.notices.extend(outcome.notices);
                self.runner.dispatch(outcome.effects);
            }
            Err(e) => log::error!("map update failed: {}", e),
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui, events: &mut Vec<UiEvent>) {
        ui.heading("pinmap");
        ui.separator();

        ui.label("Search location");
        let input = ui.text_edit_singleline(&mut self.search);
        let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Search").clicked() || submitted {
            events.push(UiEvent::SearchSubmitted(self.search.clone()));
        }

        ui.separator();
        if ui.button("Current Location").clicked() {
            events.push(UiEvent::LocateRequested);
        }
        if ui.button("Clear Markers").clicked() {
            events.push(UiEvent::ClearRequested);
        }

        ui.horizontal(|ui| {
            if ui.button("+").clicked() {
                events.push(UiEvent::ZoomInRequested);
            }
            if ui.button("−").clicked() {
                events.push(UiEvent::ZoomOutRequested);
            }
        });

        let current = self.controller.status().style;
        let mut selected = current;
        egui::ComboBox::from_label("Map type")
            .selected_text(current.label())
            .show_ui(ui, |ui| {
                for style in MapStyle::ALL {
                    ui.selectable_value(&mut selected, style, style.label());
                }
            });
        if selected != current {
            events.push(UiEvent::StyleSelected(selected));
        }

        ui.separator();
        let status = self.controller.status();
        ui.label(format!("Markers: {}", status.marker_count_text()));
        ui.label(format!("Zoom: {}", status.zoom_text()));
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notices.first() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(notice.to_string());
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.notices.remove(0);
        }
    }
}

impl eframe::App for PinmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut events = self.runner.drain();

        egui::SidePanel::left("controls")
            .resizable(false)
            .show(ctx, |ui| self.controls(ui, &mut events));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                events.extend(self.map_view.show(ui, &mut self.controller));
            });

        self.notice_window(ctx);

        for event in events {
            self.handle(event);
        }
    }
}
