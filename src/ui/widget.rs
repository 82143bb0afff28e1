//! Native map canvas.
//!
//! [`MapView`] paints the retained [`SceneBackend`] of a controller with egui:
//! basemap tiles of the active style, marker pins, the open popup and the
//! attribution line. It never mutates map state; user input comes back as
//! [`UiEvent`]s for the caller to feed into the controller.

use crate::{
    core::{
        constants::{MARKER_PIN_RADIUS, TILE_SIZE},
        geo::Point,
        viewport::Viewport,
    },
    layers::marker::MarkerId,
    prelude::HashMap,
    rendering::scene::SceneBackend,
    tiles::{
        cache::{TileCache, TileKey},
        loader::{LoadedTile, TileLoader},
    },
    ui::{
        controller::{MapController, UiEvent},
        popup::Popup,
    },
};
use egui::{Color32, ColorImage, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

/// Scroll distance (in points) that counts as one zoom step
const WHEEL_STEP: f32 = 50.0;

/// Decoded tile textures kept alive beyond the visible set
const TEXTURE_BUDGET: usize = 256;

pub struct MapView {
    loader: TileLoader,
    loaded: Receiver<LoadedTile>,
    textures: HashMap<TileKey, egui::TextureHandle>,
    open_popup: Option<MarkerId>,
    wheel: f32,
}

impl MapView {
    pub fn new(cache: TileCache) -> Self {
        let (tx, loaded) = mpsc::channel();
        Self {
            loader: TileLoader::new(tx, cache),
            loaded,
            textures: HashMap::default(),
            open_popup: None,
            wheel: 0.0,
        }
    }

    /// Marker whose popup is currently shown
    pub fn open_popup(&self) -> Option<MarkerId> {
        self.open_popup
    }

    /// Draw the map into the remaining space of `ui` and report user input
    pub fn show(&mut self, ui: &mut Ui, controller: &mut MapController<SceneBackend>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let backend = controller.surface_mut().backend_mut();
        if backend.poll_invalidate(Instant::now()) {
            self.textures.clear();
        } else if backend.has_pending_invalidation() {
            ui.ctx().request_repaint();
        }

        let surface = controller.surface();
        let style = surface.style();
        let mut viewport = Viewport::new(
            surface.center(),
            surface.zoom(),
            Point::new(rect.width() as f64, rect.height() as f64),
        );

        self.receive_tiles(ui.ctx());

        // Input
        if response.dragged() {
            let delta = response.drag_delta();
            if delta.length_sq() > 0.0 {
                viewport.pan(Point::new(delta.x as f64, delta.y as f64));
                events.push(UiEvent::ViewMoved {
                    center: viewport.center,
                    zoom: viewport.zoom,
                });
            }
        }

        if response.hovered() {
            self.wheel += ui.input(|i| i.raw_scroll_delta.y);
            if self.wheel >= WHEEL_STEP {
                self.wheel = 0.0;
                events.push(UiEvent::ZoomInRequested);
            } else if self.wheel <= -WHEEL_STEP {
                self.wheel = 0.0;
                events.push(UiEvent::ZoomOutRequested);
            }
        }

        let scene = surface.backend();
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - rect.min;
                match pin_at(scene, &viewport, local) {
                    Some(popup) => {
                        self.open_popup = match self.open_popup {
                            Some(open) if open == popup.marker => None,
                            _ => Some(popup.marker),
                        }
                    }
                    None => {
                        self.open_popup = None;
                        let lat_lng =
                            viewport.pixel_to_lat_lng(&Point::new(local.x as f64, local.y as f64));
                        events.push(UiEvent::MapClicked(lat_lng));
                    }
                }
            }
        }

        // Tiles
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(230, 230, 230));

        let visible = viewport.visible_tiles();
        for tile in &visible {
            let key = TileKey::new(style, tile.coord);
            let min = rect.min + Vec2::new(tile.screen.x as f32, tile.screen.y as f32);
            let tile_rect = Rect::from_min_size(min, Vec2::splat(TILE_SIZE as f32));

            match self.textures.get(&key) {
                Some(texture) => {
                    painter.image(
                        texture.id(),
                        tile_rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
                None => {
                    painter.rect_stroke(tile_rect, 0.0, Stroke::new(1.0, Color32::from_gray(215)));
                    self.loader.request(key);
                }
            }
        }
        self.trim_textures(&visible.iter().map(|t| TileKey::new(style, t.coord)).collect::<Vec<_>>());

        // Markers
        for (_, marker) in scene.markers() {
            let at = viewport.lat_lng_to_pixel(&marker.position);
            let center = rect.min + Vec2::new(at.x as f32, at.y as f32);
            if !rect.expand(MARKER_PIN_RADIUS).contains(center) {
                continue;
            }
            painter.circle(
                center,
                MARKER_PIN_RADIUS,
                Color32::from_rgb(37, 99, 235),
                Stroke::new(2.0, Color32::WHITE),
            );
        }

        // Popup
        if let Some(open) = self.open_popup {
            match scene.markers().find(|(_, m)| m.popup.marker == open) {
                Some((_, marker)) => {
                    let at = viewport.lat_lng_to_pixel(&marker.position);
                    let anchor = rect.min + Vec2::new(at.x as f32, at.y as f32);
                    if let Some(event) = show_popup(ui.ctx(), &marker.popup, anchor) {
                        self.open_popup = None;
                        events.push(event);
                    }
                }
                None => self.open_popup = None,
            }
        }

        painter.text(
            rect.left_bottom() + Vec2::new(5.0, -5.0),
            egui::Align2::LEFT_BOTTOM,
            surface.attribution(),
            egui::FontId::proportional(10.0),
            Color32::from_gray(90),
        );

        if !events.is_empty() {
            ui.ctx().request_repaint();
        }
        events
    }

    fn receive_tiles(&mut self, ctx: &egui::Context) {
        let mut received = false;
        while let Ok((key, data)) = self.loaded.try_recv() {
            match decode_tile(&data) {
                Some(image) => {
                    let name = format!("tile_{}_{}_{}_{}", key.style, key.coord.z, key.coord.x, key.coord.y);
                    let texture = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                    self.textures.insert(key, texture);
                    received = true;
                }
                None => log::warn!("could not decode tile {:?}", key),
            }
        }
        if received {
            ctx.request_repaint();
        }
    }

    fn trim_textures(&mut self, visible: &[TileKey]) {
        if self.textures.len() > TEXTURE_BUDGET {
            self.textures.retain(|key, _| visible.contains(key));
        }
    }
}

/// The marker pin under a container-relative position, topmost first
fn pin_at<'a>(scene: &'a SceneBackend, viewport: &Viewport, local: Vec2) -> Option<&'a Popup> {
    let hit = MARKER_PIN_RADIUS as f64 + 2.0;
    let target = Point::new(local.x as f64, local.y as f64);
    scene
        .markers()
        .filter(|(_, marker)| viewport.lat_lng_to_pixel(&marker.position).distance_to(&target) <= hit)
        .last()
        .map(|(_, marker)| &marker.popup)
}

fn show_popup(ctx: &egui::Context, popup: &Popup, anchor: Pos2) -> Option<UiEvent> {
    let mut event = None;
    egui::Area::new(egui::Id::new(("pinmap_popup", popup.marker.raw())))
        .order(egui::Order::Foreground)
        .fixed_pos(anchor + Vec2::new(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_max_width(240.0);
                ui.strong(&popup.heading);
                ui.label(format!("Latitude: {}", popup.position.lat_text()));
                ui.label(format!("Longitude: {}", popup.position.lng_text()));
                if ui.button("Remove Marker").clicked() {
                    event = Some(UiEvent::RemoveMarkerRequested(popup.marker));
                }
            });
        });
    event
}

fn decode_tile(bytes: &[u8]) -> Option<ColorImage> {
    let image = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapConfig;

    #[test]
    fn test_decode_tile() {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();

        let decoded = decode_tile(&bytes).unwrap();
        assert_eq!(decoded.size, [4, 2]);
        assert!(decode_tile(b"not an image").is_none());
    }

    #[test]
    fn test_pin_hit_testing() {
        let mut controller = MapController::new(SceneBackend::new(), MapConfig::default()).unwrap();
        let position = controller.surface().center();
        controller.handle(UiEvent::MapClicked(position)).unwrap();

        let surface = controller.surface();
        let viewport = Viewport::new(surface.center(), surface.zoom(), Point::new(800.0, 600.0));

        let popup = pin_at(surface.backend(), &viewport, Vec2::new(402.0, 299.0)).unwrap();
        assert_eq!(Some(popup.marker), controller.markers().at(0).map(|m| m.id()));
        assert!(pin_at(surface.backend(), &viewport, Vec2::new(100.0, 100.0)).is_none());
    }
}
