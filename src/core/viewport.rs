use crate::core::{
    constants::TILE_SIZE,
    geo::{LatLng, Point, TileCoord},
};
use std::f64::consts::PI;

/// A tile that intersects the viewport, with where its top-left corner lands
/// in container pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTile {
    pub coord: TileCoord,
    pub screen: Point,
}

/// The current view of the native canvas: center, integer zoom and the
/// container size in pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub size: Point,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8, size: Point) -> Self {
        Self { center, zoom, size }
    }

    /// Side length of the world in pixels at `zoom`
    pub fn world_size(zoom: u8) -> f64 {
        TILE_SIZE as f64 * 2_f64.powi(zoom as i32)
    }

    /// Projects a LatLng to world pixel coordinates (Web Mercator, EPSG:3857)
    pub fn project(lat_lng: &LatLng, zoom: u8) -> Point {
        let size = Self::world_size(zoom);
        let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();

        let x = (lat_lng.lng + 180.0) / 360.0 * size;
        let y = (1.0 - (PI / 4.0 + lat_rad / 2.0).tan().ln() / PI) / 2.0 * size;
        Point::new(x, y)
    }

    /// Inverse of [`project`](Self::project)
    pub fn unproject(pixel: &Point, zoom: u8) -> LatLng {
        let size = Self::world_size(zoom);

        let lng = pixel.x / size * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * pixel.y / size)).sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }

    /// World pixel at the container's top-left corner
    fn origin(&self) -> Point {
        Self::project(&self.center, self.zoom).subtract(&self.size.multiply(0.5))
    }

    /// Container pixel for a geographical coordinate
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        Self::project(lat_lng, self.zoom).subtract(&self.origin())
    }

    /// Geographical coordinate under a container pixel
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let lat_lng = Self::unproject(&pixel.add(&self.origin()), self.zoom);
        LatLng::new(lat_lng.lat, LatLng::wrap_lng(lat_lng.lng))
    }

    /// Move the view so content follows a drag of `delta` container pixels
    pub fn pan(&mut self, delta: Point) {
        let center = Self::project(&self.center, self.zoom).subtract(&delta);
        let world = Self::world_size(self.zoom);
        let center = Point::new(center.x, center.y.clamp(0.0, world));
        let lat_lng = Self::unproject(&center, self.zoom);
        self.center = LatLng::new(lat_lng.lat, LatLng::wrap_lng(lat_lng.lng));
    }

    /// Tiles covering the container, row by row from the top-left
    pub fn visible_tiles(&self) -> Vec<VisibleTile> {
        let tile = TILE_SIZE as f64;
        let tiles_per_side = 2_i64.pow(self.zoom as u32);
        let origin = self.origin();

        let min_x = (origin.x / tile).floor() as i64;
        let min_y = (origin.y / tile).floor() as i64;
        let max_x = ((origin.x + self.size.x) / tile).ceil() as i64;
        let max_y = ((origin.y + self.size.y) / tile).ceil() as i64;

        let mut tiles = Vec::new();
        for y in min_y.max(0)..max_y.min(tiles_per_side) {
            for x in min_x..max_x {
                // Columns wrap around the antimeridian
                let wrapped_x = x.rem_euclid(tiles_per_side);
                tiles.push(VisibleTile {
                    coord: TileCoord::new(wrapped_x as u32, y as u32, self.zoom),
                    screen: Point::new(x as f64 * tile - origin.x, y as f64 * tile - origin.y),
                });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(-6.2088, 106.8456), 10, Point::new(800.0, 600.0))
    }

    #[test]
    fn test_projection_inverse() {
        let jakarta = LatLng::new(-6.2088, 106.8456);
        let back = Viewport::unproject(&Viewport::project(&jakarta, 12), 12);
        assert!((back.lat - jakarta.lat).abs() < 1e-9);
        assert!((back.lng - jakarta.lng).abs() < 1e-9);
    }

    #[test]
    fn test_center_maps_to_middle() {
        let viewport = viewport();
        let pixel = viewport.lat_lng_to_pixel(&viewport.center);
        assert!((pixel.x - 400.0).abs() < 1e-6);
        assert!((pixel.y - 300.0).abs() < 1e-6);

        let center = viewport.pixel_to_lat_lng(&Point::new(400.0, 300.0));
        assert!((center.lat - viewport.center.lat).abs() < 1e-9);
    }

    #[test]
    fn test_pan_moves_against_drag() {
        let mut viewport = viewport();
        let before = viewport.center;
        viewport.pan(Point::new(100.0, 0.0));
        assert!(viewport.center.lng < before.lng);
        assert!((viewport.center.lat - before.lat).abs() < 1e-9);
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let viewport = viewport();
        let tiles = viewport.visible_tiles();

        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.coord.is_valid() && t.coord.z == 10));
        // Jakarta sits in tile (815, 529) at zoom 10
        assert!(tiles.iter().any(|t| t.coord == TileCoord::new(815, 529, 10)));
        // 800x600 needs at least 4x3 tiles of 256px
        assert!(tiles.len() >= 12);
    }

    #[test]
    fn test_zoom_zero_has_single_row() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 0, Point::new(256.0, 256.0));
        let tiles = viewport.visible_tiles();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].coord, TileCoord::new(0, 0, 0));
    }
}
