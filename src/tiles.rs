use crate::config::MapConfig;
use crate::projection::{MapView, TILE_SIZE};
use crate::types::PixelPoint;

/// A raster tile placed in layer pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub url: String,
    pub position: PixelPoint,
    pub size: f64,
}

/// Slippy-map raster background.
#[derive(Debug, Clone)]
pub struct TileLayer {
    url_template: String,
    subdomains: Vec<String>,
    max_zoom: u8,
}

impl TileLayer {
    pub fn new(url_template: impl Into<String>, subdomains: Vec<String>, max_zoom: u8) -> Self {
        Self {
            url_template: url_template.into(),
            subdomains,
            max_zoom,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.tile_url.clone(), config.subdomains.clone(), config.max_zoom)
    }

    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        let s = if self.subdomains.is_empty() {
            ""
        } else {
            self.subdomains[(x as usize + y as usize) % self.subdomains.len()].as_str()
        };
        self.url_template
            .replace("{s}", s)
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// Tiles intersecting the visible area, row by row. Columns wrap around
    /// the antimeridian; rows beyond the poles are skipped.
    pub fn visible_tiles(&self, view: &MapView) -> Vec<Tile> {
        let z = view.zoom().min(self.max_zoom);
        // Past the layer's max zoom the tiles are stretched.
        let stretch = 2f64.powi(view.zoom() as i32 - z as i32);
        let size = TILE_SIZE as f64 * stretch;
        let n = 1i64 << z;

        let (min, max) = view.pixel_bounds();
        let x0 = (min.x / size).floor() as i64;
        let x1 = (max.x / size).ceil() as i64 - 1;
        let y0 = ((min.y / size).floor() as i64).max(0);
        let y1 = ((max.y / size).ceil() as i64 - 1).min(n - 1);

        let origin = view.pixel_origin();
        let mut tiles = Vec::new();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let wrapped = tx.rem_euclid(n) as u32;
                tiles.push(Tile {
                    z,
                    x: wrapped,
                    y: ty as u32,
                    url: self.tile_url(z, wrapped, ty as u32),
                    position: PixelPoint::new(tx as f64 * size - origin.x, ty as f64 * size - origin.y),
                    size,
                });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LatLng;

    fn osm() -> TileLayer {
        TileLayer::from_config(&MapConfig::default())
    }

    #[test]
    fn url_template_is_filled() {
        assert_eq!(osm().tile_url(9, 150, 192), "https://a.tile.openstreetmap.org/9/150/192.png");
        assert_eq!(osm().tile_url(9, 151, 192), "https://b.tile.openstreetmap.org/9/151/192.png");
    }

    #[test]
    fn tiles_cover_the_viewport() {
        let view = MapView::new(LatLng::new(40.70, -73.94), 9, 960, 600);
        let tiles = osm().visible_tiles(&view);
        assert!(!tiles.is_empty());
        // 960x600 needs at least 4x3 whole tiles and at most one extra per axis.
        assert!(tiles.len() >= 12 && tiles.len() <= 20, "{}", tiles.len());
        let covers_center = tiles.iter().any(|t| {
            t.position.x <= 480.0 && t.position.x + t.size > 480.0 && t.position.y <= 300.0 && t.position.y + t.size > 300.0
        });
        assert!(covers_center);
        // New York at z9 is tile column 150, row 192.
        assert!(tiles.iter().any(|t| t.x == 150 && t.y == 192));
    }

    #[test]
    fn world_view_wraps_columns_and_skips_polar_rows() {
        let view = MapView::new(LatLng::new(0.0, 0.0), 0, 1024, 1024);
        let tiles = osm().visible_tiles(&view);
        assert!(tiles.iter().all(|t| t.x == 0 && t.y == 0));
        assert_eq!(tiles.len(), 5);
    }

    #[test]
    fn beyond_max_zoom_tiles_are_stretched() {
        let layer = TileLayer::new("{z}/{x}/{y}", vec![], 10);
        let view = MapView::new(LatLng::new(40.70, -73.94), 12, 256, 256);
        let tiles = layer.visible_tiles(&view);
        assert!(tiles.iter().all(|t| t.z == 10 && t.size == 1024.0));
    }
}
