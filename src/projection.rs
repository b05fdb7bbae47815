//! Spherical (Web) Mercator projection and the map viewport.
//!
//! Pixel space follows the slippy-map convention: the world is
//! `256 * 2^zoom` pixels wide, origin in the north-west corner. Overlay
//! shapes live in "layer" pixels, i.e. relative to the pixel origin fixed at
//! the last view reset, so a plain pan leaves layer coordinates unchanged and
//! only moves the pane.

use crate::types::{LatLng, PixelPoint};
use std::f64::consts::PI;

pub const TILE_SIZE: u32 = 256;

const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Converts geographic coordinates to the pixel space shapes are drawn in.
///
/// Both the region path generator and marker placement go through this one
/// method, always with latitude first.
pub trait ProjectionAdapter {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64);
}

/// Mercator metres for a coordinate. Latitude is clamped to the square world.
fn mercator_project(lat_lng: LatLng) -> PixelPoint {
    let d = PI / 180.0;
    let lat = lat_lng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = (lat * d).sin();
    PixelPoint::new(
        EARTH_RADIUS * lat_lng.lng * d,
        EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0,
    )
}

fn mercator_unproject(point: PixelPoint) -> LatLng {
    let d = 180.0 / PI;
    LatLng::new(
        (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0) * d,
        point.x * d / EARTH_RADIUS,
    )
}

fn zoom_scale(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2f64.powi(zoom as i32)
}

/// Absolute pixel position of a coordinate at `zoom`.
pub fn project(lat_lng: LatLng, zoom: u8) -> PixelPoint {
    let scale = zoom_scale(zoom);
    let k = 0.5 / (PI * EARTH_RADIUS);
    let m = mercator_project(lat_lng);
    PixelPoint::new(scale * (k * m.x + 0.5), scale * (-k * m.y + 0.5))
}

pub fn unproject(point: PixelPoint, zoom: u8) -> LatLng {
    let scale = zoom_scale(zoom);
    let k = 0.5 / (PI * EARTH_RADIUS);
    mercator_unproject(PixelPoint::new(
        (point.x / scale - 0.5) / k,
        (point.y / scale - 0.5) / -k,
    ))
}

/// Current center/zoom of the base map plus the state needed to map
/// coordinates to layer pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: LatLng,
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    size: PixelPoint,
    pixel_origin: PixelPoint,
    pane_pos: PixelPoint,
}

impl MapView {
    pub fn new(center: LatLng, zoom: u8, width: u32, height: u32) -> Self {
        let mut view = Self {
            center,
            zoom,
            min_zoom: 0,
            max_zoom: u8::MAX,
            size: PixelPoint::new(width as f64, height as f64),
            pixel_origin: PixelPoint::default(),
            pane_pos: PixelPoint::default(),
        };
        view.reset(center, zoom);
        view
    }

    pub fn with_zoom_limits(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
        let (center, zoom) = (self.center, self.zoom);
        self.reset(center, zoom);
        self
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn pixel_origin(&self) -> PixelPoint {
        self.pixel_origin
    }

    pub fn pane_pos(&self) -> PixelPoint {
        self.pane_pos
    }

    /// Moves to `center`/`zoom`, discarding any pan offset. Returns whether
    /// the zoom level changed.
    pub fn reset(&mut self, center: LatLng, zoom: u8) -> bool {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let zoom_changed = zoom != self.zoom;
        self.center = center;
        self.zoom = zoom;
        self.pane_pos = PixelPoint::default();
        self.pixel_origin = project(center, zoom)
            .sub(PixelPoint::new(self.size.x / 2.0, self.size.y / 2.0))
            .add(self.pane_pos)
            .round();
        zoom_changed
    }

    /// Shifts the view by a pixel offset. The pixel origin is kept, so layer
    /// coordinates of every shape stay valid.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let offset = PixelPoint::new(dx, dy).round();
        self.pane_pos = self.pane_pos.sub(offset);
        let center_px = project(self.center, self.zoom).add(offset);
        self.center = unproject(center_px, self.zoom);
    }

    /// `latLngToLayerPoint`: rounded absolute pixel minus the pixel origin.
    pub fn lat_lng_to_layer_point(&self, lat_lng: LatLng) -> PixelPoint {
        project(lat_lng, self.zoom).round().sub(self.pixel_origin)
    }

    /// Absolute pixel bounds (min, max) of the visible area.
    pub fn pixel_bounds(&self) -> (PixelPoint, PixelPoint) {
        let center = project(self.center, self.zoom);
        let half = PixelPoint::new(self.size.x / 2.0, self.size.y / 2.0);
        (center.sub(half), center.add(half))
    }
}

impl ProjectionAdapter for MapView {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let point = self.lat_lng_to_layer_point(LatLng::new(lat, lon));
        (point.x, point.y)
    }
}
