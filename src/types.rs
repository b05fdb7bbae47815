use geo::Geometry;
use serde::{Deserialize, Serialize};

/// A borough polygon with the mean listing price of its properties.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    pub name: Option<String>,
    pub geometry: Geometry<f64>,
    pub average_price: Option<f64>,
}

/// One listing as served by `/properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Pixel coordinates, either absolute (projected at a zoom) or relative to
/// the map's pixel origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rounds half up like `Math.round`, so negative halves do not drift
    /// away from the browser's result.
    pub fn round(self) -> Self {
        Self::new((self.x + 0.5).floor(), (self.y + 0.5).floor())
    }

    pub fn add(self, other: PixelPoint) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: PixelPoint) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Viewport change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    ZoomEnd,
    MoveEnd,
}
