//! Target geometry for the overlay: what every shape should look like for a
//! given dataset and viewport. Nothing here touches a surface.

use crate::config::StyleConfig;
use crate::projection::ProjectionAdapter;
use crate::scale::{self, ColorScale};
use crate::types::{PixelPoint, PropertyRecord, RegionFeature};
use geo::{Coord, Geometry, LineString, Polygon};
use image::Rgb;
use rayon::prelude::*;
use std::fmt::Write;

/// Fill of one region, fixed once at draw time.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStyle {
    pub fill: Option<Rgb<u8>>,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendSwatch {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Option<Rgb<u8>>,
    pub opacity: f64,
    pub label_x: f64,
    pub label_y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub offset: PixelPoint,
    pub swatches: Vec<LegendSwatch>,
}

/// Viewport-dependent part of the overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayGeometry {
    pub region_paths: Vec<String>,
    pub marker_positions: Vec<PixelPoint>,
}

/// Formats a coordinate the way JavaScript prints numbers: no trailing
/// `.0` and no negative zero.
pub fn fmt_number(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else {
        format!("{}", v)
    }
}

fn write_ring<P: ProjectionAdapter>(out: &mut String, ring: &LineString<f64>, closed: bool, projection: &P) {
    // A closed ring repeats its first position; the closing `Z` replaces it.
    let coords: &[Coord<f64>] = &ring.0;
    let n = if closed && coords.len() > 1 && coords.first() == coords.last() {
        coords.len() - 1
    } else {
        coords.len()
    };
    if n == 0 {
        return;
    }
    for (i, c) in coords[..n].iter().enumerate() {
        // GeoJSON positions are [longitude, latitude].
        let (x, y) = projection.project(c.y, c.x);
        let _ = write!(out, "{}{},{}", if i == 0 { 'M' } else { 'L' }, fmt_number(x), fmt_number(y));
    }
    if closed {
        out.push('Z');
    }
}

fn write_polygon<P: ProjectionAdapter>(out: &mut String, polygon: &Polygon<f64>, projection: &P) {
    write_ring(out, polygon.exterior(), true, projection);
    for interior in polygon.interiors() {
        write_ring(out, interior, true, projection);
    }
}

/// SVG path data for a geometry. Point geometries produce an empty path;
/// the overlay draws regions, not symbols.
pub fn geometry_path<P: ProjectionAdapter>(geometry: &Geometry<f64>, projection: &P) -> String {
    let mut out = String::new();
    append_geometry(&mut out, geometry, projection);
    out
}

fn append_geometry<P: ProjectionAdapter>(out: &mut String, geometry: &Geometry<f64>, projection: &P) {
    match geometry {
        Geometry::Polygon(p) => write_polygon(out, p, projection),
        Geometry::MultiPolygon(mp) => {
            for p in mp {
                write_polygon(out, p, projection);
            }
        }
        Geometry::LineString(ls) => write_ring(out, ls, false, projection),
        Geometry::MultiLineString(mls) => {
            for ls in mls {
                write_ring(out, ls, false, projection);
            }
        }
        Geometry::Rect(r) => write_polygon(out, &r.to_polygon(), projection),
        Geometry::Triangle(t) => write_polygon(out, &t.to_polygon(), projection),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                append_geometry(out, g, projection);
            }
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) | Geometry::Line(_) => {}
    }
}

pub fn region_styles(regions: &[RegionFeature], scale: &ColorScale, style: &StyleConfig) -> Vec<RegionStyle> {
    regions
        .iter()
        .map(|r| RegionStyle {
            fill: scale.color(r.average_price),
            opacity: style.region_opacity,
        })
        .collect()
}

pub fn marker_position<P: ProjectionAdapter>(record: &PropertyRecord, projection: &P) -> PixelPoint {
    let (x, y) = projection.project(record.latitude, record.longitude);
    PixelPoint::new(x, y)
}

/// Region paths and marker positions for the projection's current view.
pub fn compute_overlay<P>(regions: &[RegionFeature], properties: &[PropertyRecord], projection: &P) -> OverlayGeometry
where
    P: ProjectionAdapter + Sync,
{
    let region_paths = regions
        .par_iter()
        .map(|r| geometry_path(&r.geometry, projection))
        .collect();
    let marker_positions = properties
        .par_iter()
        .map(|p| marker_position(p, projection))
        .collect();
    OverlayGeometry {
        region_paths,
        marker_positions,
    }
}

/// One swatch per tick, laid out left to right across the legend width.
pub fn build_legend(scale: &ColorScale, style: &StyleConfig) -> Legend {
    let thresholds = scale.ticks(style.legend_ticks);
    let width = if thresholds.is_empty() {
        0.0
    } else {
        style.legend_width / thresholds.len() as f64
    };
    let swatches = thresholds
        .iter()
        .enumerate()
        .map(|(i, &threshold)| LegendSwatch {
            x: i as f64 * width,
            width,
            height: style.legend_height,
            fill: scale.color(Some(threshold)),
            opacity: style.region_opacity,
            label_x: (i as f64 + 0.5) * width,
            label_y: style.legend_height + style.legend_label_offset,
            label: fmt_number(threshold),
        })
        .collect();
    Legend {
        offset: PixelPoint::new(style.legend_margin, style.legend_margin),
        swatches,
    }
}

/// Fill attribute value, if any.
pub fn fill_value(fill: Option<Rgb<u8>>) -> Option<String> {
    fill.map(scale::css_color)
}
