//! Rendering surfaces. Shapes are created once and afterwards only their
//! coordinates change.

use crate::overlay::{fill_value, fmt_number, Legend, RegionStyle};
use crate::scale::css_color;
use crate::tiles::Tile;
use crate::types::PixelPoint;
use image::Rgb;
use quick_xml::escape::escape;
use std::fmt::Write;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill: Rgb<u8>,
    pub opacity: f64,
}

/// Where the map draws. Implementations own their elements; the map only
/// asks for creation once and coordinate updates afterwards.
pub trait Surface {
    fn create_regions(&mut self, styles: &[RegionStyle]);
    fn set_region_paths(&mut self, paths: &[String]);
    fn create_markers(&mut self, count: usize, style: &MarkerStyle);
    fn set_marker_positions(&mut self, positions: &[PixelPoint]);
    fn set_legend(&mut self, legend: &Legend);
    fn set_tiles(&mut self, tiles: &[Tile]);
    /// Container offset of the layer pane, changed by panning.
    fn set_pane_offset(&mut self, offset: PixelPoint);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathElement {
    pub d: String,
    pub style: RegionStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircleElement {
    pub cx: f64,
    pub cy: f64,
    pub style: MarkerStyle,
}

/// Retained SVG scene.
#[derive(Debug, Clone, Default)]
pub struct SvgSurface {
    mount_id: String,
    width: u32,
    height: u32,
    pane_offset: PixelPoint,
    tiles: Vec<Tile>,
    regions: Vec<PathElement>,
    markers: Vec<CircleElement>,
    legend: Option<Legend>,
}

impl SvgSurface {
    pub fn new(mount_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            mount_id: mount_id.into(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn regions(&self) -> &[PathElement] {
        &self.regions
    }

    pub fn markers(&self) -> &[CircleElement] {
        &self.markers
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn pane_offset(&self) -> PixelPoint {
        self.pane_offset
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let pane = format!(
            "translate({},{})",
            fmt_number(self.pane_offset.x),
            fmt_number(self.pane_offset.y)
        );

        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            escape(self.mount_id.as_str()),
            self.width,
            self.height,
            self.width,
            self.height
        );

        let _ = write!(out, r#"<g class="leaflet-tile-pane" transform="{}">"#, pane);
        for tile in &self.tiles {
            let _ = write!(
                out,
                r#"<image href="{}" x="{}" y="{}" width="{}" height="{}"/>"#,
                escape(tile.url.as_str()),
                fmt_number(tile.position.x),
                fmt_number(tile.position.y),
                fmt_number(tile.size),
                fmt_number(tile.size)
            );
        }
        out.push_str("</g>");

        let _ = write!(out, r#"<g class="leaflet-zoom-hide" transform="{}">"#, pane);
        for region in &self.regions {
            let fill = fill_value(region.style.fill)
                .map(|f| format!("fill:{};", f))
                .unwrap_or_default();
            let _ = write!(
                out,
                r#"<path d="{}" style="{}fill-opacity:{}"/>"#,
                region.d,
                fill,
                fmt_number(region.style.opacity)
            );
        }
        for marker in &self.markers {
            let _ = write!(
                out,
                r#"<circle class="property" r="{}" cx="{}" cy="{}" style="fill:{};fill-opacity:{}"/>"#,
                fmt_number(marker.style.radius),
                fmt_number(marker.cx),
                fmt_number(marker.cy),
                css_color(marker.style.fill),
                fmt_number(marker.style.opacity)
            );
        }
        out.push_str("</g>");

        if let Some(legend) = &self.legend {
            let _ = write!(
                out,
                r#"<g class="legend" transform="translate({},{})">"#,
                fmt_number(legend.offset.x),
                fmt_number(legend.offset.y)
            );
            for swatch in &legend.swatches {
                let fill = fill_value(swatch.fill)
                    .map(|f| format!("fill:{};", f))
                    .unwrap_or_default();
                let _ = write!(
                    out,
                    r#"<rect x="{}" y="0" width="{}" height="{}" style="{}fill-opacity:{}"/>"#,
                    fmt_number(swatch.x),
                    fmt_number(swatch.width),
                    fmt_number(swatch.height),
                    fill,
                    fmt_number(swatch.opacity)
                );
                let _ = write!(
                    out,
                    r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    fmt_number(swatch.label_x),
                    fmt_number(swatch.label_y),
                    escape(swatch.label.as_str())
                );
            }
            out.push_str("</g>");
        }

        out.push_str("</svg>");
        out
    }
}

impl Surface for SvgSurface {
    fn create_regions(&mut self, styles: &[RegionStyle]) {
        self.regions = styles
            .iter()
            .map(|style| PathElement {
                d: String::new(),
                style: style.clone(),
            })
            .collect();
    }

    fn set_region_paths(&mut self, paths: &[String]) {
        if paths.len() != self.regions.len() {
            warn!("Got {} region paths for {} region shapes", paths.len(), self.regions.len());
        }
        for (element, d) in self.regions.iter_mut().zip(paths) {
            element.d.clone_from(d);
        }
    }

    fn create_markers(&mut self, count: usize, style: &MarkerStyle) {
        self.markers = vec![
            CircleElement {
                cx: 0.0,
                cy: 0.0,
                style: style.clone(),
            };
            count
        ];
    }

    fn set_marker_positions(&mut self, positions: &[PixelPoint]) {
        if positions.len() != self.markers.len() {
            warn!("Got {} marker positions for {} markers", positions.len(), self.markers.len());
        }
        for (element, p) in self.markers.iter_mut().zip(positions) {
            element.cx = p.x;
            element.cy = p.y;
        }
    }

    fn set_legend(&mut self, legend: &Legend) {
        self.legend = Some(legend.clone());
    }

    fn set_tiles(&mut self, tiles: &[Tile]) {
        self.tiles = tiles.to_vec();
    }

    fn set_pane_offset(&mut self, offset: PixelPoint) {
        self.pane_offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::LegendSwatch;

    fn marker_style() -> MarkerStyle {
        MarkerStyle {
            radius: 0.25,
            fill: Rgb([255, 192, 203]),
            opacity: 0.3,
        }
    }

    #[test]
    fn updates_keep_elements_and_styles() {
        let mut surface = SvgSurface::new("chloroplethPlot", 100, 100);
        let style = RegionStyle {
            fill: Some(Rgb([200, 0, 0])),
            opacity: 0.65,
        };
        surface.create_regions(&[style.clone()]);
        surface.create_markers(2, &marker_style());

        surface.set_region_paths(&["M0,0L1,1Z".to_string()]);
        surface.set_marker_positions(&[PixelPoint::new(1.0, 2.0), PixelPoint::new(3.0, 4.0)]);
        surface.set_region_paths(&["M5,5L6,6Z".to_string()]);

        assert_eq!(surface.regions().len(), 1);
        assert_eq!(surface.regions()[0].d, "M5,5L6,6Z");
        assert_eq!(surface.regions()[0].style, style);
        assert_eq!(surface.markers()[1].cx, 3.0);
        assert_eq!(surface.markers()[1].cy, 4.0);
    }

    #[test]
    fn svg_document_contains_every_layer() {
        let mut surface = SvgSurface::new("chloroplethPlot", 960, 600);
        surface.create_regions(&[RegionStyle {
            fill: None,
            opacity: 0.65,
        }]);
        surface.set_region_paths(&["M0,0L10,0L10,10Z".to_string()]);
        surface.create_markers(1, &marker_style());
        surface.set_marker_positions(&[PixelPoint::new(12.0, 34.0)]);
        surface.set_legend(&Legend {
            offset: PixelPoint::new(265.0, 265.0),
            swatches: vec![LegendSwatch {
                x: 0.0,
                width: 200.0,
                height: 10.0,
                fill: Some(Rgb([103, 0, 13])),
                opacity: 0.65,
                label_x: 100.0,
                label_y: 25.0,
                label: "0".to_string(),
            }],
        });
        surface.set_tiles(&[Tile {
            z: 9,
            x: 150,
            y: 192,
            url: "https://a.example/9/150/192.png?k=1&v=2".to_string(),
            position: PixelPoint::new(-10.0, 0.0),
            size: 256.0,
        }]);

        let svg = surface.to_svg();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" id="chloroplethPlot""#));
        assert!(svg.contains(r#"<path d="M0,0L10,0L10,10Z" style="fill-opacity:0.65"/>"#));
        assert!(svg.contains(r#"cx="12" cy="34" style="fill:rgb(255, 192, 203);fill-opacity:0.3""#));
        assert!(svg.contains(r#"<g class="legend" transform="translate(265,265)">"#));
        assert!(svg.contains(r#"<text x="100" y="25" text-anchor="middle">0</text>"#));
        assert!(svg.contains("k=1&amp;v=2"));
        assert!(svg.ends_with("</svg>"));
    }
}
