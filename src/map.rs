//! The choropleth map: base view, tile background, region and marker
//! overlay, legend, and the view-change handling that keeps them aligned.

use crate::config::{MapConfig, StyleConfig};
use crate::overlay::{self, build_legend, compute_overlay, region_styles};
use crate::projection::MapView;
use crate::scale::{hex_to_rgb, ColorScale};
use crate::surface::{MarkerStyle, Surface};
use crate::tiles::TileLayer;
use crate::types::{LatLng, MapEvent, PropertyRecord, RegionFeature};
use tracing::{debug, info};

pub struct ChoroplethMap<S: Surface> {
    view: MapView,
    tiles: TileLayer,
    regions: Vec<RegionFeature>,
    properties: Vec<PropertyRecord>,
    scale: ColorScale,
    surface: S,
}

impl<S: Surface> ChoroplethMap<S> {
    /// Builds every shape once at the default view and positions it.
    pub fn draw(
        map_config: &MapConfig,
        style: &StyleConfig,
        regions: Vec<RegionFeature>,
        properties: Vec<PropertyRecord>,
        mut surface: S,
    ) -> Self {
        let [lat, lng] = map_config.center;
        let view = MapView::new(LatLng::new(lat, lng), map_config.zoom, map_config.width, map_config.height)
            .with_zoom_limits(map_config.min_zoom, map_config.max_zoom);
        let tiles = TileLayer::from_config(map_config);

        // Fixed from the loaded data; never recomputed.
        let scale = ColorScale::from_values(regions.iter().map(|r| r.average_price));
        info!(
            "Drawing {} regions and {} properties, price domain {:?}",
            regions.len(),
            properties.len(),
            scale.domain()
        );

        surface.create_regions(&region_styles(&regions, &scale, style));
        surface.create_markers(
            properties.len(),
            &MarkerStyle {
                radius: style.marker_radius,
                fill: hex_to_rgb(&style.marker_color),
                opacity: style.marker_opacity,
            },
        );
        surface.set_legend(&build_legend(&scale, style));

        let mut map = Self {
            view,
            tiles,
            regions,
            properties,
            scale,
            surface,
        };
        map.reset_view();
        map
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn handle_event(&mut self, event: MapEvent) {
        debug!("View event {:?} at zoom {}", event, self.view.zoom());
        match event {
            MapEvent::ZoomEnd | MapEvent::MoveEnd => self.reset_view(),
        }
    }

    /// Recomputes tile placement, region paths and marker positions for the
    /// current view and applies them to the existing shapes.
    pub fn reset_view(&mut self) {
        let geometry = self.overlay_geometry();
        self.surface.set_tiles(&self.tiles.visible_tiles(&self.view));
        self.surface.set_pane_offset(self.view.pane_pos());
        self.surface.set_region_paths(&geometry.region_paths);
        self.surface.set_marker_positions(&geometry.marker_positions);
    }

    pub fn set_view(&mut self, center: LatLng, zoom: u8) {
        let zoom_changed = self.view.reset(center, zoom);
        if zoom_changed {
            self.handle_event(MapEvent::ZoomEnd);
        }
        self.handle_event(MapEvent::MoveEnd);
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        let center = self.view.center();
        self.set_view(center, zoom);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.view.pan_by(dx, dy);
        self.handle_event(MapEvent::MoveEnd);
    }

    /// Target geometry for the current view, without applying it.
    pub fn overlay_geometry(&self) -> overlay::OverlayGeometry {
        compute_overlay(&self.regions, &self.properties, &self.view)
    }
}
