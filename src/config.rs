use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub style: StyleConfig,
    pub client: ClientConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub geojson: PathBuf,
    pub data_csv: PathBuf,
    pub join_column_geojson: String,
    pub join_column_csv: String,
    pub price_column: String,
    pub static_dir: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geojson: PathBuf::from("new-york-city-boroughs.geojson"),
            data_csv: PathBuf::from("Airbnb_Open_Data_clean.csv"),
            join_column_geojson: "name".to_string(),
            join_column_csv: "neighbourhood_group".to_string(),
            price_column: "price".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Base map settings. `center` is `[lat, lon]`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub mount_id: String,
    pub center: [f64; 2],
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub width: u32,
    pub height: u32,
    pub tile_url: String,
    pub subdomains: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            mount_id: "chloroplethPlot".to_string(),
            center: [40.70, -73.94],
            zoom: 9,
            min_zoom: 0,
            max_zoom: 19,
            width: 960,
            height: 600,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub region_opacity: f64,
    pub marker_radius: f64,
    pub marker_color: String, // Hex code
    pub marker_opacity: f64,
    pub legend_width: f64,
    pub legend_height: f64,
    pub legend_margin: f64,
    pub legend_label_offset: f64,
    pub legend_ticks: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            region_opacity: 0.65,
            marker_radius: 0.25,
            marker_color: "#ffc0cb".to_string(),
            marker_opacity: 0.3,
            legend_width: 200.0,
            legend_height: 10.0,
            legend_margin: 265.0,
            legend_label_offset: 15.0,
            legend_ticks: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[map]\nzoom = 11\n\n[server]\nport = 8080").unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.map.zoom, 11);
        assert_eq!(config.map.center, [40.70, -73.94]);
        assert_eq!(config.map.mount_id, "chloroplethPlot");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.style.legend_ticks, 6);
        assert_eq!(config.input.join_column_csv, "neighbourhood_group");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
