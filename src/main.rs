pub mod types;
pub mod config;
pub mod data;
pub mod projection;
pub mod scale;
pub mod overlay;
pub mod tiles;
pub mod surface;
pub mod map;
pub mod fetch;
pub mod server;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the borough prices and property listings
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Fetch both datasets from the server and render the map to SVG
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "chloropleth.svg")]
        output: PathBuf,
        /// Zoom to this level after the initial draw
        #[arg(long)]
        zoom: Option<u8>,
        /// Pan by DX,DY pixels after the initial draw
        #[arg(long, value_name = "DX,DY", value_parser = parse_offset, allow_hyphen_values = true)]
        pan: Option<(f64, f64)>,
    },
}

fn parse_offset(s: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected DX,DY, got '{}'", s))?;
    let dx = dx.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let dy = dy.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((dx, dy))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            println!("Serving data with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            // 1. Join listings onto borough boundaries
            let dataset = data::load_data(&app_config)?;

            // 2. Serve
            server::start_server(app_config, dataset).await?;
        }
        Commands::Render { config, output, zoom, pan } => {
            println!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let source = fetch::HttpDataSource::from_config(&app_config);
            let surface = surface::SvgSurface::new(
                app_config.map.mount_id.clone(),
                app_config.map.width,
                app_config.map.height,
            );

            let mut map = fetch::initialize(
                &app_config.map,
                &app_config.style,
                surface,
                source.fetch_regions(),
                source.fetch_properties(),
            )
            .await
            .ok_or_else(|| anyhow!("Nothing rendered, data could not be fetched"))?;

            if let Some(z) = zoom {
                map.set_zoom(z);
            }
            if let Some((dx, dy)) = pan {
                map.pan_by(dx, dy);
            }

            let svg = map.into_surface().to_svg();
            fs::write(&output, svg).with_context(|| format!("Failed to write {:?}", output))?;
            println!("Map written to {:?}", output);
        }
    }

    Ok(())
}
