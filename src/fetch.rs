//! Loading the two datasets and starting the map once both have arrived.

use crate::config::{AppConfig, MapConfig, StyleConfig};
use crate::map::ChoroplethMap;
use crate::surface::Surface;
use crate::types::{PropertyRecord, RegionFeature};
use geojson::{FeatureCollection, GeoJson};
use std::future::Future;
use thiserror::Error;
use tracing::{error, info};

/// Why a dataset could not be loaded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Converts the served feature collection into region features. Features
/// without geometry become empty collections; `average_price` must be a
/// number or null.
pub fn parse_regions(collection: FeatureCollection, url: &str) -> FetchResult<Vec<RegionFeature>> {
    let decode = |message: String| FetchError::Decode {
        url: url.to_string(),
        message,
    };

    let mut regions = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.as_ref();

        let name = props
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let average_price = match props.and_then(|p| p.get("average_price")) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(other) => return Err(decode(format!("feature {} has non-numeric average_price {}", i, other))),
        };

        let geometry: geo::Geometry<f64> = match feature.geometry {
            Some(geom) => geom
                .value
                .try_into()
                .map_err(|e| decode(format!("feature {} has unusable geometry: {:?}", i, e)))?,
            None => geo::Geometry::GeometryCollection(geo::GeometryCollection(Vec::new())),
        };

        regions.push(RegionFeature {
            name,
            geometry,
            average_price,
        });
    }
    Ok(regions)
}

/// Reads both datasets from the data server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.client.base_url.clone())
    }

    async fn get_text(&self, path: &str) -> FetchResult<(String, String)> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Request { url: url.clone(), source })?;
        Ok((url, body))
    }

    pub async fn fetch_regions(&self) -> FetchResult<Vec<RegionFeature>> {
        let (url, body) = self.get_text("/chloropleth").await?;
        let geojson: GeoJson = body.parse().map_err(|e: geojson::Error| FetchError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let collection = FeatureCollection::try_from(geojson).map_err(|e| FetchError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        parse_regions(collection, &url)
    }

    pub async fn fetch_properties(&self) -> FetchResult<Vec<PropertyRecord>> {
        let (url, body) = self.get_text("/properties").await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

/// Waits for both datasets and draws the map. If either fetch fails the
/// error is logged and nothing is drawn.
pub async fn initialize<S, R, P>(
    map_config: &MapConfig,
    style: &StyleConfig,
    surface: S,
    regions: R,
    properties: P,
) -> Option<ChoroplethMap<S>>
where
    S: Surface,
    R: Future<Output = FetchResult<Vec<RegionFeature>>>,
    P: Future<Output = FetchResult<Vec<PropertyRecord>>>,
{
    match tokio::try_join!(regions, properties) {
        Ok((regions, properties)) => {
            info!("Fetched {} regions and {} properties", regions.len(), properties.len());
            Some(ChoroplethMap::draw(map_config, style, regions, properties, surface))
        }
        Err(e) => {
            error!("Error fetching data: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::server;
    use crate::surface::SvgSurface;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn collection(json: &str) -> FeatureCollection {
        json.parse::<GeoJson>().unwrap().try_into().unwrap()
    }

    const ONE_BOROUGH: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "Queens", "average_price": 100},
            "geometry": {"type": "Polygon", "coordinates": [[[-73.96, 40.54], [-73.70, 40.54], [-73.70, 40.80], [-73.96, 40.54]]]}
        }]
    }"#;

    fn surface() -> SvgSurface {
        let config = MapConfig::default();
        SvgSurface::new(&config.mount_id, config.width, config.height)
    }

    fn unavailable(url: &str) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status: 503,
        }
    }

    #[test]
    fn parses_features_with_and_without_price() {
        let mut fc = collection(ONE_BOROUGH);
        let mut second = fc.features[0].clone();
        second.set_property("average_price", serde_json::Value::Null);
        fc.features.push(second);

        let regions = parse_regions(fc, "/chloropleth").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name.as_deref(), Some("Queens"));
        assert_eq!(regions[0].average_price, Some(100.0));
        assert_eq!(regions[1].average_price, None);
        assert!(matches!(regions[0].geometry, geo::Geometry::Polygon(_)));
    }

    #[test]
    fn non_numeric_price_is_a_decode_error() {
        let mut fc = collection(ONE_BOROUGH);
        fc.features[0].set_property("average_price", "cheap");
        let err = parse_regions(fc, "/chloropleth").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn failing_fetch_draws_nothing_and_logs() {
        let log = SharedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = AppConfig::default();
        let regions = async { parse_regions(collection(ONE_BOROUGH), "/chloropleth") };
        let properties = async { Err::<Vec<PropertyRecord>, _>(unavailable("/properties")) };

        let map = initialize(&config.map, &config.style, surface(), regions, properties).await;

        assert!(map.is_none());
        let logged = log.contents();
        assert!(logged.contains("Error fetching data"), "{}", logged);
        assert!(logged.contains("/properties returned status 503"), "{}", logged);
    }

    #[tokio::test]
    async fn failing_regions_fetch_also_draws_nothing() {
        let config = AppConfig::default();
        let regions = async { Err::<Vec<RegionFeature>, _>(unavailable("/chloropleth")) };
        let properties = async {
            Ok(vec![PropertyRecord {
                latitude: 40.7,
                longitude: -73.9,
                price: Some(99.0),
            }])
        };
        let map = initialize(&config.map, &config.style, surface(), regions, properties).await;
        assert!(map.is_none());
    }

    #[tokio::test]
    async fn successful_fetches_draw_the_map() {
        let config = AppConfig::default();
        let regions = async { parse_regions(collection(ONE_BOROUGH), "/chloropleth") };
        let properties = async {
            Ok(vec![PropertyRecord {
                latitude: 40.7,
                longitude: -73.9,
                price: Some(99.0),
            }])
        };
        let map = initialize(&config.map, &config.style, surface(), regions, properties)
            .await
            .unwrap();
        assert_eq!(map.surface().regions().len(), 1);
        assert_eq!(map.surface().markers().len(), 1);
    }

    #[tokio::test]
    async fn http_source_reads_from_data_server() {
        let dataset = Dataset {
            regions: collection(ONE_BOROUGH),
            properties: vec![PropertyRecord {
                latitude: 40.7,
                longitude: -73.9,
                price: Some(99.0),
            }],
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = server::router(dataset, std::env::temp_dir());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let source = HttpDataSource::new(format!("http://{}/", addr));
        let (regions, properties) = tokio::try_join!(source.fetch_regions(), source.fetch_properties()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].average_price, Some(100.0));
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].latitude, 40.7);
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpDataSource::new(format!("http://{}", addr));
        let err = source.fetch_properties().await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
