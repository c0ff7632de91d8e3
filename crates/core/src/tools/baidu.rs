//! Baidu Maps web service backend.

use super::maps::{Coordinates, MapsBackend, Place, Route};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const BAIDU_MAPS_API_BASE: &str = "https://api.map.baidu.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

pub struct BaiduMaps {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// --- Response shapes (only the fields we read) ---

#[derive(Deserialize)]
struct PlaceSearchResponse {
    status: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Deserialize)]
struct PlaceResult {
    name: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    telephone: Option<String>,
    #[serde(default)]
    detail_info: Option<DetailInfo>,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct DetailInfo {
    #[serde(default)]
    distance: Option<u32>,
}

#[derive(Deserialize)]
struct DrivingResponse {
    status: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<DrivingResult>,
}

#[derive(Deserialize)]
struct DrivingResult {
    #[serde(default)]
    routes: Vec<DrivingRoute>,
}

#[derive(Deserialize)]
struct DrivingRoute {
    distance: u64,
    duration: u64,
    #[serde(default)]
    steps: Vec<DrivingStep>,
}

#[derive(Deserialize)]
struct DrivingStep {
    #[serde(default)]
    instruction: String,
}

impl From<PlaceResult> for Place {
    fn from(result: PlaceResult) -> Self {
        Place {
            name: result.name,
            address: result.address.unwrap_or_default(),
            coordinates: result.location.map(|l| Coordinates { lat: l.lat, lng: l.lng }),
            phone: result.telephone.filter(|t| !t.is_empty()),
            distance_m: result.detail_info.and_then(|d| d.distance),
        }
    }
}

impl BaiduMaps {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, BAIDU_MAPS_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for Baidu Maps")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("output", "json"), ("ak", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Baidu Maps request to {endpoint} failed"))?
            .error_for_status()
            .with_context(|| format!("Baidu Maps returned an error status for {endpoint}"))?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Malformed Baidu Maps response from {endpoint}"))
    }
}

fn check_status(status: i64, message: Option<String>) -> Result<()> {
    if status != 0 {
        bail!(
            "Baidu Maps API error: {}",
            message.unwrap_or_else(|| format!("status {status}"))
        );
    }
    Ok(())
}

#[async_trait]
impl MapsBackend for BaiduMaps {
    async fn search_place(&self, query: &str, region: &str) -> Result<Vec<Place>> {
        let body: PlaceSearchResponse = self
            .get("place/v2/search", &[("query", query), ("region", region)])
            .await?;
        check_status(body.status, body.message)?;
        Ok(body.results.into_iter().map(Place::from).collect())
    }

    async fn driving_route(&self, origin: &str, destination: &str) -> Result<Option<Route>> {
        let body: DrivingResponse = self
            .get(
                "direction/v2/driving",
                &[("origin", origin), ("destination", destination)],
            )
            .await?;
        check_status(body.status, body.message)?;
        Ok(body
            .result
            .and_then(|r| r.routes.into_iter().next())
            .map(|route| Route {
                distance_m: route.distance,
                duration_s: route.duration,
                steps: route.steps.into_iter().map(|s| s.instruction).collect(),
            }))
    }

    async fn search_nearby(&self, location: &str, keyword: &str, radius_m: u32) -> Result<Vec<Place>> {
        let radius = radius_m.to_string();
        let body: PlaceSearchResponse = self
            .get(
                "place/v2/search",
                &[
                    ("query", keyword),
                    ("location", location),
                    ("radius", radius.as_str()),
                    ("scope", "2"),
                ],
            )
            .await?;
        check_status(body.status, body.message)?;
        Ok(body.results.into_iter().map(Place::from).collect())
    }
}
