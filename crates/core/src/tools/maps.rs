//! Location lookup, driving directions and nearby search.
//!
//! The answers are phrased for a voice model: every successful output carries
//! a short `summary` and a `voice_response` sentence alongside the structured
//! fields.

use crate::tool::{ToolHandler, failure_output, first_missing, str_arg};
use anyhow::bail;
use async_trait::async_trait;
use gemini_realtime::{FunctionDeclaration, SchemaType};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::info;

pub const GET_LOCATION_INFO: &str = "get_location_info";
pub const GET_DRIVING_DIRECTIONS: &str = "get_driving_directions";
pub const SEARCH_NEARBY_PLACES: &str = "search_nearby_places";

const DEFAULT_RADIUS_M: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub coordinates: Option<Coordinates>,
    pub phone: Option<String>,
    /// Distance from the search center, for nearby searches.
    pub distance_m: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub distance_m: u64,
    pub duration_s: u64,
    pub steps: Vec<String>,
}

/// A mapping service. `Err` means the service could not be used at all;
/// "nothing found" is an empty `Vec` or `None`.
#[async_trait]
pub trait MapsBackend: Send + Sync {
    async fn search_place(&self, query: &str, region: &str) -> anyhow::Result<Vec<Place>>;

    async fn driving_route(&self, origin: &str, destination: &str) -> anyhow::Result<Option<Route>>;

    async fn search_nearby(&self, location: &str, keyword: &str, radius_m: u32) -> anyhow::Result<Vec<Place>>;
}

pub struct MapsTool<B> {
    backend: B,
}

impl<B: MapsBackend> MapsTool<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn location_info(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        if let Some(missing) = first_missing(args, &["query", "region"]) {
            return Ok(missing_argument(missing));
        }
        let (query, region) = (str_arg(args, "query").unwrap_or_default(), str_arg(args, "region").unwrap_or_default());

        let places = self.backend.search_place(query, region).await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(failure_output(
                format!("No results found for '{query}' in {region}."),
                "Check the place name or try a broader region.",
            ));
        };

        let phone = place.phone.as_deref().map(|p| format!("，电话{p}")).unwrap_or_default();
        Ok(json!({
            "success": true,
            "query": query,
            "region": region,
            "name": place.name,
            "address": place.address,
            "coordinates": place.coordinates,
            "phone": place.phone,
            "summary": format!("{}位于{}{}。", place.name, place.address, phone),
            "voice_response": format!("{}在{}{}。", place.name, place.address, phone),
        }))
    }

    async fn driving_directions(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        if let Some(missing) = first_missing(args, &["origin", "destination"]) {
            return Ok(missing_argument(missing));
        }
        let (origin, destination) = (
            str_arg(args, "origin").unwrap_or_default(),
            str_arg(args, "destination").unwrap_or_default(),
        );

        let Some(route) = self.backend.driving_route(origin, destination).await? else {
            return Ok(failure_output(
                format!("No driving route found from {origin} to {destination}."),
                "Try more specific place names or coordinates such as '39.999701,116.312612'.",
            ));
        };

        let distance_km = (route.distance_m as f64 / 100.0).round() / 10.0;
        let duration_min = route.duration_s.div_ceil(60);
        Ok(json!({
            "success": true,
            "origin": origin,
            "destination": destination,
            "distance_km": distance_km,
            "duration_min": duration_min,
            "steps": route.steps,
            "summary": format!("{origin}到{destination}{distance_km}公里，驾车约{duration_min}分钟。"),
            "voice_response": format!("从{origin}到{destination}大约{distance_km}公里，驾车需要{duration_min}分钟。"),
        }))
    }

    async fn nearby_places(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        if let Some(missing) = first_missing(args, &["location", "keyword"]) {
            return Ok(missing_argument(missing));
        }
        let (location, keyword) = (
            str_arg(args, "location").unwrap_or_default(),
            str_arg(args, "keyword").unwrap_or_default(),
        );
        let radius = args
            .get("radius")
            .and_then(Value::as_f64)
            .filter(|r| *r > 0.0)
            .map_or(DEFAULT_RADIUS_M, |r| r.round() as u32);

        let places = self.backend.search_nearby(location, keyword, radius).await?;
        if places.is_empty() {
            return Ok(failure_output(
                format!("No {keyword} found within {radius}m of {location}."),
                "Increase the radius or use a more general keyword.",
            ));
        }

        let names: Vec<&str> = places.iter().take(3).map(|p| p.name.as_str()).collect();
        Ok(json!({
            "success": true,
            "location": location,
            "keyword": keyword,
            "radius": radius,
            "results": places,
            "summary": format!("附近找到{}个{keyword}：{}。", places.len(), names.join("、")),
            "voice_response": format!("在附近为您找到{}个{keyword}，比如{}。", places.len(), names.join("、")),
        }))
    }
}

#[async_trait]
impl<B: MapsBackend> ToolHandler for MapsTool<B> {
    fn declarations(&self) -> Vec<FunctionDeclaration> {
        vec![
            FunctionDeclaration::new(
                GET_LOCATION_INFO,
                "Get precise location information including address, coordinates, and contact details",
            )
            .required_property(
                "query",
                SchemaType::String,
                "The specific location name to search for (e.g., '北京大学', '天安门广场')",
            )
            .required_property(
                "region",
                SchemaType::String,
                "The city or region to search within (e.g., '北京', '上海')",
            ),
            FunctionDeclaration::new(
                GET_DRIVING_DIRECTIONS,
                "Get driving directions with distance, time, and step-by-step instructions",
            )
            .required_property(
                "origin",
                SchemaType::String,
                "The starting point name or coordinates (e.g., '北京西站' or '39.89491,116.322056')",
            )
            .required_property(
                "destination",
                SchemaType::String,
                "The destination name or coordinates (e.g., '北京大学' or '39.999701,116.312612')",
            ),
            FunctionDeclaration::new(SEARCH_NEARBY_PLACES, "Search for places of a given kind around a location")
                .required_property("location", SchemaType::String, "The center location as 'lat,lng' (e.g., '39.915,116.404')")
                .required_property("keyword", SchemaType::String, "What to look for (e.g., '餐厅', '银行')")
                .property("radius", SchemaType::Number, "Search radius in meters (default: 1000)")
                .with_default("radius", json!(DEFAULT_RADIUS_M)),
        ]
    }

    async fn execute(&self, name: &str, args: &Map<String, Value>) -> anyhow::Result<Value> {
        info!(tool = %name, ?args, "Maps tool executing.");
        match name {
            GET_LOCATION_INFO => self.location_info(args).await,
            GET_DRIVING_DIRECTIONS => self.driving_directions(args).await,
            SEARCH_NEARBY_PLACES => self.nearby_places(args).await,
            other => bail!("maps tool does not provide '{other}'"),
        }
    }
}

fn missing_argument(field: &str) -> Value {
    let hint = match field {
        "query" => "Provide the place name to look up, e.g. '北京大学'.",
        "region" => "Provide the city or region to search within, e.g. '北京'.",
        "origin" => "Provide the starting point, e.g. '北京西站'.",
        "destination" => "Provide the destination, e.g. '北京大学'.",
        "location" => "Provide the center location as 'lat,lng', e.g. '39.915,116.404'.",
        "keyword" => "Provide what to search for, e.g. '餐厅'.",
        _ => "Provide all required arguments.",
    };
    failure_output(format!("Missing required argument: {field}"), hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::OfflineMaps;
    use std::sync::Mutex;

    fn args(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn location_lookup_returns_structured_record() {
        let tool = MapsTool::new(OfflineMaps);
        let output = tool
            .execute(GET_LOCATION_INFO, &args(json!({ "query": "北京大学", "region": "北京" })))
            .await
            .unwrap();

        assert_eq!(output["success"], true);
        assert_eq!(output["name"], "北京大学");
        assert_eq!(output["address"], "北京市海淀区颐和园路5号");
        assert_eq!(output["coordinates"]["lat"], 39.999701);
        assert!(!output["voice_response"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_region_is_a_failure_with_suggestion() {
        let tool = MapsTool::new(OfflineMaps);
        let output = tool
            .execute(GET_LOCATION_INFO, &args(json!({ "query": "北京大学" })))
            .await
            .unwrap();

        assert_eq!(output["success"], false);
        assert_eq!(output["error"], "Missing required argument: region");
        assert!(output["suggestion"].as_str().unwrap().contains("region"));
    }

    #[tokio::test]
    async fn directions_are_summarised() {
        let tool = MapsTool::new(OfflineMaps);
        let output = tool
            .execute(
                GET_DRIVING_DIRECTIONS,
                &args(json!({ "origin": "北京西站", "destination": "北京大学" })),
            )
            .await
            .unwrap();

        assert_eq!(output["success"], true);
        assert_eq!(output["distance_km"], 12.9);
        assert_eq!(output["duration_min"], 25);
    }

    struct Recording {
        radius: Mutex<Option<u32>>,
    }

    #[async_trait]
    impl MapsBackend for Recording {
        async fn search_place(&self, _query: &str, _region: &str) -> anyhow::Result<Vec<Place>> {
            Ok(vec![])
        }

        async fn driving_route(&self, _origin: &str, _destination: &str) -> anyhow::Result<Option<Route>> {
            bail!("network unreachable")
        }

        async fn search_nearby(&self, _location: &str, keyword: &str, radius_m: u32) -> anyhow::Result<Vec<Place>> {
            *self.radius.lock().unwrap() = Some(radius_m);
            Ok(vec![Place {
                name: format!("{keyword}一号"),
                address: "东城区".into(),
                coordinates: None,
                phone: None,
                distance_m: Some(120),
            }])
        }
    }

    #[tokio::test]
    async fn zero_results_are_not_errors() {
        let tool = MapsTool::new(Recording { radius: Mutex::new(None) });
        let output = tool
            .execute(GET_LOCATION_INFO, &args(json!({ "query": "无名地", "region": "北京" })))
            .await
            .unwrap();
        assert_eq!(output["success"], false);
        assert!(output["error"].as_str().unwrap().contains("No results"));
    }

    #[tokio::test]
    async fn backend_outage_is_an_error() {
        let tool = MapsTool::new(Recording { radius: Mutex::new(None) });
        let err = tool
            .execute(GET_DRIVING_DIRECTIONS, &args(json!({ "origin": "a", "destination": "b" })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "network unreachable");
    }

    #[tokio::test]
    async fn nearby_uses_default_radius() {
        let backend = Recording { radius: Mutex::new(None) };
        let tool = MapsTool::new(backend);
        let output = tool
            .execute(
                SEARCH_NEARBY_PLACES,
                &args(json!({ "location": "39.915,116.404", "keyword": "餐厅" })),
            )
            .await
            .unwrap();

        assert_eq!(output["success"], true);
        assert_eq!(output["radius"], 1000);
        assert_eq!(*tool.backend.radius.lock().unwrap(), Some(1000));
        assert_eq!(output["results"][0]["name"], "餐厅一号");
    }

    #[tokio::test]
    async fn unknown_capability_is_an_error() {
        let tool = MapsTool::new(OfflineMaps);
        assert!(tool.execute("get_weather", &Map::new()).await.is_err());
    }

    #[test]
    fn declarations_are_valid() {
        let tool = MapsTool::new(OfflineMaps);
        let declarations = tool.declarations();
        assert_eq!(declarations.len(), 3);
        for declaration in &declarations {
            declaration.validate().unwrap();
        }
        assert_eq!(declarations[0].parameters.required, vec!["query", "region"]);
    }
}
