//! OSRM HTTP adapter for pairwise route distances.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::traits::DistanceProvider;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn route_url(&self, from: (f64, f64), to: (f64, f64)) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            from.1,
            from.0,
            to.1,
            to.0
        )
    }
}

impl DistanceProvider for OsrmClient {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        // OSRM answers NoRoute with a 400, so the body is decoded regardless of status.
        let body = self.client.get(self.route_url(from, to)).send()?.text()?;
        parse_route_response(&body)
    }
}

/// Decode an OSRM `route` service body into a distance in meters.
fn parse_route_response(body: &str) -> Result<Option<f64>, ProviderError> {
    let response: OsrmRouteResponse = serde_json::from_str(body)?;

    match response.code.as_str() {
        "Ok" => Ok(response.routes.first().map(|route| route.distance)),
        "NoRoute" => Ok(None),
        _ => Err(ProviderError::Service {
            code: response.code,
            message: response.message.unwrap_or_default(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
}
