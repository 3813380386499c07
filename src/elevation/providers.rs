//! HTTP elevation providers
//!
//! Each provider is the only place that knows its wire format.

use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{Config, ProviderConfig};
use crate::error::{Error, Result};
use crate::types::Coordinate;
use super::{ElevationErrorKind, ElevationSample, ElevationSource};

type LookupResult<T> = std::result::Result<T, ElevationErrorKind>;

/// Shared HTTP plumbing for the providers
#[derive(Clone)]
struct HttpLookup {
    client: Client,
    timeout: Duration,
}

impl HttpLookup {
    async fn get_json<T: DeserializeOwned>(
        &self,
        source: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> LookupResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify(source, &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(source, "elevation provider rate limited the request");
            return Err(ElevationErrorKind::RateLimited);
        }
        if !status.is_success() {
            tracing::warn!(source, status = status.as_u16(), "elevation provider returned error status");
            return Err(ElevationErrorKind::Unreachable);
        }

        let body = response.bytes().await.map_err(|e| classify(source, &e))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(source, error = %e, "could not decode elevation response");
            ElevationErrorKind::MalformedResponse
        })
    }
}

fn classify(source: &str, error: &reqwest::Error) -> ElevationErrorKind {
    let kind = if error.is_timeout() {
        ElevationErrorKind::Timeout
    } else if error.is_decode() {
        ElevationErrorKind::MalformedResponse
    } else {
        ElevationErrorKind::Unreachable
    };
    tracing::warn!(source, error = %error, ?kind, "elevation request failed");
    kind
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn location_param(coordinate: Coordinate) -> String {
    format!("{},{}", coordinate.latitude(), coordinate.longitude())
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupEntry>,
}

#[derive(Debug, Deserialize)]
struct LookupEntry {
    elevation: Option<f64>,
}

fn first_elevation(response: LookupResponse) -> LookupResult<f64> {
    response
        .results
        .into_iter()
        .next()
        .and_then(|entry| entry.elevation)
        .ok_or(ElevationErrorKind::MalformedResponse)
}

/// Open-Elevation (`/api/v1/lookup`)
pub struct OpenElevation {
    http: HttpLookup,
    base_url: String,
}

impl OpenElevation {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http: HttpLookup { client, timeout },
            base_url: trim_base(base_url),
        }
    }

    async fn lookup(&self, coordinate: Coordinate) -> LookupResult<f64> {
        let url = format!("{}/api/v1/lookup", self.base_url);
        let response: LookupResponse = self
            .http
            .get_json(self.name(), &url, &[("locations", location_param(coordinate))])
            .await?;
        first_elevation(response)
    }
}

impl ElevationSource for OpenElevation {
    fn name(&self) -> &str {
        "open-elevation"
    }

    fn timeout(&self) -> Duration {
        self.http.timeout
    }

    fn fetch(&self, coordinate: Coordinate) -> BoxFuture<'_, ElevationSample> {
        async move {
            let result = self.lookup(coordinate).await;
            ElevationSample::from_result(coordinate, self.name(), result)
        }
        .boxed()
    }
}

#[derive(Debug, Deserialize)]
struct MeteoResponse {
    elevation: Vec<f64>,
}

/// Open-Meteo elevation API (`/v1/elevation`)
pub struct OpenMeteo {
    http: HttpLookup,
    base_url: String,
}

impl OpenMeteo {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http: HttpLookup { client, timeout },
            base_url: trim_base(base_url),
        }
    }

    async fn lookup(&self, coordinate: Coordinate) -> LookupResult<f64> {
        let url = format!("{}/v1/elevation", self.base_url);
        let query = [
            ("latitude", coordinate.latitude().to_string()),
            ("longitude", coordinate.longitude().to_string()),
        ];
        let response: MeteoResponse = self.http.get_json(self.name(), &url, &query).await?;
        response
            .elevation
            .first()
            .copied()
            .ok_or(ElevationErrorKind::MalformedResponse)
    }
}

impl ElevationSource for OpenMeteo {
    fn name(&self) -> &str {
        "open-meteo"
    }

    fn timeout(&self) -> Duration {
        self.http.timeout
    }

    fn fetch(&self, coordinate: Coordinate) -> BoxFuture<'_, ElevationSample> {
        async move {
            let result = self.lookup(coordinate).await;
            ElevationSample::from_result(coordinate, self.name(), result)
        }
        .boxed()
    }
}

#[derive(Debug, Deserialize)]
struct TopoResponse {
    status: String,
    #[serde(default)]
    results: Vec<LookupEntry>,
}

/// OpenTopoData (`/v1/{dataset}`)
pub struct OpenTopoData {
    http: HttpLookup,
    base_url: String,
    dataset: String,
    name: String,
}

impl OpenTopoData {
    pub fn new(client: Client, base_url: &str, dataset: &str, timeout: Duration) -> Self {
        Self {
            http: HttpLookup { client, timeout },
            base_url: trim_base(base_url),
            dataset: dataset.to_string(),
            name: format!("opentopodata:{}", dataset),
        }
    }

    async fn lookup(&self, coordinate: Coordinate) -> LookupResult<f64> {
        let url = format!("{}/v1/{}", self.base_url, self.dataset);
        let response: TopoResponse = self
            .http
            .get_json(&self.name, &url, &[("locations", location_param(coordinate))])
            .await?;
        if response.status != "OK" {
            tracing::warn!(source = %self.name, status = %response.status, "opentopodata reported failure");
            return Err(ElevationErrorKind::MalformedResponse);
        }
        first_elevation(LookupResponse { results: response.results })
    }
}

impl ElevationSource for OpenTopoData {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.http.timeout
    }

    fn fetch(&self, coordinate: Coordinate) -> BoxFuture<'_, ElevationSample> {
        async move {
            let result = self.lookup(coordinate).await;
            ElevationSample::from_result(coordinate, self.name(), result)
        }
        .boxed()
    }
}

/// Builds the configured providers around one shared HTTP client
pub fn build_sources(config: &Config) -> Result<Vec<Arc<dyn ElevationSource>>> {
    config.validate()?;

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
    let timeout = config.source_timeout();

    let sources = config
        .providers
        .iter()
        .map(|provider| -> Arc<dyn ElevationSource> {
            match provider {
                ProviderConfig::OpenElevation { base_url } => {
                    Arc::new(OpenElevation::new(client.clone(), base_url, timeout))
                }
                ProviderConfig::OpenMeteo { base_url } => {
                    Arc::new(OpenMeteo::new(client.clone(), base_url, timeout))
                }
                ProviderConfig::OpenTopoData { base_url, dataset } => {
                    Arc::new(OpenTopoData::new(client.clone(), base_url, dataset, timeout))
                }
            }
        })
        .collect();

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn coord() -> Coordinate {
        Coordinate::new(46.5, 7.25).unwrap()
    }

    fn timeout() -> Duration {
        Duration::from_secs(2)
    }

    #[tokio::test]
    async fn test_open_elevation_success() {
        let router = Router::new().route(
            "/api/v1/lookup",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("locations").map(String::as_str), Some("46.5,7.25"));
                Json(json!({"results": [{"latitude": 46.5, "longitude": 7.25, "elevation": 1620.0}]}))
            }),
        );
        let base = serve(router).await;

        let source = OpenElevation::new(Client::new(), &base, timeout());
        let sample = source.fetch(coord()).await;
        assert!(sample.success);
        assert_eq!(sample.elevation(), Some(1620.0));
        assert_eq!(sample.source_name, "open-elevation");
    }

    #[tokio::test]
    async fn test_open_meteo_success() {
        let router = Router::new().route(
            "/v1/elevation",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("latitude").map(String::as_str), Some("46.5"));
                Json(json!({"elevation": [1598.0]}))
            }),
        );
        let base = serve(router).await;

        let source = OpenMeteo::new(Client::new(), &format!("{}/", base), timeout());
        let sample = source.fetch(coord()).await;
        assert_eq!(sample.elevation(), Some(1598.0));
    }

    #[tokio::test]
    async fn test_opentopodata_success_and_null() {
        let router = Router::new()
            .route(
                "/v1/aster30m",
                get(|| async { Json(json!({"status": "OK", "results": [{"elevation": 1611.0, "dataset": "aster30m"}]})) }),
            )
            .route(
                "/v1/empty",
                get(|| async { Json(json!({"status": "OK", "results": [{"elevation": null}]})) }),
            );
        let base = serve(router).await;

        let source = OpenTopoData::new(Client::new(), &base, "aster30m", timeout());
        assert_eq!(source.name(), "opentopodata:aster30m");
        assert_eq!(source.fetch(coord()).await.elevation(), Some(1611.0));

        let empty = OpenTopoData::new(Client::new(), &base, "empty", timeout());
        let sample = empty.fetch(coord()).await;
        assert_eq!(sample.error, Some(ElevationErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn test_rate_limited_and_server_error() {
        let router = Router::new()
            .route("/v1/elevation", get(|| async { AxumStatus::TOO_MANY_REQUESTS }))
            .route("/api/v1/lookup", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }));
        let base = serve(router).await;

        let meteo = OpenMeteo::new(Client::new(), &base, timeout());
        assert_eq!(meteo.fetch(coord()).await.error, Some(ElevationErrorKind::RateLimited));

        let open = OpenElevation::new(Client::new(), &base, timeout());
        assert_eq!(open.fetch(coord()).await.error, Some(ElevationErrorKind::Unreachable));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let router = Router::new().route(
            "/v1/elevation",
            get(|| async { Json(json!({"unexpected": true})) }),
        );
        let base = serve(router).await;

        let source = OpenMeteo::new(Client::new(), &base, timeout());
        let sample = source.fetch(coord()).await;
        assert!(!sample.success);
        assert_eq!(sample.error, Some(ElevationErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route(
            "/v1/elevation",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json::<Value>(json!({"elevation": [1.0]}))
            }),
        );
        let base = serve(router).await;

        let source = OpenMeteo::new(Client::new(), &base, Duration::from_millis(50));
        let sample = source.fetch(coord()).await;
        assert_eq!(sample.error, Some(ElevationErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let source = OpenElevation::new(Client::new(), &base, timeout());
        assert_eq!(source.fetch(coord()).await.error, Some(ElevationErrorKind::Unreachable));
    }

    #[test]
    fn test_build_sources_from_default_config() {
        let sources = build_sources(&Config::default()).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["open-elevation", "open-meteo", "opentopodata:aster30m"]);
        assert!(sources.iter().all(|s| s.timeout() == Duration::from_secs(5)));
    }
}
