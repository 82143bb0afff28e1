use super::{GeocodeError, Geocoder, Place};
use crate::core::geo::LatLng;
use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::{Deserialize, Serialize};

/// Connection settings for a Nominatim instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    /// Service root, without a trailing slash
    pub base_url: String,
    /// Sent as `User-Agent` outside the browser (required by the usage policy)
    pub user_agent: String,
    /// Optional contact address forwarded as the `email` parameter
    pub email: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("pinmap/", env!("CARGO_PKG_VERSION")).to_string(),
            email: None,
        }
    }
}

/// Nominatim `search` / `reverse` client
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        // Browsers own the User-Agent header
        #[cfg(target_arch = "wasm32")]
        let client = Client::new();

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &NominatimConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_email(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// `GET /search?format=json&q=<query>&limit=1`
    pub fn search_request(&self, query: &str) -> Result<Request, GeocodeError> {
        let params = self.with_email(vec![
            ("format", "json".to_string()),
            ("q", query.to_string()),
            ("limit", "1".to_string()),
        ]);
        Ok(self.client.get(self.endpoint("search")).query(&params).build()?)
    }

    /// `GET /reverse?format=json&lat=<lat>&lon=<lng>`
    pub fn reverse_request(&self, position: LatLng) -> Result<Request, GeocodeError> {
        let params = self.with_email(vec![
            ("format", "json".to_string()),
            ("lat", position.lat.to_string()),
            ("lon", position.lng.to_string()),
        ]);
        Ok(self.client.get(self.endpoint("reverse")).query(&params).build()?)
    }

    async fn fetch(&self, request: Request) -> Result<String, GeocodeError> {
        let url = request.url().clone();
        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("geocoder returned {} for {}", status, url);
            return Err(GeocodeError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
        let body = self.fetch(self.search_request(query)?).await?;
        let place = parse_search(&body)?;
        match &place {
            Some(place) => log::info!("location found: {}", place.display_name),
            None => log::info!("no location found for {:?}", query),
        }
        Ok(place)
    }

    async fn reverse(&self, position: LatLng) -> Result<Option<String>, GeocodeError> {
        let body = self.fetch(self.reverse_request(position)?).await?;
        parse_reverse(&body)
    }
}

/// Nominatim sends coordinates as strings; accept numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Text(String),
    Number(f64),
}

impl Degrees {
    fn value(&self) -> Result<f64, GeocodeError> {
        match self {
            Degrees::Number(value) => Ok(*value),
            Degrees::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| GeocodeError::Decode(format!("invalid coordinate {:?}", text))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: Degrees,
    lon: Degrees,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    #[serde(default)]
    display_name: Option<String>,
}

/// Parse a `search` response body. An empty array means "not found".
pub fn parse_search(body: &str) -> Result<Option<Place>, GeocodeError> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    hits.into_iter()
        .next()
        .map(|hit| -> Result<Place, GeocodeError> {
            Ok(Place {
                position: LatLng::new(hit.lat.value()?, hit.lon.value()?),
                display_name: hit.display_name,
            })
        })
        .transpose()
}

/// Parse a `reverse` response body. Error objects and blank names yield `None`.
pub fn parse_reverse(body: &str) -> Result<Option<String>, GeocodeError> {
    let hit: ReverseHit = serde_json::from_str(body)?;
    Ok(hit.display_name.filter(|name| !name.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoder() -> NominatimGeocoder {
        NominatimGeocoder::new(NominatimConfig::default()).unwrap()
    }

    #[test]
    fn test_search_request_url() {
        let request = geocoder().search_request("Monas Jakarta").unwrap();
        let url = request.url();

        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("format".into(), "json".into())));
        assert!(pairs.contains(&("q".into(), "Monas Jakarta".into())));
        assert!(pairs.contains(&("limit".into(), "1".into())));
    }

    #[test]
    fn test_reverse_request_url() {
        let mut config = NominatimConfig::default();
        config.base_url = "http://localhost:8080/".to_string();
        config.email = Some("ops@example.org".to_string());
        let geocoder = NominatimGeocoder::new(config).unwrap();

        let request = geocoder.reverse_request(LatLng::new(-6.2, 106.8)).unwrap();
        let url = request.url().as_str();
        assert!(url.starts_with("http://localhost:8080/reverse?"));
        assert!(url.contains("lat=-6.2"));
        assert!(url.contains("lon=106.8"));
        assert!(url.contains("email=ops%40example.org"));
    }

    #[test]
    fn test_parse_search_hit() {
        let body = r#"[{"place_id":1,"lat":"-6.1753924","lon":"106.8271528","display_name":"Monas, Jakarta, Indonesia"}]"#;
        let place = parse_search(body).unwrap().unwrap();

        assert_eq!(place.display_name, "Monas, Jakarta, Indonesia");
        assert!((place.position.lat + 6.1753924).abs() < 1e-9);
        assert!((place.position.lng - 106.8271528).abs() < 1e-9);
    }

    #[test]
    fn test_parse_search_numeric_coordinates() {
        let body = r#"[{"lat":51.5,"lon":-0.12,"display_name":"London"}]"#;
        let place = parse_search(body).unwrap().unwrap();
        assert_eq!(place.position, LatLng::new(51.5, -0.12));
    }

    #[test]
    fn test_parse_search_empty_is_not_found() {
        assert!(parse_search("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_search_malformed() {
        assert!(matches!(parse_search("<html>"), Err(GeocodeError::Decode(_))));
        let bad_lat = r#"[{"lat":"north","lon":"1","display_name":"x"}]"#;
        assert!(matches!(parse_search(bad_lat), Err(GeocodeError::Decode(_))));
    }

    #[test]
    fn test_parse_reverse() {
        assert_eq!(
            parse_reverse(r#"{"display_name":"Jakarta, Indonesia"}"#).unwrap(),
            Some("Jakarta, Indonesia".to_string())
        );
        assert_eq!(parse_reverse(r#"{"error":"Unable to geocode"}"#).unwrap(), None);
        assert_eq!(parse_reverse(r#"{"display_name":"  "}"#).unwrap(), None);
    }
}
