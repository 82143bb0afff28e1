//! One-shot device position fixes.
//!
//! The browser frontend asks `navigator.geolocation`; native frontends fall
//! back to an IP lookup. Both report through [`LocationProvider`].

use crate::core::geo::LatLng;
use async_trait::async_trait;

/// Why no position could be obtained
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeolocationError {
    /// The platform has no geolocation capability
    #[error("Error: Your browser doesn't support geolocation.")]
    Unsupported,

    /// The capability exists but did not produce a fix
    #[error("Error: The Geolocation service failed.")]
    ServiceFailed { message: Option<String> },
}

impl GeolocationError {
    pub fn service_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        GeolocationError::ServiceFailed {
            message: (!message.is_empty()).then_some(message),
        }
    }

    /// Text shown to the user: the condition, then the underlying message
    /// on its own line when there is one.
    pub fn user_message(&self) -> String {
        match self {
            GeolocationError::ServiceFailed {
                message: Some(message),
            } => format!("{}\n{}", self, message),
            _ => self.to_string(),
        }
    }
}

/// Source of the device's current position
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait LocationProvider {
    async fn current_position(&self) -> Result<LatLng, GeolocationError>;
}

/// Provider for platforms without any geolocation capability
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl LocationProvider for NoGeolocation {
    async fn current_position(&self) -> Result<LatLng, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use ip::IpLocator;

#[cfg(not(target_arch = "wasm32"))]
mod ip {
    use super::*;
    use serde::Deserialize;

    const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";

    #[derive(Debug, Deserialize)]
    struct IpApiResponse {
        status: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lon: Option<f64>,
    }

    /// Approximates the device position from its public IP address
    #[derive(Debug, Clone)]
    pub struct IpLocator {
        client: reqwest::Client,
        endpoint: String,
    }

    impl IpLocator {
        pub fn new() -> Self {
            Self::with_endpoint(DEFAULT_ENDPOINT)
        }

        pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                endpoint: endpoint.into(),
            }
        }
    }

    impl Default for IpLocator {
        fn default() -> Self {
            Self::new()
        }
    }

    pub(super) fn parse_fix(body: &str) -> Result<LatLng, GeolocationError> {
        let response: IpApiResponse = serde_json::from_str(body)
            .map_err(|e| GeolocationError::service_failed(e.to_string()))?;

        match (response.status.as_str(), response.lat, response.lon) {
            ("success", Some(lat), Some(lon)) => Ok(LatLng::new(lat, lon)),
            _ => Err(GeolocationError::service_failed(
                response.message.unwrap_or_default(),
            )),
        }
    }

    #[async_trait]
    impl LocationProvider for IpLocator {
        async fn current_position(&self) -> Result<LatLng, GeolocationError> {
            let response = self
                .client
                .get(&self.endpoint)
                .send()
                .await
                .map_err(|e| GeolocationError::service_failed(e.to_string()))?;
            let body = response
                .text()
                .await
                .map_err(|e| GeolocationError::service_failed(e.to_string()))?;
            let fix = parse_fix(&body)?;
            log::info!("current location found: {}", fix);
            Ok(fix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_distinguish_causes() {
        assert_eq!(
            GeolocationError::Unsupported.user_message(),
            "Error: Your browser doesn't support geolocation."
        );
        assert_eq!(
            GeolocationError::service_failed("User denied Geolocation").user_message(),
            "Error: The Geolocation service failed.\nUser denied Geolocation"
        );
        assert_eq!(
            GeolocationError::service_failed("").user_message(),
            "Error: The Geolocation service failed."
        );
    }

    #[tokio::test]
    async fn test_no_geolocation_is_unsupported() {
        assert_eq!(
            NoGeolocation.current_position().await,
            Err(GeolocationError::Unsupported)
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_parse_ip_fix() {
        let fix = ip::parse_fix(r#"{"status":"success","lat":-6.2,"lon":106.8}"#).unwrap();
        assert_eq!(fix, LatLng::new(-6.2, 106.8));

        let err = ip::parse_fix(r#"{"status":"fail","message":"reserved range"}"#).unwrap_err();
        assert_eq!(
            err,
            GeolocationError::ServiceFailed {
                message: Some("reserved range".to_string())
            }
        );
    }
}
