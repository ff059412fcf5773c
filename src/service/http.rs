use super::{
    AuthRequest, AuthResponse, EnrollmentRequest, EnrollmentResponse, ModelService, ServiceError,
};
use crate::config::ServiceConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// JSON-over-HTTP model service client.
pub struct HttpModelService {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpModelService {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ServiceError::Unavailable("service endpoint not configured".into()))?;
        Self::new(endpoint, config.api_key.clone(), config.timeout())
    }

    pub fn from_env() -> Result<Self, ServiceError> {
        let config = ServiceConfig::from_env();
        if config.endpoint.is_none() {
            return Err(ServiceError::Unavailable("BIOKEY_SERVICE_URL not set".into()));
        }
        Self::from_config(&config)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        log::debug!("model service {path}: HTTP {status}");

        if let Some(error) = value.get("error") {
            if !error.is_null() {
                return Err(ServiceError::Rejected(error.to_string()));
            }
        }
        if !status.is_success() {
            return Err(ServiceError::Rejected(format!("HTTP {status}")));
        }

        serde_json::from_value(value).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ModelService for HttpModelService {
    fn name(&self) -> &str {
        "HTTP Model Service"
    }

    async fn enroll(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentResponse, ServiceError> {
        self.post_json("enroll", request).await
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ServiceError> {
        self.post_json("authenticate", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let svc = HttpModelService::new(
            "http://localhost:8080/api/".into(),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(svc.url("/enroll"), "http://localhost:8080/api/enroll");
        assert_eq!(svc.url("authenticate"), "http://localhost:8080/api/authenticate");
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let config = ServiceConfig::default();
        assert!(matches!(
            HttpModelService::from_config(&config),
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let svc = HttpModelService::new(
            "http://127.0.0.1:1".into(),
            Some("key".into()),
            Duration::from_secs(2),
        )
        .unwrap();
        let req = EnrollmentRequest {
            encoded_features: vec![0.0; 26],
            raw_timing_arrays: None,
            derived_features: crate::fingerprint::keystroke::DerivedKeystrokeFeatures {
                typing_speed: 0.0,
                mean_flight_time: 0.0,
                error_signal: 0.0,
                hold_time_std_dev: 0.0,
            },
            sample_count: 1,
        };
        assert!(matches!(svc.enroll(&req).await, Err(ServiceError::Network(_))));
    }
}
