mod http;
mod types;

pub use http::HttpModelService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Remote model service that trains on enrollment samples and scores
/// authentication attempts.
#[async_trait]
pub trait ModelService: Send + Sync {
    fn name(&self) -> &str;
    async fn enroll(&self, request: &EnrollmentRequest) -> Result<EnrollmentResponse, ServiceError>;
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ServiceError>;
}

pub type ServiceHandle = Arc<dyn ModelService>;

#[async_trait]
impl<S: ModelService + ?Sized> ModelService for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn enroll(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentResponse, ServiceError> {
        (**self).enroll(request).await
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ServiceError> {
        (**self).authenticate(request).await
    }
}
