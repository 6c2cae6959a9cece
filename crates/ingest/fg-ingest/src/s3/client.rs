//! S3 connection settings and client construction.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use fg_error::Result;

/// Connection overrides for the flow-log object store.
///
/// Every field is optional. With no overrides the ambient AWS
/// environment (env vars, config files, instance role) decides, which
/// is the normal production path; the endpoint and credential overrides
/// exist for LocalStack runs.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    region: Option<String>,
    endpoint: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    profile: Option<String>,
}

impl S3Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Point at a custom endpoint (LocalStack). Implies path-style
    /// addressing.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use an explicit static key pair instead of the ambient
    /// credential chain.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Resolve credentials from a named AWS profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    fn static_credentials(&self) -> Option<aws_sdk_s3::config::Credentials> {
        match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(aws_sdk_s3::config::Credentials::new(
                access_key, secret_key, None, None, "flowguard",
            )),
            _ => None,
        }
    }
}

/// Build an S3 client from the connection overrides.
pub async fn create_s3_client(config: &S3Config) -> Result<Client> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let Some(credentials) = config.static_credentials() {
        loader = loader.credentials_provider(credentials);
    }

    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }

    let shared = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&shared);

    // Virtual-hosted addressing does not resolve against LocalStack
    if config.endpoint.is_some() {
        builder = builder.force_path_style(true);
    }

    Ok(Client::from_conf(builder.build()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_chain() {
        let config = S3Config::new()
            .with_region("us-east-1")
            .with_endpoint("http://localhost:4566")
            .with_profile("flowguard-dev");

        assert_eq!(config.region, Some("us-east-1".to_string()));
        assert_eq!(config.endpoint, Some("http://localhost:4566".to_string()));
        assert_eq!(config.profile, Some("flowguard-dev".to_string()));
    }

    #[test]
    fn test_static_credentials_require_both_halves() {
        let config = S3Config::new().with_credentials("access", "secret");
        assert!(config.static_credentials().is_some());

        let partial = S3Config {
            access_key: Some("access".to_string()),
            ..S3Config::default()
        };
        assert!(partial.static_credentials().is_none());
    }

    #[test]
    fn test_default_config_has_no_overrides() {
        let config = S3Config::default();

        assert!(config.region.is_none());
        assert!(config.endpoint.is_none());
        assert!(config.access_key.is_none());
        assert!(config.profile.is_none());
    }
}
