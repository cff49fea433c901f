//! Credential selection and SDK session construction.
//!
//! The credential mode is chosen once from [`Config`] and passed down
//! explicitly; nothing past this point reads the process environment.

use crate::config::Config;
use crate::error::{QueryError, Result};
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use std::fmt;
use tracing::info;

const ROLE_SESSION_NAME: &str = "athena-query";
const STATIC_PROVIDER_NAME: &str = "athena-query-config";

#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Default provider chain: environment, profile, instance metadata.
    Ambient,
    StaticKeys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    AssumeRole {
        role_arn: String,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Ambient => f.write_str("Ambient"),
            CredentialSource::StaticKeys { access_key_id, .. } => f
                .debug_struct("StaticKeys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish_non_exhaustive(),
            CredentialSource::AssumeRole { role_arn } => f
                .debug_struct("AssumeRole")
                .field("role_arn", role_arn)
                .finish(),
        }
    }
}

/// Everything needed to build an authenticated SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub region: Option<String>,
    pub credentials: CredentialSource,
}

impl SessionSpec {
    /// Pick the credential mode from a validated configuration.
    ///
    /// A role wins over everything else; keys need both halves; otherwise
    /// the ambient chain is used for the configured region.
    pub fn from_config(config: &Config) -> Result<Self> {
        let region = non_empty(config.region.as_deref());
        let role = non_empty(config.role.as_deref());
        let access_key_id = non_empty(config.access_key_id.as_deref());
        let secret_access_key = non_empty(config.secret_access_key.as_deref());

        if region.is_none() && role.is_none() {
            return Err(QueryError::config(
                "neither a region nor a role is configured",
            ));
        }

        let credentials = match (role, access_key_id, secret_access_key) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(QueryError::config(
                    "a role cannot be combined with static access keys",
                ))
            }
            (Some(role_arn), None, None) => CredentialSource::AssumeRole {
                role_arn: role_arn.to_string(),
            },
            (None, Some(id), Some(secret)) => CredentialSource::StaticKeys {
                access_key_id: id.to_string(),
                secret_access_key: secret.to_string(),
                session_token: non_empty(config.session_token.as_deref()).map(str::to_string),
            },
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(QueryError::config(
                    "access key id and secret access key must be supplied together",
                ))
            }
            (None, None, None) => CredentialSource::Ambient,
        };

        Ok(Self {
            region: region.map(str::to_string),
            credentials,
        })
    }

    /// Resolve into an [`SdkConfig`]. No network calls happen here; role
    /// credentials are fetched lazily on first use.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        match &self.credentials {
            CredentialSource::Ambient => {
                info!(region = ?self.region, "using ambient AWS credentials");
                loader.load().await
            }
            CredentialSource::StaticKeys {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                info!(region = ?self.region, %access_key_id, "using static AWS access keys");
                let creds = Credentials::new(
                    access_key_id.clone(),
                    secret_access_key.clone(),
                    session_token.clone(),
                    None,
                    STATIC_PROVIDER_NAME,
                );
                loader
                    .credentials_provider(SharedCredentialsProvider::new(creds))
                    .load()
                    .await
            }
            CredentialSource::AssumeRole { role_arn } => {
                info!(region = ?self.region, %role_arn, "assuming AWS role");
                let base = loader.load().await;
                let provider = AssumeRoleProvider::builder(role_arn.clone())
                    .session_name(ROLE_SESSION_NAME)
                    .configure(&base)
                    .build()
                    .await;
                base.into_builder()
                    .credentials_provider(SharedCredentialsProvider::new(provider))
                    .build()
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
