//! Resolving the exporting instance's identifier
//!
//! Called once per export. A configured license key makes the instance a
//! licensed instance; otherwise it reports as unlicensed. Both variants
//! carry the instance's site ID.

use crate::error::IdentifierError;
use async_trait::async_trait;
use telemetry_gateway_core::proto::identifier::{self, LicensedInstance, UnlicensedInstance};
use telemetry_gateway_core::proto::Identifier;

/// Read access to site configuration.
pub trait SiteConfigQuerier: Send + Sync {
    /// The configured license key, if any.
    fn license_key(&self) -> Option<String>;
}

/// Read access to persistent global state.
#[async_trait]
pub trait GlobalStateStore: Send + Sync {
    /// The instance's site ID.
    async fn site_id(&self) -> Result<String, IdentifierError>;
}

/// Static site configuration, for tests and single-tenant deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteConfig {
    /// License key to report.
    pub license_key: Option<String>,
}

impl SiteConfigQuerier for StaticSiteConfig {
    fn license_key(&self) -> Option<String> {
        self.license_key.clone()
    }
}

/// Static global state.
#[derive(Debug, Clone, Default)]
pub struct StaticGlobalState {
    /// Site ID to report.
    pub site_id: String,
}

#[async_trait]
impl GlobalStateStore for StaticGlobalState {
    async fn site_id(&self) -> Result<String, IdentifierError> {
        Ok(self.site_id.clone())
    }
}

/// Builds the identifier sent in stream metadata.
pub async fn resolve_identifier(
    site_config: &dyn SiteConfigQuerier,
    global_state: &dyn GlobalStateStore,
) -> Result<Identifier, IdentifierError> {
    let instance_id = global_state.site_id().await?;
    if instance_id.trim().is_empty() {
        return Err(IdentifierError::EmptyInstanceId);
    }

    let variant = match site_config
        .license_key()
        .filter(|key| !key.trim().is_empty())
    {
        Some(license_key) => identifier::Identifier::LicensedInstance(LicensedInstance {
            license_key,
            instance_id,
        }),
        None => identifier::Identifier::UnlicensedInstance(UnlicensedInstance { instance_id }),
    };
    Ok(Identifier {
        identifier: Some(variant),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FailingState;

    #[async_trait]
    impl GlobalStateStore for FailingState {
        async fn site_id(&self) -> Result<String, IdentifierError> {
            Err(IdentifierError::GlobalState("database is locked".into()))
        }
    }

    fn state(id: &str) -> StaticGlobalState {
        StaticGlobalState {
            site_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_licensed_when_key_configured() {
        let conf = StaticSiteConfig {
            license_key: Some("license".into()),
        };
        let id = resolve_identifier(&conf, &state("site-1")).await.unwrap();
        match id.identifier.unwrap() {
            identifier::Identifier::LicensedInstance(l) => {
                assert_eq!(l.license_key, "license");
                assert_eq!(l.instance_id, "site-1");
            }
            other => panic!("expected licensed instance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlicensed_when_key_blank() {
        let conf = StaticSiteConfig {
            license_key: Some("  ".into()),
        };
        let id = resolve_identifier(&conf, &state("site-1")).await.unwrap();
        assert!(matches!(
            id.identifier,
            Some(identifier::Identifier::UnlicensedInstance(ref u)) if u.instance_id == "site-1"
        ));
    }

    #[tokio::test]
    async fn test_empty_instance_id_is_an_error() {
        let err = resolve_identifier(&StaticSiteConfig::default(), &state(""))
            .await
            .unwrap_err();
        assert_eq!(err, IdentifierError::EmptyInstanceId);
    }

    #[tokio::test]
    async fn test_state_error_propagates() {
        let err = resolve_identifier(&StaticSiteConfig::default(), &FailingState)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentifierError::GlobalState(_)));
    }
}
