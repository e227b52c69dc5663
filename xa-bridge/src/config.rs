//! Resource configuration types and builders.
//!
//! Values are supplied by the wiring layer that owns the data source.
//! [`ResourceSettings`] is a serde-friendly mirror for callers that bind the
//! configuration from a document; it is converted with [`TryFrom`].

use serde::Deserialize;

use xa_bridge_core::XaError;

pub use xa_bridge_core::Credentials as RecoveryCredentials;

/// Name given to resources when none is configured.
pub const DEFAULT_RESOURCE_NAME: &str = "dataSource";

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for XaError {
    fn from(err: ConfigError) -> Self {
        XaError::Configuration(err.message)
    }
}

/// How one resource is wrapped for transactions and recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    name: String,
    last_resource: bool,
    recovery_credentials: Option<RecoveryCredentials>,
    verify_on_wrap: bool,
}

impl ResourceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ResourceConfigBuilder {
        ResourceConfigBuilder::new()
    }

    /// Returns the name attached to the resource for recovery matching.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the resource enlists as a last resource.
    pub fn is_last_resource(&self) -> bool {
        self.last_resource
    }

    /// Returns the credentials used for recovery connections.
    pub fn recovery_credentials(&self) -> Option<&RecoveryCredentials> {
        self.recovery_credentials.as_ref()
    }

    /// Returns true when wrapping checks that the resource can be reached.
    pub fn verify_on_wrap(&self) -> bool {
        self.verify_on_wrap
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_RESOURCE_NAME.to_string(),
            last_resource: false,
            recovery_credentials: None,
            verify_on_wrap: false,
        }
    }
}

/// Builder for [`ResourceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResourceConfigBuilder {
    name: Option<String>,
    last_resource: Option<bool>,
    recovery_credentials: Option<RecoveryCredentials>,
    verify_on_wrap: Option<bool>,
}

impl ResourceConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the resource as a last resource.
    pub fn last_resource(mut self, last_resource: bool) -> Self {
        self.last_resource = Some(last_resource);
        self
    }

    /// Sets the credentials used for recovery connections.
    ///
    /// Credentials with neither user nor password are ignored.
    pub fn recovery_credentials(mut self, credentials: RecoveryCredentials) -> Self {
        self.recovery_credentials = Some(credentials);
        self
    }

    /// Enables the connectivity check performed when wrapping.
    pub fn verify_on_wrap(mut self, verify: bool) -> Self {
        self.verify_on_wrap = Some(verify);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the name is set but blank
    /// - the recovery user is blank and no password is given
    pub fn build(self) -> Result<ResourceConfig, ConfigError> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::new("name must not be blank"));
            }
            Some(name) => name,
            None => DEFAULT_RESOURCE_NAME.to_string(),
        };

        let recovery_credentials = self
            .recovery_credentials
            .filter(RecoveryCredentials::is_valid);
        if let Some(credentials) = &recovery_credentials {
            let blank_user = credentials.user().map_or(false, |u| u.trim().is_empty());
            if blank_user && credentials.password().is_none() {
                return Err(ConfigError::new(
                    "recovery user must not be blank without a password",
                ));
            }
        }

        Ok(ResourceConfig {
            name,
            last_resource: self.last_resource.unwrap_or(false),
            recovery_credentials,
            verify_on_wrap: self.verify_on_wrap.unwrap_or(false),
        })
    }
}

/// Serde mirror of [`ResourceConfig`].
///
/// ```json
/// {
///   "name": "orders",
///   "last-resource": false,
///   "recovery-credentials": { "user": "recovery", "password": "secret" },
///   "verify-on-wrap": true
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResourceSettings {
    /// Resource name.
    pub name: Option<String>,
    /// Enlist as a last resource.
    pub last_resource: bool,
    /// Credentials for recovery connections.
    pub recovery_credentials: Option<RecoveryCredentials>,
    /// Check connectivity when wrapping.
    pub verify_on_wrap: bool,
}

impl TryFrom<ResourceSettings> for ResourceConfig {
    type Error = ConfigError;

    fn try_from(settings: ResourceSettings) -> Result<Self, Self::Error> {
        let mut builder = ResourceConfig::builder()
            .last_resource(settings.last_resource)
            .verify_on_wrap(settings.verify_on_wrap);
        if let Some(name) = settings.name {
            builder = builder.name(name);
        }
        if let Some(credentials) = settings.recovery_credentials {
            builder = builder.recovery_credentials(credentials);
        }
        builder.build()
    }
}
