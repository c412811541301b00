use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use config::Config;
use serde::Deserialize;

use crate::core::error::ConfigError;

pub const AUTHENTICATION_SCHEME: &str = "OneTimeToken";
pub const AUTHORIZATION_HEADER_NAME: &str = "Authorization";
pub const AUTHORIZATION_HEADER_PREFIX: &str = "OneTime";
pub const AUTHORIZATION_QUERY_PARAM_NAME: &str = "accessToken";
pub const NAME_IDENTIFIER: &str = "One time access token";
pub const DEFAULT_EXPIRE_MINUTES: i64 = 30;

const ENV_PREFIX: &str = "ONETIME_TOKEN";

/// Time source used for expiration. Swapped for a manual clock in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Raw settings as read from the environment or a config file.
#[derive(Debug, Deserialize, Clone, Default)]
pub(crate) struct Args {
    pub(crate) authorization_header_name: Option<String>,
    pub(crate) authorization_header_prefix: Option<String>,
    pub(crate) authorization_query_param_name: Option<String>,
    pub(crate) name_identifier: Option<String>,
    pub(crate) default_expire_seconds: Option<i64>,
}

#[derive(Clone)]
pub struct TokenOptions {
    pub authorization_header_name: String,
    pub authorization_header_prefix: String,
    pub authorization_query_param_name: String,
    pub name_identifier: String,
    pub default_expire_time: Duration,
    pub now: Clock,
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("authorization_header_name", &self.authorization_header_name)
            .field("authorization_header_prefix", &self.authorization_header_prefix)
            .field(
                "authorization_query_param_name",
                &self.authorization_query_param_name,
            )
            .field("name_identifier", &self.name_identifier)
            .field("default_expire_time", &self.default_expire_time)
            .finish_non_exhaustive()
    }
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            authorization_header_name: AUTHORIZATION_HEADER_NAME.to_string(),
            authorization_header_prefix: AUTHORIZATION_HEADER_PREFIX.to_string(),
            authorization_query_param_name: AUTHORIZATION_QUERY_PARAM_NAME.to_string(),
            name_identifier: NAME_IDENTIFIER.to_string(),
            default_expire_time: Duration::minutes(DEFAULT_EXPIRE_MINUTES),
            now: system_clock(),
        }
    }
}

impl TokenOptions {
    /// Reads `ONETIME_TOKEN_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::from_config(config)
    }

    /// Like [`TokenOptions::from_env`], with an optional config file underneath.
    /// Environment variables win over file values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let args = config.try_deserialize::<Args>()?;

        Self::from_args(args)
    }

    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.authorization_header_name = name.into();
        self
    }

    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.authorization_header_prefix = prefix.into();
        self
    }

    pub fn with_query_param_name(mut self, name: impl Into<String>) -> Self {
        self.authorization_query_param_name = name.into();
        self
    }

    pub fn with_name_identifier(mut self, name_identifier: impl Into<String>) -> Self {
        self.name_identifier = name_identifier.into();
        self
    }

    pub fn with_default_expire_time(mut self, expire_time: Duration) -> Self {
        self.default_expire_time = expire_time;
        self
    }

    pub fn with_clock(mut self, now: Clock) -> Self {
        self.now = now;
        self
    }

    pub(crate) fn from_args(args: Args) -> Result<Self, ConfigError> {
        let defaults = TokenOptions::default();

        let authorization_header_name = non_empty(
            "authorization_header_name",
            args.authorization_header_name,
            defaults.authorization_header_name,
        )?;
        let authorization_header_prefix = non_empty(
            "authorization_header_prefix",
            args.authorization_header_prefix,
            defaults.authorization_header_prefix,
        )?;
        let authorization_query_param_name = non_empty(
            "authorization_query_param_name",
            args.authorization_query_param_name,
            defaults.authorization_query_param_name,
        )?;

        let default_expire_time = match args.default_expire_seconds {
            None => defaults.default_expire_time,
            Some(seconds) if seconds < 0 => {
                return Err(ConfigError::InvalidValue {
                    key: "default_expire_seconds",
                    reason: format!("must not be negative, got {}", seconds),
                });
            }
            Some(seconds) => {
                Duration::try_seconds(seconds).ok_or_else(|| ConfigError::InvalidValue {
                    key: "default_expire_seconds",
                    reason: format!("{} is out of range", seconds),
                })?
            }
        };

        Ok(Self {
            authorization_header_name,
            authorization_header_prefix,
            authorization_query_param_name,
            name_identifier: args.name_identifier.unwrap_or(defaults.name_identifier),
            default_expire_time,
            now: defaults.now,
        })
    }
}

fn non_empty(
    key: &'static str,
    value: Option<String>,
    default: String,
) -> Result<String, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            key,
            reason: "must not be empty".to_string(),
        }),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(source: &str) -> Result<TokenOptions, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;

        TokenOptions::from_config(config)
    }

    #[test]
    fn test_defaults() {
        let options = TokenOptions::default();

        assert_eq!(options.authorization_header_name, "Authorization");
        assert_eq!(options.authorization_header_prefix, "OneTime");
        assert_eq!(options.authorization_query_param_name, "accessToken");
        assert_eq!(options.name_identifier, "One time access token");
        assert_eq!(options.default_expire_time, Duration::minutes(30));
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let options = from_toml("").unwrap();

        assert_eq!(options.authorization_header_prefix, "OneTime");
        assert_eq!(options.default_expire_time, Duration::minutes(30));
    }

    #[test]
    fn test_overrides() {
        let options = from_toml(
            r#"
            authorization_header_name = "X-Access"
            authorization_header_prefix = "Ticket"
            authorization_query_param_name = "ticket"
            name_identifier = "Download link"
            default_expire_seconds = 90
            "#,
        )
        .unwrap();

        assert_eq!(options.authorization_header_name, "X-Access");
        assert_eq!(options.authorization_header_prefix, "Ticket");
        assert_eq!(options.authorization_query_param_name, "ticket");
        assert_eq!(options.name_identifier, "Download link");
        assert_eq!(options.default_expire_time, Duration::seconds(90));
    }

    #[test]
    fn test_negative_expire_time_is_rejected() {
        let err = from_toml("default_expire_seconds = -5").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "default_expire_seconds",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let err = from_toml(r#"authorization_header_prefix = " ""#).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "authorization_header_prefix",
                ..
            }
        ));
    }

    #[test]
    fn test_clock_override() {
        let fixed = Utc::now() - Duration::days(3);
        let options = TokenOptions::default().with_clock(Arc::new(move || fixed));

        assert_eq!((options.now)(), fixed);
    }
}
