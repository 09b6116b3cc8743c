use std::time::Duration;

use serde::Deserialize;

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins
    #[serde(default)]
    pub origins: AnyOrList,
    /// Allowed methods
    #[serde(default)]
    pub methods: AnyOrList,
    /// Allowed request headers
    #[serde(default)]
    pub headers: AnyOrList,
    #[serde(default)]
    pub credentials: bool,
    /// Preflight cache lifetime in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl CorsConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

/// Either the wildcard `"*"` or an explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAnyOrList")]
pub enum AnyOrList {
    #[default]
    Any,
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnyOrList {
    One(String),
    Many(Vec<String>),
}

impl From<RawAnyOrList> for AnyOrList {
    fn from(raw: RawAnyOrList) -> Self {
        let values = match raw {
            RawAnyOrList::One(value) => vec![value],
            RawAnyOrList::Many(values) => values,
        };

        if values.iter().any(|v| v == "*") {
            Self::Any
        } else {
            Self::List(values)
        }
    }
}
