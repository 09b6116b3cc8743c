use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// IANA zone that defines calendar days and months; system zone when unset
    #[serde(default)]
    pub time_zone: Option<String>,
}
