use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ConfigError;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `{{ env.NAME }}` or `{{ env.NAME | default("value") }}`
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw configuration text
///
/// Comment lines are copied through untouched so commented-out settings
/// never require their variables to be set.
pub(crate) fn expand_env(input: &str) -> Result<String, ConfigError> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(line.len());
    let mut cursor = 0;

    for caps in placeholder().captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };

        expanded.push_str(&line[cursor..whole.start()]);
        expanded.push_str(&resolve(&caps)?);
        cursor = whole.end();
    }

    expanded.push_str(&line[cursor..]);
    Ok(expanded)
}

fn resolve(caps: &Captures<'_>) -> Result<String, ConfigError> {
    let key = caps.get(1).map_or("", |m| m.as_str());
    let fallback = caps.get(2).map(|m| m.as_str());

    let Some(name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(ConfigError::Expand(format!("only `env.` variables are supported: `{key}`")));
    };

    match (std::env::var(name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(ConfigError::Expand(format!("environment variable not found: `{name}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "listen_address = \"127.0.0.1:8080\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_variables_on_several_lines() {
        let vars = [("SB_REDIS_URL", Some("redis://cache:6379")), ("SB_PREFIX", Some("sb"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("url = \"{{ env.SB_REDIS_URL }}\"\nkey_prefix = \"{{env.SB_PREFIX}}\"").unwrap();
            assert_eq!(result, "url = \"redis://cache:6379\"\nkey_prefix = \"sb\"");
        });
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        temp_env::with_var_unset("SB_SERVICE_KEY", || {
            let err = expand_env("service_key = \"{{ env.SB_SERVICE_KEY }}\"").unwrap_err();
            assert!(err.to_string().contains("SB_SERVICE_KEY"));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("SB_ZONE", || {
            let result = expand_env("time_zone = \"{{ env.SB_ZONE | default(\"UTC\") }}\"").unwrap();
            assert_eq!(result, "time_zone = \"UTC\"");
        });

        temp_env::with_var("SB_ZONE", Some("Asia/Shanghai"), || {
            let result = expand_env("time_zone = \"{{ env.SB_ZONE | default(\"UTC\") }}\"").unwrap();
            assert_eq!(result, "time_zone = \"Asia/Shanghai\"");
        });
    }

    #[test]
    fn other_scopes_are_rejected() {
        let err = expand_env("key = \"{{ vault.TOKEN }}\"").unwrap_err();
        assert!(err.to_string().contains("only `env.` variables"));
    }

    #[test]
    fn comments_are_not_expanded() {
        temp_env::with_var_unset("SB_UNSET", || {
            let input = "  # anon_key = \"{{ env.SB_UNSET }}\"\nenabled = true";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
