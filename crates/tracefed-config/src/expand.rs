//! `${VAR}` expansion for config files, applied before YAML parsing when the
//! operator opts in on the command line.

use regex::{Captures, Regex};
use std::sync::OnceLock;

static VAR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn var_pattern() -> &'static Regex {
    VAR_PATTERN.get_or_init(|| {
        // ${VAR} or ${VAR:default}; $$ escapes a literal dollar sign.
        Regex::new(r"\$(\$)|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}")
            .expect("static pattern compiles")
    })
}

/// Substitute `${VAR}` references with values from the process environment.
/// `${VAR:default}` falls back to `default` when VAR is unset; a plain
/// `${VAR}` that is unset expands to the empty string.
pub fn expand_env_vars(raw: &str) -> String {
    var_pattern()
        .replace_all(raw, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = &caps[2];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => caps.get(3).map(|d| d.as_str().to_string()).unwrap_or_default(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_set_variable() {
        std::env::set_var("TRACEFED_TEST_TENANT", "team-a");
        assert_eq!(
            expand_env_vars("tenant_id: ${TRACEFED_TEST_TENANT}"),
            "tenant_id: team-a"
        );
    }

    #[test]
    fn unset_variable_uses_default_or_empty() {
        std::env::remove_var("TRACEFED_TEST_UNSET");
        assert_eq!(
            expand_env_vars("a: ${TRACEFED_TEST_UNSET:fallback}"),
            "a: fallback"
        );
        assert_eq!(expand_env_vars("a: ${TRACEFED_TEST_UNSET}"), "a: ");
    }

    #[test]
    fn double_dollar_escapes() {
        assert_eq!(expand_env_vars("password: $$literal"), "password: $literal");
    }

    #[test]
    fn plain_text_untouched() {
        let yaml = "endpoint: http://localhost:3200";
        assert_eq!(expand_env_vars(yaml), yaml);
    }
}
