// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{CommandConfig, ConfigFile, RawConfigFile};
use crate::errors::{CmdrunnerError, Result};
use crate::exec::MAX_PATTERN_WAIT;
use crate::exec::patterns::compile_full_line;
use crate::types::RegistrationKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CmdrunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_registrations(cfg)?;
    validate_runner_section(cfg)?;
    validate_unique_ids(cfg)?;

    for (kind, id, common) in commands(cfg) {
        validate_command(kind, id, common)?;
    }
    for (id, deploy) in cfg.deploy.iter() {
        if let Some(url) = deploy.health_check_url.as_deref() {
            validate_health_url(id, url)?;
        }
        let section = format!("[deploy.{id}]");
        let health_timeout = deploy
            .health_check_timeout_seconds
            .map(|s| i64::try_from(s).unwrap_or(i64::MAX));
        validate_seconds(
            &section,
            "max_wait_for_startup_seconds",
            deploy.max_wait_for_startup_seconds,
        )?;
        validate_seconds(&section, "health_check_timeout_seconds", health_timeout)?;
    }
    Ok(())
}

fn commands(cfg: &RawConfigFile) -> Vec<(RegistrationKind, &str, &CommandConfig)> {
    let tests = cfg
        .test
        .iter()
        .map(|(id, t)| (RegistrationKind::Test, id.as_str(), &t.common));
    let builds = cfg
        .build
        .iter()
        .map(|(id, b)| (RegistrationKind::Build, id.as_str(), &b.common));
    let deploys = cfg
        .deploy
        .iter()
        .map(|(id, d)| (RegistrationKind::Deploy, id.as_str(), &d.common));
    tests.chain(builds).chain(deploys).collect()
}

fn ensure_has_registrations(cfg: &RawConfigFile) -> Result<()> {
    if cfg.test.is_empty() && cfg.build.is_empty() && cfg.deploy.is_empty() {
        return Err(CmdrunnerError::ConfigError(
            "config must contain at least one [test.<id>], [build.<id>] or [deploy.<id>] section"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_runner_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.queue_capacity == 0 {
        return Err(CmdrunnerError::ConfigError(
            "[runner].queue_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.runner.poll_interval_ms == 0 {
        return Err(CmdrunnerError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    let default_wait = cfg.runner.default_pattern_wait_seconds;
    if default_wait > MAX_PATTERN_WAIT.as_secs() {
        return Err(CmdrunnerError::ConfigError(format!(
            "[runner].default_pattern_wait_seconds must be <= {} (got {default_wait})",
            MAX_PATTERN_WAIT.as_secs()
        )));
    }
    Ok(())
}

fn validate_unique_ids(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: BTreeMap<&str, RegistrationKind> = BTreeMap::new();
    for (kind, id, _) in commands(cfg) {
        if let Some(first) = seen.insert(id, kind) {
            return Err(CmdrunnerError::ConfigError(format!(
                "registration id '{id}' is used by both [{first}.{id}] and [{kind}.{id}]"
            )));
        }
    }
    Ok(())
}

fn validate_command(kind: RegistrationKind, id: &str, common: &CommandConfig) -> Result<()> {
    if common.command.trim().is_empty() {
        return Err(CmdrunnerError::ConfigError(format!(
            "[{kind}.{id}] has an empty command"
        )));
    }
    for pattern in common.patterns() {
        compile_full_line(pattern)?;
    }
    validate_seconds(&format!("[{kind}.{id}]"), "timeout_seconds", common.timeout_seconds)
}

fn validate_seconds(section: &str, field: &str, value: Option<i64>) -> Result<()> {
    let max = MAX_PATTERN_WAIT.as_secs();
    match value {
        Some(secs) if secs > 0 && secs.unsigned_abs() > max => Err(CmdrunnerError::ConfigError(
            format!("{section}.{field} must be <= {max} (got {secs})"),
        )),
        _ => Ok(()),
    }
}

fn validate_health_url(id: &str, url: &str) -> Result<()> {
    let valid = reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !valid {
        return Err(CmdrunnerError::ConfigError(format!(
            "[deploy.{id}].health_check_url must be an absolute http(s) URL (got '{url}')"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    fn config_error(toml_src: &str) -> String {
        match parse(toml_src) {
            Err(CmdrunnerError::ConfigError(msg)) => msg,
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(config_error("").contains("at least one"));
    }

    #[test]
    fn blank_command_is_rejected() {
        let msg = config_error("[test.unit]\ncommand = \"   \"\n");
        assert!(msg.contains("[test.unit]"));
    }

    #[test]
    fn id_reused_across_kinds_is_rejected() {
        let msg = config_error(
            "[test.app]\ncommand = \"echo t\"\n[build.app]\ncommand = \"echo b\"\n",
        );
        assert!(msg.contains("'app'"));
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let msg =
            config_error("[test.t]\ncommand = \"echo\"\ntimeout_seconds = 9223372036854775807\n");
        assert!(msg.contains("[test.t].timeout_seconds"));

        let msg = config_error(
            "[deploy.web]\ncommand = \"echo\"\nmax_wait_for_startup_seconds = 99999999999\n",
        );
        assert!(msg.contains("max_wait_for_startup_seconds"));

        let msg = config_error(
            "[runner]\ndefault_pattern_wait_seconds = 99999999999\n[test.t]\ncommand = \"echo\"\n",
        );
        assert!(msg.contains("default_pattern_wait_seconds"));
    }

    #[test]
    fn negative_timeout_means_unset() {
        assert!(parse("[test.t]\ncommand = \"echo\"\ntimeout_seconds = -1\n").is_ok());
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let msg = config_error("[runner]\nqueue_capacity = 0\n[test.t]\ncommand = \"echo\"\n");
        assert!(msg.contains("queue_capacity"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = parse("[build.b]\ncommand = \"echo\"\nfailure_patterns = [\"(\"]\n").unwrap_err();
        assert!(matches!(err, CmdrunnerError::InvalidPattern { .. }));
    }

    #[test]
    fn relative_health_url_is_rejected() {
        let msg = config_error(
            "[deploy.web]\ncommand = \"echo\"\nhealth_check_url = \"/health\"\n",
        );
        assert!(msg.contains("health_check_url"));

        let msg = config_error(
            "[deploy.web]\ncommand = \"echo\"\nhealth_check_url = \"ftp://host/x\"\n",
        );
        assert!(msg.contains("http(s)"));
    }

    #[test]
    fn valid_config_keeps_defaults() {
        let cfg = parse(
            "[deploy.web]\ncommand = \"echo\"\nhealth_check_url = \"http://localhost:8080/health\"\n",
        )
        .unwrap();
        assert_eq!(cfg.runner().queue_capacity, 1024);
        let regs = cfg.registrations();
        assert_eq!(regs.len(), 1);
        assert!(regs[0].enabled);
        assert_eq!(regs[0].kind, RegistrationKind::Deploy);
    }
}
