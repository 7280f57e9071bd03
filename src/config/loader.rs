//! Configuration loader
//!
//! Pipeline for crop configurations:
//! 1. Size-limit check
//! 2. Read, strip UTF-8 BOM
//! 3. Environment variable expansion (pre-parse, on raw text)
//! 4. YAML parsing and empty-document check
//! 5. Deserialization to [`PhenologyConfig`]
//! 6. Validation
//! 7. Freeze with `Arc`
//!
//! Schedules go through steps 1-5 only.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::config::validation::Validator;
use crate::error::ConfigError;
use phenology_core::config::{PhenologyConfig, ScheduleConfig};

/// `$$`, or `${...}` with an optional closing brace (absent means unclosed).
static ENV_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$|\$\{([^}\n]*)(\})?").expect("valid regex"));

// ============================================================================
// Public API
// ============================================================================

/// Limits guarding against oversized configurations.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of phases
    pub max_phases: usize,

    /// Maximum file size in bytes
    pub max_config_size: u64,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_phases: env_or("PHENOLOGY_MAX_PHASES", 100),
            max_config_size: env_or("PHENOLOGY_MAX_CONFIG_SIZE", 10 * 1024 * 1024),
        }
    }
}

/// A loaded, validated and frozen configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The configuration
    pub config: Arc<PhenologyConfig>,

    /// Warnings from substitution and validation
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal problem found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message
    pub message: String,

    /// Where it was found
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Loads crop configurations and schedules.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> &ConfigLimits {
        &self.limits
    }

    /// Loads and validates a crop configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, if parsing or
    /// substitution fails, or if validation reports any error.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = self.read(path)?;
        self.load_from_str(&raw, path)
    }

    /// Runs the crop pipeline on in-memory text; `origin` names it in
    /// errors.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus the file checks.
    pub fn load_from_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let (config, mut warnings) = self.parse::<PhenologyConfig>(raw, origin)?;

        let result = Validator::new().validate(&config, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors.into_iter().chain(result.warnings).collect(),
            });
        }
        for issue in result.warnings {
            warn!(path = %issue.path, "{}", issue.message);
            warnings.push(LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            });
        }

        debug!(
            path = %origin.display(),
            crop = %config.crop.name,
            phases = config.phases.len(),
            "configuration loaded"
        );
        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }

    /// Parses a crop configuration without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading, substitution or parsing fails.
    pub fn parse_unvalidated(
        &self,
        path: &Path,
    ) -> Result<(PhenologyConfig, Vec<LoadWarning>), ConfigError> {
        let raw = self.read(path)?;
        self.parse(&raw, path)
    }

    /// Loads a daily schedule file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading, substitution or parsing fails.
    pub fn load_schedule(&self, path: &Path) -> Result<ScheduleConfig, ConfigError> {
        let raw = self.read(path)?;
        let (schedule, warnings) = self.parse::<ScheduleConfig>(&raw, path)?;
        for warning in &warnings {
            warn!("{warning}");
        }
        Ok(schedule)
    }

    fn read(&self, path: &Path) -> Result<String, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > self.limits.max_config_size {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.limits.max_config_size,
            });
        }
        std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })
    }

    #[allow(clippy::unused_self)]
    fn parse<T: DeserializeOwned>(
        &self,
        raw: &str,
        origin: &Path,
    ) -> Result<(T, Vec<LoadWarning>), ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let (substituted, warnings) = substitute_env(raw, origin)?;

        let root: Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;
        if root.is_null() {
            return Err(ConfigError::EmptyDocument {
                path: origin.to_path_buf(),
            });
        }

        let value: T = serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;
        Ok((value, warnings))
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Expands environment references in raw text.
///
/// - `${VAR}`: value, or empty string with a warning if unset
/// - `${VAR:-default}`: value, or `default` if unset
/// - `${VAR:?message}`: value, or an error carrying `message`
/// - `$$`: literal `$`
fn substitute_env(raw: &str, origin: &Path) -> Result<(String, Vec<LoadWarning>), ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut warnings = Vec::new();
    let mut last = 0;

    for caps in ENV_REF_RE.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&raw[last..whole.start()]);
        last = whole.end();

        if whole.as_str() == "$$" {
            out.push('$');
            continue;
        }
        let spec = caps.get(1).map_or("", |m| m.as_str());
        if caps.get(2).is_none() {
            return Err(ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: Some(line_of(raw, whole.start())),
                message: format!("unclosed environment variable reference: ${{{spec}"),
            });
        }

        let (name, fallback) = split_spec(spec);
        if name.is_empty() {
            return Err(ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: Some(line_of(raw, whole.start())),
                message: "empty environment variable reference".to_string(),
            });
        }

        match (std::env::var(name), fallback) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Fallback::Default(default)) => out.push_str(default),
            (Err(_), Fallback::Required(message)) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: name.to_string(),
                    location: if message.is_empty() {
                        origin.display().to_string()
                    } else {
                        message.to_string()
                    },
                });
            }
            (Err(_), Fallback::Empty) => warnings.push(LoadWarning {
                message: format!("environment variable '{name}' is not set, using empty string"),
                location: Some(origin.display().to_string()),
            }),
        }
    }

    out.push_str(&raw[last..]);
    Ok((out, warnings))
}

enum Fallback<'a> {
    Empty,
    Default(&'a str),
    Required(&'a str),
}

fn split_spec(spec: &str) -> (&str, Fallback<'_>) {
    if let Some((name, default)) = spec.split_once(":-") {
        (name, Fallback::Default(default))
    } else if let Some((name, message)) = spec.split_once(":?") {
        (name, Fallback::Required(message))
    } else {
        (spec, Fallback::Empty)
    }
}

fn line_of(raw: &str, offset: usize) -> usize {
    raw[..offset].matches('\n').count() + 1
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const WHEAT: &str = r"
crop:
  name: wheat
phases:
  - { name: Germinating, start: Sowing, end: Germination, type: generic, target: 50 }
  - { name: Emerging, start: Germination, end: Emergence, type: generic, target: 80, emerged: true }
  - { name: Ready, start: Emergence, end: Unused, type: terminal, emerged: true }
";

    fn origin() -> PathBuf {
        PathBuf::from("wheat.yaml")
    }

    #[test]
    fn test_load_from_str() {
        let result = ConfigLoader::default()
            .load_from_str(WHEAT, &origin())
            .unwrap();
        assert_eq!(result.config.crop.name, "wheat");
        assert_eq!(result.config.phases.len(), 3);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_bom_is_stripped() {
        let raw = format!("\u{feff}{WHEAT}");
        assert!(ConfigLoader::default().load_from_str(&raw, &origin()).is_ok());
    }

    #[test]
    fn test_empty_document() {
        let err = ConfigLoader::default()
            .load_from_str("# nothing here\n", &origin())
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyDocument { .. }));
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = ConfigLoader::default()
            .load_from_str("crop:\n  name: [unclosed\n", &origin())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { line: Some(_), .. }));
    }

    #[test]
    fn test_validation_error_reported() {
        let raw = WHEAT.replace("end: Germination", "end: Germ");
        let err = ConfigLoader::default().load_from_str(&raw, &origin()).unwrap_err();
        let ConfigError::ValidationError { errors, .. } = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.iter().any(|e| e.path == "phases[1].start"));
    }

    #[test]
    fn test_env_substitution() {
        // Variables unlikely to exist in any environment.
        let raw = "a: ${PHENOLOGY_TEST_UNSET_A:-12.5}\nb: $$HOME\nc: x${PHENOLOGY_TEST_UNSET_B}y\n";
        let (out, warnings) = substitute_env(raw, &origin()).unwrap();
        assert_eq!(out, "a: 12.5\nb: $HOME\nc: xy\n");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("PHENOLOGY_TEST_UNSET_B"));
    }

    #[test]
    fn test_env_required() {
        let err = substitute_env("x: ${PHENOLOGY_TEST_UNSET_C:?target needed}", &origin())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarNotSet { ref var, ref location }
                if var == "PHENOLOGY_TEST_UNSET_C" && location == "target needed"
        ));
    }

    #[test]
    fn test_env_unclosed() {
        let err = substitute_env("a: 1\nb: ${OOPS\n", &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { line: Some(2), .. }));
    }

    #[test]
    fn test_load_file_and_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WHEAT.as_bytes()).unwrap();

        assert!(ConfigLoader::default().load(file.path()).is_ok());

        let tiny = ConfigLoader::new(ConfigLimits {
            max_phases: 100,
            max_config_size: 16,
        });
        assert!(matches!(
            tiny.load(file.path()),
            Err(ConfigError::TooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::default()
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_load_schedule() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"start_date: 2024-04-01\ndays:\n  - thermal_time: 10\n")
            .unwrap();
        let schedule = ConfigLoader::default().load_schedule(file.path()).unwrap();
        assert_eq!(schedule.days.len(), 1);
    }
}
