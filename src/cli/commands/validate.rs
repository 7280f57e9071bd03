//! `phenology validate`
//!
//! Checks every file and reports all of them before failing.

use std::path::Path;

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, Validator};
use crate::error::{ConfigError, PhenologyError, ValidationIssue};

struct FileReport<'a> {
    path: &'a Path,
    issues: Vec<ValidationIssue>,
    /// Set when the file could not be read or parsed at all
    failure: Option<String>,
}

impl FileReport<'_> {
    fn is_valid(&self) -> bool {
        self.failure.is_none() && !self.issues.iter().any(ValidationIssue::is_error)
    }
}

/// Validates crop configuration files.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationFailed`] if any file is invalid.
pub fn run(args: &ValidateArgs) -> Result<(), PhenologyError> {
    let loader = ConfigLoader::default();
    let reports: Vec<FileReport<'_>> = args
        .files
        .iter()
        .map(|path| check(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => print_human(&reports),
        OutputFormat::Json => print_json(&reports)?,
    }

    let failed = reports.iter().filter(|r| !r.is_valid()).count();
    if failed > 0 {
        return Err(ConfigError::ValidationFailed { count: failed }.into());
    }
    Ok(())
}

fn check<'a>(loader: &ConfigLoader, path: &'a Path, strict: bool) -> FileReport<'a> {
    tracing::info!(file = %path.display(), "validating configuration");
    let (config, warnings) = match loader.parse_unvalidated(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            return FileReport {
                path,
                issues: Vec::new(),
                failure: Some(e.to_string()),
            };
        }
    };

    let mut result = Validator::new().validate(&config, loader.limits());
    result.warnings.extend(warnings.into_iter().map(|w| {
        ValidationIssue::warning(w.location.unwrap_or_default(), w.message)
    }));
    if strict {
        result = result.strict();
    }
    FileReport {
        path,
        issues: result.issues().cloned().collect(),
        failure: None,
    }
}

fn print_human(reports: &[FileReport<'_>]) {
    for report in reports {
        let mark = if report.is_valid() { "ok" } else { "FAILED" };
        println!("{}: {mark}", report.path.display());
        if let Some(failure) = &report.failure {
            println!("  {failure}");
        }
        for issue in &report.issues {
            println!("  {issue}");
        }
    }
}

fn print_json(reports: &[FileReport<'_>]) -> Result<(), PhenologyError> {
    let files: Vec<_> = reports
        .iter()
        .map(|r| {
            json!({
                "file": r.path.display().to_string(),
                "valid": r.is_valid(),
                "failure": r.failure,
                "issues": r.issues.iter().map(|i| json!({
                    "path": i.path,
                    "message": i.message,
                    "severity": i.severity.to_string(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "files": files }))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const NO_TARGET: &str = "crop: { name: pea }\nphases:\n  \
        - { name: Growing, start: Sowing, end: Ripe, type: generic }\n  \
        - { name: Ready, start: Ripe, end: Unused, type: terminal }\n";

    #[test]
    fn warnings_only_fail_when_strict() {
        let f = file(NO_TARGET);
        let loader = ConfigLoader::default();

        let relaxed = check(&loader, f.path(), false);
        assert!(relaxed.is_valid());
        assert_eq!(relaxed.issues.len(), 1);

        let strict = check(&loader, f.path(), true);
        assert!(!strict.is_valid());
    }

    #[test]
    fn unreadable_file_is_a_failure() {
        let report = check(&ConfigLoader::default(), Path::new("/no/such/crop.yaml"), false);
        assert!(!report.is_valid());
        assert!(report.failure.unwrap().contains("not found"));
    }
}
