mod common;

use std::io::Write;

use common::fixture;
use phenology::config::{ConfigLimits, ConfigLoader, CriterionConfig};
use phenology::error::ConfigError;

#[test]
fn fixtures_load() {
    let loader = ConfigLoader::default();
    for name in ["wheat.yaml", "lucerne.yaml", "maize_counters.yaml"] {
        let result = loader.load(&fixture(name));
        assert!(result.is_ok(), "{name}: {:?}", result.err());
    }

    let wheat = loader.load(&fixture("wheat.yaml")).unwrap();
    assert_eq!(wheat.config.phases.len(), 6);
    assert!(wheat.config.phases[3].stressed);
    let rewind = wheat.config.rewind.as_ref().unwrap();
    assert_eq!(rewind.min_phase_index, 2);
    assert!(rewind.function.is_none());
}

#[test]
fn invalid_fixture_reports_every_problem() {
    let err = ConfigLoader::default()
        .load(&fixture("invalid.yaml"))
        .unwrap_err();
    let ConfigError::ValidationError { errors, .. } = err else {
        panic!("expected validation error, got {err}");
    };
    let paths: Vec<&str> = errors
        .iter()
        .filter(|e| e.is_error())
        .map(|e| e.path.as_str())
        .collect();
    assert!(paths.contains(&"crop.name"));
    assert!(paths.contains(&"phases[0].target"));
    assert!(paths.contains(&"phases[1].start"));
    assert!(paths.contains(&"phases[2].goto"));
}

#[test]
fn environment_defaults_fill_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "crop: {{ name: \"${{PHENOLOGY_TEST_CROP_NAME_UNSET:-barley}}\" }}\n\
         phases:\n  \
         - {{ name: Growing, start: Sowing, end: Ripe, type: generic, target: ${{PHENOLOGY_TEST_TARGET_UNSET:-75}} }}\n  \
         - {{ name: Ready, start: Ripe, end: Unused, type: terminal }}\n"
    )
    .unwrap();

    let loaded = ConfigLoader::default().load(file.path()).unwrap();
    assert_eq!(loaded.config.crop.name, "barley");
    assert!(matches!(
        loaded.config.phases[0].criterion,
        CriterionConfig::Generic { target: Some(t) } if (t - 75.0).abs() < f64::EPSILON
    ));
}

#[test]
fn json_configs_are_accepted() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"crop": {"name": "rye"}, "phases": [
            {"name": "Growing", "start": "Sowing", "end": "Ripe", "type": "generic", "target": 10},
            {"name": "Ready", "start": "Ripe", "end": "Unused", "type": "terminal"}
        ]}"#,
    )
    .unwrap();
    let loaded = ConfigLoader::default().load(file.path()).unwrap();
    assert_eq!(loaded.config.crop.name, "rye");
}

#[test]
fn phase_limit_applies() {
    let loader = ConfigLoader::new(ConfigLimits {
        max_phases: 3,
        max_config_size: 1024 * 1024,
    });
    let err = loader.load(&fixture("wheat.yaml")).unwrap_err();
    assert!(err.to_string().contains("validation failed"));
}

#[test]
fn schedule_fixture_loads() {
    let schedule = ConfigLoader::default()
        .load_schedule(&fixture("schedule.yaml"))
        .unwrap();
    assert_eq!(schedule.days.len(), 10);
    assert_eq!(schedule.days[8].actions.len(), 1);
    assert_eq!(schedule.sow_date(), schedule.start_date);
}
