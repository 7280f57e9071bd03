//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::NaiveDate;
use phenology::config::{ConfigLoader, PhenologyConfig};
use phenology::phenology::Phenology;

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Loads and validates a fixture crop.
pub fn load_crop(name: &str) -> PhenologyConfig {
    let loaded = ConfigLoader::default()
        .load(&fixture(name))
        .unwrap_or_else(|e| panic!("fixture {name} should load: {e}"));
    (*loaded.config).clone()
}

/// A crop sown on 2024-04-01, before its first day.
pub fn sown(name: &str) -> Phenology {
    let mut p = Phenology::new(&load_crop(name)).expect("fixture has phases");
    p.sow(date(1), 1.0);
    p
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).expect("valid April date")
}

/// Runs one full day with a constant thermal time.
pub fn day(p: &mut Phenology, thermal_time: f64) -> Vec<phenology::phenology::Notification> {
    p.start_of_day();
    p.do_phenology(&thermal_time).expect("day step should succeed")
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Runs the `phenology` binary with `args`.
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phenology"))
        .args(args)
        .env_remove("PHENOLOGY_LOG_LEVEL")
        .env_remove("PHENOLOGY_CONFIG")
        .env_remove("PHENOLOGY_SCHEDULE")
        .output()
        .expect("failed to spawn phenology")
}
