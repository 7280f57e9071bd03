#![no_main]

use libfuzzer_sys::fuzz_target;
use phenology::config::PhenologyConfig;
use phenology::phenology::Phenology;

const CROP: &str = "crop: { name: fuzz }
phases:
  - { name: Germinating, start: Sowing, end: Germination, type: generic, target: 50 }
  - { name: Emerging, start: Germination, end: Emergence, type: generic, target: 80 }
  - { name: Growing, start: Emergence, end: Flowering, type: generic, target: 200, emerged: true }
  - { name: Regrow, start: Flowering, end: Regrown, type: redirect, goto: Growing }
  - { name: Ready, start: Regrown, end: Unused, type: terminal }
rewind:
  above_ground: { start: Emergence, end: Regrown }
  min_phase_index: 2
";

// Each input byte pair drives one day: the first picks an action, the
// second scales the thermal time.
fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_yaml::from_str::<PhenologyConfig>(CROP) else {
        return;
    };
    let Ok(mut p) = Phenology::new(&config) else {
        return;
    };
    p.commence();

    for pair in data.chunks_exact(2) {
        let tt = f64::from(pair[1]) * 2.0;
        p.start_of_day();
        let _ = match pair[0] % 8 {
            0 => p.remove_biomass(f64::from(pair[1]) / 255.0),
            1 => p.set_to_stage(f64::from(pair[1]) / 40.0),
            2 => p.set_phase("Regrow"),
            _ => p.do_phenology(&tt),
        };
        assert!(p.current_phase_index() < p.phases().len());
        assert!(p.accumulated_thermal_time() > -1e-9);
    }
});
