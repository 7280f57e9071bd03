//! `phenology stages`

use serde_json::json;

use crate::cli::args::{OutputFormat, StagesArgs};
use crate::config::ConfigLoader;
use crate::error::PhenologyError;
use crate::phenology::Phenology;

/// Prints the phase table of a crop.
///
/// # Errors
///
/// Fails if the configuration cannot be loaded.
pub fn run(args: &StagesArgs) -> Result<(), PhenologyError> {
    let loaded = ConfigLoader::default().load(&args.config)?;
    let phenology = Phenology::new(&loaded.config)?;
    println!("{}", render(&phenology, args.format)?);
    Ok(())
}

fn render(phenology: &Phenology, format: OutputFormat) -> Result<String, PhenologyError> {
    let rows = phenology.phase_table();
    match format {
        OutputFormat::Json => {
            let stages: Vec<_> = phenology
                .stage_codes()
                .into_iter()
                .zip(phenology.stage_names())
                .map(|(code, name)| json!({ "code": code, "name": name }))
                .collect();
            Ok(serde_json::to_string_pretty(&json!({
                "crop": phenology.crop_name(),
                "phases": rows,
                "stages": stages,
            }))?)
        }
        OutputFormat::Human => {
            let mut out = format!(
                "{}\n{:>3}  {:<24}  {:<20}  {:<20}  {}",
                phenology.crop_name(),
                "#",
                "phase",
                "start",
                "end",
                "criterion"
            );
            for row in rows {
                out.push_str(&format!(
                    "\n{:>3}  {:<24}  {:<20}  {:<20}  {}",
                    row.number, row.name, row.start, row.end, row.criterion
                ));
            }
            Ok(out)
        }
    }
}
