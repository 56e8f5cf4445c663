//! `geo schema` command implementation.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use geo_data::{GeoData, GeoDataConfig};

/// Arguments for the `geo schema` command.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Output JSON instead of one line per type.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Run the schema command.
///
/// # Errors
///
/// Returns an error if the subgraph cannot be reached.
pub async fn run(config: &GeoDataConfig, args: &SchemaArgs) -> Result<()> {
    let geo = GeoData::from_config(config).await?;
    let entities: Vec<_> = geo.schema().entities().collect();

    let mut stdout = std::io::stdout().lock();
    if args.json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&entities)?)?;
    } else {
        for entity in entities {
            writeln!(stdout, "{}\t{}", entity.name, entity.fields.join(", "))?;
        }
    }
    stdout.flush()?;
    Ok(())
}
