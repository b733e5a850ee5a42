//! Denial Map - mortgage denial-rate choropleths by county
//!
//! ```bash
//! denial_map --loans hmda_2022.csv --counties counties.geojson --out-dir maps
//! denial_map --config run.json --join-direction not-latino
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use denial_map::charts::MapView;
use denial_map::{JoinDirection, Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "denial_map")]
#[command(about = "Render mortgage denial-rate disparities by county", long_about = None)]
struct Cli {
    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Loan application CSV
    #[arg(short, long)]
    loans: Option<PathBuf>,

    /// County boundaries (GeoJSON)
    #[arg(long)]
    counties: Option<PathBuf>,

    /// Directory for the CSV, GeoJSON and PNG outputs
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Which ethnicity drives the cross-ethnicity merge
    #[arg(long, value_enum)]
    join_direction: Option<JoinDirection>,

    /// Map views to render (repeatable)
    #[arg(long = "view", value_enum)]
    views: Vec<MapView>,

    /// Canonical county code width
    #[arg(long)]
    code_width: Option<usize>,

    /// Skip rendering the PNG maps
    #[arg(long)]
    no_render: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(loans) = self.loans {
            config.loans_path = loans;
        }
        if let Some(counties) = self.counties {
            config.counties_path = counties;
        }
        if let Some(out_dir) = self.out_dir {
            config.output_dir = out_dir;
        }
        if let Some(direction) = self.join_direction {
            config.join_direction = direction;
        }
        if !self.views.is_empty() {
            config.views = self.views;
        }
        if let Some(width) = self.code_width {
            config.code_width = width;
        }
        if self.no_render {
            config.render = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Cli::parse().into_config()?;
    info!(
        "loans={} counties={} out={} join={:?}",
        config.loans_path.display(),
        config.counties_path.display(),
        config.output_dir.display(),
        config.join_direction
    );

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
