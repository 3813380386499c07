use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flightheight::analysis::{FlightHeightAnalyzer, FlightHeightResult};
use flightheight::gsd::{preset, GsdReference, RasterMetadata, PRESETS};
use flightheight::{report, Config, Coordinate, Error, MetadataRecord, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drone flight height above terrain", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one image position
    Analyze(AnalyzeArgs),
    /// Analyze every row of a CSV file and write a CSV report
    Batch {
        /// CSV with filename,latitude,longitude,gps_altitude_m
        #[arg(value_name = "CSV")]
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Check which elevation sources are reachable
    Status,
    /// List built-in camera presets
    Presets,
}

#[derive(ClapArgs, Debug)]
struct AnalyzeArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// GPS altitude in meters
    #[arg(long, allow_negative_numbers = true)]
    alt: f64,
    /// Image name used in the output
    #[arg(long, default_value = "image")]
    name: String,

    /// Camera preset for GSD recalculation
    #[arg(long)]
    preset: Option<String>,
    /// Custom reference height in meters
    #[arg(long, requires = "reference_gsd")]
    reference_height: Option<f64>,
    /// Custom reference GSD in cm/px
    #[arg(long, requires = "reference_height")]
    reference_gsd: Option<f64>,
    /// Raster pixel width in CRS units; triggers GSD recalculation
    #[arg(long)]
    pixel_size: Option<f64>,
    /// Raster pixel height in CRS units (defaults to the width)
    #[arg(long)]
    pixel_size_y: Option<f64>,
    /// Meters per CRS unit
    #[arg(long)]
    crs_scale: Option<f64>,
    /// EPSG code of the raster CRS
    #[arg(long)]
    epsg: Option<u16>,
    /// Raster origin as X,Y in CRS units
    #[arg(long, value_delimiter = ',', num_args = 2, allow_negative_numbers = true)]
    origin: Option<Vec<f64>>,

    /// Manual flight height, overrides everything else
    #[arg(long)]
    manual_height: Option<String>,
}

impl AnalyzeArgs {
    fn reference(&self) -> Result<Option<GsdReference>> {
        if let Some(label) = &self.preset {
            return preset(label)
                .map(|p| Some(p.reference()))
                .ok_or_else(|| Error::UnknownPreset(label.clone()));
        }
        match (self.reference_height, self.reference_gsd) {
            (Some(height), Some(gsd)) => Ok(Some(GsdReference::custom("Custom", height, gsd)?)),
            _ => Ok(None),
        }
    }

    fn raster(&self) -> Option<RasterMetadata> {
        self.pixel_size.map(|px| RasterMetadata {
            pixel_size_x: px,
            pixel_size_y: self.pixel_size_y.unwrap_or(px),
            coordinate_reference_system_scale: self.crs_scale,
            epsg: self.epsg,
            origin: self.origin.as_deref().and_then(|o| match o {
                [x, y] => Some((*x, *y)),
                _ => None,
            }),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;
    let analyzer = FlightHeightAnalyzer::from_config(&config)?;

    match cli.command {
        Command::Analyze(args) => {
            let result = analyze(&analyzer, &args).await?;
            println!("{}", report::to_json(&result)?);
        }
        Command::Batch { input, output } => {
            let start = std::time::Instant::now();
            let (records, skipped) = report::read_batch_csv(BufReader::new(File::open(&input)?))?;
            for row in &skipped {
                warn!(row = row.row, reason = %row.reason, "skipping row");
            }

            let mut results = Vec::with_capacity(records.len());
            for record in &records {
                match analyzer.analyze(record).await {
                    Ok(result) => results.push(result),
                    Err(e) => warn!(image = %record.filename, error = %e, "skipping image"),
                }
            }

            match output {
                Some(path) => report::write_csv(File::create(&path)?, &results)?,
                None => report::write_csv(io::stdout().lock(), &results)?,
            }
            info!(analyzed = results.len(), elapsed = ?start.elapsed(), "batch finished");
        }
        Command::Status => {
            let status = analyzer.aggregator().check_connectivity().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Presets => {
            for p in PRESETS {
                println!("{:<24} {:>6.1} m  {:>5.2} cm/px", p.label, p.reference_height_m, p.reference_gsd_cm_per_px);
            }
        }
    }

    Ok(())
}

async fn analyze(analyzer: &FlightHeightAnalyzer, args: &AnalyzeArgs) -> Result<FlightHeightResult> {
    let record = MetadataRecord::new(args.name.clone(), Coordinate::new(args.lat, args.lon)?, args.alt);
    let mut result = analyzer.analyze(&record).await?;

    if let Some(raster) = args.raster() {
        let reference = args.reference()?.ok_or_else(|| {
            Error::InvalidInput("GSD recalculation needs --preset or --reference-height/--reference-gsd".to_string())
        })?;
        result = analyzer.recalculate_from_raster(&result, &raster, &reference)?;
    } else if result.prompts_recalculation() {
        warn!(
            height = ?result.computed_height_m(),
            "negative height; rerun with --pixel-size and --preset, or set --manual-height"
        );
    }

    if let Some(manual) = &args.manual_height {
        result = analyzer.override_height_str(&result, manual)?;
    }

    Ok(result)
}
