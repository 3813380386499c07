//! Result presentation: JSON views and CSV reports

use std::io::{Read, Write};
use serde::{Deserialize, Serialize};

use crate::analysis::{FlightHeightResult, WarningKind};
use crate::error::Result;
use crate::metadata::MetadataRecord;
use crate::types::Coordinate;

/// What a user-facing surface shows for one result
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub image_id: String,
    pub state: String,
    pub effective_height_m: Option<f64>,
    pub computed_height_m: Option<f64>,
    pub gps_altitude_m: f64,
    pub terrain_elevation_m: Option<f64>,
    pub source_count: usize,
    pub sources: Vec<String>,
    pub failed_sources: Vec<String>,
    pub is_manual_override: bool,
    pub warnings: Vec<String>,
    /// The UI should offer GSD recalculation or manual entry
    pub recalculation_prompt: bool,
    pub result: FlightHeightResult,
}

impl From<&FlightHeightResult> for ResultView {
    fn from(result: &FlightHeightResult) -> Self {
        let terrain = result.terrain_estimate();
        Self {
            image_id: result.image_id().to_string(),
            state: result.state().to_string(),
            effective_height_m: result.effective_height_m(),
            computed_height_m: result.computed_height_m(),
            gps_altitude_m: result.gps_altitude_m(),
            terrain_elevation_m: terrain.elevation_meters,
            source_count: terrain.source_count,
            sources: terrain.source_names().into_iter().map(str::to_string).collect(),
            failed_sources: terrain
                .failed_sources
                .iter()
                .map(|s| match s.error {
                    Some(kind) => format!("{} ({})", s.source_name, kind),
                    None => s.source_name.clone(),
                })
                .collect(),
            is_manual_override: result.is_manual_override(),
            warnings: result.warnings().iter().map(|w| w.message().to_string()).collect(),
            recalculation_prompt: result.prompts_recalculation(),
            result: result.clone(),
        }
    }
}

/// Pretty JSON for one result
pub fn to_json(result: &FlightHeightResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ResultView::from(result))?)
}

/// One row of the CSV report
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    filename: &'a str,
    latitude: f64,
    longitude: f64,
    gps_altitude_m: f64,
    terrain_elevation_m: Option<f64>,
    terrain_sources: String,
    computed_height_m: Option<f64>,
    effective_height_m: Option<f64>,
    manual_override: bool,
    state: &'static str,
    warnings: String,
}

fn warning_code(warning: &WarningKind) -> &'static str {
    match warning {
        WarningKind::NegativeHeight => "negative_height",
        WarningKind::AboveRegulatoryLimit => "above_limit",
        WarningKind::ElevationUnavailable => "elevation_unavailable",
    }
}

/// Writes a CSV report, one row per result
pub fn write_csv<W: Write>(writer: W, results: &[FlightHeightResult]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        let terrain = result.terrain_estimate();
        csv_writer.serialize(ReportRow {
            filename: result.image_id().as_str(),
            latitude: terrain.coordinate.latitude(),
            longitude: terrain.coordinate.longitude(),
            gps_altitude_m: result.gps_altitude_m(),
            terrain_elevation_m: terrain.elevation_meters,
            terrain_sources: terrain.source_names().join(";"),
            computed_height_m: result.computed_height_m(),
            effective_height_m: result.effective_height_m(),
            manual_override: result.is_manual_override(),
            state: result.state().name(),
            warnings: result.warnings().iter().map(warning_code).collect::<Vec<_>>().join(";"),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Row of a batch input file
#[derive(Debug, Deserialize)]
struct BatchRow {
    filename: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    gps_altitude_m: Option<f64>,
    #[serde(default)]
    capture_timestamp: Option<String>,
}

/// A batch row that could not be turned into a record
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based data row
    pub row: usize,
    pub reason: String,
}

/// Reads metadata records from CSV with columns
/// `filename,latitude,longitude,gps_altitude_m[,capture_timestamp]`.
///
/// Rows with an invalid coordinate are skipped and reported; rows with
/// missing fields become records without position or altitude so the
/// analyzer reports them.
pub fn read_batch_csv<R: Read>(reader: R) -> Result<(Vec<MetadataRecord>, Vec<SkippedRow>)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (index, row) in csv_reader.deserialize::<BatchRow>().enumerate() {
        let row_number = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                skipped.push(SkippedRow { row: row_number, reason: e.to_string() });
                continue;
            }
        };

        let coordinate = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
                Ok(c) => Some(c),
                Err(e) => {
                    skipped.push(SkippedRow { row: row_number, reason: e.to_string() });
                    continue;
                }
            },
            _ => None,
        };

        records.push(MetadataRecord {
            filename: row.filename,
            coordinate,
            gps_altitude_m: row.gps_altitude_m,
            capture_timestamp: row.capture_timestamp,
        });
    }

    Ok((records, skipped))
}
