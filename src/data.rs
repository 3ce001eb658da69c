use crate::aggregate::{clean_code, validate_records};
use crate::config::AppConfig;
use crate::types::{ProvinceBoundary, SchoolRecord};
use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, Trim};
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Property names that may hold the province id, in priority order.
pub const ID_PROPERTIES: [&str; 3] = ["kode", "kdprovinsi", "id"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("boundary file {0:?} has no extension")]
    MissingExtension(std::path::PathBuf),
    #[error("unsupported geometry format: {0}")]
    UnsupportedFormat(String),
    #[error("GeoJSON must be a FeatureCollection")]
    NotFeatureCollection,
}

/// Everything the dashboard needs, loaded up front.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SchoolRecord>,
    pub boundaries: Vec<ProvinceBoundary>,
}

/// Load the school table and the province boundaries. Either failing aborts the load.
pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    // 1. Load CSV Data
    let mut records = load_school_records(&config.input.school_csv)?;
    let offending = validate_records(&mut records, config.validation.count_policy);
    if offending > 0 {
        warn!("{} rows report more schools with internet than schools", offending);
    }
    info!("Loaded {} school rows", records.len());

    // 2. Load Geometry (Shapefile or GeoJSON)
    let boundaries = load_boundaries(&config.input.boundaries)?;
    info!("Loaded {} province boundaries", boundaries.len());

    Ok(Dataset { records, boundaries })
}

pub fn load_school_records(path: &Path) -> Result<Vec<SchoolRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: SchoolRecord = result
            .with_context(|| format!("Failed to parse row {} of {:?}", line + 1, path))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_boundaries(path: &Path) -> Result<Vec<ProvinceBoundary>> {
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| LoadError::MissingExtension(path.to_path_buf()))?;

    match extension.as_str() {
        "shp" => load_shapefile_boundaries(path),
        "json" | "geojson" => load_geojson_boundaries(path),
        _ => Err(LoadError::UnsupportedFormat(extension).into()),
    }
}

fn load_shapefile_boundaries(path: &Path) -> Result<Vec<ProvinceBoundary>> {
    use shapefile::dbase::FieldValue;

    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut boundaries = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let raw_code = ID_PROPERTIES.iter().find_map(|name| match record.get(name) {
            Some(FieldValue::Character(Some(s))) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(FieldValue::Numeric(Some(n))) if *n != 0.0 => Some(n.to_string()),
            _ => None,
        });
        let raw_code = match raw_code {
            Some(code) => code,
            None => {
                debug!("Skipping shape without a province id");
                continue;
            }
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // Skip non-polygon shapes
        };

        boundaries.push(ProvinceBoundary {
            code: clean_code(Some(&raw_code)),
            raw_code,
            geometry,
        });
    }

    Ok(boundaries)
}

fn load_geojson_boundaries(path: &Path) -> Result<Vec<ProvinceBoundary>> {
    use std::io::BufReader;
    use geojson::GeoJson;

    debug!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    boundaries_from_geojson(geojson)
}

pub fn boundaries_from_geojson(geojson: geojson::GeoJson) -> Result<Vec<ProvinceBoundary>> {
    let collection = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(LoadError::NotFeatureCollection.into()),
    };

    let mut boundaries = Vec::new();

    for feature in collection.features {
        let raw_code = match feature.properties.as_ref().and_then(province_id) {
            Some(code) => code,
            None => {
                debug!("Skipping feature without a province id");
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geo) => {
                let valid_geo: geo::Geometry<f64> = geo.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        boundaries.push(ProvinceBoundary {
            code: clean_code(Some(&raw_code)),
            raw_code,
            geometry,
        });
    }

    Ok(boundaries)
}

/// First non-empty id under `kode`, `kdprovinsi` or `id`.
fn province_id(props: &geojson::JsonObject) -> Option<String> {
    ID_PROPERTIES.iter().find_map(|name| match props.get(*name) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
