use crate::config::{Columns, DataConfig};
use crate::error::{LoadError, Result};
use geojson::{FeatureCollection, GeoJson};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// One row of the cause-of-death table
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: String,
    pub code: String,
    pub year: i32,
    /// Counts aligned with `Dataset::causes()`; NaN where the cell was not numeric
    values: Vec<f64>,
}

impl Record {
    pub fn new(name: impl Into<String>, code: impl Into<String>, year: i32, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            year,
            values,
        }
    }

    /// Raw value of the cause at `cause` (column index among the causes)
    pub fn value(&self, cause: usize) -> Option<f64> {
        self.values.get(cause).copied()
    }
}

/// The whole table, held for the lifetime of the app
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    records: Vec<Record>,
    causes: Vec<String>,
    years: Vec<i32>,
}

impl Dataset {
    pub fn new(causes: Vec<String>, records: Vec<Record>) -> Self {
        let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        Self {
            records,
            causes,
            years,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    /// Cause column names in header order
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn cause_index(&self, cause: &str) -> Option<usize> {
        self.causes.iter().position(|c| c == cause)
    }

    /// Distinct years, ascending
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Finite value of `cause` for `record`. Unknown causes and non-numeric cells are `None`.
    pub fn value(&self, record: &Record, cause: &str) -> Option<f64> {
        self.cause_index(cause)
            .and_then(|i| record.value(i))
            .filter(|v| v.is_finite())
    }

    /// The year present in the data closest to `year` (ties go to the earlier year)
    pub fn nearest_year(&self, year: i32) -> Option<i32> {
        self.years
            .iter()
            .copied()
            .min_by_key(|y| ((*y as i64 - year as i64).abs(), *y))
    }
}

/// Load the boundary collection and the table concurrently.
pub fn load(config: &DataConfig) -> Result<(FeatureCollection, Dataset)> {
    let (world, dataset) = rayon::join(
        || load_boundaries(&config.world),
        || load_records(&config.records, &config.columns),
    );
    let world = world?;
    let dataset = dataset?;

    info!(
        "Loaded {} boundary features and {} records ({} causes, years {}-{})",
        world.features.len(),
        dataset.records().len(),
        dataset.causes().len(),
        dataset.years().first().copied().unwrap_or_default(),
        dataset.years().last().copied().unwrap_or_default(),
    );

    Ok((world, dataset))
}

/// Read a GeoJSON FeatureCollection from disk
pub fn load_boundaries(path: &Path) -> Result<FeatureCollection> {
    let mut bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_boundaries(&mut bytes)
}

/// Parse a GeoJSON FeatureCollection. simd-json parses in place, hence `&mut`.
pub fn parse_boundaries(bytes: &mut [u8]) -> Result<FeatureCollection> {
    match simd_json::serde::from_slice::<GeoJson>(bytes)? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(LoadError::NotAFeatureCollection),
    }
}

/// Read the cause-of-death CSV from disk
pub fn load_records(path: &Path, columns: &Columns) -> Result<Dataset> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(file, columns)
}

/// Parse the table: identifying columns are kept as text, every other
/// column becomes a numeric cause.
pub fn parse_records<R: Read>(reader: R, columns: &Columns) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let name_idx = position(&columns.name)?;
    let code_idx = position(&columns.code)?;
    let year_idx = position(&columns.year)?;

    let cause_idx: Vec<usize> = (0..headers.len())
        .filter(|i| ![name_idx, code_idx, year_idx].contains(i))
        .collect();
    if cause_idx.is_empty() {
        return Err(LoadError::NoCauses);
    }
    let causes: Vec<String> = cause_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in rdr.records() {
        let row = row?;
        let year_cell = row.get(year_idx).unwrap_or("");
        let Some(year) = parse_year(year_cell) else {
            skipped += 1;
            debug!("Skipping row with non-numeric year {:?}", year_cell);
            continue;
        };

        let values = cause_idx
            .iter()
            .map(|&i| coerce_number(row.get(i).unwrap_or("")))
            .collect();

        records.push(Record::new(
            row.get(name_idx).unwrap_or(""),
            row.get(code_idx).unwrap_or(""),
            year,
            values,
        ));
    }

    if skipped > 0 {
        warn!("Skipped {} rows without a numeric year", skipped);
    }

    let dataset = Dataset::new(causes, records);
    if dataset.years().is_empty() {
        return Err(LoadError::NoYears);
    }
    Ok(dataset)
}

/// Blank cells count as zero; anything else unparsable becomes NaN
fn coerce_number(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() {
        0.0
    } else {
        cell.parse().unwrap_or(f64::NAN)
    }
}

fn parse_year(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let year: f64 = cell.parse().ok()?;
    if year.fract() == 0.0 && year >= i32::MIN as f64 && year <= i32::MAX as f64 {
        Some(year as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
Country/Territory,Code,Year,Flu,Malaria
Afghanistan,AFG,1990,10,4
Afghanistan,AFG,1991,,x
Albania,ALB,1990,3,0
Nowhere,NOW,,5,5
";

    #[test]
    fn test_parse_records_coerces_numbers() {
        let dataset = parse_records(CSV.as_bytes(), &Columns::default()).unwrap();

        assert_eq!(dataset.causes(), &["Flu".to_string(), "Malaria".to_string()]);
        assert_eq!(dataset.years(), &[1990, 1991]);
        assert_eq!(dataset.records().len(), 3);

        let afg_1991 = &dataset.records()[1];
        assert_eq!(afg_1991.value(0), Some(0.0));
        assert!(afg_1991.value(1).unwrap().is_nan());
        assert_eq!(dataset.value(afg_1991, "Malaria"), None);
        assert_eq!(dataset.value(afg_1991, "Flu"), Some(0.0));
        assert_eq!(dataset.value(afg_1991, "Cholera"), None);
    }

    #[test]
    fn test_cause_columns_exclude_identifiers_anywhere_in_header() {
        let csv = "Flu,Year,Code,Polio,Country/Territory\n1,2000,AAA,2,A\n";
        let dataset = parse_records(csv.as_bytes(), &Columns::default()).unwrap();
        assert_eq!(dataset.causes(), &["Flu".to_string(), "Polio".to_string()]);
        let record = &dataset.records()[0];
        assert_eq!(record.name, "A");
        assert_eq!(record.code, "AAA");
        assert_eq!(dataset.value(record, "Polio"), Some(2.0));
    }

    #[test]
    fn test_missing_identifying_column() {
        let csv = "Country,Code,Year,Flu\nA,AAA,2000,1\n";
        let err = parse_records(csv.as_bytes(), &Columns::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Country/Territory"));
    }

    #[test]
    fn test_no_causes() {
        let csv = "Country/Territory,Code,Year\nA,AAA,2000\n";
        let err = parse_records(csv.as_bytes(), &Columns::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoCauses));
    }

    #[test]
    fn test_no_years() {
        let csv = "Country/Territory,Code,Year,Flu\nA,AAA,soon,1\n";
        let err = parse_records(csv.as_bytes(), &Columns::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoYears));
    }

    #[test]
    fn test_nearest_year() {
        let dataset = parse_records(CSV.as_bytes(), &Columns::default()).unwrap();
        assert_eq!(dataset.nearest_year(1800), Some(1990));
        assert_eq!(dataset.nearest_year(1991), Some(1991));
        assert_eq!(dataset.nearest_year(2050), Some(1991));
        assert_eq!(Dataset::default().nearest_year(2000), None);
    }

    #[test]
    fn test_parse_boundaries() {
        let mut json = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "AAA", "properties": {"name": "A"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "id": 7, "properties": {"iso_a3": "ATA"},
                 "geometry": {"type": "Point", "coordinates": [0, -80]}}
            ]
        }"#
        .to_vec();
        let fc = parse_boundaries(&mut json).unwrap();
        assert_eq!(fc.features.len(), 2);
        assert!(fc.features[1].property("iso_a3").is_some());
    }

    #[test]
    fn test_parse_boundaries_rejects_bare_geometry() {
        let mut json = br#"{"type": "Point", "coordinates": [0, 0]}"#.to_vec();
        let err = parse_boundaries(&mut json).unwrap_err();
        assert!(matches!(err, LoadError::NotAFeatureCollection));
    }

    #[test]
    fn test_parse_boundaries_rejects_malformed_json() {
        let mut json = b"{\"type\": ".to_vec();
        assert!(matches!(
            parse_boundaries(&mut json).unwrap_err(),
            LoadError::Json(_)
        ));
    }

    #[test]
    fn test_load_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("world.geojson");
        let records = dir.path().join("deaths.csv");
        fs::write(&world, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        File::create(&records).unwrap().write_all(CSV.as_bytes()).unwrap();

        let config = DataConfig {
            world,
            records,
            columns: Columns::default(),
        };
        let (fc, dataset) = load(&config).unwrap();
        assert!(fc.features.is_empty());
        assert_eq!(dataset.records().len(), 3);
    }

    #[test]
    fn test_load_fails_when_either_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("world.geojson");
        fs::write(&world, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();

        let config = DataConfig {
            world,
            records: dir.path().join("missing.csv"),
            columns: Columns::default(),
        };
        assert!(matches!(load(&config).unwrap_err(), LoadError::Io { .. }));
    }
}
