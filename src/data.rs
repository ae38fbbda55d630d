// data.rs
//
// Crop production table: reading, header normalization, numeric coercion and
// the derived start year.

use anyhow::{Context, Result, bail, ensure};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Columns the dashboard needs; anything else in the file is ignored.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "State",
    "District",
    "Crop",
    "Season",
    "Year",
    "Area",
    "Production",
    "Yield",
];

/// One row as it appears in the file, before coercion.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "District")]
    district: String,
    #[serde(rename = "Crop")]
    crop: String,
    #[serde(rename = "Season")]
    season: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Area")]
    area: String,
    #[serde(rename = "Production")]
    production: String,
    #[serde(rename = "Yield")]
    yield_: String,
}

/// A single crop observation. Numeric fields are `None` when the source cell
/// was empty or not a number.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRecord {
    pub state: String,
    pub district: String,
    pub crop: String,
    pub season: String,
    pub year: String,
    pub year_start: i32,
    pub area: Option<f64>,
    pub production: Option<f64>,
    pub yield_: Option<f64>,
}

/// Counts gathered while loading, logged once the table is ready.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub rows: usize,
    pub missing_area: usize,
    pub missing_production: usize,
    pub missing_yield: usize,
}

/// The full, read-only crop table.
#[derive(Debug, Clone, Default)]
pub struct CropTable {
    records: Vec<CropRecord>,
    report: LoadReport,
}

/// Coerces a cell to a number; anything unparseable becomes missing.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Start year of a "YYYY-YYYY" season string: the first `-` separated token.
pub fn parse_year_start(year: &str) -> Option<i32> {
    year.split('-').next()?.trim().parse::<i32>().ok()
}

impl CropTable {
    /// Builds a table from records that are already typed.
    pub fn from_records(records: Vec<CropRecord>) -> Self {
        let report = LoadReport {
            rows: records.len(),
            missing_area: records.iter().filter(|r| r.area.is_none()).count(),
            missing_production: records.iter().filter(|r| r.production.is_none()).count(),
            missing_yield: records.iter().filter(|r| r.yield_.is_none()).count(),
        };
        CropTable { records, report }
    }

    /// Reads a delimited table from `path`.
    pub fn load(path: &Path, delimiter: u8) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open crop table {}", path.display()))?;
        let table = Self::from_reader(file, delimiter)
            .with_context(|| format!("failed to read crop table {}", path.display()))?;
        info!(
            path = %path.display(),
            rows = table.report.rows,
            missing_area = table.report.missing_area,
            missing_production = table.report.missing_production,
            missing_yield = table.report.missing_yield,
            "crop table loaded"
        );
        Ok(table)
    }

    /// Reads a delimited table from any reader. Column names are trimmed,
    /// numeric cells coerced, and a row with an unusable Year fails the load.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().context("missing header row")?.clone();
        for column in REQUIRED_COLUMNS {
            ensure!(
                headers.iter().any(|h| h == column),
                "required column `{}` not found (columns: {})",
                column,
                headers.iter().collect::<Vec<_>>().join(", ")
            );
        }

        let mut records = Vec::new();
        let mut record = StringRecord::new();
        let mut row_number = 0;
        while rdr
            .read_record(&mut record)
            .with_context(|| format!("malformed row {}", row_number + 1))?
        {
            row_number += 1;
            // Short rows read as missing trailing cells.
            while record.len() < headers.len() {
                record.push_field("");
            }
            let row: RawRow = record
                .deserialize(Some(&headers))
                .with_context(|| format!("malformed row {}", row_number))?;
            let Some(year_start) = parse_year_start(&row.year) else {
                bail!(
                    "row {}: cannot derive start year from Year value {:?}",
                    row_number,
                    row.year
                );
            };
            records.push(CropRecord {
                area: parse_numeric(&row.area),
                production: parse_numeric(&row.production),
                yield_: parse_numeric(&row.yield_),
                state: row.state,
                district: row.district,
                crop: row.crop,
                season: row.season,
                year: row.year,
                year_start,
            });
        }
        debug!(rows = records.len(), "parsed crop rows");
        Ok(Self::from_records(records))
    }

    pub fn records(&self) -> &[CropRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SAMPLE: &str = "\
 State ,District , Crop,Season,Year,Area , Production,Yield
Punjab,Ludhiana,Rice,Kharif,2001-2002,100,400,4
Punjab,Amritsar,Wheat,Rabi,1999-2000,50,,2.5
Kerala,Idukki,Rice,Kharif,2001-2002,abc,30,NaN
";

    #[test]
    fn year_start_takes_first_token() {
        assert_eq!(parse_year_start("2001-2002"), Some(2001));
        assert_eq!(parse_year_start("1999-2000"), Some(1999));
        assert_eq!(parse_year_start("2010"), Some(2010));
        assert_eq!(parse_year_start("-2001"), None);
        assert_eq!(parse_year_start("abcd-2001"), None);
    }

    #[test]
    fn numeric_coercion_marks_missing() {
        assert_eq!(parse_numeric(" 12.5 "), Some(12.5));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn headers_are_trimmed_and_cells_coerced() {
        let table = CropTable::from_reader(SAMPLE.as_bytes(), b',').unwrap();
        assert_eq!(table.len(), 3);

        let first = &table.records()[0];
        assert_eq!(first.state, "Punjab");
        assert_eq!(first.year_start, 2001);
        assert_eq!(first.production, Some(400.0));

        assert_eq!(table.records()[1].production, None);
        assert_eq!(table.records()[1].year_start, 1999);
        assert_eq!(table.records()[2].area, None);
        assert_eq!(table.records()[2].yield_, None);

        let report = table.report();
        assert_eq!(report.rows, 3);
        assert_eq!(report.missing_area, 1);
        assert_eq!(report.missing_production, 1);
        assert_eq!(report.missing_yield, 1);
    }

    #[test]
    fn malformed_year_fails_the_load() {
        let csv = "State,District,Crop,Season,Year,Area,Production,Yield\n\
                   Punjab,Ludhiana,Rice,Kharif,2001-2002,1,1,1\n\
                   Punjab,Ludhiana,Rice,Kharif,unknown,1,1,1\n";
        let err = CropTable::from_reader(csv.as_bytes(), b',').unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("row 2"), "{}", message);
        assert!(message.contains("unknown"), "{}", message);
    }

    #[test]
    fn short_rows_read_as_missing_cells() {
        let csv = "State,District,Crop,Season,Year,Area,Production,Yield\n\
                   Punjab,Ludhiana,Rice,Kharif,2001-2002,1,2,2\n\
                   Punjab,Ludhiana,Rice,Kharif,2002-2003,1,2\n\
                   Punjab,Amritsar,Wheat,Rabi,2002-2003\n";
        let table = CropTable::from_reader(csv.as_bytes(), b',').unwrap();
        assert_eq!(table.len(), 3);

        let short = &table.records()[1];
        assert_eq!(short.year_start, 2002);
        assert_eq!(short.production, Some(2.0));
        assert_eq!(short.yield_, None);

        let shorter = &table.records()[2];
        assert_eq!(shorter.area, None);
        assert_eq!(shorter.production, None);
        assert_eq!(table.report().missing_yield, 2);
    }

    #[test]
    fn row_without_a_year_still_fails() {
        let csv = "State,District,Crop,Season,Year,Area,Production,Yield\n\
                   Punjab,Ludhiana,Rice\n";
        let err = CropTable::from_reader(csv.as_bytes(), b',').unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "State,District,Crop,Season,Year,Area,Production\n";
        let err = CropTable::from_reader(csv.as_bytes(), b',').unwrap_err();
        assert!(err.to_string().contains("`Yield`"));
    }

    #[test]
    fn alternative_delimiter() {
        let csv = "State;District;Crop;Season;Year;Area;Production;Yield\n\
                   Goa;North Goa;Rice;Kharif;2005-2006;1.5;3;2\n";
        let table = CropTable::from_reader(csv.as_bytes(), b';').unwrap();
        assert_eq!(table.records()[0].area, Some(1.5));
    }

    #[test]
    fn reloading_yields_identical_year_starts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let first = CropTable::load(file.path(), b',').unwrap();
        let second = CropTable::load(file.path(), b',').unwrap();
        let a: Vec<i32> = first.records().iter().map(|r| r.year_start).collect();
        let b: Vec<i32> = second.records().iter().map(|r| r.year_start).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CropTable::load(Path::new("/nonexistent/crops.csv"), b',').unwrap_err();
        assert!(err.to_string().contains("failed to open crop table"));
    }
}
