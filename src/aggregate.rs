// aggregate.rs
//
// Summary tables behind each chart. Every function is pure over a row slice.
// Missing values are skipped by both sums and means: a sum over nothing is 0,
// a mean over nothing is missing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::data::{CropRecord, CropTable};
use crate::names::map_state_name;

pub const TOP_DISTRICTS: usize = 10;
pub const DRILLDOWN_DISTRICTS: usize = 15;

pub const MEASURES: [&str; 3] = ["Area", "Production", "Yield"];

#[derive(Debug, Clone, Copy, Default)]
struct Stat {
    sum: f64,
    count: usize,
}

impl Stat {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Pearson correlation of Area, Production and Yield. `None` marks a pair
/// without enough complete, varying observations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: [&'static str; 3],
    pub cells: [[Option<f64>; 3]; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTotals {
    pub year_start: i32,
    pub area: f64,
    pub production: f64,
    pub mean_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictTotal {
    pub district: String,
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateYield {
    pub state: String,
    pub mean_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictPoint {
    pub district: String,
    pub area: f64,
    pub mean_yield: Option<f64>,
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CropSeries {
    pub crop: String,
    pub points: Vec<(i32, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateTotals {
    pub state: String,
    pub production: f64,
    pub area: f64,
    pub mean_yield: Option<f64>,
}

fn measure(record: &CropRecord, index: usize) -> Option<f64> {
    match index {
        0 => record.area,
        1 => record.production,
        _ => record.yield_,
    }
}

/// Rows whose grouping key is present; blank keys form no group.
fn keyed<'a, 'r>(
    rows: &'r [&'a CropRecord],
    key: fn(&CropRecord) -> &String,
) -> impl Iterator<Item = &'a CropRecord> + 'r {
    rows.iter().copied().filter(move |r| !key(r).is_empty())
}

/// Pearson's r over the complete pairs yielded by `pairs`.
pub fn pearson(pairs: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = pairs.collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

pub fn correlation(rows: &[&CropRecord]) -> CorrelationMatrix {
    let mut cells = [[None; 3]; 3];
    for i in 0..3 {
        for j in i..3 {
            let r = pearson(
                rows.iter()
                    .filter_map(|rec| Some((measure(rec, i)?, measure(rec, j)?))),
            );
            // the diagonal is exactly 1 whenever the column varies
            let r = if i == j { r.map(|_| 1.0) } else { r };
            cells[i][j] = r;
            cells[j][i] = r;
        }
    }
    CorrelationMatrix {
        labels: MEASURES,
        cells,
    }
}

/// Area and production totals and mean yield per start year, ascending.
pub fn time_series(rows: &[&CropRecord]) -> Vec<YearlyTotals> {
    let mut groups: BTreeMap<i32, [Stat; 3]> = BTreeMap::new();
    for r in rows {
        let g = groups.entry(r.year_start).or_default();
        g[0].push(r.area);
        g[1].push(r.production);
        g[2].push(r.yield_);
    }
    groups
        .into_iter()
        .map(|(year_start, [area, production, yield_])| YearlyTotals {
            year_start,
            area: area.sum,
            production: production.sum,
            mean_yield: yield_.mean(),
        })
        .collect()
}

/// Districts ranked by total production, largest first, ties by name.
pub fn top_districts(rows: &[&CropRecord], limit: usize) -> Vec<DistrictTotal> {
    let mut groups: BTreeMap<&str, Stat> = BTreeMap::new();
    for r in keyed(rows, |r| &r.district) {
        groups.entry(r.district.as_str()).or_default().push(r.production);
    }
    let mut totals: Vec<DistrictTotal> = groups
        .into_iter()
        .map(|(district, stat)| DistrictTotal {
            district: district.to_string(),
            production: stat.sum,
        })
        .collect();
    // BTreeMap order is by name, so a stable sort keeps ties alphabetical
    totals.sort_by(|a, b| {
        b.production
            .partial_cmp(&a.production)
            .unwrap_or(Ordering::Equal)
    });
    totals.truncate(limit);
    totals
}

/// Mean yield per state, keyed by the boundary file's spelling.
pub fn state_yield(rows: &[&CropRecord]) -> Vec<StateYield> {
    let mut groups: BTreeMap<&str, Stat> = BTreeMap::new();
    for r in keyed(rows, |r| &r.state) {
        groups
            .entry(map_state_name(&r.state))
            .or_default()
            .push(r.yield_);
    }
    groups
        .into_iter()
        .map(|(state, stat)| StateYield {
            state: state.to_string(),
            mean_yield: stat.mean(),
        })
        .collect()
}

pub fn district_scatter(rows: &[&CropRecord]) -> Vec<DistrictPoint> {
    let mut groups: BTreeMap<&str, [Stat; 3]> = BTreeMap::new();
    for r in keyed(rows, |r| &r.district) {
        let g = groups.entry(r.district.as_str()).or_default();
        g[0].push(r.area);
        g[1].push(r.production);
        g[2].push(r.yield_);
    }
    groups
        .into_iter()
        .map(|(district, [area, production, yield_])| DistrictPoint {
            district: district.to_string(),
            area: area.sum,
            mean_yield: yield_.mean(),
            production: production.sum,
        })
        .collect()
}

/// Production per (start year, crop), one series per crop in name order.
pub fn crop_production(rows: &[&CropRecord]) -> Vec<CropSeries> {
    let mut groups: BTreeMap<&str, BTreeMap<i32, Stat>> = BTreeMap::new();
    for r in keyed(rows, |r| &r.crop) {
        groups
            .entry(r.crop.as_str())
            .or_default()
            .entry(r.year_start)
            .or_default()
            .push(r.production);
    }
    groups
        .into_iter()
        .map(|(crop, years)| CropSeries {
            crop: crop.to_string(),
            points: years.into_iter().map(|(y, s)| (y, s.sum)).collect(),
        })
        .collect()
}

/// Production, area and mean yield per state, keyed by boundary spelling.
pub fn state_totals(rows: &[&CropRecord]) -> Vec<StateTotals> {
    let mut groups: BTreeMap<&str, [Stat; 3]> = BTreeMap::new();
    for r in keyed(rows, |r| &r.state) {
        let g = groups.entry(map_state_name(&r.state)).or_default();
        g[0].push(r.area);
        g[1].push(r.production);
        g[2].push(r.yield_);
    }
    groups
        .into_iter()
        .map(|(state, [area, production, yield_])| StateTotals {
            state: state.to_string(),
            production: production.sum,
            area: area.sum,
            mean_yield: yield_.mean(),
        })
        .collect()
}

/// Rows of one state, taken from the full table (never a filtered subset).
pub fn state_rows<'a>(table: &'a CropTable, state: &str) -> Vec<&'a CropRecord> {
    table.records().iter().filter(|r| r.state == state).collect()
}

pub fn drilldown_districts(table: &CropTable, state: &str) -> Vec<DistrictTotal> {
    top_districts(&state_rows(table, state), DRILLDOWN_DISTRICTS)
}

/// Yearly production of one state, ascending.
pub fn drilldown_trend(table: &CropTable, state: &str) -> Vec<(i32, f64)> {
    let mut groups: BTreeMap<i32, Stat> = BTreeMap::new();
    for r in state_rows(table, state) {
        groups.entry(r.year_start).or_default().push(r.production);
    }
    groups.into_iter().map(|(y, s)| (y, s.sum)).collect()
}
