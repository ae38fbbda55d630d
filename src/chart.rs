// chart.rs
//
// Chart specifications built from summary tables. A `Chart` says which field
// goes to position, size and color; `render` draws it to PNG and `ui` draws it
// in the terminal.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::aggregate::{
    CorrelationMatrix, CropSeries, DistrictPoint, DistrictTotal, StateTotals, StateYield,
    YearlyTotals,
};
use crate::geo::GeoBoundary;

pub const NO_DATA_MESSAGE: &str = "No data available for selected filters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    RdYlGn,
    Greens,
    YlGn,
    Blues,
    Viridis,
}

impl ColorScale {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            ColorScale::RdYlGn => &[
                (165, 0, 38),
                (215, 48, 39),
                (244, 109, 67),
                (253, 174, 97),
                (254, 224, 139),
                (255, 255, 191),
                (217, 239, 139),
                (166, 217, 106),
                (102, 189, 99),
                (26, 152, 80),
                (0, 104, 55),
            ],
            ColorScale::Greens => &[
                (247, 252, 245),
                (199, 233, 192),
                (116, 196, 118),
                (35, 139, 69),
                (0, 68, 27),
            ],
            ColorScale::YlGn => &[
                (255, 255, 229),
                (217, 240, 163),
                (120, 198, 121),
                (35, 132, 67),
                (0, 69, 41),
            ],
            ColorScale::Blues => &[
                (247, 251, 255),
                (198, 219, 239),
                (107, 174, 214),
                (33, 113, 181),
                (8, 48, 107),
            ],
            ColorScale::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
        }
    }

    /// Color at position `t` in [0, 1], linearly interpolated between stops.
    pub fn at(self, t: f64) -> (u8, u8, u8) {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (stops.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = scaled - lo as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (stops[lo], stops[hi]);
        (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }

    /// Color for `value` relative to `[min, max]`.
    pub fn color_for(self, value: f64, min: f64, max: f64) -> (u8, u8, u8) {
        let t = if max > min { (value - min) / (max - min) } else { 1.0 };
        self.at(t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub enum ChartBody {
    Heatmap {
        labels: Vec<String>,
        cells: Vec<Vec<Option<f64>>>,
        scale: ColorScale,
    },
    /// Primary series share the left axis, secondary series the right one.
    DualAxisLine {
        x_label: String,
        primary_label: String,
        secondary_label: String,
        primary: Vec<Series>,
        secondary: Vec<Series>,
    },
    Bar {
        x_label: String,
        y_label: String,
        bars: Vec<(String, f64)>,
        scale: ColorScale,
    },
    /// One value slot per boundary shape; `None` renders unfilled.
    Choropleth {
        boundary: Arc<GeoBoundary>,
        values: Vec<Option<f64>>,
        value_label: String,
        scale: ColorScale,
    },
    Scatter {
        x_label: String,
        y_label: String,
        size_label: String,
        points: Vec<ScatterPoint>,
        scale: ColorScale,
    },
    Line {
        x_label: String,
        y_label: String,
        series: Vec<Series>,
    },
    NoData {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub body: ChartBody,
}

impl Chart {
    pub fn no_data(title: impl Into<String>) -> Self {
        Chart {
            title: title.into(),
            body: ChartBody::NoData {
                message: NO_DATA_MESSAGE.to_string(),
            },
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.body, ChartBody::NoData { .. })
    }
}

/// Smallest and largest finite value, if any.
pub fn value_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub fn correlation_chart(matrix: &CorrelationMatrix) -> Chart {
    let title = "Correlation Matrix";
    if matrix.cells.iter().flatten().all(Option::is_none) {
        return Chart::no_data(title);
    }
    Chart {
        title: title.to_string(),
        body: ChartBody::Heatmap {
            labels: matrix.labels.iter().map(|l| l.to_string()).collect(),
            cells: matrix.cells.iter().map(|row| row.to_vec()).collect(),
            scale: ColorScale::RdYlGn,
        },
    }
}

pub fn time_series_chart(years: &[YearlyTotals]) -> Chart {
    let title = "Time Series";
    if years.is_empty() {
        return Chart::no_data(title);
    }
    fn series(years: &[YearlyTotals], name: &str, f: impl Fn(&YearlyTotals) -> Option<f64>) -> Series {
        Series {
            name: name.to_string(),
            points: years
                .iter()
                .filter_map(|y| Some((y.year_start as f64, f(y)?)))
                .collect(),
        }
    }
    Chart {
        title: title.to_string(),
        body: ChartBody::DualAxisLine {
            x_label: "Year".to_string(),
            primary_label: "Area & Production".to_string(),
            secondary_label: "Yield".to_string(),
            primary: vec![
                series(years, "Area", |y| Some(y.area)),
                series(years, "Production", |y| Some(y.production)),
            ],
            secondary: vec![series(years, "Yield", |y| y.mean_yield)],
        },
    }
}

pub fn district_bar_chart(title: impl Into<String>, totals: &[DistrictTotal], scale: ColorScale) -> Chart {
    if totals.is_empty() {
        return Chart::no_data(title);
    }
    Chart {
        title: title.into(),
        body: ChartBody::Bar {
            x_label: "District".to_string(),
            y_label: "Production".to_string(),
            bars: totals
                .iter()
                .map(|t| (t.district.clone(), t.production))
                .collect(),
            scale,
        },
    }
}

/// Joins `(mapped state, value)` pairs onto the boundary by name. Shapes
/// without a matching state stay unfilled.
pub fn choropleth_chart(
    title: impl Into<String>,
    boundary: &Arc<GeoBoundary>,
    values: &[(String, Option<f64>)],
    value_label: &str,
    scale: ColorScale,
) -> Chart {
    if values.is_empty() {
        return Chart::no_data(title);
    }
    let by_name: BTreeMap<&str, Option<f64>> =
        values.iter().map(|(state, v)| (state.as_str(), *v)).collect();
    // A region split over several features fills every one of them.
    let slots: Vec<Option<f64>> = boundary
        .shapes()
        .iter()
        .map(|shape| by_name.get(shape.name.as_str()).copied().flatten())
        .collect();
    for state in by_name.keys() {
        if !boundary.shapes().iter().any(|shape| shape.name == *state) {
            debug!(state = %state, "state has no matching boundary feature");
        }
    }
    Chart {
        title: title.into(),
        body: ChartBody::Choropleth {
            boundary: Arc::clone(boundary),
            values: slots,
            value_label: value_label.to_string(),
            scale,
        },
    }
}

pub fn state_yield_chart(boundary: &Arc<GeoBoundary>, yields: &[StateYield]) -> Chart {
    let values: Vec<(String, Option<f64>)> = yields
        .iter()
        .map(|s| (s.state.clone(), s.mean_yield))
        .collect();
    choropleth_chart("Yield", boundary, &values, "Yield", ColorScale::YlGn)
}

pub fn national_production_chart(boundary: &Arc<GeoBoundary>, totals: &[StateTotals]) -> Chart {
    let values: Vec<(String, Option<f64>)> = totals
        .iter()
        .map(|s| (s.state.clone(), Some(s.production)))
        .collect();
    choropleth_chart(
        "State-wise Production Distribution",
        boundary,
        &values,
        "Production",
        ColorScale::Greens,
    )
}

/// Area against mean yield, sized by production. Districts without any
/// yield value cannot be placed and are left out.
pub fn scatter_chart(points: &[DistrictPoint]) -> Chart {
    let title = "Yield vs Production Area";
    let placed: Vec<ScatterPoint> = points
        .iter()
        .filter_map(|p| {
            Some(ScatterPoint {
                label: p.district.clone(),
                x: p.area,
                y: p.mean_yield?,
                size: p.production,
            })
        })
        .collect();
    if placed.is_empty() {
        return Chart::no_data(title);
    }
    Chart {
        title: title.to_string(),
        body: ChartBody::Scatter {
            x_label: "Area".to_string(),
            y_label: "Yield".to_string(),
            size_label: "Production".to_string(),
            points: placed,
            scale: ColorScale::Viridis,
        },
    }
}

pub fn crop_production_chart(series: &[CropSeries]) -> Chart {
    let title = "Crop-wise Production";
    if series.is_empty() {
        return Chart::no_data(title);
    }
    Chart {
        title: title.to_string(),
        body: ChartBody::Line {
            x_label: "Year".to_string(),
            y_label: "Production".to_string(),
            series: series
                .iter()
                .map(|s| Series {
                    name: s.crop.clone(),
                    points: s.points.iter().map(|(y, v)| (*y as f64, *v)).collect(),
                })
                .collect(),
        },
    }
}

pub fn trend_chart(title: impl Into<String>, trend: &[(i32, f64)]) -> Chart {
    if trend.is_empty() {
        return Chart::no_data(title);
    }
    Chart {
        title: title.into(),
        body: ChartBody::Line {
            x_label: "Year".to_string(),
            y_label: "Production".to_string(),
            series: vec![Series {
                name: "Production".to_string(),
                points: trend.iter().map(|(y, v)| (*y as f64, *v)).collect(),
            }],
        },
    }
}
