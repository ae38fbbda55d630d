// dashboard.rs
//
// One recompute pass: filter -> aggregate -> chart. Called on every
// interaction; the inputs come from the memoized loaders.

use std::sync::Arc;
use tracing::{debug, info_span};

use crate::aggregate;
use crate::chart::{self, Chart, ColorScale};
use crate::data::CropTable;
use crate::filter::FilterSelection;
use crate::geo::GeoBoundary;

/// The six Dashboard charts for one filter selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub matched_rows: usize,
    pub charts: Vec<Chart>,
}

/// District bars and yearly trend for one state.
#[derive(Debug, Clone)]
pub struct Drilldown {
    pub state: String,
    pub districts: Chart,
    pub trend: Chart,
}

#[derive(Debug, Clone)]
pub struct MapView {
    pub national: Chart,
    pub states: Vec<aggregate::StateTotals>,
    pub drilldown: Option<Drilldown>,
}

pub const DASHBOARD_TITLES: [&str; 6] = [
    "Correlation Matrix",
    "Time Series",
    "Top Producing Districts",
    "Yield",
    "Yield vs Production Area",
    "Crop-wise Production",
];

pub fn build_dashboard(
    table: &CropTable,
    boundary: &Arc<GeoBoundary>,
    selection: &FilterSelection,
) -> DashboardView {
    let _span = info_span!("dashboard_pass").entered();
    let rows = selection.apply(table);
    debug!(matched = rows.len(), total = table.len(), "filters applied");

    if rows.is_empty() {
        return DashboardView {
            matched_rows: 0,
            charts: DASHBOARD_TITLES.iter().map(|t| Chart::no_data(*t)).collect(),
        };
    }

    let charts = vec![
        chart::correlation_chart(&aggregate::correlation(&rows)),
        chart::time_series_chart(&aggregate::time_series(&rows)),
        chart::district_bar_chart(
            DASHBOARD_TITLES[2],
            &aggregate::top_districts(&rows, aggregate::TOP_DISTRICTS),
            ColorScale::Greens,
        ),
        chart::state_yield_chart(boundary, &aggregate::state_yield(&rows)),
        chart::scatter_chart(&aggregate::district_scatter(&rows)),
        chart::crop_production_chart(&aggregate::crop_production(&rows)),
    ];
    DashboardView {
        matched_rows: rows.len(),
        charts,
    }
}

/// National choropleth over the full table, plus the drill-down for
/// `state` when one is chosen. Dashboard filters never apply here.
pub fn build_map_view(
    table: &CropTable,
    boundary: &Arc<GeoBoundary>,
    state: Option<&str>,
) -> MapView {
    let _span = info_span!("map_pass", state = state.unwrap_or("")).entered();
    let all: Vec<_> = table.records().iter().collect();
    let states = aggregate::state_totals(&all);
    let national = chart::national_production_chart(boundary, &states);

    let drilldown = state.map(|state| Drilldown {
        state: state.to_string(),
        districts: chart::district_bar_chart(
            format!("District-level Production: {}", state),
            &aggregate::drilldown_districts(table, state),
            ColorScale::Blues,
        ),
        trend: chart::trend_chart(
            format!("Production Trend: {}", state),
            &aggregate::drilldown_trend(table, state),
        ),
    });

    MapView {
        national,
        states,
        drilldown,
    }
}

impl MapView {
    pub fn charts(&self) -> Vec<&Chart> {
        let mut charts = vec![&self.national];
        if let Some(d) = &self.drilldown {
            charts.push(&d.districts);
            charts.push(&d.trend);
        }
        charts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartBody;
    use crate::filter::tests::sample_table;
    use crate::geo::StateShape;

    fn boundary() -> Arc<GeoBoundary> {
        let square = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        Arc::new(GeoBoundary::from_shapes(
            ["Punjab", "Kerala", "Andaman and Nicobar"]
                .iter()
                .map(|n| StateShape {
                    name: n.to_string(),
                    rings: vec![square.clone()],
                })
                .collect(),
        ))
    }

    #[test]
    fn unfiltered_pass_renders_six_charts() {
        let view = build_dashboard(&sample_table(), &boundary(), &FilterSelection::default());
        assert_eq!(view.matched_rows, 6);
        assert_eq!(view.charts.len(), 6);
        assert!(view.charts.iter().all(|c| !c.is_no_data()));
    }

    #[test]
    fn empty_subset_degrades_every_chart() {
        let mut selection = FilterSelection::default();
        selection.states.insert("Kerala".to_string());
        selection.crops.insert("Wheat".to_string());
        let view = build_dashboard(&sample_table(), &boundary(), &selection);
        assert_eq!(view.matched_rows, 0);
        assert_eq!(view.charts.len(), 6);
        assert!(view.charts.iter().all(Chart::is_no_data));
        let titles: Vec<&str> = view.charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, DASHBOARD_TITLES);
    }

    #[test]
    fn map_view_ignores_dashboard_filters() {
        let table = sample_table();
        let view = build_map_view(&table, &boundary(), Some("Kerala"));
        assert_eq!(view.states.len(), 3);
        let drill = view.drilldown.as_ref().unwrap();
        match &drill.districts.body {
            ChartBody::Bar { bars, .. } => {
                let names: Vec<&str> = bars.iter().map(|b| b.0.as_str()).collect();
                assert_eq!(names, vec!["Idukki", "Wayanad"]);
            }
            other => panic!("unexpected chart body {:?}", other),
        }
        assert_eq!(view.charts().len(), 3);
    }

    #[test]
    fn map_view_without_selection_has_only_the_national_map() {
        let view = build_map_view(&sample_table(), &boundary(), None);
        assert!(view.drilldown.is_none());
        assert_eq!(view.charts().len(), 1);
        match &view.national.body {
            ChartBody::Choropleth { values, .. } => {
                assert!(values.iter().all(Option::is_some));
            }
            other => panic!("unexpected chart body {:?}", other),
        }
    }
}
