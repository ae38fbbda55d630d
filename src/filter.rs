// filter.rs
//
// Set-membership filtering over the crop table, plus the option lists the
// filter widgets offer.

use chrono::Datelike;
use std::collections::BTreeSet;

use crate::data::{CropRecord, CropTable};

/// Oldest year offered by the year selector.
pub const FIRST_SELECTABLE_YEAR: i32 = 1990;

/// How many of the most recent data years the default selection includes.
const DEFAULT_YEAR_COUNT: usize = 5;

/// The five filter dimensions. An empty set places no restriction on its
/// dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub states: BTreeSet<String>,
    pub districts: BTreeSet<String>,
    pub crops: BTreeSet<String>,
    pub seasons: BTreeSet<String>,
    pub year_starts: BTreeSet<i32>,
}

/// Identifies one of the five filter dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    State,
    District,
    Crop,
    Season,
    Year,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::State,
        Dimension::District,
        Dimension::Crop,
        Dimension::Season,
        Dimension::Year,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::State => "State",
            Dimension::District => "District",
            Dimension::Crop => "Crop",
            Dimension::Season => "Season",
            Dimension::Year => "Year",
        }
    }
}

fn passes(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

impl FilterSelection {
    /// True when `record` satisfies every non-empty dimension.
    pub fn matches(&self, record: &CropRecord) -> bool {
        passes(&self.states, record.state.as_str())
            && passes(&self.districts, record.district.as_str())
            && passes(&self.crops, record.crop.as_str())
            && passes(&self.seasons, record.season.as_str())
            && (self.year_starts.is_empty() || self.year_starts.contains(&record.year_start))
    }

    /// Rows passing all five filters, in table order.
    pub fn apply<'a>(&self, table: &'a CropTable) -> Vec<&'a CropRecord> {
        table.records().iter().filter(|r| self.matches(r)).collect()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.states.is_empty()
            && self.districts.is_empty()
            && self.crops.is_empty()
            && self.seasons.is_empty()
            && self.year_starts.is_empty()
    }

    /// Adds `value` to the dimension if absent, removes it otherwise. Years
    /// are given in their decimal form. Returns whether the value is now
    /// selected.
    pub fn toggle(&mut self, dimension: Dimension, value: &str) -> bool {
        fn flip<T: Ord>(set: &mut BTreeSet<T>, value: T) -> bool {
            if set.remove(&value) {
                false
            } else {
                set.insert(value);
                true
            }
        }
        match dimension {
            Dimension::State => flip(&mut self.states, value.to_string()),
            Dimension::District => flip(&mut self.districts, value.to_string()),
            Dimension::Crop => flip(&mut self.crops, value.to_string()),
            Dimension::Season => flip(&mut self.seasons, value.to_string()),
            Dimension::Year => match value.parse::<i32>() {
                Ok(year) => flip(&mut self.year_starts, year),
                Err(_) => false,
            },
        }
    }

    pub fn is_selected(&self, dimension: Dimension, value: &str) -> bool {
        match dimension {
            Dimension::State => self.states.contains(value),
            Dimension::District => self.districts.contains(value),
            Dimension::Crop => self.crops.contains(value),
            Dimension::Season => self.seasons.contains(value),
            Dimension::Year => value
                .parse::<i32>()
                .is_ok_and(|y| self.year_starts.contains(&y)),
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::State => self.states.clear(),
            Dimension::District => self.districts.clear(),
            Dimension::Crop => self.crops.clear(),
            Dimension::Season => self.seasons.clear(),
            Dimension::Year => self.year_starts.clear(),
        }
    }

    pub fn len(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::State => self.states.len(),
            Dimension::District => self.districts.len(),
            Dimension::Crop => self.crops.len(),
            Dimension::Season => self.seasons.len(),
            Dimension::Year => self.year_starts.len(),
        }
    }

    /// Drops selected districts that no longer belong to any selected state.
    pub fn prune_districts(&mut self, table: &CropTable) {
        let allowed: BTreeSet<String> = district_options(table, &self.states).into_iter().collect();
        self.districts.retain(|d| allowed.contains(d));
    }

    /// First state, its first district, Rice and Kharif when present, and
    /// the most recent years present in the data.
    pub fn defaults(table: &CropTable) -> Self {
        let mut selection = FilterSelection::default();
        let states = state_options(table);
        if let Some(state) = states.first() {
            selection.states.insert(state.clone());
            if let Some(district) = district_options(table, &selection.states).first() {
                selection.districts.insert(district.clone());
            }
        }
        let crops = crop_options(table);
        if let Some(crop) = preferred(&crops, "Rice") {
            selection.crops.insert(crop);
        }
        let seasons = season_options(table);
        if let Some(season) = preferred(&seasons, "Kharif") {
            selection.seasons.insert(season);
        }
        let years: BTreeSet<i32> = table.records().iter().map(|r| r.year_start).collect();
        selection.year_starts = years.into_iter().rev().take(DEFAULT_YEAR_COUNT).collect();
        selection
    }
}

fn preferred(options: &[String], wanted: &str) -> Option<String> {
    options
        .iter()
        .find(|o| o.as_str() == wanted)
        .or_else(|| options.first())
        .cloned()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn state_options(table: &CropTable) -> Vec<String> {
    distinct(table.records().iter().map(|r| r.state.as_str()))
}

/// Districts of the selected states. With no state selected there is
/// nothing to choose from.
pub fn district_options(table: &CropTable, states: &BTreeSet<String>) -> Vec<String> {
    if states.is_empty() {
        return Vec::new();
    }
    distinct(
        table
            .records()
            .iter()
            .filter(|r| states.contains(&r.state))
            .map(|r| r.district.as_str()),
    )
}

pub fn crop_options(table: &CropTable) -> Vec<String> {
    distinct(table.records().iter().map(|r| r.crop.as_str()))
}

pub fn season_options(table: &CropTable) -> Vec<String> {
    distinct(table.records().iter().map(|r| r.season.as_str()))
}

/// Years from 1990 through `current_year`, plus any data year outside that
/// range, newest first.
pub fn year_options(table: &CropTable, current_year: i32) -> Vec<i32> {
    let mut years: BTreeSet<i32> = (FIRST_SELECTABLE_YEAR..=current_year).collect();
    years.extend(table.records().iter().map(|r| r.year_start));
    years.into_iter().rev().collect()
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(
        state: &str,
        district: &str,
        crop: &str,
        season: &str,
        year_start: i32,
        area: Option<f64>,
        production: Option<f64>,
        yield_: Option<f64>,
    ) -> CropRecord {
        CropRecord {
            state: state.to_string(),
            district: district.to_string(),
            crop: crop.to_string(),
            season: season.to_string(),
            year: format!("{}-{}", year_start, year_start + 1),
            year_start,
            area,
            production,
            yield_,
        }
    }

    pub(crate) fn sample_table() -> CropTable {
        CropTable::from_records(vec![
            record("Punjab", "Ludhiana", "Rice", "Kharif", 2001, Some(100.0), Some(400.0), Some(4.0)),
            record("Punjab", "Amritsar", "Wheat", "Rabi", 2001, Some(80.0), Some(240.0), Some(3.0)),
            record("Punjab", "Ludhiana", "Wheat", "Rabi", 2002, Some(90.0), Some(300.0), None),
            record("Kerala", "Idukki", "Rice", "Kharif", 2002, Some(20.0), Some(50.0), Some(2.5)),
            record("Kerala", "Wayanad", "Pepper", "Whole Year", 2003, None, Some(5.0), Some(0.5)),
            record("Andaman and Nicobar Islands", "Nicobars", "Coconut", "Whole Year", 2003, Some(10.0), Some(30.0), Some(3.0)),
        ])
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_selection_passes_everything() {
        let table = sample_table();
        let rows = FilterSelection::default().apply(&table);
        assert_eq!(rows.len(), table.len());
    }

    #[test]
    fn empty_set_equals_all_values() {
        let table = sample_table();
        let all = FilterSelection {
            states: state_options(&table).into_iter().collect(),
            crops: crop_options(&table).into_iter().collect(),
            seasons: season_options(&table).into_iter().collect(),
            year_starts: table.records().iter().map(|r| r.year_start).collect(),
            districts: table.records().iter().map(|r| r.district.clone()).collect(),
        };
        assert_eq!(all.apply(&table), FilterSelection::default().apply(&table));
    }

    #[test]
    fn dimensions_combine_with_and() {
        let table = sample_table();
        let selection = FilterSelection {
            states: set(&["Punjab"]),
            crops: set(&["Rice"]),
            ..Default::default()
        };
        let rows = selection.apply(&table);
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.state == "Punjab" && r.crop == "Rice"));
    }

    #[test]
    fn unmatched_filters_return_nothing() {
        let table = sample_table();
        let selection = FilterSelection {
            states: set(&["Kerala"]),
            crops: set(&["Wheat"]),
            ..Default::default()
        };
        assert!(selection.apply(&table).is_empty());
    }

    #[test]
    fn year_filter_uses_start_year() {
        let table = sample_table();
        let mut selection = FilterSelection::default();
        selection.year_starts.insert(2003);
        assert_eq!(selection.apply(&table).len(), 2);
    }

    #[test]
    fn district_options_follow_states() {
        let table = sample_table();
        assert!(district_options(&table, &BTreeSet::new()).is_empty());
        assert_eq!(
            district_options(&table, &set(&["Punjab"])),
            vec!["Amritsar", "Ludhiana"]
        );
        assert_eq!(
            district_options(&table, &set(&["Punjab", "Kerala"])),
            vec!["Amritsar", "Idukki", "Ludhiana", "Wayanad"]
        );
    }

    #[test]
    fn pruning_drops_orphaned_districts() {
        let table = sample_table();
        let mut selection = FilterSelection {
            states: set(&["Punjab", "Kerala"]),
            districts: set(&["Ludhiana", "Idukki"]),
            ..Default::default()
        };
        selection.toggle(Dimension::State, "Kerala");
        selection.prune_districts(&table);
        assert_eq!(selection.districts, set(&["Ludhiana"]));
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = FilterSelection::default();
        assert!(selection.toggle(Dimension::Year, "2001"));
        assert!(selection.is_selected(Dimension::Year, "2001"));
        assert!(!selection.toggle(Dimension::Year, "2001"));
        assert!(selection.is_unrestricted());
        assert!(!selection.toggle(Dimension::Year, "not a year"));
    }

    #[test]
    fn defaults_follow_data() {
        let table = sample_table();
        let selection = FilterSelection::defaults(&table);
        assert_eq!(selection.states, set(&["Andaman and Nicobar Islands"]));
        assert_eq!(selection.districts, set(&["Nicobars"]));
        assert_eq!(selection.crops, set(&["Rice"]));
        assert_eq!(selection.seasons, set(&["Kharif"]));
        assert_eq!(selection.year_starts, [2001, 2002, 2003].into_iter().collect());
    }

    #[test]
    fn year_options_cover_range_and_data() {
        let table = CropTable::from_records(vec![record(
            "Goa", "North Goa", "Rice", "Kharif", 1985, None, None, None,
        )]);
        let years = year_options(&table, 1992);
        assert_eq!(years, vec![1992, 1991, 1990, 1985]);
    }
}
