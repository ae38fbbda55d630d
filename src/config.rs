// config.rs
use std::path::PathBuf;

use crate::cache::Sources;
use crate::filter::FilterSelection;

/// Crop production and yield dashboard (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "cropdash", version, about)]
pub struct Cli {
    /// Crop production table (delimited text with a header row)
    #[arg(long, default_value = "India Agriculture Crop Production.csv", value_hint = clap::ValueHint::FilePath)]
    pub data: PathBuf,

    /// State boundary GeoJSON FeatureCollection
    #[arg(long, default_value = "india_state_geo.json", value_hint = clap::ValueHint::FilePath)]
    pub geojson: PathBuf,

    /// Feature property holding the state name
    #[arg(long, default_value = "NAME_1")]
    pub name_key: String,

    /// Field delimiter of the crop table
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Directory exported PNG charts are written to
    #[arg(long, default_value = "output", value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// Log file used while the interactive dashboard owns the terminal
    #[arg(long, default_value = "cropdash.log", value_hint = clap::ValueHint::FilePath)]
    pub log_file: PathBuf,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Render every chart to PNG without starting the interactive dashboard
    Export(ExportArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct ExportArgs {
    /// Start from the default selection instead of no restriction
    #[arg(long)]
    pub defaults: bool,

    /// Keep only these states (repeatable)
    #[arg(long = "state")]
    pub states: Vec<String>,

    /// Keep only these districts (repeatable)
    #[arg(long = "district")]
    pub districts: Vec<String>,

    /// Keep only these crops (repeatable)
    #[arg(long = "crop")]
    pub crops: Vec<String>,

    /// Keep only these seasons (repeatable)
    #[arg(long = "season")]
    pub seasons: Vec<String>,

    /// Keep only these start years (repeatable)
    #[arg(long = "year")]
    pub years: Vec<i32>,

    /// Also export the district drill-down of this state
    #[arg(long)]
    pub drill_state: Option<String>,
}

impl Cli {
    pub fn sources(&self) -> anyhow::Result<Sources> {
        anyhow::ensure!(
            self.delimiter.is_ascii(),
            "delimiter must be a single ASCII character, got {:?}",
            self.delimiter
        );
        Ok(Sources {
            data_path: self.data.clone(),
            delimiter: self.delimiter as u8,
            geojson_path: self.geojson.clone(),
            name_key: self.name_key.clone(),
        })
    }

    /// `RUST_LOG`-style default directive for the verbosity flag.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl ExportArgs {
    /// Explicit values are layered over `base`: a dimension named on the
    /// command line replaces that dimension of the base selection.
    pub fn selection(&self, base: FilterSelection) -> FilterSelection {
        let mut selection = base;
        if !self.states.is_empty() {
            selection.states = self.states.iter().cloned().collect();
        }
        if !self.districts.is_empty() {
            selection.districts = self.districts.iter().cloned().collect();
        }
        if !self.crops.is_empty() {
            selection.crops = self.crops.iter().cloned().collect();
        }
        if !self.seasons.is_empty() {
            selection.seasons = self.seasons.iter().cloned().collect();
        }
        if !self.years.is_empty() {
            selection.year_starts = self.years.iter().copied().collect();
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["cropdash"]);
        assert_eq!(cli.name_key, "NAME_1");
        assert_eq!(cli.delimiter, ',');
        assert!(cli.command.is_none());
        assert_eq!(cli.log_directive(), "info");
        assert_eq!(cli.sources().unwrap().delimiter, b',');
    }

    #[test]
    fn export_filters_are_repeatable() {
        let cli = Cli::parse_from([
            "cropdash", "-vv", "--delimiter", ";", "export", "--state", "Punjab", "--state",
            "Kerala", "--year", "2001", "--drill-state", "Punjab",
        ]);
        assert_eq!(cli.log_directive(), "trace");
        let Some(Commands::Export(args)) = cli.command else {
            panic!("expected export subcommand");
        };
        let selection = args.selection(FilterSelection::default());
        assert_eq!(selection.states.len(), 2);
        assert!(selection.year_starts.contains(&2001));
        assert!(selection.crops.is_empty());
        assert_eq!(args.drill_state.as_deref(), Some("Punjab"));
    }

    #[test]
    fn explicit_values_replace_base_dimensions() {
        let mut base = FilterSelection::default();
        base.crops.insert("Rice".to_string());
        base.seasons.insert("Kharif".to_string());
        let args = ExportArgs {
            crops: vec!["Wheat".to_string()],
            ..Default::default()
        };
        let selection = args.selection(base);
        assert_eq!(selection.crops.iter().collect::<Vec<_>>(), vec!["Wheat"]);
        assert!(selection.seasons.contains("Kharif"));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let cli = Cli::parse_from(["cropdash", "--delimiter", "§"]);
        assert!(cli.sources().is_err());
    }
}
