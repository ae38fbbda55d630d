// app.rs

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::dashboard::{self, DashboardView, MapView};
use crate::data::CropTable;
use crate::filter::{self, Dimension, FilterSelection};
use crate::geo::GeoBoundary;
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentScreen {
    Dashboard,
    MapView,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Navigation,
    Searching,
}

/// Subsequence match, case-insensitive. An empty pattern matches everything.
pub fn fuzzy_match(pattern: &str, text: &str) -> bool {
    let text_lower = text.to_lowercase();
    let mut text_chars = text_lower.chars();
    pattern
        .to_lowercase()
        .chars()
        .all(|p| text_chars.any(|t| t == p))
}

pub struct App {
    pub current_screen: CurrentScreen,
    pub previous_screen: CurrentScreen,
    pub current_mode: AppMode,
    pub should_quit: bool,

    // Inputs, shared with the loaders' cache
    pub table: Arc<CropTable>,
    pub boundary: Arc<GeoBoundary>,
    pub output_dir: PathBuf,
    pub current_year: i32,

    // Dashboard filters
    pub selection: FilterSelection,
    pub focused_dimension: usize, // index into `Dimension::ALL`
    pub option_cursors: [usize; 5],

    // Fuzzy search over the focused option list
    pub search_query_buffer: String,
    pub search_query_cursor: usize,
    pub previous_search_query_buffer: String,

    // Map View drill-down; cursor 0 is "no state"
    pub map_cursor: usize,
    pub drill_state: Option<String>,

    // Latest recompute results
    pub dashboard: DashboardView,
    pub map_view: MapView,

    pub notification: String,
    pub help_keybinds: Vec<String>,
}

impl App {
    /// Constructs a new `App` and runs the first recompute pass for both tabs.
    pub fn new(
        table: Arc<CropTable>,
        boundary: Arc<GeoBoundary>,
        selection: FilterSelection,
        output_dir: PathBuf,
    ) -> App {
        let dashboard = dashboard::build_dashboard(&table, &boundary, &selection);
        let map_view = dashboard::build_map_view(&table, &boundary, None);
        App {
            current_screen: CurrentScreen::Dashboard,
            previous_screen: CurrentScreen::Dashboard,
            current_mode: AppMode::Navigation,
            should_quit: false,

            table,
            boundary,
            output_dir,
            current_year: filter::current_year(),

            selection,
            focused_dimension: 0,
            option_cursors: [0; 5],

            search_query_buffer: String::new(),
            search_query_cursor: 0,
            previous_search_query_buffer: String::new(),

            map_cursor: 0,
            drill_state: None,

            dashboard,
            map_view,

            notification: String::from("Select filters to explore crop production:"),
            help_keybinds: vec![
                "Tab / 1 / 2: Switch between Dashboard and Map View".to_string(),
                "Left/Right: Focus previous/next filter".to_string(),
                "J/K or Arrow Keys: Move within a list".to_string(),
                "Space: Toggle the highlighted value".to_string(),
                "A: Clear the focused filter (no restriction)".to_string(),
                "R: Reset filters to defaults".to_string(),
                "/: Fuzzy search the focused list".to_string(),
                "Enter (Map View): Drill down into a state".to_string(),
                "X (Map View): Clear the drill-down".to_string(),
                "E: Export the current tab's charts to PNG".to_string(),
                "H: Show this Help screen".to_string(),
                "Q: Quit the application".to_string(),
            ],
        }
    }

    pub fn focused(&self) -> Dimension {
        Dimension::ALL[self.focused_dimension]
    }

    /// All values offered for `dimension`; years are rendered as text.
    pub fn options(&self, dimension: Dimension) -> Vec<String> {
        match dimension {
            Dimension::State => filter::state_options(&self.table),
            Dimension::District => filter::district_options(&self.table, &self.selection.states),
            Dimension::Crop => filter::crop_options(&self.table),
            Dimension::Season => filter::season_options(&self.table),
            Dimension::Year => filter::year_options(&self.table, self.current_year)
                .into_iter()
                .map(|y| y.to_string())
                .collect(),
        }
    }

    /// Options for `dimension`, narrowed by the search query when it is the
    /// focused list.
    pub fn visible_options(&self, dimension: Dimension) -> Vec<String> {
        let options = self.options(dimension);
        if dimension != self.focused() || self.search_query_buffer.is_empty() {
            return options;
        }
        options
            .into_iter()
            .filter(|o| fuzzy_match(&self.search_query_buffer, o))
            .collect()
    }

    /// Map View choices. The list widget puts a "none" entry in front.
    pub fn map_state_options(&self) -> Vec<String> {
        filter::state_options(&self.table)
    }

    pub fn refresh_dashboard(&mut self) {
        self.dashboard = dashboard::build_dashboard(&self.table, &self.boundary, &self.selection);
        // Option lists can shrink under any cursor, e.g. districts after a
        // state is deselected.
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            let len = self.visible_options(*dimension).len();
            self.option_cursors[i] = self.option_cursors[i].min(len.saturating_sub(1));
        }
    }

    pub fn refresh_map(&mut self) {
        self.map_view =
            dashboard::build_map_view(&self.table, &self.boundary, self.drill_state.as_deref());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.current_mode {
            AppMode::Searching => self.handle_search_key(key),
            AppMode::Navigation => match self.current_screen {
                CurrentScreen::Help => self.close_help(),
                CurrentScreen::Dashboard => {
                    if !self.handle_global_key(key) {
                        self.handle_dashboard_key(key);
                    }
                }
                CurrentScreen::MapView => {
                    if !self.handle_global_key(key) {
                        self.handle_map_key(key);
                    }
                }
            },
        }
    }

    fn close_help(&mut self) {
        self.current_screen = self.previous_screen;
    }

    /// Keys shared by both tabs. Returns true when the key was consumed.
    fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                self.notification = String::from("Exiting...");
            }
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                self.previous_screen = self.current_screen;
                self.current_screen = CurrentScreen::Help;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.current_screen = match self.current_screen {
                    CurrentScreen::Dashboard => CurrentScreen::MapView,
                    _ => CurrentScreen::Dashboard,
                };
            }
            KeyCode::Char('1') => self.current_screen = CurrentScreen::Dashboard,
            KeyCode::Char('2') => self.current_screen = CurrentScreen::MapView,
            KeyCode::Char('e') | KeyCode::Char('E') => self.export_current(),
            _ => return false,
        }
        true
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        let dimension = self.focused();
        let len = self.visible_options(dimension).len();
        let cursor = self.option_cursors[self.focused_dimension];
        match key.code {
            KeyCode::Left => {
                self.focused_dimension =
                    (self.focused_dimension + Dimension::ALL.len() - 1) % Dimension::ALL.len();
                self.search_query_buffer.clear();
            }
            KeyCode::Right => {
                self.focused_dimension = (self.focused_dimension + 1) % Dimension::ALL.len();
                self.search_query_buffer.clear();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if cursor + 1 < len {
                    self.option_cursors[self.focused_dimension] += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if cursor > 0 {
                    self.option_cursors[self.focused_dimension] -= 1;
                }
            }
            KeyCode::Char(' ') => self.toggle_highlighted(),
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.selection.clear(dimension);
                if dimension == Dimension::State {
                    self.selection.prune_districts(&self.table);
                }
                self.notification = format!("{}: no restriction", dimension.label());
                self.refresh_dashboard();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.selection = FilterSelection::defaults(&self.table);
                self.option_cursors = [0; 5];
                self.notification = String::from("Filters reset to defaults.");
                self.refresh_dashboard();
            }
            KeyCode::Char('/') => {
                self.current_mode = AppMode::Searching;
                self.previous_search_query_buffer.clone_from(&self.search_query_buffer);
                self.search_query_cursor = self.search_query_buffer.len();
                self.notification =
                    String::from("Enter search query. Press Enter to apply, Escape to cancel.");
            }
            _ => {}
        }
    }

    fn toggle_highlighted(&mut self) {
        let dimension = self.focused();
        let options = self.visible_options(dimension);
        let Some(value) = options.get(self.option_cursors[self.focused_dimension]) else {
            self.notification = String::from("No values to select in current view.");
            return;
        };
        let selected = self.selection.toggle(dimension, value);
        if dimension == Dimension::State {
            self.selection.prune_districts(&self.table);
        }
        self.notification = format!(
            "{} {}: {}",
            if selected { "Selected" } else { "Deselected" },
            dimension.label(),
            value
        );
        self.refresh_dashboard();
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let results = self.visible_options(self.focused()).len();
                self.notification = if self.search_query_buffer.is_empty() {
                    String::from("Search cleared. Showing all values.")
                } else {
                    format!(
                        "Searching for: '{}' ({} results)",
                        self.search_query_buffer, results
                    )
                };
                self.option_cursors[self.focused_dimension] = 0;
                self.current_mode = AppMode::Navigation;
            }
            KeyCode::Esc => {
                self.search_query_buffer.clone_from(&self.previous_search_query_buffer);
                self.option_cursors[self.focused_dimension] = 0;
                self.notification = String::from("Search cancelled.");
                self.current_mode = AppMode::Navigation;
            }
            KeyCode::Char(c) => {
                self.search_query_buffer.insert(self.search_query_cursor, c);
                self.search_query_cursor += c.len_utf8();
                self.option_cursors[self.focused_dimension] = 0;
            }
            KeyCode::Backspace => {
                let before = self.char_before_cursor();
                if let Some(width) = before {
                    self.search_query_cursor -= width;
                    self.search_query_buffer.remove(self.search_query_cursor);
                    self.option_cursors[self.focused_dimension] = 0;
                }
            }
            KeyCode::Left => {
                if let Some(width) = self.char_before_cursor() {
                    self.search_query_cursor -= width;
                }
            }
            KeyCode::Right => {
                let after = self.search_query_buffer[self.search_query_cursor..]
                    .chars()
                    .next()
                    .map(char::len_utf8);
                if let Some(width) = after {
                    self.search_query_cursor += width;
                }
            }
            _ => {}
        }
    }

    /// Byte width of the character left of the search cursor.
    fn char_before_cursor(&self) -> Option<usize> {
        self.search_query_buffer[..self.search_query_cursor]
            .chars()
            .next_back()
            .map(char::len_utf8)
    }

    fn handle_map_key(&mut self, key: KeyEvent) {
        let len = self.map_state_options().len() + 1;
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if self.map_cursor + 1 < len {
                    self.map_cursor += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.map_cursor = self.map_cursor.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.drill_state = match self.map_cursor {
                    0 => None,
                    i => self.map_state_options().get(i - 1).cloned(),
                };
                self.notification = match &self.drill_state {
                    Some(state) => format!("District-level analysis: {}", state),
                    None => String::from("Showing the national map."),
                };
                self.refresh_map();
            }
            KeyCode::Backspace | KeyCode::Char('x') | KeyCode::Char('X') => {
                self.map_cursor = 0;
                self.drill_state = None;
                self.notification = String::from("Showing the national map.");
                self.refresh_map();
            }
            _ => {}
        }
    }

    /// Writes the visible tab's charts to the output directory.
    pub fn export_current(&mut self) {
        let charts: Vec<_> = match self.current_screen {
            CurrentScreen::MapView => self.map_view.charts().into_iter().cloned().collect(),
            _ => self.dashboard.charts.clone(),
        };
        match render::export_all(&charts, &self.output_dir) {
            Ok(paths) => {
                info!(count = paths.len(), dir = %self.output_dir.display(), "export finished");
                self.notification = format!(
                    "Exported {} charts to {}",
                    paths.len(),
                    self.output_dir.display()
                );
            }
            Err(e) => {
                error!("export failed: {:#}", e);
                self.notification = format!("Export failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::sample_table;
    use crate::geo::StateShape;

    fn app() -> App {
        let square = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let boundary = GeoBoundary::from_shapes(vec![StateShape {
            name: "Punjab".to_string(),
            rings: vec![square],
        }]);
        App::new(
            Arc::new(sample_table()),
            Arc::new(boundary),
            FilterSelection::default(),
            PathBuf::from("output"),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn fuzzy_match_is_subsequence() {
        assert!(fuzzy_match("", "anything"));
        assert!(fuzzy_match("pjb", "Punjab"));
        assert!(fuzzy_match("KER", "Kerala"));
        assert!(!fuzzy_match("bjp", "Punjab"));
    }

    #[test]
    fn district_options_grow_with_state_selection() {
        let mut app = app();
        assert!(app.options(Dimension::District).is_empty());

        // states: Andaman..., Kerala, Punjab
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.options(Dimension::District), vec!["Idukki", "Wayanad"]);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(
            app.options(Dimension::District),
            vec!["Amritsar", "Idukki", "Ludhiana", "Wayanad"]
        );
        assert_eq!(app.dashboard.matched_rows, 5);
    }

    #[test]
    fn deselecting_a_state_prunes_its_districts() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' ')); // Kerala
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char(' ')); // Idukki
        assert!(app.selection.districts.contains("Idukki"));

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char(' ')); // Kerala off
        assert!(app.selection.districts.is_empty());
    }

    #[test]
    fn district_cursor_follows_a_shrinking_list() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' ')); // Kerala
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' ')); // Punjab
        press(&mut app, KeyCode::Right);
        for _ in 0..3 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.option_cursors[1], 3); // Wayanad

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char(' ')); // Punjab off
        assert_eq!(app.options(Dimension::District), vec!["Idukki", "Wayanad"]);
        assert_eq!(app.option_cursors[1], 1);

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.selection.districts.contains("Wayanad"));
    }

    #[test]
    fn clearing_a_dimension_removes_the_restriction() {
        let mut app = app();
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.dashboard.matched_rows, 1);
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.dashboard.matched_rows, 6);
    }

    #[test]
    fn search_narrows_the_focused_list() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        for c in "pun".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.current_mode, AppMode::Searching);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.visible_options(Dimension::State), vec!["Punjab"]);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.selection.states.contains("Punjab"));
    }

    #[test]
    fn map_drilldown_selects_and_clears() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_screen, CurrentScreen::MapView);
        assert!(app.map_view.drilldown.is_none());

        for _ in 0..3 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.drill_state.as_deref(), Some("Punjab"));
        assert!(app.map_view.drilldown.is_some());

        press(&mut app, KeyCode::Char('x'));
        assert!(app.map_view.drilldown.is_none());
    }

    #[test]
    fn help_returns_to_previous_screen() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.current_screen, CurrentScreen::Help);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.current_screen, CurrentScreen::MapView);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
