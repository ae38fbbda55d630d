// ui.rs

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart as ChartWidget, Dataset,
        GraphType, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap,
        block::{Position, Title},
        canvas::{Canvas, Line as CanvasLine},
    },
};

use crate::app::{App, AppMode, CurrentScreen};
use crate::chart::{Chart, ChartBody, ColorScale, ScatterPoint, Series, value_range};
use crate::filter::Dimension;
use crate::names::map_state_name;

const SERIES_COLORS: [Color; 8] = [
    Color::LightGreen,
    Color::LightBlue,
    Color::LightYellow,
    Color::LightMagenta,
    Color::LightCyan,
    Color::LightRed,
    Color::Green,
    Color::Blue,
];

const SCATTER_BUCKETS: usize = 4;

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

pub fn render(frame: &mut Frame, app: &App) {
    let mut constraints = vec![
        Constraint::Length(3), // Tabs
        Constraint::Length(1), // Notification
    ];
    if app.current_mode == AppMode::Searching {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(3)); // Footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.size());

    render_tabs(frame, app, chunks[0]);

    let notification = Paragraph::new(app.notification.clone())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(notification, chunks[1]);

    let mut body = chunks[2];
    if app.current_mode == AppMode::Searching {
        render_search_bar(frame, app, chunks[2]);
        body = chunks[3];
    }

    match app.current_screen {
        CurrentScreen::Dashboard => render_dashboard(frame, app, body),
        CurrentScreen::MapView => render_map_view(frame, app, body),
        CurrentScreen::Help => render_help_screen(frame, app, body),
    }

    render_footer(frame, app, chunks[chunks.len() - 1]);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let on_map = app.current_screen == CurrentScreen::MapView
        || (app.current_screen == CurrentScreen::Help
            && app.previous_screen == CurrentScreen::MapView);
    let selected = usize::from(on_map);
    let tabs = Tabs::new(vec![" Dashboard ", " Map View "])
        .select(selected)
        .block(
            Block::default()
                .title(" Crop Production & Yield ")
                .title_style(Style::default().fg(Color::Cyan).bold())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(8), // "Search:" label
            Constraint::Min(0),    // Input field
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new("Search:").style(Style::default().fg(Color::LightCyan)),
        layout[0],
    );
    frame.render_widget(
        Paragraph::new(app.search_query_buffer.clone()).style(Style::default().fg(Color::Yellow)),
        layout[1],
    );
    let typed = app.search_query_buffer[..app.search_query_cursor].chars().count();
    frame.set_cursor(layout[1].x + typed as u16, layout[1].y);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)])
        .split(area);

    let filter_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(chunks[0]);
    for (i, dimension) in Dimension::ALL.iter().enumerate() {
        render_filter_list(frame, app, *dimension, i, filter_areas[i]);
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(chunks[1]);
    for (r, row) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 2); 2])
            .split(*row);
        for (c, cell) in cells.iter().enumerate() {
            if let Some(chart) = app.dashboard.charts.get(r * 2 + c) {
                render_chart(frame, *cell, chart);
            }
        }
    }
}

fn render_filter_list(frame: &mut Frame, app: &App, dimension: Dimension, index: usize, area: Rect) {
    let focused = index == app.focused_dimension;
    let selected_count = app.selection.len(dimension);
    let title = if selected_count == 0 {
        format!(" {} (all) ", dimension.label())
    } else {
        format!(" {} ({}) ", dimension.label(), selected_count)
    };

    let items: Vec<ListItem> = app
        .visible_options(dimension)
        .into_iter()
        .map(|value| {
            let selected = app.selection.is_selected(dimension, &value);
            let marker = if selected { "[x]" } else { "[ ]" };
            let style = if selected {
                Style::default().fg(Color::LightGreen)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(Span::styled(format!("{} {}", marker, value), style)))
        })
        .collect();

    let empty_hint = items.is_empty();
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        });

    if empty_hint {
        let hint = if dimension == Dimension::District {
            "Select a state first"
        } else {
            "No values"
        };
        frame.render_widget(
            Paragraph::new(hint)
                .block(block)
                .style(Style::default().fg(Color::Gray)),
            area,
        );
        return;
    }

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );
    let mut state =
        ListState::default().with_selected(focused.then_some(app.option_cursors[index]));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_map_view(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    render_chart(frame, columns[0], &app.map_view.national);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(0)])
        .split(columns[1]);

    let mut items = vec![ListItem::new("(none)").style(Style::default().fg(Color::Gray))];
    for state in app.map_state_options() {
        let mapped = map_state_name(&state);
        let totals = app.map_view.states.iter().find(|t| t.state == mapped);
        let text = match totals {
            Some(t) => format!(
                "{:<26} P {:>12.0}  A {:>10.0}  Y {}",
                state,
                t.production,
                t.area,
                t.mean_yield
                    .map_or_else(|| "-".to_string(), |y| format!("{:.2}", y))
            ),
            None => state.clone(),
        };
        let style = if app.drill_state.as_deref() == Some(state.as_str()) {
            Style::default().fg(Color::LightGreen)
        } else {
            Style::default().fg(Color::White)
        };
        items.push(ListItem::new(Line::from(Span::styled(text, style))));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Select State for Detailed Analysis ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightBlue)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default().with_selected(Some(app.map_cursor));
    frame.render_stateful_widget(list, right[0], &mut state);

    match &app.map_view.drilldown {
        Some(drill) => {
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(right[1]);
            render_chart(frame, halves[0], &drill.districts);
            render_chart(frame, halves[1], &drill.trend);
        }
        None => {
            let hint = Paragraph::new("Select a state to see district-level analysis.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL))
                .style(Style::default().fg(Color::Gray));
            frame.render_widget(hint, right[1]);
        }
    }
}

fn chart_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(Color::LightCyan).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Draws any chart specification into `area` with ratatui widgets.
pub fn render_chart(frame: &mut Frame, area: Rect, chart: &Chart) {
    let block = chart_block(&chart.title);
    match &chart.body {
        ChartBody::NoData { message } => {
            let paragraph = Paragraph::new(message.as_str())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block)
                .style(Style::default().fg(Color::Gray));
            frame.render_widget(paragraph, area);
        }
        ChartBody::Heatmap {
            labels,
            cells,
            scale,
        } => render_heatmap(frame, area, block, labels, cells, *scale),
        ChartBody::DualAxisLine {
            x_label,
            primary_label,
            secondary_label,
            primary,
            secondary,
        } => {
            // Terminal charts have one y axis; stack the two scales instead.
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(inner);
            render_lines(frame, halves[0], Block::default(), x_label, primary_label, primary, 0);
            render_lines(
                frame,
                halves[1],
                Block::default().borders(Borders::TOP),
                x_label,
                secondary_label,
                secondary,
                primary.len(),
            );
        }
        ChartBody::Bar { bars, scale, .. } => render_bars(frame, area, block, bars, *scale),
        ChartBody::Choropleth {
            boundary,
            values,
            value_label,
            scale,
        } => {
            let range = value_range(values.iter().flatten().copied());
            let legend = match range {
                Some((lo, hi)) => format!(" {}: {:.1} .. {:.1} ", value_label, lo, hi),
                None => format!(" {}: no values ", value_label),
            };
            let block = block.title(Title::from(legend).position(Position::Bottom));
            let ([x0, x1], [y0, y1]) = boundary.padded_bounds(0.05);
            let canvas = Canvas::default()
                .block(block)
                .marker(Marker::Braille)
                .x_bounds([x0, x1])
                .y_bounds([y0, y1])
                .paint(|ctx| {
                    for (shape, value) in boundary.shapes().iter().zip(values) {
                        let color = match (value, range) {
                            (Some(v), Some((lo, hi))) => rgb(scale.color_for(*v, lo, hi)),
                            _ => Color::DarkGray,
                        };
                        for ring in &shape.rings {
                            for pair in ring.windows(2) {
                                ctx.draw(&CanvasLine {
                                    x1: pair[0].0,
                                    y1: pair[0].1,
                                    x2: pair[1].0,
                                    y2: pair[1].1,
                                    color,
                                });
                            }
                        }
                    }
                });
            frame.render_widget(canvas, area);
        }
        ChartBody::Scatter {
            x_label,
            y_label,
            points,
            scale,
            ..
        } => render_scatter(frame, area, block, x_label, y_label, points, *scale),
        ChartBody::Line {
            x_label,
            y_label,
            series,
        } => render_lines(frame, area, block, x_label, y_label, series, 0),
    }
}

fn render_heatmap(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    labels: &[String],
    cells: &[Vec<Option<f64>>],
    scale: ColorScale,
) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(labels.iter().map(|l| Cell::from(l.as_str()).style(bold))),
    );
    let rows = labels.iter().zip(cells).map(|(label, row)| {
        let mut row_cells = vec![Cell::from(label.as_str()).style(bold)];
        for cell in row {
            row_cells.push(match cell {
                Some(v) => Cell::from(format!("{:.2}", v))
                    .style(Style::default().fg(Color::Black).bg(rgb(scale.color_for(*v, -1.0, 1.0)))),
                None => Cell::from("-").style(Style::default().fg(Color::Gray)),
            });
        }
        Row::new(row_cells)
    });
    let widths = vec![Constraint::Length(12); labels.len() + 1];
    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn render_bars(frame: &mut Frame, area: Rect, block: Block, bars: &[(String, f64)], scale: ColorScale) {
    let (lo, hi) = value_range(bars.iter().map(|b| b.1)).unwrap_or((0.0, 0.0));
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width = (inner_width / bars.len().max(1)).saturating_sub(1).clamp(1, 12) as u16;
    let widget_bars: Vec<Bar> = bars
        .iter()
        .map(|(name, value)| {
            Bar::default()
                .value(value.max(0.0).round() as u64)
                .text_value(format!("{:.0}", value))
                .label(Line::from(name.as_str()))
                .style(Style::default().fg(rgb(scale.color_for(*value, lo, hi))))
        })
        .collect();
    let chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .data(BarGroup::default().bars(&widget_bars));
    frame.render_widget(chart, area);
}

fn axis_bounds(values: impl IntoIterator<Item = f64>) -> [f64; 2] {
    match value_range(values) {
        Some((lo, hi)) if hi - lo > f64::EPSILON => [lo, hi],
        Some((lo, hi)) => [lo - 1.0, hi + 1.0],
        None => [0.0, 1.0],
    }
}

fn axis<'a>(title: &'a str, [lo, hi]: [f64; 2]) -> Axis<'a> {
    Axis::default()
        .title(title.gray())
        .bounds([lo, hi])
        .labels(vec![
            Span::raw(format!("{:.0}", lo)),
            Span::raw(format!("{:.0}", (lo + hi) / 2.0)),
            Span::raw(format!("{:.0}", hi)),
        ])
}

fn render_lines(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    x_label: &str,
    y_label: &str,
    series: &[Series],
    color_offset: usize,
) {
    let x_bounds = axis_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
    let y_bounds = axis_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[(i + color_offset) % SERIES_COLORS.len()]))
                .data(&s.points)
        })
        .collect();
    let chart = ChartWidget::new(datasets)
        .block(block)
        .x_axis(axis(x_label, x_bounds))
        .y_axis(axis(y_label, y_bounds));
    frame.render_widget(chart, area);
}

/// Points are grouped into size buckets; each bucket is one colored dataset.
fn render_scatter(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    x_label: &str,
    y_label: &str,
    points: &[ScatterPoint],
    scale: ColorScale,
) {
    let (lo, hi) = value_range(points.iter().map(|p| p.size)).unwrap_or((0.0, 0.0));
    let mut buckets: Vec<Vec<(f64, f64)>> = vec![Vec::new(); SCATTER_BUCKETS];
    for p in points {
        let t = if hi > lo { (p.size - lo) / (hi - lo) } else { 1.0 };
        let bucket = ((t * (SCATTER_BUCKETS - 1) as f64).round() as usize).min(SCATTER_BUCKETS - 1);
        buckets[bucket].push((p.x, p.y));
    }
    let datasets: Vec<Dataset> = buckets
        .iter()
        .enumerate()
        .filter(|(_, b)| !b.is_empty())
        .map(|(i, b)| {
            let t = i as f64 / (SCATTER_BUCKETS - 1) as f64;
            let upper = lo + (hi - lo) * t;
            Dataset::default()
                .name(format!("prod ~{:.0}", upper))
                .marker(Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(rgb(scale.at(t))))
                .data(b)
        })
        .collect();
    let chart = ChartWidget::new(datasets)
        .block(block)
        .x_axis(axis(x_label, axis_bounds(points.iter().map(|p| p.x))))
        .y_axis(axis(y_label, axis_bounds(points.iter().map(|p| p.y))));
    frame.render_widget(chart, area);
}

/// Renders the help screen.
fn render_help_screen(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Help Screen ")
        .title_style(Style::default().fg(Color::Yellow).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let mut lines = vec![Line::from("Keybinds:"), Line::from("")];
    lines.extend(app.help_keybinds.iter().map(|k| Line::from(format!("  {}", k))));
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Exports are written to {}",
        app.output_dir.display()
    )));
    lines.push(Line::from("Press any key to return."));

    let help_text = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::LightGreen));
    frame.render_widget(help_text, area);
}

/// Renders a common footer area.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let current_screen_name = match app.current_screen {
        CurrentScreen::Dashboard => "Dashboard",
        CurrentScreen::MapView => "Map View",
        CurrentScreen::Help => "Help",
    };

    let current_mode_name = match app.current_mode {
        AppMode::Navigation => "Navigation",
        AppMode::Searching => "Searching",
    };

    let footer_text = Line::from(vec![
        Span::raw("Screen: "),
        Span::styled(
            current_screen_name,
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Mode: "),
        Span::styled(
            current_mode_name,
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " | Rows: {} of {}",
            app.dashboard.matched_rows,
            app.table.len()
        )),
        Span::raw(" | Press "),
        Span::styled(
            "q",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Red),
        ),
        Span::raw(" to quit "),
        Span::raw(" | Press "),
        Span::styled(
            "h",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Green),
        ),
        Span::raw(" for Help "),
    ]);

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let footer = Paragraph::new(footer_text)
        .alignment(Alignment::Center)
        .block(block)
        .style(Style::default().fg(Color::Gray));

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSelection;
    use crate::filter::tests::sample_table;
    use crate::geo::{GeoBoundary, StateShape};
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn app() -> App {
        let square = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let boundary = GeoBoundary::from_shapes(vec![StateShape {
            name: "Kerala".to_string(),
            rings: vec![square],
        }]);
        App::new(
            Arc::new(sample_table()),
            Arc::new(boundary),
            FilterSelection::default(),
            PathBuf::from("output"),
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn dashboard_draws_filters_and_titles() {
        let mut terminal = Terminal::new(TestBackend::new(200, 60)).unwrap();
        let app = app();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Dashboard"));
        assert!(text.contains("Select a state first"));
        assert!(text.contains("Correlation Matrix"));
        assert!(text.contains("Rows: 6 of 6"));
    }

    #[test]
    fn empty_selection_shows_placeholder() {
        let mut terminal = Terminal::new(TestBackend::new(200, 60)).unwrap();
        let mut app = app();
        app.selection.crops.insert("Barley".to_string());
        app.refresh_dashboard();
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("No data available"));
    }

    #[test]
    fn map_view_lists_states_with_totals() {
        let mut terminal = Terminal::new(TestBackend::new(200, 60)).unwrap();
        let mut app = app();
        app.current_screen = CurrentScreen::MapView;
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("(none)"));
        assert!(text.contains("Kerala"));
        assert!(text.contains("Select a state to see district-level analysis."));
    }
}
