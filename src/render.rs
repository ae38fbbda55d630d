// render.rs
//
// Draws chart specifications to PNG files with plotters.

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chart::{Chart, ChartBody, ColorScale, ScatterPoint, Series, value_range};
use crate::geo::GeoBoundary;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;
const LEGEND_WIDTH: u32 = 160;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

fn centered<'a>(font: impl IntoFont<'a>) -> TextStyle<'a> {
    TextStyle::from(font.into_font()).pos(Pos::new(HPos::Center, VPos::Center))
}

/// Axis range around `[lo, hi]`, widened when the data is a single value.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi - lo < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

/// Lowercase, underscore separated file stem for a chart title.
pub fn file_stem(title: &str) -> String {
    let mut stem = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('_') && !stem.is_empty() {
            stem.push('_');
        }
    }
    stem.trim_end_matches('_').to_string()
}

/// Draws `chart` into a PNG at `path`.
pub fn export_chart(chart: &Chart, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    match &chart.body {
        ChartBody::Heatmap {
            labels,
            cells,
            scale,
        } => draw_heatmap(&root, &chart.title, labels, cells, *scale)?,
        ChartBody::DualAxisLine {
            x_label,
            primary_label,
            secondary_label,
            primary,
            secondary,
        } => draw_dual_axis(
            &root,
            &chart.title,
            (x_label, primary_label, secondary_label),
            primary,
            secondary,
        )?,
        ChartBody::Bar {
            x_label,
            y_label,
            bars,
            scale,
        } => draw_bars(&root, &chart.title, (x_label, y_label), bars, *scale)?,
        ChartBody::Choropleth {
            boundary,
            values,
            value_label,
            scale,
        } => draw_choropleth(&root, &chart.title, boundary, values, value_label, *scale)?,
        ChartBody::Scatter {
            x_label,
            y_label,
            size_label,
            points,
            scale,
        } => draw_scatter(
            &root,
            &chart.title,
            (x_label, y_label, size_label),
            points,
            *scale,
        )?,
        ChartBody::Line {
            x_label,
            y_label,
            series,
        } => draw_lines(&root, &chart.title, (x_label, y_label), series)?,
        ChartBody::NoData { message } => {
            let area = root.titled(&chart.title, ("sans-serif", 40))?;
            let (w, h) = area.dim_in_pixel();
            area.draw(&Text::new(
                message.as_str(),
                (w as i32 / 2, h as i32 / 2),
                centered(("sans-serif", 28)),
            ))?;
        }
    }
    root.present()
        .with_context(|| format!("failed to write chart to {}", path.display()))?;
    Ok(())
}

/// Writes every chart into `dir` as `<title>.png`, returning the paths.
pub fn export_all(charts: &[Chart], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let mut written = Vec::with_capacity(charts.len());
    for chart in charts {
        let path = dir.join(format!("{}.png", file_stem(&chart.title)));
        export_chart(chart, &path)?;
        info!(path = %path.display(), title = %chart.title, "chart exported");
        written.push(path);
    }
    Ok(written)
}

fn draw_heatmap(
    root: &Area,
    title: &str,
    labels: &[String],
    cells: &[Vec<Option<f64>>],
    scale: ColorScale,
) -> Result<()> {
    let n = labels.len() as f64;
    // one spare cell on the left and a strip on top hold the labels
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 40).into_font())
        .margin(20)
        .build_cartesian_2d(-1.0f64..n, n..-0.6f64)?;

    for (i, row) in cells.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            let (x, y) = (j as f64, i as f64);
            let fill = match cell {
                Some(v) => rgb(scale.at((v + 1.0) / 2.0)),
                None => RGBColor(220, 220, 220),
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x, y), (x + 1.0, y + 1.0)],
                fill.filled(),
            )))?;
            let text = cell.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v));
            chart.draw_series(std::iter::once(Text::new(
                text,
                (x + 0.5, y + 0.5),
                centered(("sans-serif", 24)),
            )))?;
        }
    }
    for (k, label) in labels.iter().enumerate() {
        let c = k as f64 + 0.5;
        chart.draw_series(std::iter::once(Text::new(label.clone(), (c, -0.3), centered(("sans-serif", 20)))))?;
        chart.draw_series(std::iter::once(Text::new(label.clone(), (-0.5, c), centered(("sans-serif", 20)))))?;
    }
    Ok(())
}

fn draw_dual_axis(
    root: &Area,
    title: &str,
    (x_label, primary_label, secondary_label): (&str, &str, &str),
    primary: &[Series],
    secondary: &[Series],
) -> Result<()> {
    let all_x = primary.iter().chain(secondary).flat_map(|s| s.points.iter().map(|p| p.0));
    let (x0, x1) = padded(value_range(all_x).unwrap_or((0.0, 1.0)));
    let (p0, p1) = padded(
        value_range(primary.iter().flat_map(|s| s.points.iter().map(|p| p.1))).unwrap_or((0.0, 1.0)),
    );
    let (s0, s1) = padded(
        value_range(secondary.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
            .unwrap_or((0.0, 1.0)),
    );

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 40).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x0..x1, p0..p1)?
        .set_secondary_coord(x0..x1, s0..s1);

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(primary_label)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()?;
    chart.configure_secondary_axes().y_desc(secondary_label).draw()?;

    let colors = [BLUE.to_rgba(), GREEN.to_rgba()];
    for (i, s) in primary.iter().enumerate() {
        let color = colors.get(i).copied().unwrap_or_else(|| Palette99::pick(i).to_rgba());
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(s.points.iter().map(|p| Circle::new(*p, 3, color.filled())))?;
    }
    let orange = RGBColor(255, 165, 0).to_rgba();
    for s in secondary {
        chart
            .draw_secondary_series(LineSeries::new(s.points.iter().copied(), orange.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], orange));
        chart.draw_secondary_series(s.points.iter().map(|p| Circle::new(*p, 3, orange.filled())))?;
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars(
    root: &Area,
    title: &str,
    (x_label, y_label): (&str, &str),
    bars: &[(String, f64)],
    scale: ColorScale,
) -> Result<()> {
    let (lo, hi) = value_range(bars.iter().map(|b| b.1)).unwrap_or((0.0, 1.0));
    let top = if hi > 0.0 { hi * 1.1 } else { 1.0 };
    let n = bars.len() as u32;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 40).into_font())
        .margin(15)
        .x_label_area_size(140)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..n).into_segmented(), lo.min(0.0)..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_labels(bars.len())
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|b| b.0.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .margin(5)
            .style_func(move |_, v: &f64| rgb(scale.color_for(*v, lo, hi)).filled())
            .data(bars.iter().enumerate().map(|(i, b)| (i as u32, b.1))),
    )?;
    Ok(())
}

fn draw_choropleth(
    root: &Area,
    title: &str,
    boundary: &GeoBoundary,
    values: &[Option<f64>],
    value_label: &str,
    scale: ColorScale,
) -> Result<()> {
    let root = root.titled(title, ("sans-serif", 40))?;
    let (w, _) = root.dim_in_pixel();
    let (map_area, legend_area) = root.split_horizontally(w.saturating_sub(LEGEND_WIDTH) as i32);
    let (lon, lat) = boundary.padded_bounds(0.1);
    let range = value_range(values.iter().flatten().copied());

    let mut chart = ChartBuilder::on(&map_area)
        .margin(10)
        .build_cartesian_2d(lon[0]..lon[1], lat[0]..lat[1])?;

    for (shape, value) in boundary.shapes().iter().zip(values) {
        for ring in &shape.rings {
            if let (Some(v), Some((lo, hi))) = (value, range) {
                chart.draw_series(std::iter::once(Polygon::new(
                    ring.clone(),
                    rgb(scale.color_for(*v, lo, hi)).filled(),
                )))?;
            }
            chart.draw_series(std::iter::once(PathElement::new(
                ring.clone(),
                RGBColor(90, 90, 90).stroke_width(1),
            )))?;
        }
    }

    if let Some((lo, hi)) = range {
        let (b0, b1) = padded((lo, hi));
        let mut legend = ChartBuilder::on(&legend_area)
            .margin(20)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0f64..1.0, b0..b1)?;
        legend
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_desc(value_label)
            .draw()?;
        let steps = 64;
        legend.draw_series((0..steps).map(|k| {
            let a = b0 + (b1 - b0) * k as f64 / steps as f64;
            let b = b0 + (b1 - b0) * (k + 1) as f64 / steps as f64;
            Rectangle::new(
                [(0.0, a), (1.0, b)],
                rgb(scale.color_for((a + b) / 2.0, lo, hi)).filled(),
            )
        }))?;
    }
    Ok(())
}

fn draw_scatter(
    root: &Area,
    title: &str,
    (x_label, y_label, size_label): (&str, &str, &str),
    points: &[ScatterPoint],
    scale: ColorScale,
) -> Result<()> {
    let (x0, x1) = padded(value_range(points.iter().map(|p| p.x)).unwrap_or((0.0, 1.0)));
    let (y0, y1) = padded(value_range(points.iter().map(|p| p.y)).unwrap_or((0.0, 1.0)));
    let (lo, hi) = value_range(points.iter().map(|p| p.size)).unwrap_or((0.0, 1.0));
    let largest = hi.max(0.0);

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{} (size and color: {})", title, size_label),
            ("sans-serif", 32).into_font(),
        )
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart.configure_mesh().x_desc(x_label).y_desc(y_label).draw()?;
    chart.draw_series(points.iter().map(|p| {
        let radius = if largest > 0.0 {
            4.0 + 26.0 * (p.size.max(0.0) / largest).sqrt()
        } else {
            6.0
        };
        Circle::new(
            (p.x, p.y),
            radius as i32,
            rgb(scale.color_for(p.size, lo, hi)).mix(0.7).filled(),
        )
    }))?;
    Ok(())
}

fn draw_lines(
    root: &Area,
    title: &str,
    (x_label, y_label): (&str, &str),
    series: &[Series],
) -> Result<()> {
    let (x0, x1) = padded(
        value_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))).unwrap_or((0.0, 1.0)),
    );
    let (y0, y1) = padded(
        value_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1))).unwrap_or((0.0, 1.0)),
    );

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 40).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(s.points.iter().map(|p| Circle::new(*p, 3, color.filled())))?;
    }
    if series.len() > 1 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}
