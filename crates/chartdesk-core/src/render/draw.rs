use std::path::Path;

use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::chart::{hex_to_rgb, ChartType, Palette};
use crate::error::{ChartError, ChartResult};

use super::ChartSpec;

pub const CANVAS_SIZE: (u32, u32) = (1000, 600);

// Value captions get crowded past these counts.
const BAR_VALUE_LABEL_LIMIT: usize = 20;
const LINE_VALUE_LABEL_LIMIT: usize = 15;

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// Text layout goes through the registered font for every backend.
static FONT_READY: Lazy<Result<(), String>> = Lazy::new(|| {
    register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
        .map_err(|_| "embedded chart font could not be loaded".to_string())
});

fn ensure_font() -> ChartResult<()> {
    match &*FONT_READY {
        Ok(()) => Ok(()),
        Err(e) => Err(ChartError::Render(e.clone())),
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

fn color(hex: &str) -> ChartResult<RGBColor> {
    hex_to_rgb(hex)
        .map(|(r, g, b)| RGBColor(r, g, b))
        .ok_or_else(|| ChartError::Render(format!("invalid palette color '{}'", hex)))
}

/// Y-axis range that keeps zero in view and leaves headroom for captions.
fn y_range(values: &[f64]) -> ChartResult<(f64, f64)> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ChartError::Render(format!("cannot plot value {}", bad)));
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min).min(0.0);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(0.0);
    let span = (max - min).max(1.0);
    let lower = if min < 0.0 { min - span * 0.1 } else { 0.0 };
    let upper = max + span * 0.1;
    if !span.is_finite() || !lower.is_finite() || !upper.is_finite() {
        return Err(ChartError::Render(format!(
            "values between {} and {} are too far apart to plot",
            min, max
        )));
    }
    Ok((lower, upper))
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

fn check_series(labels: &[String], values: &[f64]) -> ChartResult<()> {
    if labels.is_empty() || labels.len() != values.len() {
        return Err(ChartError::Render(format!(
            "cannot draw {} labels against {} values",
            labels.len(),
            values.len()
        )));
    }
    Ok(())
}

/// Draw an already-sampled series into an SVG document.
pub fn draw_svg(
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    palette: Palette,
) -> ChartResult<String> {
    check_series(labels, values)?;
    ensure_font()?;

    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, CANVAS_SIZE).into_drawing_area();
        plot(&root, spec, labels, values, palette)?;
    }
    Ok(buffer)
}

/// Draw an already-sampled series into a PNG file at `path`.
pub fn draw_png(
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    palette: Palette,
    path: &Path,
) -> ChartResult<()> {
    check_series(labels, values)?;
    ensure_font()?;

    let root = BitMapBackend::new(path, CANVAS_SIZE).into_drawing_area();
    plot(&root, spec, labels, values, palette)
}

fn plot<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    palette: Palette,
) -> ChartResult<()> {
    let primary = color(palette.primary)?;
    let content = color(palette.content)?;
    let background = color(palette.background)?;
    let n = labels.len() as u32;
    let (y_min, y_max) = y_range(values)?;

    {
        root.fill(&background).map_err(render_err)?;

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, (FONT_FAMILY, 28).into_font().color(&content))
            .margin(24)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), y_min..y_max)
            .map_err(render_err)?;

        let x_formatter = |x: &SegmentValue<u32>| match x {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        let y_formatter = |y: &f64| format_value(*y);

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(labels.len())
            .y_labels(8)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .axis_style(ShapeStyle::from(&content).stroke_width(1))
            .light_line_style(ShapeStyle::from(&content.mix(0.05)).stroke_width(1))
            .bold_line_style(ShapeStyle::from(&content.mix(0.15)).stroke_width(1))
            .label_style((FONT_FAMILY, 13).into_font().color(&content))
            .axis_desc_style((FONT_FAMILY, 15).into_font().color(&content));
        if let Some(x_label) = &spec.x_label {
            mesh.x_desc(x_label.as_str());
        }
        if let Some(y_label) = &spec.y_label {
            mesh.y_desc(y_label.as_str());
        }
        mesh.draw().map_err(render_err)?;

        let caption_style = (FONT_FAMILY, 12)
            .into_font()
            .color(&content)
            .pos(Pos::new(HPos::Center, VPos::Bottom));

        match spec.chart_type {
            ChartType::Bar => {
                chart
                    .draw_series(values.iter().enumerate().map(|(i, &v)| {
                        let i = i as u32;
                        let mut bar = Rectangle::new(
                            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                            primary.filled(),
                        );
                        bar.set_margin(0, 0, 6, 6);
                        bar
                    }))
                    .map_err(render_err)?;

                if values.len() <= BAR_VALUE_LABEL_LIMIT {
                    chart
                        .draw_series(values.iter().enumerate().map(|(i, &v)| {
                            Text::new(
                                format_value(v),
                                (SegmentValue::CenterOf(i as u32), v),
                                caption_style.clone(),
                            )
                        }))
                        .map_err(render_err)?;
                }
            }
            ChartType::Line => {
                let points: Vec<(SegmentValue<u32>, f64)> = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (SegmentValue::CenterOf(i as u32), v))
                    .collect();

                chart
                    .draw_series(LineSeries::new(
                        points.iter().cloned(),
                        primary.stroke_width(3),
                    ))
                    .map_err(render_err)?;
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|(x, y)| Circle::new((x.clone(), *y), 5, primary.filled())),
                    )
                    .map_err(render_err)?;

                if values.len() <= LINE_VALUE_LABEL_LIMIT {
                    chart
                        .draw_series(points.iter().map(|(x, y)| {
                            Text::new(format_value(*y), (x.clone(), *y), caption_style.clone())
                        }))
                        .map_err(render_err)?;
                }
            }
        }
    }

    root.present().map_err(render_err)
}
