pub mod draw;
pub mod sampling;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::chart::{ChartType, ColorScheme};
use crate::decision::ChartRequestDecision;
use crate::error::{ChartError, ChartResult};

pub use sampling::{sample_series, smart_sample, DEFAULT_MAX_POINTS};

/// Everything the renderer needs besides the palette.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_labels: Vec<String>,
    pub y_values: Vec<f64>,
}

impl ChartSpec {
    /// Chart to draw for a valid decision that carries data. The chart type falls back
    /// to `default_type` when the decision left it open.
    pub fn from_decision(decision: &ChartRequestDecision, default_type: ChartType) -> Option<Self> {
        if !decision.is_valid {
            return None;
        }
        let series = decision.series()?;
        let chart_type = decision.chart_type.unwrap_or(default_type);
        Some(Self {
            chart_type,
            title: decision
                .title
                .clone()
                .unwrap_or_else(|| format!("{} Chart", chart_type.display_name())),
            x_label: decision.x_axis_label.clone(),
            y_label: decision.y_axis_label.clone(),
            x_labels: series.x_labels,
            y_values: series.y_values,
        })
    }
}

/// File formats written for every chart id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Svg,
    Png,
}

impl ChartFormat {
    pub fn parse(s: &str) -> ChartResult<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "svg" => Ok(ChartFormat::Svg),
            "png" => Ok(ChartFormat::Png),
            other => Err(ChartError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "image/svg+xml",
            ChartFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub chart_id: String,
    /// The SVG file. A PNG with the same id sits next to it.
    pub path: PathBuf,
    /// Points drawn after sampling.
    pub sampled_points: usize,
}

/// Writes chart files into a single directory, one file per chart id and format.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    charts_dir: PathBuf,
    max_points: usize,
    keep_latest_only: bool,
}

impl ChartRenderer {
    pub fn new(charts_dir: impl Into<PathBuf>, max_points: usize, keep_latest_only: bool) -> Self {
        Self {
            charts_dir: charts_dir.into(),
            max_points,
            keep_latest_only,
        }
    }

    pub fn charts_dir(&self) -> &Path {
        &self.charts_dir
    }

    pub fn render(&self, spec: &ChartSpec, scheme: ColorScheme) -> ChartResult<RenderedChart> {
        if spec.x_labels.is_empty() || spec.x_labels.len() != spec.y_values.len() {
            return Err(ChartError::Render(format!(
                "chart needs aligned, non-empty data ({} labels, {} values)",
                spec.x_labels.len(),
                spec.y_values.len()
            )));
        }
        if let Some(bad) = spec.y_values.iter().find(|v| !v.is_finite()) {
            return Err(ChartError::Render(format!("cannot plot value {}", bad)));
        }

        let (labels, values) = sample_series(&spec.x_labels, &spec.y_values, self.max_points);
        if labels.len() < spec.x_labels.len() {
            debug!(
                "Sampled {} of {} points for '{}'",
                labels.len(),
                spec.x_labels.len(),
                spec.title
            );
        }

        let palette = scheme.palette();
        let document = draw::draw_svg(spec, &labels, &values, palette)?;

        fs::create_dir_all(&self.charts_dir)?;
        if self.keep_latest_only {
            self.clear_previous()?;
        }

        let chart_id = Uuid::new_v4().to_string();
        let path = self.file_path(&chart_id, ChartFormat::Svg);
        fs::write(&path, document)?;

        let png_path = self.file_path(&chart_id, ChartFormat::Png);
        if let Err(e) = draw::draw_png(spec, &labels, &values, palette, &png_path) {
            let _ = fs::remove_file(&path);
            let _ = fs::remove_file(&png_path);
            return Err(e);
        }

        info!(
            "Rendered {} chart {} ({} scheme) to {:?}",
            spec.chart_type.as_str(),
            chart_id,
            scheme.as_str(),
            path
        );

        Ok(RenderedChart {
            chart_id,
            path,
            sampled_points: labels.len(),
        })
    }

    /// Location of a previously rendered chart. Ids that are not UUIDs are
    /// rejected so they can never address files outside the charts directory.
    pub fn chart_path(&self, chart_id: &str, format: &str) -> ChartResult<PathBuf> {
        let format = ChartFormat::parse(format)?;
        let id = Uuid::parse_str(chart_id)
            .map_err(|_| ChartError::NotFound(chart_id.to_string()))?;

        let path = self.file_path(&id.to_string(), format);
        if !path.is_file() {
            return Err(ChartError::NotFound(chart_id.to_string()));
        }
        Ok(path)
    }

    fn file_path(&self, chart_id: &str, format: ChartFormat) -> PathBuf {
        self.charts_dir
            .join(format!("{}.{}", chart_id, format.extension()))
    }

    fn clear_previous(&self) -> ChartResult<()> {
        for entry in fs::read_dir(&self.charts_dir)? {
            let path = entry?.path();
            let is_chart = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ChartFormat::parse(ext).is_ok())
                .unwrap_or(false);
            if is_chart && path.is_file() {
                fs::remove_file(&path)?;
                debug!("Removed old chart {:?}", path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ChartSeries;
    use tempfile::TempDir;

    fn spec(n: usize) -> ChartSpec {
        ChartSpec {
            chart_type: ChartType::Line,
            title: "Daily Visitors".to_string(),
            x_label: Some("Day".to_string()),
            y_label: Some("Visitors".to_string()),
            x_labels: (1..=n).map(|i| format!("D{}", i)).collect(),
            y_values: (1..=n).map(|i| i as f64 * 2.0).collect(),
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ChartFormat::parse("SVG").unwrap(), ChartFormat::Svg);
        assert_eq!(ChartFormat::parse(".svg").unwrap(), ChartFormat::Svg);
        assert_eq!(ChartFormat::parse("png").unwrap(), ChartFormat::Png);
        assert_eq!(ChartFormat::Png.content_type(), "image/png");
        assert!(matches!(
            ChartFormat::parse("gif"),
            Err(ChartError::UnsupportedFormat(f)) if f == "gif"
        ));
    }

    #[test]
    fn test_spec_from_decision() {
        let series = ChartSeries::new(vec!["A".into(), "B".into()], vec![1.0, 2.0]).unwrap();
        let decision =
            ChartRequestDecision::accept(series, ChartType::Bar, "T", ("Category", "Value"), None);
        let spec = ChartSpec::from_decision(&decision, ChartType::Line).unwrap();
        assert_eq!(spec.chart_type, ChartType::Bar);
        assert_eq!(spec.x_label.as_deref(), Some("Category"));

        let refused = ChartRequestDecision::refuse("no");
        assert!(ChartSpec::from_decision(&refused, ChartType::Bar).is_none());
    }

    #[test]
    fn test_render_writes_file_and_samples() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, false);

        let rendered = renderer.render(&spec(100), ColorScheme::Fd).unwrap();
        assert!(rendered.path.is_file());
        assert_eq!(rendered.sampled_points, 34);

        let found = renderer.chart_path(&rendered.chart_id, "svg").unwrap();
        assert_eq!(found, rendered.path);
        let svg = fs::read_to_string(found).unwrap();
        assert!(svg.contains("D1"));
        assert!(svg.contains("D100"));
    }

    #[test]
    fn test_render_writes_png_alongside_svg() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, false);

        let rendered = renderer.render(&spec(5), ColorScheme::Bnr).unwrap();
        let png = renderer.chart_path(&rendered.chart_id, "png").unwrap();
        assert_eq!(png.extension().and_then(|e| e.to_str()), Some("png"));
        assert!(fs::read(png).unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_render_rejects_values_that_are_not_finite() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, false);

        let mut bad = spec(2);
        bad.y_values = vec![f64::INFINITY, 2.0];
        assert!(matches!(
            renderer.render(&bad, ColorScheme::Fd),
            Err(ChartError::Render(_))
        ));
        bad.y_values = vec![f64::NAN, 2.0];
        assert!(renderer.render(&bad, ColorScheme::Fd).is_err());
        assert_eq!(fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[test]
    fn test_keep_latest_only_removes_previous() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, true);

        let first = renderer.render(&spec(3), ColorScheme::Fd).unwrap();
        let second = renderer.render(&spec(3), ColorScheme::Bnr).unwrap();
        assert!(!first.path.exists());
        assert!(renderer.chart_path(&first.chart_id, "png").is_err());
        assert!(second.path.exists());
        assert!(renderer.chart_path(&second.chart_id, "png").is_ok());

        let keeping = ChartRenderer::new(dir.path(), 30, false);
        let third = keeping.render(&spec(3), ColorScheme::Fd).unwrap();
        assert!(second.path.exists() && third.path.exists());
    }

    #[test]
    fn test_chart_path_rejects_unknown_ids() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, false);
        assert!(matches!(
            renderer.chart_path("../../etc/passwd", "svg"),
            Err(ChartError::NotFound(_))
        ));
        assert!(matches!(
            renderer.chart_path(&Uuid::new_v4().to_string(), "svg"),
            Err(ChartError::NotFound(_))
        ));
    }

    #[test]
    fn test_render_rejects_empty_spec() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), 30, false);
        assert!(renderer.render(&spec(0), ColorScheme::Fd).is_err());
    }
}
