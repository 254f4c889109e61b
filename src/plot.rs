// src/plot.rs

//! Horizontal bar chart of feature contributions.

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters_svg::SVGBackend;
use std::path::Path;

use crate::core::{AdrError, FeatureContribution, Result};

const BAR_COLOR: RGBColor = RGBColor(135, 206, 235); // skyblue

fn render_err<E: std::fmt::Display>(e: E) -> AdrError {
    AdrError::Render(e.to_string())
}

/// Draw one bar per contribution, first entry at the bottom, to an SVG file.
pub fn render_contributions(
    contributions: &[FeatureContribution],
    path: &Path,
    size: (u32, u32),
) -> Result<()> {
    if contributions.is_empty() {
        return Err(AdrError::InvalidInput(
            "Nothing to plot: no feature contributions.".to_string(),
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let n = contributions.len();
    let lo = contributions.iter().map(|c| c.value).fold(0.0_f64, f64::min);
    let hi = contributions.iter().map(|c| c.value).fold(0.0_f64, f64::max);
    let pad = ((hi - lo) * 0.1).max(1e-6);
    let names: Vec<&str> = contributions.iter().map(|c| c.feature.as_str()).collect();

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Contribution (SHAP Values)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(240)
        .build_cartesian_2d((lo - pad)..(hi + pad), (0..n).into_segmented())
        .map_err(render_err)?;

    let label = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            names.get(*i).map(|s| s.to_string()).unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("SHAP value")
        .y_label_formatter(&label)
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(contributions.iter().enumerate().map(|(i, c)| {
            let (x0, x1) = if c.value < 0.0 { (c.value, 0.0) } else { (0.0, c.value) };
            let mut bar = Rectangle::new(
                [(x0, SegmentValue::Exact(i)), (x1, SegmentValue::Exact(i + 1))],
                BAR_COLOR.filled(),
            );
            bar.set_margin(6, 6, 0, 0);
            bar
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    log::debug!("Rendered {} bars to {}", n, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributions() -> Vec<FeatureContribution> {
        [("sex", 0.01), ("patient_age", -0.05), ("patient_weight", 0.3)]
            .iter()
            .map(|(f, v)| FeatureContribution {
                feature: f.to_string(),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn writes_svg_with_feature_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plot.svg");
        render_contributions(&contributions(), &path, (640, 400)).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("patient_weight"));
        assert!(svg.contains("Feature Contribution (SHAP Values)"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_contributions(&[], &dir.path().join("p.svg"), (10, 10)).unwrap_err();
        assert!(matches!(err, AdrError::InvalidInput(_)));
    }
}
