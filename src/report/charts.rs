use crate::performance::metrics::StatsRow;
use crate::report::{Pivot, ResultSet};
use crate::scenario::Protocol;
use anyhow::Result;
use owo_colors::OwoColorize;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette::{BLUE_700, GREEN_700, ORANGE_700, RED_700};
use std::path::{Path, PathBuf};

type Panel<'a> = DrawingArea<SVGBackend<'a>, Shift>;

pub const CHART_FILES: [&str; 5] = [
    "response_time_comparison.svg",
    "requests_per_second.svg",
    "failure_rate.svg",
    "percentiles_comparison.svg",
    "overall_performance.svg",
];

const PANEL_WIDTH: u32 = 600;
const PANEL_HEIGHT: u32 = 500;
const TITLE_FONT: (&str, u32) = ("sans-serif", 28);
const PANEL_FONT: (&str, u32) = ("sans-serif", 20);

pub fn protocol_color(protocol: Protocol) -> RGBColor {
    match protocol {
        Protocol::Rest => GREEN_700,
        Protocol::GraphQl => BLUE_700,
        Protocol::Soap => ORANGE_700,
        Protocol::Grpc => RED_700,
    }
}

/// How a chart panel plots its pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Bars,
    Lines,
}

struct PanelSpec<'a> {
    title: String,
    x_desc: &'a str,
    y_desc: &'a str,
    style: Style,
}

/// Renders the five comparison charts into `charts_dir`.
pub fn render_all(results: &ResultSet, charts_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut generated = Vec::new();

    generated.push(per_user_count_chart(
        results,
        charts_dir,
        CHART_FILES[0],
        "Comparação de Tempo de Resposta Médio por Protocolo",
        "Tempo Médio (ms)",
        |r| Some(r.average_response_time),
    )?);
    generated.push(per_user_count_chart(
        results,
        charts_dir,
        CHART_FILES[1],
        "Comparação de Requisições por Segundo (RPS)",
        "Requisições/s",
        |r| Some(r.requests_per_second),
    )?);
    generated.push(per_user_count_chart(
        results,
        charts_dir,
        CHART_FILES[2],
        "Comparação de Taxa de Falhas (%)",
        "Taxa de Falhas (%)",
        |r| Some(r.failure_rate()),
    )?);
    generated.push(percentiles_chart(results, charts_dir)?);
    generated.push(overall_chart(results, charts_dir)?);

    Ok(generated)
}

fn announce(title: &str) {
    println!();
    println!("{} Generating chart: {}", "📊".bright_white(), title);
}

fn saved(path: &Path) {
    println!("  {} Saved: {}", "✓".green(), path.display());
}

/// One bar panel per user count, tasks on the x axis, one bar per protocol.
fn per_user_count_chart<F>(
    results: &ResultSet,
    charts_dir: &Path,
    file_name: &str,
    title: &str,
    y_desc: &str,
    metric: F,
) -> Result<PathBuf>
where
    F: Fn(&StatsRow) -> Option<f64> + Copy,
{
    announce(title);
    let path = charts_dir.join(file_name);
    let columns = results.user_counts.len().max(1) as u32;

    {
        let root = SVGBackend::new(&path, (PANEL_WIDTH * columns, PANEL_HEIGHT + 60))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, TITLE_FONT)?;
        let panels = root.split_evenly((1, columns as usize));

        for (panel, &user_count) in panels.iter().zip(&results.user_counts) {
            let pivot = results.endpoint_pivot(user_count, metric);
            draw_panel(
                panel,
                &pivot,
                &PanelSpec {
                    title: format!("{} Usuários", user_count),
                    x_desc: "Funcionalidade",
                    y_desc,
                    style: Style::Bars,
                },
            )?;
        }
        root.present()?;
    }

    saved(&path);
    Ok(path)
}

/// Grid of p50/p95/p99 panels, one row per user count.
fn percentiles_chart(results: &ResultSet, charts_dir: &Path) -> Result<PathBuf> {
    let title = "Comparação de Percentis de Tempo de Resposta (p50, p95, p99)";
    announce(title);
    let path = charts_dir.join(CHART_FILES[3]);

    let percentiles: [(&str, fn(&StatsRow) -> Option<f64>); 3] =
        [("50%", |r| r.p50), ("95%", |r| r.p95), ("99%", |r| r.p99)];
    let rows = results.user_counts.len().max(1);

    {
        let root = SVGBackend::new(
            &path,
            (PANEL_WIDTH * 3, PANEL_HEIGHT * rows as u32 + 60),
        )
        .into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, TITLE_FONT)?;
        let panels = root.split_evenly((rows, 3));

        for (row_idx, &user_count) in results.user_counts.iter().enumerate() {
            for (col_idx, (label, metric)) in percentiles.iter().enumerate() {
                let pivot = results.endpoint_pivot(user_count, metric);
                draw_panel(
                    &panels[row_idx * 3 + col_idx],
                    &pivot,
                    &PanelSpec {
                        title: format!("{} Usuários - Percentil {}", user_count, label),
                        x_desc: "Funcionalidade",
                        y_desc: "Tempo (ms)",
                        style: Style::Bars,
                    },
                )?;
            }
        }
        root.present()?;
    }

    saved(&path);
    Ok(path)
}

/// Aggregated rows only: how each protocol scales with the number of users.
fn overall_chart(results: &ResultSet, charts_dir: &Path) -> Result<PathBuf> {
    let title = "Performance Geral por Protocolo";
    announce(title);
    let path = charts_dir.join(CHART_FILES[4]);

    let quadrants: [(&str, &str, Style, fn(&StatsRow) -> Option<f64>); 4] = [
        (
            "Tempo Médio de Resposta",
            "Tempo Médio (ms)",
            Style::Lines,
            |r| Some(r.average_response_time),
        ),
        (
            "Requisições por Segundo",
            "Requisições/s",
            Style::Lines,
            |r| Some(r.requests_per_second),
        ),
        (
            "Total de Requisições",
            "Total de Requisições",
            Style::Bars,
            |r| Some(r.request_count as f64),
        ),
        (
            "Taxa de Falhas",
            "Taxa de Falhas (%)",
            Style::Lines,
            |r| Some(r.failure_rate()),
        ),
    ];

    {
        let root = SVGBackend::new(&path, (PANEL_WIDTH * 2, PANEL_HEIGHT * 2 + 60))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, TITLE_FONT)?;
        let panels = root.split_evenly((2, 2));

        for (panel, (panel_title, y_desc, style, metric)) in panels.iter().zip(quadrants) {
            let pivot = results.aggregated_pivot(metric);
            draw_panel(
                panel,
                &pivot,
                &PanelSpec {
                    title: panel_title.to_string(),
                    x_desc: "Número de Usuários",
                    y_desc,
                    style,
                },
            )?;
        }
        root.present()?;
    }

    saved(&path);
    Ok(path)
}

/// Label of the category centered at `x`, or nothing between categories.
fn category_label(categories: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    categories
        .get(index as usize)
        .cloned()
        .unwrap_or_default()
}

fn axis_value(y: f64) -> String {
    if y.abs() < 10.0 {
        format!("{:.1}", y)
    } else {
        format!("{:.0}", y)
    }
}

/// Draws one pivot. Category `i` is centered on `x = i`; with one axis label per
/// category the mesh puts its ticks on those centers.
fn draw_panel(panel: &Panel<'_>, pivot: &Pivot, spec: &PanelSpec<'_>) -> Result<()> {
    let categories = pivot.categories.len().max(1);
    let y_max = match pivot.max_value() {
        v if v > 0.0 => v * 1.1,
        _ => 1.0,
    };

    let mut chart = ChartBuilder::on(panel)
        .caption(&spec.title, PANEL_FONT)
        .margin(15)
        .x_label_area_size(70)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(categories as f64 - 0.5), 0f64..y_max)?;

    let labels = pivot.categories.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories)
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_label_formatter(&|y| axis_value(*y))
        .x_desc(spec.x_desc)
        .y_desc(spec.y_desc)
        .light_line_style(WHITE.mix(0.0))
        .bold_line_style(BLACK.mix(0.1))
        .draw()?;

    let group_width = 0.8 / pivot.protocols.len().max(1) as f64;

    for (slot, &protocol) in pivot.protocols.iter().enumerate() {
        let color = protocol_color(protocol);
        let points: Vec<(f64, f64)> = pivot
            .categories
            .iter()
            .enumerate()
            .filter_map(|(i, c)| pivot.value(c, protocol).map(|v| (i as f64, v)))
            .collect();

        let series = match spec.style {
            Style::Bars => chart.draw_series(points.iter().map(|&(x, v)| {
                let left = x - 0.4 + slot as f64 * group_width;
                Rectangle::new([(left, 0.0), (left + group_width, v)], color.filled())
            }))?,
            Style::Lines => {
                chart.draw_series(
                    points
                        .iter()
                        .map(|&point| Circle::new(point, 4, color.filled())),
                )?;
                chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            }
        };

        series
            .label(protocol.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    if !pivot.protocols.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.3))
            .draw()?;
    }

    Ok(())
}
