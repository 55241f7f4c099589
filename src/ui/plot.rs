use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{
    Bar, BarChart as PlotBars, GridMark, Legend, Plot, PlotPoints, PlotUi, Points,
    uniform_grid_spacer,
};

use crate::config::ChartLayout;
use crate::dashboard::Interaction;
use crate::dashboard::charts::{
    BarChart, BarDatum, ScatterPlot, ScatterPoint, StackedBarChart, ValueAccessor, YAxis,
};
use crate::data::index::{CrossFilter, DimensionFilter, DimensionId};
use crate::data::reduce::Reducer;

// ---------------------------------------------------------------------------
// Chart frame
// ---------------------------------------------------------------------------

struct ChartHeader<'a> {
    title: &'a str,
    layout: &'a ChartLayout,
    /// Dimension the chart filters, if any.
    dimension: Option<DimensionId>,
}

/// Title row with an optional reset control, then the chart inside its
/// margins. Returns whatever the chart body returns.
fn chart_frame<T>(
    ui: &mut Ui,
    header: ChartHeader<'_>,
    index: &CrossFilter,
    actions: &mut Vec<Interaction>,
    body: impl FnOnce(&mut Ui, [f32; 2]) -> T,
) -> T {
    let ChartHeader {
        title,
        layout,
        dimension,
    } = header;
    let m = layout.margins;
    let inner = [
        (layout.width - m.left - m.right).max(50.0),
        (layout.height - m.top - m.bottom).max(50.0),
    ];

    ui.vertical(|ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            ui.strong(title);
            let filtered = dimension
                .and_then(|d| index.filter_of(d).ok())
                .is_some_and(|f| !f.is_all());
            if let (true, Some(d)) = (filtered, dimension) {
                if ui.small_button("reset").clicked() {
                    actions.push(Interaction::Reset(d));
                }
            }
        });
        ui.add_space(m.top);
        let out = ui
            .horizontal(|ui: &mut Ui| {
                ui.add_space(m.left);
                let out = body(ui, inner);
                ui.add_space(m.right);
                out
            })
            .inner;
        ui.add_space(m.bottom);
        out
    })
    .inner
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Category index under a plot x coordinate, if the pointer is on a bar.
pub fn category_at(x: f64, categories: usize) -> Option<usize> {
    let i = x.round();
    if (x - i).abs() > 0.4 || i < 0.0 || i as usize >= categories {
        return None;
    }
    Some(i as usize)
}

/// A 1, 2 or 5 × 10ⁿ step giving at most `ticks` intervals up to `max`.
pub fn tick_step(max: f64, ticks: usize) -> f64 {
    if max <= 0.0 || ticks == 0 {
        return 1.0;
    }
    let raw = max / ticks as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude)
}

fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        category_at(mark.value, labels.len())
            .filter(|i| (mark.value - *i as f64).abs() < 1e-6)
            .map(|i| labels[i].clone())
            .unwrap_or_default()
    }
}

fn clicked_category(plot_ui: &PlotUi, categories: usize) -> Option<usize> {
    if !plot_ui.response().clicked() {
        return None;
    }
    plot_ui
        .pointer_coordinate()
        .and_then(|p| category_at(p.x, categories))
}

fn categorical(plot: Plot, size: [f32; 2], x_label: String, labels: Vec<String>) -> Plot {
    plot.width(size[0])
        .height(size[1])
        .x_axis_label(x_label)
        .x_axis_formatter(category_formatter(labels))
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .include_y(0.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
}

fn bar_fill(base: Color32, filter: &DimensionFilter, bar: &BarDatum) -> Color32 {
    if filter.accepts(&bar.key) {
        base
    } else {
        base.gamma_multiply(0.3)
    }
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Render a categorical bar chart. Clicking a bar toggles its key.
pub fn bar_chart<R, V>(
    ui: &mut Ui,
    chart: &BarChart<R, V>,
    index: &CrossFilter,
    actions: &mut Vec<Interaction>,
) where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    let data = chart.bars();
    let dimension = chart.dimension();
    let filter = index.filter_of(dimension).cloned().unwrap_or_default();
    let labels: Vec<String> = data.iter().map(|b| b.label.clone()).collect();
    let max = data.iter().map(|b| b.value).fold(0.0, f64::max);

    let header = ChartHeader {
        title: chart.anchor,
        layout: &chart.layout,
        dimension: Some(dimension),
    };
    let clicked = chart_frame(ui, header, index, actions, |ui, size| {
        let mut plot = categorical(
            Plot::new(chart.anchor),
            size,
            chart.x_label.clone(),
            labels.clone(),
        );
        plot = match chart.y_axis {
            YAxis::Ticks(ticks) => {
                let step = tick_step(max, ticks);
                plot.include_y((max / step).ceil() * step)
                    .y_grid_spacer(uniform_grid_spacer(move |_| [step, step * 5.0, step * 25.0]))
            }
            YAxis::Elastic { ticks } => {
                let step = tick_step(max, ticks);
                plot.y_grid_spacer(uniform_grid_spacer(move |_| [step, step * 5.0, step * 25.0]))
            }
        };

        plot.show(ui, |plot_ui| {
            let bars: Vec<Bar> = data
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    Bar::new(i as f64, b.value)
                        .name(&b.label)
                        .width(0.6)
                        .fill(bar_fill(chart.color, &filter, b))
                })
                .collect();
            plot_ui.bar_chart(PlotBars::new(bars).color(chart.color));
            clicked_category(plot_ui, data.len())
        })
        .inner
    });

    if let Some(i) = clicked {
        actions.push(Interaction::Toggle {
            dimension,
            key: data[i].key.clone(),
        });
    }
}

/// Render a stacked bar chart with a legend. Clicking a stack toggles its
/// key.
pub fn stacked_bar_chart<R, V>(
    ui: &mut Ui,
    chart: &StackedBarChart<R, V>,
    index: &CrossFilter,
    actions: &mut Vec<Interaction>,
) where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    let series = chart.series();
    let dimension = chart.dimension();
    let filter = index.filter_of(dimension).cloned().unwrap_or_default();
    let Some(base) = series.first() else {
        return;
    };
    let labels: Vec<String> = base.bars.iter().map(|b| b.label.clone()).collect();
    let keys: Vec<_> = base.bars.iter().map(|b| b.key.clone()).collect();

    let header = ChartHeader {
        title: chart.anchor,
        layout: &chart.layout,
        dimension: Some(dimension),
    };
    let clicked = chart_frame(ui, header, index, actions, |ui, size| {
        categorical(
            Plot::new(chart.anchor),
            size,
            chart.x_label.clone(),
            labels.clone(),
        )
        .legend(Legend::default())
        .include_y(100.0)
        .show(ui, |plot_ui| {
            let mut stacked: Vec<PlotBars> = Vec::with_capacity(series.len());
            for layer in &series {
                let bars: Vec<Bar> = layer
                    .bars
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        Bar::new(i as f64, b.value)
                            .name(format!("{}: {:.2}%", b.label, b.value))
                            .width(0.6)
                            .fill(bar_fill(layer.color, &filter, b))
                    })
                    .collect();
                let below: Vec<&PlotBars> = stacked.iter().collect();
                let layer_bars = PlotBars::new(bars)
                    .name(&layer.name)
                    .color(layer.color)
                    .stack_on(&below);
                stacked.push(layer_bars);
            }
            for layer_bars in stacked {
                plot_ui.bar_chart(layer_bars);
            }
            clicked_category(plot_ui, keys.len())
        })
        .inner
    });

    if let Some(i) = clicked {
        actions.push(Interaction::Toggle {
            dimension,
            key: keys[i].clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Scatter plots
// ---------------------------------------------------------------------------

fn span(values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi > lo { hi - lo } else { 1.0 }
}

/// Title of the point nearest to `(x, y)`, distances scaled by each axis span.
pub fn nearest_title(points: &[ScatterPoint], x: f64, y: f64) -> Option<&str> {
    let sx = span(points.iter().map(|p| p.x));
    let sy = span(points.iter().map(|p| p.y));

    points
        .iter()
        .map(|p| {
            let dx = (p.x - x) / sx;
            let dy = (p.y - y) / sy;
            (dx * dx + dy * dy, p)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| p.title.as_str())
}

/// Render a scatter plot. Scatter plots show data only; they never filter.
pub fn scatter_plot(
    ui: &mut Ui,
    chart: &ScatterPlot,
    index: &CrossFilter,
    actions: &mut Vec<Interaction>,
) {
    let points = chart.points();
    let legend = chart.legend();
    let (x_min, x_max) = chart.x_domain;

    let header = ChartHeader {
        title: chart.anchor,
        layout: &chart.layout,
        dimension: None,
    };
    chart_frame(ui, header, index, actions, |ui, size| {
        let hover_points = points.clone();
        Plot::new(chart.anchor)
            .width(size[0])
            .height(size[1])
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .include_x(x_min)
            .include_x(x_max)
            .legend(Legend::default())
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .label_formatter(move |_name, value| {
                nearest_title(&hover_points, value.x, value.y)
                    .unwrap_or_default()
                    .to_string()
            })
            .show(ui, |plot_ui| {
                for (name, color) in &legend {
                    let series: Vec<[f64; 2]> = points
                        .iter()
                        .filter(|p| p.color == *color)
                        .map(|p| [p.x, p.y])
                        .collect();
                    plot_ui.points(
                        Points::new(PlotPoints::from(series))
                            .name(name)
                            .color(*color)
                            .filled(true)
                            .radius(chart.symbol_size / 2.0),
                    );
                }
                let other: Vec<[f64; 2]> = points
                    .iter()
                    .filter(|p| legend.iter().all(|(_, c)| *c != p.color))
                    .map(|p| [p.x, p.y])
                    .collect();
                if !other.is_empty() {
                    plot_ui.points(
                        Points::new(PlotPoints::from(other))
                            .color(Color32::GRAY)
                            .filled(true)
                            .radius(chart.symbol_size / 2.0),
                    );
                }
            });
    })
}

/// Large formatted number with a caption.
pub fn number_display(ui: &mut Ui, caption: &str, formatted: &str) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.label(RichText::new(formatted).size(32.0).strong());
        ui.label(caption);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, title: &str) -> ScatterPoint {
        ScatterPoint {
            x,
            y,
            color: Color32::GRAY,
            title: title.to_string(),
        }
    }

    #[test]
    fn category_hit_testing() {
        assert_eq!(category_at(0.1, 2), Some(0));
        assert_eq!(category_at(1.3, 2), Some(1));
        assert_eq!(category_at(0.5, 2), None);
        assert_eq!(category_at(2.0, 2), None);
        assert_eq!(category_at(-0.8, 2), None);
    }

    #[test]
    fn tick_steps_are_round() {
        assert_eq!(tick_step(200.0, 20), 10.0);
        assert_eq!(tick_step(78.0, 20), 5.0);
        assert_eq!(tick_step(113000.0, 4), 50000.0);
        assert_eq!(tick_step(0.0, 4), 1.0);
    }

    #[test]
    fn nearest_title_scales_axes() {
        let points = [
            point(0.0, 50000.0, "AsstProf earned: 50000"),
            point(40.0, 52000.0, "Prof earned: 52000"),
            point(2.0, 150000.0, "Prof earned: 150000"),
        ];
        assert_eq!(nearest_title(&points, 38.0, 60000.0), Some("Prof earned: 52000"));
        assert_eq!(nearest_title(&points, 1.0, 140000.0), Some("Prof earned: 150000"));
        assert_eq!(nearest_title(&[], 0.0, 0.0), None);
    }
}
