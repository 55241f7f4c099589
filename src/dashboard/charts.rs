use eframe::egui::Color32;

use crate::color::ColorScale;
use crate::config::ChartLayout;
use crate::data::index::{CrossFilter, DimensionFilter, DimensionId, Group, GroupAll, IndexError};
use crate::data::model::{FieldValue, SalaryRecord};
use crate::data::reduce::{CountReducer, MatchCount, ProfShare, Reducer, SalaryStats};

// ---------------------------------------------------------------------------
// Value accessors
// ---------------------------------------------------------------------------

/// Turns a group aggregate into the number a chart plots.
pub trait ValueAccessor<Acc> {
    fn value(&self, acc: &Acc) -> f64;
}

/// Raw record count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountValue;

impl ValueAccessor<u64> for CountValue {
    fn value(&self, acc: &u64) -> f64 {
        *acc as f64
    }
}

/// Running average, rounded to cents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageValue;

impl ValueAccessor<SalaryStats> for AverageValue {
    fn value(&self, acc: &SalaryStats) -> f64 {
        (acc.average * 100.0).round() / 100.0
    }
}

/// Match ratio scaled to 0..=100. An empty group plots as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchPercent;

impl ValueAccessor<MatchCount> for MatchPercent {
    fn value(&self, acc: &MatchCount) -> f64 {
        acc.ratio() * 100.0
    }
}

/// Share of one sex holding a rank, as a fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareValue;

impl ValueAccessor<ProfShare> for ShareValue {
    fn value(&self, acc: &ProfShare) -> f64 {
        acc.ratio()
    }
}

/// Format a fraction as a percentage with two decimals (`0.4` → `"40.00%"`).
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

// ---------------------------------------------------------------------------
// Bars
// ---------------------------------------------------------------------------

/// One bar of a categorical chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub key: FieldValue,
    pub label: String,
    pub value: f64,
}

fn bar_data<R, V>(group: &Group<R>, accessor: &V) -> Vec<BarDatum>
where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    group
        .all()
        .into_iter()
        .map(|(key, acc)| BarDatum {
            label: key.to_string(),
            value: accessor.value(&acc),
            key,
        })
        .collect()
}

/// Y axis behaviour of a bar chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YAxis {
    /// Fixed number of ticks, domain from zero to the data maximum.
    Ticks(usize),
    /// Domain follows the data.
    Elastic { ticks: usize },
}

/// A categorical bar chart over one group.
pub struct BarChart<R: Reducer, V> {
    pub anchor: &'static str,
    pub layout: ChartLayout,
    pub x_label: String,
    pub y_axis: YAxis,
    pub color: Color32,
    group: Group<R>,
    accessor: V,
}

impl<R, V> BarChart<R, V>
where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    pub fn new(anchor: &'static str, layout: ChartLayout, group: Group<R>, accessor: V) -> Self {
        Self {
            anchor,
            layout,
            x_label: String::new(),
            y_axis: YAxis::Ticks(5),
            color: Color32::from_rgb(49, 130, 189),
            group,
            accessor,
        }
    }

    pub fn x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    pub fn y_axis(mut self, axis: YAxis) -> Self {
        self.y_axis = axis;
        self
    }

    pub fn dimension(&self) -> DimensionId {
        self.group.dimension()
    }

    pub fn bars(&self) -> Vec<BarDatum> {
        bar_data(&self.group, &self.accessor)
    }
}

/// One named series of a stacked bar chart.
pub struct StackLayer<R: Reducer> {
    pub name: String,
    pub color: Color32,
    group: Group<R>,
}

/// Rendered data of one stack layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub name: String,
    pub color: Color32,
    pub bars: Vec<BarDatum>,
}

/// Bars built from several groups over the same dimension, stacked in
/// insertion order.
pub struct StackedBarChart<R: Reducer, V> {
    pub anchor: &'static str,
    pub layout: ChartLayout,
    pub x_label: String,
    dimension: DimensionId,
    layers: Vec<StackLayer<R>>,
    accessor: V,
}

impl<R, V> StackedBarChart<R, V>
where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    pub fn new(
        anchor: &'static str,
        layout: ChartLayout,
        base: Group<R>,
        name: impl Into<String>,
        accessor: V,
    ) -> Self {
        let dimension = base.dimension();
        let mut chart = Self {
            anchor,
            layout,
            x_label: String::new(),
            dimension,
            layers: Vec::new(),
            accessor,
        };
        chart.layers.push(StackLayer {
            name: name.into(),
            color: Color32::GRAY,
            group: base,
        });
        chart
    }

    /// Stack another group on top. Its dimension must match the base group.
    pub fn stack(mut self, group: Group<R>, name: impl Into<String>) -> Self {
        debug_assert_eq!(group.dimension(), self.dimension);
        self.layers.push(StackLayer {
            name: name.into(),
            color: Color32::GRAY,
            group,
        });
        self
    }

    pub fn x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    /// Colour the layers from a scale keyed by layer name.
    pub fn colors(mut self, scale: &ColorScale) -> Self {
        for layer in &mut self.layers {
            layer.color = scale.color_for(&layer.name);
        }
        self
    }

    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    pub fn series(&self) -> Vec<SeriesData> {
        self.layers
            .iter()
            .map(|layer| SeriesData {
                name: layer.name.clone(),
                color: layer.color,
                bars: bar_data(&layer.group, &self.accessor),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Number display
// ---------------------------------------------------------------------------

/// A single formatted number over a whole-dataset aggregate.
pub struct NumberDisplay<R: Reducer, V> {
    pub anchor: &'static str,
    pub caption: String,
    group: GroupAll<R>,
    accessor: V,
}

impl<R, V> NumberDisplay<R, V>
where
    R: Reducer,
    V: ValueAccessor<R::Acc>,
{
    pub fn new(
        anchor: &'static str,
        caption: impl Into<String>,
        group: GroupAll<R>,
        accessor: V,
    ) -> Self {
        Self {
            anchor,
            caption: caption.into(),
            group,
            accessor,
        }
    }

    pub fn value(&self) -> f64 {
        self.accessor.value(&self.group.value())
    }

    pub fn formatted(&self) -> String {
        format_percent(self.value())
    }
}

// ---------------------------------------------------------------------------
// Scatter plot
// ---------------------------------------------------------------------------

/// Positions of the scatter attributes inside a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterKey {
    pub x: usize,
    pub y: usize,
    pub color: usize,
    pub rank: usize,
}

/// Composite keys are `[x, salary, sex, rank]`.
pub const SALARY_SCATTER_KEY: ScatterKey = ScatterKey {
    x: 0,
    y: 1,
    color: 2,
    rank: 3,
};

/// Tooltip text of a scatter point: `"{rank} earned: {salary}"`.
#[derive(Debug, Clone, Copy)]
pub struct PointTitle {
    pub key: ScatterKey,
}

impl PointTitle {
    pub fn title(&self, point: &FieldValue) -> String {
        let part = |i: usize| point.component(i).map(|v| v.to_string()).unwrap_or_default();
        format!("{} earned: {}", part(self.key.rank), part(self.key.y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub color: Color32,
    pub title: String,
}

/// Salary against a years measure, one symbol per distinct composite key.
pub struct ScatterPlot {
    pub anchor: &'static str,
    pub layout: ChartLayout,
    pub x_label: String,
    pub y_label: String,
    /// Linear x domain from the smallest to the largest key.
    pub x_domain: (f64, f64),
    pub symbol_size: f32,
    group: Group<CountReducer>,
    colors: ColorScale,
    title: PointTitle,
}

impl ScatterPlot {
    pub fn new(
        anchor: &'static str,
        layout: ChartLayout,
        group: Group<CountReducer>,
        x_domain: (f64, f64),
        colors: ColorScale,
    ) -> Self {
        Self {
            anchor,
            layout,
            x_label: String::new(),
            y_label: String::new(),
            x_domain,
            symbol_size: 8.0,
            group,
            colors,
            title: PointTitle {
                key: SALARY_SCATTER_KEY,
            },
        }
    }

    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn symbol_size(mut self, size: f32) -> Self {
        self.symbol_size = size;
        self
    }

    pub fn legend(&self) -> Vec<(String, Color32)> {
        self.colors.legend_entries()
    }

    /// Points whose key is still selected. Keys with a non-numeric
    /// coordinate are skipped.
    pub fn points(&self) -> Vec<ScatterPoint> {
        let k = self.title.key;
        self.group
            .all()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(key, _)| {
                let x = key.component(k.x)?.as_i64()?;
                let y = key.component(k.y)?.as_i64()?;
                let color = key
                    .component(k.color)
                    .map(|v| self.colors.color_for_value(v))
                    .unwrap_or(Color32::GRAY);
                Some(ScatterPoint {
                    x: x as f64,
                    y: y as f64,
                    color,
                    title: self.title.title(&key),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Select menu
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub key: FieldValue,
    pub title: String,
    pub count: u64,
}

/// Single-choice filter over one dimension.
pub struct SelectMenu {
    pub anchor: &'static str,
    pub prompt: String,
    group: Group<CountReducer>,
}

impl SelectMenu {
    pub fn new(anchor: &'static str, group: Group<CountReducer>) -> Self {
        Self {
            anchor,
            prompt: "Select all".to_string(),
            group,
        }
    }

    pub fn dimension(&self) -> DimensionId {
        self.group.dimension()
    }

    /// Options titled `"key: count"`. Keys with no selected records are
    /// left out.
    pub fn options(&self) -> Vec<SelectOption> {
        self.group
            .all()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(key, count)| SelectOption {
                title: format!("{key}: {count}"),
                key,
                count,
            })
            .collect()
    }

    /// The currently chosen key, if any.
    pub fn selected(&self, index: &CrossFilter) -> Result<Option<FieldValue>, IndexError> {
        Ok(match index.filter_of(self.dimension())? {
            DimensionFilter::Exact(key) => Some(key.clone()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Records table
// ---------------------------------------------------------------------------

/// The highest-paid selected records.
pub struct RecordsTable {
    pub anchor: &'static str,
    pub rows: usize,
    dimension: DimensionId,
}

impl RecordsTable {
    pub fn new(anchor: &'static str, dimension: DimensionId, rows: usize) -> Self {
        Self {
            anchor,
            rows,
            dimension,
        }
    }

    pub fn records<'a>(&self, index: &'a CrossFilter) -> Result<Vec<&'a SalaryRecord>, IndexError> {
        index.top(self.dimension, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_format() {
        assert_eq!(format_percent(0.4), "40.00%");
        assert_eq!(format_percent(0.25), "25.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }

    #[test]
    fn average_value_rounds_to_cents() {
        let acc = SalaryStats {
            count: 3,
            total: 200000,
            average: 200000.0 / 3.0,
        };
        assert_eq!(AverageValue.value(&acc), 66666.67);
    }

    #[test]
    fn empty_rank_group_plots_zero() {
        assert_eq!(MatchPercent.value(&MatchCount::default()), 0.0);
        assert_eq!(MatchPercent.value(&MatchCount { total: 10, matched: 4 }), 40.0);
    }

    #[test]
    fn point_title_reads_rank_and_salary() {
        let key = FieldValue::Tuple(vec![
            FieldValue::Integer(18),
            FieldValue::Integer(139750),
            FieldValue::Text("Male".into()),
            FieldValue::Text("Prof".into()),
        ]);
        let title = PointTitle {
            key: SALARY_SCATTER_KEY,
        };
        assert_eq!(title.title(&key), "Prof earned: 139750");
    }
}
