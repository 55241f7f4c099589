//! Chart wiring.
//!
//! Each `show_*` function takes the index explicitly, registers the
//! dimensions and groups its chart needs, and returns the chart model. The
//! index is never global, so several dashboards can coexist.

pub mod charts;

use anyhow::{Context, Result};

use crate::color::ColorScale;
use crate::config::{ChartLayout, DashboardConfig};
use crate::data::index::{CrossFilter, DimensionFilter, DimensionId};
use crate::data::model::{Field, FieldValue};
use crate::data::reduce::{AverageSalary, CountReducer, GenderRankMatch, RankMatch};

use charts::{
    AverageValue, BarChart, CountValue, MatchPercent, NumberDisplay, RecordsTable, ScatterPlot,
    SelectMenu, ShareValue, StackedBarChart, YAxis,
};

pub const DISCIPLINE_SELECTOR: &str = "#discipline-selector";
pub const GENDER_BALANCE: &str = "#gender-balance";
pub const AVERAGE_SALARY: &str = "#average-salary";
pub const RANK_DISTRIBUTION: &str = "#rank-distribution";
pub const WOMEN_PROF: &str = "#percentage-of-women-prof";
pub const MEN_PROF: &str = "#percentage-of-men-prof";
pub const SERVICE_SALARY: &str = "#service-salary";
pub const PHD_SALARY: &str = "#phd-salary";
pub const RECORDS_TABLE: &str = "#records-table";

/// The three ranks of the stacked chart with their legend names.
pub const RANK_SERIES: [(&str, &str); 3] = [
    ("Prof", "Prof"),
    ("AsstProf", "Assistant Prof"),
    ("AssocProf", "Associate Prof"),
];

/// Every chart of the dashboard, wired to one index.
pub struct Dashboard {
    pub discipline_selector: SelectMenu,
    pub gender_balance: BarChart<CountReducer, CountValue>,
    pub average_salary: BarChart<AverageSalary, AverageValue>,
    pub rank_distribution: StackedBarChart<RankMatch, MatchPercent>,
    pub women_prof: NumberDisplay<GenderRankMatch, ShareValue>,
    pub men_prof: NumberDisplay<GenderRankMatch, ShareValue>,
    pub service_salary: ScatterPlot,
    pub phd_salary: ScatterPlot,
    pub records_table: RecordsTable,
}

impl Dashboard {
    /// Register every dimension and group on `index` and build the charts.
    pub fn build(index: &mut CrossFilter, config: &DashboardConfig) -> Result<Self> {
        let dashboard = Dashboard {
            discipline_selector: show_discipline_selector(index)?,
            gender_balance: show_gender_balance(index, config)?,
            average_salary: show_average_salary(index, config)?,
            rank_distribution: show_rank_distribution(index, config)?,
            women_prof: show_percent_prof(index, "Female", WOMEN_PROF),
            men_prof: show_percent_prof(index, "Male", MEN_PROF),
            service_salary: service_to_salary(index, config)?,
            phd_salary: phd_to_salary(index, config)?,
            records_table: show_records_table(index, config)?,
        };
        log::info!(
            "dashboard built over {} records ({} selected)",
            index.len(),
            index.selected_count()
        );
        Ok(dashboard)
    }

    /// Dimensions that charts can filter, with their anchors.
    pub fn filterable(&self) -> [(&'static str, DimensionId); 4] {
        [
            (self.discipline_selector.anchor, self.discipline_selector.dimension()),
            (self.gender_balance.anchor, self.gender_balance.dimension()),
            (self.average_salary.anchor, self.average_salary.dimension()),
            (self.rank_distribution.anchor, self.rank_distribution.dimension()),
        ]
    }
}

/// Discipline single-select filter.
pub fn show_discipline_selector(index: &mut CrossFilter) -> Result<SelectMenu> {
    let dim = index.dimension_on(Field::Discipline)?;
    let group = index.group(dim, CountReducer)?;
    Ok(SelectMenu::new(DISCIPLINE_SELECTOR, group))
}

/// Record count per sex.
pub fn show_gender_balance(
    index: &mut CrossFilter,
    config: &DashboardConfig,
) -> Result<BarChart<CountReducer, CountValue>> {
    let dim = index.dimension_on(Field::Sex)?;
    let group = index.group(dim, CountReducer)?;
    Ok(
        BarChart::new(GENDER_BALANCE, config.gender_balance, group, CountValue)
            .x_label("Gender")
            .y_axis(YAxis::Ticks(20)),
    )
}

/// Running average salary per sex.
pub fn show_average_salary(
    index: &mut CrossFilter,
    config: &DashboardConfig,
) -> Result<BarChart<AverageSalary, AverageValue>> {
    let dim = index.dimension_on(Field::Sex)?;
    let group = index.group(dim, AverageSalary)?;
    Ok(
        BarChart::new(AVERAGE_SALARY, config.average_salary, group, AverageValue)
            .x_label("Gender")
            .y_axis(YAxis::Elastic { ticks: 4 }),
    )
}

/// Percentage of each rank per sex, one stacked layer per rank.
pub fn show_rank_distribution(
    index: &mut CrossFilter,
    config: &DashboardConfig,
) -> Result<StackedBarChart<RankMatch, MatchPercent>> {
    let dim = index.dimension_on(Field::Sex)?;
    let [(first_rank, first_name), rest @ ..] = RANK_SERIES;

    let base = index.group(dim, RankMatch::new(first_rank))?;
    let mut chart = StackedBarChart::new(
        RANK_DISTRIBUTION,
        config.rank_distribution,
        base,
        first_name,
        MatchPercent,
    );
    for (rank, name) in rest {
        chart = chart.stack(index.group(dim, RankMatch::new(rank))?, name);
    }

    let names: Vec<&str> = RANK_SERIES.iter().map(|(_, name)| *name).collect();
    Ok(chart
        .x_label("Gender")
        .colors(&ColorScale::generated(&names)))
}

/// Share of `gender` holding the Prof rank, over every selected record.
pub fn show_percent_prof(
    index: &mut CrossFilter,
    gender: &str,
    anchor: &'static str,
) -> NumberDisplay<GenderRankMatch, ShareValue> {
    let group = index.group_all(GenderRankMatch::new(gender, "Prof"));
    NumberDisplay::new(anchor, format!("{gender} professors"), group, ShareValue)
}

/// Scatter of salary against `x_field`, coloured by sex.
fn salary_scatter(
    index: &mut CrossFilter,
    config: &DashboardConfig,
    anchor: &'static str,
    layout: ChartLayout,
    x_field: Field,
) -> Result<ScatterPlot> {
    let axis = index.dimension_on(x_field)?;
    let (min, max) = index
        .extent(axis)?
        .with_context(|| format!("no numeric '{}' values for {anchor}", x_field.column_name()))?;

    let fields = [x_field, Field::Salary, Field::Sex, Field::Rank];
    let dim = index.dimension(move |r| Field::pluck_tuple(&fields, r))?;
    let group = index.group(dim, CountReducer)?;

    let colors = ColorScale::ordinal(&config.gender_colors.domain, &config.gender_colors.range);
    Ok(
        ScatterPlot::new(anchor, layout, group, (min as f64, max as f64), colors)
            .symbol_size(config.symbol_size),
    )
}

pub fn service_to_salary(index: &mut CrossFilter, config: &DashboardConfig) -> Result<ScatterPlot> {
    let layout = config.service_salary;
    let chart = salary_scatter(index, config, SERVICE_SALARY, layout, Field::YrsService)?;
    Ok(chart.labels("Years of service", "Salary"))
}

pub fn phd_to_salary(index: &mut CrossFilter, config: &DashboardConfig) -> Result<ScatterPlot> {
    let layout = config.phd_salary;
    let chart = salary_scatter(index, config, PHD_SALARY, layout, Field::YrsSincePhd)?;
    Ok(chart.labels("Years since PhD", "Salary"))
}

/// Highest-paid selected records.
pub fn show_records_table(
    index: &mut CrossFilter,
    config: &DashboardConfig,
) -> Result<RecordsTable> {
    let dim = index.dimension_on(Field::Salary)?;
    Ok(RecordsTable::new(RECORDS_TABLE, dim, config.table_rows))
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// A filter change requested by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Click on a bar: toggle the key in the dimension's filter.
    Toggle { dimension: DimensionId, key: FieldValue },
    /// Select menu choice; `None` selects everything.
    Select {
        dimension: DimensionId,
        key: Option<FieldValue>,
    },
    /// Clear one dimension's filter.
    Reset(DimensionId),
    /// Clear every filter.
    ResetAll,
}

impl Interaction {
    pub fn apply(&self, index: &mut CrossFilter) -> Result<()> {
        match self {
            Interaction::Toggle { dimension, key } => {
                let next = index.filter_of(*dimension)?.toggled(key);
                index.filter(*dimension, next)?;
            }
            Interaction::Select { dimension, key } => {
                let next = key
                    .clone()
                    .map_or(DimensionFilter::All, DimensionFilter::Exact);
                index.filter(*dimension, next)?;
            }
            Interaction::Reset(dimension) => index.filter(*dimension, DimensionFilter::All)?,
            Interaction::ResetAll => index.filter_all(),
        }
        log::debug!("{self:?}: {} records selected", index.selected_count());
        Ok(())
    }
}
