use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::dashboard::charts::{RecordsTable, SelectMenu};
use crate::dashboard::Interaction;
use crate::data::index::CrossFilter;
use crate::state::AppState;
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Left side panel – selector and headline numbers
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Faculty Salaries");
    ui.separator();

    let (Some(dashboard), Some(index)) = (&state.dashboard, &state.index) else {
        ui.label("No dataset loaded.");
        return;
    };

    ui.strong("Discipline");
    discipline_selector(ui, &dashboard.discipline_selector, index, &mut state.pending);
    ui.separator();

    plot::number_display(
        ui,
        &dashboard.women_prof.caption,
        &dashboard.women_prof.formatted(),
    );
    ui.add_space(12.0);
    plot::number_display(
        ui,
        &dashboard.men_prof.caption,
        &dashboard.men_prof.formatted(),
    );
}

fn discipline_selector(
    ui: &mut Ui,
    menu: &SelectMenu,
    index: &CrossFilter,
    actions: &mut Vec<Interaction>,
) {
    let current = match menu.selected(index) {
        Ok(current) => current,
        Err(e) => {
            log::error!("{}: {e}", menu.anchor);
            return;
        }
    };
    let options = menu.options();
    let selected_text = current
        .as_ref()
        .and_then(|key| options.iter().find(|o| &o.key == key))
        .map(|o| o.title.clone())
        .unwrap_or_else(|| menu.prompt.clone());

    egui::ComboBox::from_id_salt(menu.anchor)
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            if ui.selectable_label(current.is_none(), &menu.prompt).clicked() {
                actions.push(Interaction::Select {
                    dimension: menu.dimension(),
                    key: None,
                });
            }
            for option in &options {
                let is_current = current.as_ref() == Some(&option.key);
                if ui.selectable_label(is_current, &option.title).clicked() && !is_current {
                    actions.push(Interaction::Select {
                        dimension: menu.dimension(),
                        key: Some(option.key.clone()),
                    });
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Central panel – charts
// ---------------------------------------------------------------------------

/// Render every chart of the dashboard.
pub fn chart_panel(ui: &mut Ui, state: &mut AppState) {
    let (Some(dashboard), Some(index)) = (&state.dashboard, &state.index) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a salary file to build the dashboard  (File → Open…)");
        });
        return;
    };
    let actions = &mut state.pending;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.horizontal_wrapped(|ui: &mut Ui| {
                plot::bar_chart(ui, &dashboard.gender_balance, index, actions);
                plot::bar_chart(ui, &dashboard.average_salary, index, actions);
                plot::stacked_bar_chart(ui, &dashboard.rank_distribution, index, actions);
            });
            ui.separator();
            plot::scatter_plot(ui, &dashboard.service_salary, index, actions);
            ui.separator();
            plot::scatter_plot(ui, &dashboard.phd_salary, index, actions);
            ui.separator();
            records_table(ui, &dashboard.records_table, index);
        });
}

fn records_table(ui: &mut Ui, table: &RecordsTable, index: &CrossFilter) {
    let rows = match table.records(index) {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("{}: {e}", table.anchor);
            return;
        }
    };
    let number = |v: Option<i64>| v.map_or_else(|| "NaN".to_string(), |n| n.to_string());

    ui.strong(format!("Top {} salaries", table.rows));
    TableBuilder::new(ui)
        .id_salt(table.anchor)
        .striped(true)
        .vscroll(false)
        .columns(Column::auto().at_least(90.0), 6)
        .header(20.0, |mut header| {
            for title in [
                "Discipline",
                "Sex",
                "Rank",
                "Years of service",
                "Years since PhD",
                "Salary",
            ] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for record in rows {
                body.row(18.0, |mut row| {
                    let cells = [
                        record.discipline.clone(),
                        record.sex.clone(),
                        record.rank.clone(),
                        number(record.yrs_service),
                        number(record.yrs_since_phd),
                        number(record.salary),
                    ];
                    for cell in cells {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell);
                        });
                    }
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(index) = &state.index {
            ui.label(format!(
                "{} selected out of {} records",
                index.selected_count(),
                index.len()
            ));
            if ui.button("Reset all").clicked() {
                state.pending.push(Interaction::ResetAll);
            }
        }

        if let Some(path) = &state.source {
            ui.separator();
            ui.label(RichText::new(path.display().to_string()).weak());
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open salary data")
        .add_filter("Supported files", &["csv", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
