mod app;
mod color;
mod config;
mod dashboard;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::SalaryDashboardApp;
use clap::Parser;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;

#[derive(Parser)]
#[command(name = "salary-dashboard")]
#[command(version)]
#[command(about = "Cross-filtered faculty salary dashboard", long_about = None)]
struct Cli {
    /// Salary file to open at startup (.csv or .json)
    #[arg(short, long, env = "SALARY_DASHBOARD_DATA")]
    data: Option<PathBuf>,

    /// Dashboard configuration file (JSON)
    #[arg(short, long, env = "SALARY_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    log::debug!("config: {config:?}");

    let mut state = AppState::new(config.clone());
    if let Some(path) = &cli.data {
        state.load_path(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Salary Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(SalaryDashboardApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the dashboard window")
}
