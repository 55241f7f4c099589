use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, Interaction};
use crate::data::index::CrossFilter;
use crate::data::loader::load_file;
use crate::data::model::SalaryDataset;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Filtering index over the loaded dataset (None until a file loads).
    pub index: Option<CrossFilter>,

    /// Charts wired to `index`. Present exactly when `index` is.
    pub dashboard: Option<Dashboard>,

    /// File the current dataset came from.
    pub source: Option<PathBuf>,

    /// Filter changes collected while drawing, applied after the frame.
    pub pending: Vec<Interaction>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            index: None,
            dashboard: None,
            source: None,
            pending: Vec::new(),
            status_message: None,
        }
    }

    /// Load a file and rebuild the dashboard. On failure nothing is shown
    /// but the error.
    pub fn load_path(&mut self, path: &Path) {
        let result = load_file(path).and_then(|dataset| {
            log::info!(
                "Loaded {} records with columns {:?}",
                dataset.len(),
                dataset.column_names
            );
            self.set_dataset(dataset)
        });

        match result {
            Ok(()) => self.source = Some(path.to_path_buf()),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.index = None;
                self.dashboard = None;
                self.source = None;
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Build a fresh index and every chart over `dataset`.
    pub fn set_dataset(&mut self, dataset: SalaryDataset) -> Result<()> {
        let mut index = CrossFilter::new(dataset);
        let dashboard = Dashboard::build(&mut index, &self.config)?;

        self.index = Some(index);
        self.dashboard = Some(dashboard);
        self.pending.clear();
        self.status_message = None;
        Ok(())
    }

    /// Apply the filter changes queued during the last frame.
    pub fn apply_pending(&mut self) {
        let Some(index) = self.index.as_mut() else {
            self.pending.clear();
            return;
        };
        for interaction in self.pending.drain(..) {
            if let Err(e) = interaction.apply(index) {
                log::error!("{interaction:?} failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv;
    use crate::data::model::FieldValue;

    const CSV: &str = "\
rank,discipline,yrs.since.phd,yrs.service,sex,salary
Prof,A,20,15,Female,60000
Prof,B,30,45,Male,100000
";

    fn loaded() -> AppState {
        let mut state = AppState::new(DashboardConfig::default());
        state
            .set_dataset(load_csv(CSV.as_bytes()).unwrap())
            .unwrap();
        state
    }

    #[test]
    fn failed_load_leaves_no_dashboard() {
        let mut state = loaded();
        state.load_path(Path::new("/nonexistent/Salaries.csv"));
        assert!(state.dashboard.is_none());
        assert!(state.index.is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn empty_dataset_fails_to_build() {
        let mut state = AppState::new(DashboardConfig::default());
        let empty = load_csv("rank,discipline,yrs.since.phd,yrs.service,sex,salary\n".as_bytes())
            .unwrap();
        assert!(state.set_dataset(empty).is_err());
        assert!(state.dashboard.is_none());
    }

    #[test]
    fn pending_interactions_apply_after_frame() {
        let mut state = loaded();
        let dim = state.dashboard.as_ref().unwrap().gender_balance.dimension();
        state.pending.push(Interaction::Toggle {
            dimension: dim,
            key: FieldValue::Text("Male".into()),
        });
        state.apply_pending();
        assert!(state.pending.is_empty());
        assert_eq!(state.index.as_ref().unwrap().selected_count(), 1);
    }
}
