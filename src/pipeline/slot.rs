//! Process-wide holder for the active compensation model.
use crate::error::{CompensationError, Result};
use crate::spline::{load_model, CompensationModel};
use log::info;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Readers clone the `Arc` and never hold the lock while compensating;
/// installing a new model swaps the reference.
#[derive(Debug, Default)]
pub struct ModelSlot {
    inner: RwLock<Option<Arc<CompensationModel>>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, model: CompensationModel) -> Arc<CompensationModel> {
        let shared = Arc::new(model);
        self.install_shared(shared.clone());
        shared
    }

    pub fn install_shared(&self, model: Arc<CompensationModel>) {
        *self.inner.write() = Some(model);
    }

    /// Load from disk and install. The previous model stays on failure.
    pub fn load(&self, path: &Path) -> Result<Arc<CompensationModel>> {
        let model = load_model(path)?;
        info!(
            "model slot: loaded {} ({} calibration points)",
            path.display(),
            model.calibration_points()
        );
        Ok(self.install(model))
    }

    pub fn current(&self) -> Result<Arc<CompensationModel>> {
        self.inner.read().clone().ok_or(CompensationError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn clear(&self) -> Option<Arc<CompensationModel>> {
        self.inner.write().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(offset: f64) -> CompensationModel {
        CompensationModel::build(&[0.0, 10.0, 20.0], &[offset, 10.0 + offset, 20.0 + offset], 3)
            .unwrap()
    }

    #[test]
    fn empty_slot_reports_model_not_loaded() {
        let slot = ModelSlot::new();
        assert!(matches!(slot.current(), Err(CompensationError::ModelNotLoaded)));
        assert!(!slot.is_loaded());
    }

    #[test]
    fn install_swaps_without_invalidating_readers() {
        let slot = ModelSlot::new();
        slot.install(model(0.1));
        let held = slot.current().unwrap();
        slot.install(model(0.5));
        assert_eq!(held.x_range().0, 0.1);
        assert_eq!(slot.current().unwrap().x_range().0, 0.5);
        assert!(slot.clear().is_some());
        assert!(!slot.is_loaded());
    }

    #[test]
    fn failed_load_keeps_previous_model() {
        let slot = ModelSlot::new();
        slot.install(model(0.2));
        assert!(slot.load(Path::new("/no/such/model.json")).is_err());
        assert_eq!(slot.current().unwrap().x_range().0, 0.2);
    }

    #[test]
    fn shared_across_threads() {
        let slot = Arc::new(ModelSlot::new());
        slot.install(model(0.0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let slot = Arc::clone(&slot);
                std::thread::spawn(move || slot.current().map(|m| m.calibration_points()))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), 3);
        }
    }
}
