//! Epoch duration

use super::traits::{Callback, CallbackAction, EpochContext};
use crate::net::NeuralNet;
use crate::Result;
use std::time::Instant;

/// Records the wall time of each epoch in seconds under `dur`
#[derive(Debug, Clone, Default)]
pub struct EpochTimer {
    started: Option<Instant>,
}

impl EpochTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Callback for EpochTimer {
    fn initialize(&mut self) -> Result<()> {
        self.started = None;
        Ok(())
    }

    fn on_epoch_begin(&mut self, _net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        self.started = Some(Instant::now());
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        if let Some(started) = self.started.take() {
            net.history_mut().record("dur", started.elapsed().as_secs_f64())?;
        }
        Ok(CallbackAction::Continue)
    }

    fn type_name(&self) -> &str {
        "EpochTimer"
    }
}
