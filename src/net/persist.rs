//! Saving and loading module weights and history
//!
//! Weights are stored as safetensors: one F32 tensor per module parameter,
//! plus `__metadata__` entries `format`, `format_version` and `device`.

use super::core::NeuralNet;
use crate::device::Device;
use crate::history::History;
use crate::module::StateDict;
use crate::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const FORMAT: &str = "skorch";
const FORMAT_VERSION: &str = "1";

impl NeuralNet {
    /// Write the module's weights to `path`
    pub fn save_params(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.params_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        debug!(path = %path.as_ref().display(), "saved module params");
        Ok(())
    }

    pub fn save_params_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.params_bytes()?)?;
        Ok(())
    }

    /// Load weights saved by [`save_params`](Self::save_params) into the
    /// initialized module
    pub fn load_params(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_module("load")?;
        let bytes = std::fs::read(path.as_ref())?;
        self.load_params_bytes(&bytes)
    }

    pub fn load_params_from<R: Read>(&mut self, mut reader: R) -> Result<()> {
        self.ensure_module("load")?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.load_params_bytes(&bytes)
    }

    pub fn save_history(&self, path: impl AsRef<Path>) -> Result<()> {
        self.history.save(path)
    }

    pub fn save_history_to<W: Write>(&self, writer: W) -> Result<()> {
        self.history.to_writer(writer)
    }

    pub fn load_history(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.history = History::load(path)?;
        Ok(())
    }

    pub fn load_history_from<R: Read>(&mut self, reader: R) -> Result<()> {
        self.history = History::from_reader(reader)?;
        Ok(())
    }

    fn ensure_module(&self, action: &str) -> Result<()> {
        if self.module.is_some() {
            return Ok(());
        }
        Err(Error::NotInitialized(format!(
            "Cannot {action} parameters of an un-initialized model. Please initialize first by \
             calling .initialize() or by fitting the model with .fit(...)."
        )))
    }

    fn params_bytes(&self) -> Result<Vec<u8>> {
        self.ensure_module("save")?;
        let state = self.module.as_ref().map(|m| m.state_dict()).unwrap_or_default();
        let tensors: Vec<(String, Vec<u8>, Vec<usize>)> = state
            .iter()
            .map(|(name, data)| {
                let values: Vec<f32> = data.iter().copied().collect();
                (name.to_string(), bytemuck::cast_slice(&values).to_vec(), data.shape().to_vec())
            })
            .collect();
        let views = tensors
            .iter()
            .map(|(name, bytes, shape)| {
                TensorView::new(Dtype::F32, shape.clone(), bytes)
                    .map(|view| (name.as_str(), view))
                    .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let metadata = HashMap::from([
            ("format".to_string(), FORMAT.to_string()),
            ("format_version".to_string(), FORMAT_VERSION.to_string()),
            ("device".to_string(), self.device.to_string()),
        ]);
        safetensors::serialize(views, Some(metadata))
            .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))
    }

    fn load_params_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let (_, metadata) = SafeTensors::read_metadata(bytes)
            .map_err(|e| Error::Serialization(format!("SafeTensors header: {e}")))?;
        if let Some(saved) = metadata.metadata().as_ref().and_then(|m| m.get("device")) {
            let available = saved.parse::<Device>().is_ok_and(|device| device.is_available());
            if !available {
                warn!(
                    saved = %saved,
                    "weights were saved on a device that is not available, loading them on cpu"
                );
            }
        }
        let tensors = SafeTensors::deserialize(bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize params: {e}")))?;

        let mut state = StateDict::new();
        for name in tensors.names() {
            let view = tensors
                .tensor(name)
                .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))?;
            if view.dtype() != Dtype::F32 {
                return Err(Error::Serialization(format!("tensor {name} is {:?}, expected F32", view.dtype())));
            }
            let values: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
            let array = ArrayD::from_shape_vec(IxDyn(view.shape()), values)
                .map_err(|e| Error::ShapeMismatch(format!("{name}: {e}")))?;
            state.insert(name, array);
        }
        let module = self.module.as_mut().ok_or_else(|| Error::NotInitialized("module".into()))?;
        module.load_state_dict(&state)
    }
}
