use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use lexdb_core::traits::Embedder;
use tokenizers::{Tokenizer, TruncationParams};

use crate::device::select_device;
use crate::pool::{masked_mean, masked_mean_l2};
use crate::tokenize::tokenize_on_device;

/// BERT-family sentence encoder (InLegalBERT by default) with masked mean pooling.
///
/// `model_dir` must contain `config.json`, `tokenizer.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
    normalize: bool,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path, max_len: usize, normalize: bool) -> Result<Self> {
        if !model_dir.exists() {
            return Err(anyhow!("Model directory not found: {}", model_dir.display()));
        }
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| {
                anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
            })?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "bert".into());
        let mut embedder =
            Self { model, tokenizer, device, id: String::new(), dim: 0, max_len, normalize };
        let probe = embedder.encode("probe")?;
        embedder.dim = probe.len();
        embedder.id = format!("bert:{}:d{}:n{}", name, embedder.dim, u8::from(normalize));
        tracing::info!(id = %embedder.id, "embedding model loaded");
        Ok(embedder)
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = if self.normalize {
            masked_mean_l2(&hidden, &attention_mask)?
        } else {
            masked_mean(&hidden, &attention_mask)?
        };
        let v = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 250 {
            tracing::debug!(?elapsed, chars = text.len(), "slow embedding");
        }
        Ok(v)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let v = self.encode(text)?;
        if v.len() != self.dim {
            return Err(anyhow!(
                "Embedding dimension {} does not match model dimension {}",
                v.len(),
                self.dim
            ));
        }
        Ok(v)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while the model is alive.
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    if !weights_path.exists() {
        return Err(anyhow!("No model weights in {}", model_dir.display()));
    }
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}
