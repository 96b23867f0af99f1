//! Pretrained sentence embedder running on candle.
//!
//! Loads `sentence-transformers/all-MiniLM-L6-v2` from the HuggingFace hub
//! (cached under `~/.cache/huggingface`, ~90MB on first use) and produces
//! 384-dimensional, mean-pooled, L2-normalised sentence embeddings.

use crate::embedder::Embedder;
use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use faqx_core::{Error, Result, Vector};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Model repository on the HuggingFace hub
pub const MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output dimension of MiniLM-L6
pub const MINILM_DIM: usize = 384;

/// Longest token sequence fed to the model
const MAX_SEQUENCE_LENGTH: usize = 256;

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dim: usize,
}

impl MiniLmEmbedder {
    /// Download (if needed) and load all-MiniLM-L6-v2 on the CPU
    pub fn new() -> Result<Self> {
        Self::with_model(MINILM_REPO)
    }

    /// Load any BERT-family sentence-transformer from the hub
    pub fn with_model(model_name: &str) -> Result<Self> {
        Self::load(model_name).map_err(|e| Error::Embedding(format!("{:#}", e)))
    }

    fn load(model_name: &str) -> anyhow::Result<Self> {
        info!("Loading embedding model: {}", model_name);

        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));

        let config_path = repo.get("config.json").context("Failed to download config.json")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model.safetensors")?;

        let config: Config = serde_json::from_str(
            &std::fs::read_to_string(&config_path).context("Failed to read config.json")?,
        )
        .context("Failed to parse config.json")?;
        debug!("Model config: hidden_size={}", config.hidden_size);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        // SAFETY: the safetensors file is owned by the hub cache and not
        // modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &config).context("Failed to build BERT model")?;

        info!("Embedding model loaded ({} dims)", config.hidden_size);

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: model_name.to_string(),
            dim: config.hidden_size,
        })
    }

    fn forward_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);
        let mut token_type_ids = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut mask = encoding.get_attention_mask().to_vec();
            let mut types = encoding.get_type_ids().to_vec();
            ids.resize(max_len, 0);
            mask.resize(max_len, 0);
            types.resize(max_len, 0);
            input_ids.extend(ids);
            attention_mask.extend(mask);
            token_type_ids.extend(types);
        }

        let shape = (texts.len(), max_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, shape, &self.device)?;
        let token_type_ids = Tensor::from_vec(token_type_ids, shape, &self.device)?;

        // (batch, seq_len, hidden)
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = summed.broadcast_div(&counts)?;

        let normalized = l2_normalize(&pooled)?;
        Ok(normalized.to_vec2::<f32>()?)
    }
}

fn l2_normalize(tensor: &Tensor) -> anyhow::Result<Tensor> {
    let norm = tensor
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::MAX)?;
    Ok(tensor.broadcast_div(&norm)?)
}

impl Embedder for MiniLmEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        let rows = self
            .forward_batch(texts)
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?;
        Ok(rows.into_iter().map(Vector::new).collect())
    }
}

impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("model_name", &self.model_name)
            .field("dim", &self.dim)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires model download
    fn test_embed_single() {
        let embedder = MiniLmEmbedder::new().expect("Failed to load embedder");
        let embedding = embedder.embed("how do i get a refund").unwrap();

        assert_eq!(embedding.dim(), MINILM_DIM);
        assert!((embedding.norm() - 1.0).abs() < 0.01);
    }

    #[test]
    #[ignore] // Requires model download
    fn test_paraphrase_closer_than_unrelated() {
        let embedder = MiniLmEmbedder::new().expect("Failed to load embedder");
        let batch = embedder
            .embed_batch(&[
                "how do i get my money back",
                "i want refund for this thing",
                "game crashes when loading mods",
            ])
            .unwrap();

        assert_eq!(batch.len(), 3);
        assert!(batch[0].cosine_similarity(&batch[1]) > batch[0].cosine_similarity(&batch[2]));
    }
}
