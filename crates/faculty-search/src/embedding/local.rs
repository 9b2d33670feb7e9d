//! Local BERT sentence embedder running on candle.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use faculty_core::{Error, Result};
use tokenizers::Tokenizer;
use tracing::info;

use super::{EmbeddingModel, check_dimensions};

/// Longest token sequence fed through the encoder; longer inputs are
/// truncated, shorter ones padded.
const MAX_TOKENS: usize = 256;

/// Sentence-transformer embedder with no network dependency.
///
/// Loads a BERT checkpoint (`tokenizer.json`, `config.json`,
/// `pytorch_model.bin`) from a local directory and runs tokenize, forward
/// pass, masked mean pooling, and L2 normalization on the CPU. Deterministic
/// for fixed weights.
pub struct LocalEmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dimension: usize,
}

fn candle_error(context: &str, error: impl std::fmt::Display) -> Error {
    Error::Config(format!("{context}: {error}"))
}

impl LocalEmbeddingModel {
    /// Loads a model checkpoint from a local directory.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the tokenizer, config, or weights
    /// cannot be loaded.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = Device::Cpu;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|error| {
            candle_error("failed to load tokenizer", error)
        })?;

        let config_text = fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let dimension = config.hidden_size;

        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))
            .map_err(|error| candle_error("failed to load model weights", error))?;
        let builder =
            VarBuilder::from_tensors(weights.into_iter().collect(), DType::F32, &device);
        let model = BertModel::load(builder, &config)
            .map_err(|error| candle_error("failed to build model", error))?;

        let model_name = model_dir
            .file_name()
            .map_or_else(|| "bert".to_owned(), |name| name.to_string_lossy().into_owned());

        info!("Loaded local embedding model '{model_name}' ({dimension} dims)");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name,
            dimension,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|error| candle_error("tokenization failed", error))?;

        let mut ids = encoding.get_ids().to_vec();
        let mut mask = encoding.get_attention_mask().to_vec();
        ids.truncate(MAX_TOKENS);
        mask.truncate(MAX_TOKENS);
        while ids.len() < MAX_TOKENS {
            ids.push(0);
            mask.push(0);
        }

        self.forward(&ids, &mask)
            .map_err(|error| candle_error("inference failed", error))
    }

    fn forward(&self, ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<f32>> {
        let input_ids = Tensor::from_iter(ids.iter().copied(), &self.device)?
            .reshape((1, MAX_TOKENS))?;
        let attention_mask = Tensor::from_iter(mask.iter().copied(), &self.device)?
            .reshape((1, MAX_TOKENS))?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only, then L2 normalize.
        let mask_f32 = attention_mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
        let masked = hidden.broadcast_mul(&mask_f32)?;
        let summed = masked.sum(1)?;
        let counts = mask_f32.sum(1)?.clamp(1e-9, f64::INFINITY)?;
        let mean = summed.broadcast_div(&counts)?;

        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::INFINITY)?;
        let normalized = mean.broadcast_div(&norm)?;

        normalized.squeeze(0)?.to_vec1()
    }
}

#[async_trait]
impl EmbeddingModel for LocalEmbeddingModel {
    fn identity(&self) -> String {
        format!("local:{}@{}", self.model_name, self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_input_chars(&self) -> usize {
        // Rough chars-per-token bound keeps the chunker from producing
        // windows the tokenizer would truncate heavily.
        MAX_TOKENS * 4
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text)?);
        }
        check_dimensions(&vectors, self.dimension)?;
        Ok(vectors)
    }
}
