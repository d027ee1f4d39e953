//! BERT sequence classifier run locally with candle.
//!
//! Expects a Hugging Face `BertForSequenceClassification` checkpoint: a `bert.*`
//! encoder, `bert.pooler.dense` and a `classifier` head. The tokenizer comes from
//! `tokenizer.json` or, for older checkpoints, is rebuilt from `vocab.txt`.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use log::{debug, info, warn};
use serde_json::Value;
use tokenizers::decoders::DecoderWrapper;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::models::ModelWrapper;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::normalizers::NormalizerWrapper;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::processors::PostProcessorWrapper;
use tokenizers::{Model, Tokenizer, TokenizerBuilder};

use crate::config::ModelSource;
use crate::error::ModelError;
use crate::models::SentimentScore;
use crate::sentiment::{parse_star_label, score_from_probabilities, SentimentModel};

const MAX_TOKENS: usize = 512;

enum Weights {
    SafeTensors(PathBuf),
    Pytorch(PathBuf),
}

enum TokenizerFiles {
    Json(PathBuf),
    WordPiece {
        vocab: PathBuf,
        config: Option<PathBuf>,
    },
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: TokenizerFiles,
    weights: Weights,
}

pub struct BertSentimentModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<u8>,
    device: Device,
}

impl BertSentimentModel {
    /// Resolve the model files and load them. Downloads from the hub on first use.
    pub fn load(source: &ModelSource) -> Result<Self, ModelError> {
        let files = match source {
            ModelSource::Local(dir) => local_files(dir)?,
            ModelSource::Hub { model_id, revision } => hub_files(model_id, revision)?,
        };
        Self::from_files(&files)
    }

    fn from_files(files: &ModelFiles) -> Result<Self, ModelError> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&files.config)
            .map_err(|e| ModelError::Load(format!("{}: {}", files.config.display(), e)))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| ModelError::Load(format!("invalid config.json: {}", e)))?;
        let config_value: Value = serde_json::from_str(&raw_config)
            .map_err(|e| ModelError::Load(format!("invalid config.json: {}", e)))?;

        let hidden_size = config_value["hidden_size"]
            .as_u64()
            .ok_or_else(|| ModelError::Load("config.json has no hidden_size".to_string()))?
            as usize;
        let labels = class_labels(&config_value)?;

        let tokenizer = load_tokenizer(&files.tokenizer)?;

        let vb = match &files.weights {
            Weights::SafeTensors(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)?
            },
            Weights::Pytorch(path) => VarBuilder::from_pth(path, DType::F32, &device)?,
        };

        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden_size, labels.len(), vb.pp("classifier"))?;

        info!("Sentiment model loaded with {} classes", labels.len());
        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer,
            labels,
            device,
        })
    }

    fn probabilities(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

        let ids = truncate_keeping_last(encoding.get_ids());
        let type_ids = truncate_keeping_last(encoding.get_type_ids());
        let mask = truncate_keeping_last(encoding.get_attention_mask());
        debug!("Encoded review into {} tokens", ids.len());

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;

        Ok(probs.squeeze(0)?.to_vec1::<f32>()?)
    }
}

impl SentimentModel for BertSentimentModel {
    fn classify(&self, text: &str) -> Result<SentimentScore, ModelError> {
        let probs = self.probabilities(text)?;
        score_from_probabilities(&probs, &self.labels)
    }
}

/// Keep at most `MAX_TOKENS`, preserving the final `[SEP]` position.
fn truncate_keeping_last(values: &[u32]) -> Vec<u32> {
    if values.len() <= MAX_TOKENS {
        return values.to_vec();
    }
    let mut kept = values[..MAX_TOKENS - 1].to_vec();
    kept.push(values[values.len() - 1]);
    kept
}

/// Star label per class index, from `id2label` when it is usable.
fn class_labels(config: &Value) -> Result<Vec<u8>, ModelError> {
    let num_labels = match config["id2label"].as_object() {
        Some(map) if !map.is_empty() => map.len(),
        _ => config["num_labels"].as_u64().unwrap_or(5) as usize,
    };

    let mut labels = Vec::with_capacity(num_labels);
    for index in 0..num_labels {
        let named = config["id2label"][index.to_string()]
            .as_str()
            .and_then(parse_star_label);
        let label = match named {
            Some(label) => label,
            None => {
                let fallback = u8::try_from(index + 1)
                    .ok()
                    .filter(|l| *l <= crate::sentiment::MAX_LABEL)
                    .ok_or_else(|| {
                        ModelError::Load(format!("class {} cannot be mapped to a star label", index))
                    })?;
                warn!("Class {} has no star label, using {}", index, fallback);
                fallback
            }
        };
        labels.push(label);
    }
    Ok(labels)
}

fn load_tokenizer(files: &TokenizerFiles) -> Result<Tokenizer, ModelError> {
    match files {
        TokenizerFiles::Json(path) => {
            Tokenizer::from_file(path).map_err(|e| ModelError::Tokenizer(e.to_string()))
        }
        TokenizerFiles::WordPiece { vocab, config } => {
            let lowercase = match config {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))?;
                    let value: Value = serde_json::from_str(&raw)
                        .map_err(|e| ModelError::Load(format!("invalid tokenizer_config.json: {}", e)))?;
                    value["do_lower_case"].as_bool().unwrap_or(true)
                }
                None => true,
            };
            wordpiece_tokenizer(vocab, lowercase)
        }
    }
}

/// Rebuild the standard BERT tokenizer pipeline around a WordPiece vocabulary.
fn wordpiece_tokenizer(vocab: &Path, lowercase: bool) -> Result<Tokenizer, ModelError> {
    debug!("Building WordPiece tokenizer from {} (lowercase: {})", vocab.display(), lowercase);
    let wordpiece = WordPiece::from_file(&vocab.to_string_lossy())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

    let special = |token: &str| {
        wordpiece
            .token_to_id(token)
            .ok_or_else(|| ModelError::Tokenizer(format!("{} missing from vocabulary", token)))
    };
    let sep = special("[SEP]")?;
    let cls = special("[CLS]")?;

    let tokenizer = TokenizerBuilder::<
        ModelWrapper,
        NormalizerWrapper,
        PreTokenizerWrapper,
        PostProcessorWrapper,
        DecoderWrapper,
    >::new()
    .with_model(wordpiece.into())
    .with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase).into()))
    .with_pre_tokenizer(Some(BertPreTokenizer.into()))
    .with_post_processor(Some(
        BertProcessing::new(("[SEP]".to_string(), sep), ("[CLS]".to_string(), cls)).into(),
    ))
    .with_decoder(None)
    .build()
    .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

    Ok(Tokenizer::from(tokenizer))
}

fn local_files(dir: &Path) -> Result<ModelFiles, ModelError> {
    info!("Loading sentiment model from {}", dir.display());
    let require = |name: &str| {
        let path = dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ModelError::Load(format!("{} not found", path.display())))
        }
    };

    let safetensors = dir.join("model.safetensors");
    let weights = if safetensors.is_file() {
        Weights::SafeTensors(safetensors)
    } else {
        Weights::Pytorch(require("pytorch_model.bin")?)
    };

    let tokenizer_json = dir.join("tokenizer.json");
    let tokenizer = if tokenizer_json.is_file() {
        TokenizerFiles::Json(tokenizer_json)
    } else {
        let config = dir.join("tokenizer_config.json");
        TokenizerFiles::WordPiece {
            vocab: require("vocab.txt")?,
            config: config.is_file().then_some(config),
        }
    };

    Ok(ModelFiles {
        config: require("config.json")?,
        tokenizer,
        weights,
    })
}

fn hub_files(model_id: &str, revision: &str) -> Result<ModelFiles, ModelError> {
    info!("Fetching sentiment model {} ({}) from the hub", model_id, revision);
    let api = Api::new().map_err(|e| ModelError::Load(e.to_string()))?;
    let repo = api.repo(Repo::with_revision(
        model_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));
    let fetch = |name: &str| {
        repo.get(name)
            .map_err(|e| ModelError::Load(format!("{}: {}", name, e)))
    };

    let weights = match repo.get("model.safetensors") {
        Ok(path) => Weights::SafeTensors(path),
        Err(e) => {
            debug!("No safetensors weights ({}), falling back to pytorch_model.bin", e);
            Weights::Pytorch(fetch("pytorch_model.bin")?)
        }
    };

    let tokenizer = match repo.get("tokenizer.json") {
        Ok(path) => TokenizerFiles::Json(path),
        Err(e) => {
            debug!("No tokenizer.json ({}), building WordPiece from vocab.txt", e);
            TokenizerFiles::WordPiece {
                vocab: fetch("vocab.txt")?,
                config: repo.get("tokenizer_config.json").ok(),
            }
        }
    };

    Ok(ModelFiles {
        config: fetch("config.json")?,
        tokenizer,
        weights,
    })
}
