//! # Neural Tagger
//!
//! Token classification with a fine-tuned DistilBERT checkpoint. Text is
//! split into words by the [`Tokenizer`], the words are encoded
//! pre-tokenized, and the first sub-word of each word carries its label.
//! Uses candle for inference without external runtimes.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::distilbert::Config as BertConfig;
use safetensors::tensor::Metadata;
use serde::Deserialize;
use tokenizers::Tokenizer as HfTokenizer;

use crate::error::{AspectraError, Result};
use crate::extract::SequenceTagger;
use crate::neural::model::TokenClassifier;
use crate::neural::viterbi::ViterbiDecoder;
use crate::scheme::{OUTSIDE_LABEL, Tag, TagScheme};
use crate::text::Tokenizer;
use crate::types::Document;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

const CLASSIFIER_WEIGHT: &str = "classifier.weight";
const TRANSITIONS_WEIGHT: &str = "crf_transitions.weight";
const MAX_HEADER_LEN: usize = 100_000_000;

fn candle(err: candle_core::Error) -> AspectraError {
    AspectraError::CandleError(err.to_string())
}

/// The parts of `config.json` not covered by the encoder config.
#[derive(Debug, Deserialize)]
struct ClassifierConfig {
    dim: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

impl ClassifierConfig {
    /// Label vocabulary in output order.
    fn labels(&self) -> Result<Vec<String>> {
        let mut labels = vec![None; self.id2label.len()];
        for (id, label) in &self.id2label {
            let slot = id
                .parse::<usize>()
                .ok()
                .and_then(|idx| labels.get_mut(idx))
                .ok_or_else(|| {
                    AspectraError::ModelLoad(format!("id2label has an out-of-range id {id:?}"))
                })?;
            *slot = Some(label.clone());
        }
        if labels.is_empty() {
            return Err(AspectraError::ModelLoad("id2label is empty".into()));
        }
        labels
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AspectraError::ModelLoad("id2label ids are not contiguous".into()))
    }
}

/// Picks the decoder for a label vocabulary.
///
/// IO-style vocabularies (no begin labels) parse every aspect label as a
/// continuation, so they are decoded without transition constraints.
fn decoder_for(tags: &[Tag]) -> ViterbiDecoder {
    if tags.iter().any(|t| t.is_begin()) {
        ViterbiDecoder::for_tags(tags)
    } else {
        tracing::debug!("label vocabulary has no begin labels, decoding unconstrained");
        ViterbiDecoder::new(tags.len())
    }
}

/// Tensor names and shapes from a safetensors header, without reading the
/// tensor data.
fn read_tensor_shapes(path: &Path) -> Result<HashMap<String, Vec<usize>>> {
    let mut file = File::open(path)?;
    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)?;
    let header_len = usize::try_from(u64::from_le_bytes(len_bytes))
        .ok()
        .filter(|&n| n <= MAX_HEADER_LEN)
        .ok_or_else(|| AspectraError::ModelLoad("safetensors header is too large".into()))?;

    let mut header = vec![0u8; header_len];
    file.read_exact(&mut header)?;

    let metadata: Metadata = serde_json::from_slice(&header)
        .map_err(|e| AspectraError::ModelLoad(format!("invalid safetensors header: {e}")))?;
    Ok(metadata
        .tensors()
        .into_iter()
        .map(|(name, info)| (name, info.shape.clone()))
        .collect())
}

fn require_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(AspectraError::ModelLoad(format!(
            "{name} not found in {}",
            dir.display()
        )))
    }
}

/// Sequence tagger backed by a DistilBERT token classifier.
pub struct NeuralTagger {
    hf_tokenizer: HfTokenizer,
    words: Tokenizer,
    model: TokenClassifier,
    transitions: Option<Vec<Vec<f32>>>,
    viterbi: ViterbiDecoder,
    labels: Vec<String>,
    device: Device,
}

impl NeuralTagger {
    /// Loads a checkpoint directory holding `config.json`, `tokenizer.json`
    /// and `model.safetensors`.
    ///
    /// # Errors
    ///
    /// Returns `AspectraError::ModelLoad` for missing or malformed files,
    /// and `AspectraError::SchemeMismatch` if the model predicts a label the
    /// scheme does not declare.
    pub fn load(dir: impl AsRef<Path>, scheme: &TagScheme) -> Result<Self> {
        let dir = dir.as_ref();
        let config_path = require_file(dir, CONFIG_FILE)?;
        let tokenizer_path = require_file(dir, TOKENIZER_FILE)?;
        let weights_path = require_file(dir, WEIGHTS_FILE)?;

        let config_str = std::fs::read_to_string(&config_path)?;
        let classifier_config: ClassifierConfig = serde_json::from_str(&config_str)
            .map_err(|e| AspectraError::ModelLoad(format!("failed to parse config: {e}")))?;
        let bert_config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| AspectraError::ModelLoad(format!("failed to parse config: {e}")))?;

        let labels = classifier_config.labels()?;
        scheme.validate_labels(&labels)?;
        let tags: Vec<Tag> = labels.iter().map(|l| scheme.resolve_tag(l).0).collect();

        let shapes = read_tensor_shapes(&weights_path)?;
        let expected = [labels.len(), classifier_config.dim];
        match shapes.get(CLASSIFIER_WEIGHT) {
            Some(shape) if shape.as_slice() == expected => {}
            Some(shape) => {
                return Err(AspectraError::ModelLoad(format!(
                    "{CLASSIFIER_WEIGHT} has shape {shape:?}, expected {expected:?}"
                )));
            }
            None => {
                return Err(AspectraError::ModelLoad(format!(
                    "{CLASSIFIER_WEIGHT} missing from {WEIGHTS_FILE}"
                )));
            }
        }
        let with_transitions = shapes.contains_key(TRANSITIONS_WEIGHT);

        let hf_tokenizer = HfTokenizer::from_file(&tokenizer_path)
            .map_err(|e| AspectraError::ModelLoad(format!("failed to load tokenizer: {e}")))?;

        let device = Device::Cpu;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device) }
            .map_err(candle)?;
        let model = TokenClassifier::load(
            vb,
            &bert_config,
            classifier_config.dim,
            labels.len(),
            with_transitions,
        )
        .map_err(candle)?;

        let transitions = model
            .transitions
            .as_ref()
            .map(|t| t.to_vec2::<f32>())
            .transpose()
            .map_err(candle)?;

        tracing::info!(
            model = %dir.display(),
            labels = labels.len(),
            transitions = with_transitions,
            "neural tagger loaded"
        );

        Ok(Self {
            hf_tokenizer,
            words: Tokenizer::new()?,
            model,
            transitions,
            viterbi: decoder_for(&tags),
            labels,
            device,
        })
    }

    /// The model's label vocabulary in output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Emission scores, one row per sub-word.
    fn emissions(&self, ids: &[u32]) -> Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::new(ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle)?;
        let attention_mask = Tensor::ones_like(&input_ids).map_err(candle)?;

        let rows = self
            .model
            .forward(&input_ids, &attention_mask)
            .and_then(|e| e.squeeze(0))
            .and_then(|e| e.to_vec2::<f32>())
            .map_err(candle)?;

        if rows.first().is_some_and(|row| row.len() != self.labels.len()) {
            return Err(AspectraError::Inference(format!(
                "model emitted {} scores per token, expected {}",
                rows[0].len(),
                self.labels.len()
            )));
        }
        Ok(rows)
    }
}

impl SequenceTagger for NeuralTagger {
    fn tag(&self, text: &str) -> Result<Document> {
        let tokens = self.words.tokenize(text);
        if tokens.is_empty() {
            return Document::new(text, Vec::new(), Vec::new());
        }
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        let encoding = self
            .hf_tokenizer
            .encode(words.as_slice(), true)
            .map_err(|e| AspectraError::Inference(format!("tokenize error: {e}")))?;
        let emissions = self.emissions(encoding.get_ids())?;

        let mut first_subword: Vec<Option<usize>> = vec![None; words.len()];
        for (row, word) in encoding.get_word_ids().iter().enumerate() {
            if let Some(slot) = word.and_then(|w| first_subword.get_mut(w as usize)) {
                slot.get_or_insert(row);
            }
        }

        let rows: Vec<Vec<f32>> = first_subword
            .iter()
            .flatten()
            .filter_map(|&row| emissions.get(row).cloned())
            .collect();
        let mut path = self
            .viterbi
            .decode(&rows, self.transitions.as_deref())?
            .into_iter();

        let truncated = first_subword.iter().filter(|slot| slot.is_none()).count();
        if truncated > 0 {
            tracing::warn!(truncated, "words beyond the model input were labelled O");
        }

        let labels = first_subword
            .iter()
            .map(|slot| {
                slot.and_then(|_| path.next())
                    .and_then(|idx| self.labels.get(idx).cloned())
                    .unwrap_or_else(|| OUTSIDE_LABEL.to_string())
            })
            .collect();

        Document::new(text, tokens, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> ClassifierConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn labels_in_id_order() {
        let config = config(r#"{"dim": 768, "id2label": {"1": "B-TASK", "0": "O", "2": "I-TASK"}}"#);
        assert_eq!(config.labels().unwrap(), ["O", "B-TASK", "I-TASK"]);
    }

    #[test]
    fn labels_must_be_contiguous() {
        let gap = config(r#"{"dim": 768, "id2label": {"0": "O", "5": "B-TASK"}}"#);
        assert!(matches!(gap.labels(), Err(AspectraError::ModelLoad(_))));

        let empty = config(r#"{"dim": 768}"#);
        assert!(empty.labels().is_err());
    }

    #[test]
    fn foreign_labels_are_rejected() {
        let scheme = TagScheme::default();
        let config = config(r#"{"dim": 8, "id2label": {"0": "O", "1": "B-DATASET"}}"#);
        let labels = config.labels().unwrap();
        assert!(matches!(
            scheme.validate_labels(&labels),
            Err(AspectraError::SchemeMismatch { label }) if label == "B-DATASET"
        ));
    }

    #[test]
    fn io_vocabulary_decodes_unconstrained() {
        let scheme = TagScheme::default();
        let io: Vec<Tag> = ["O", "Task", "Method"]
            .iter()
            .map(|l| scheme.resolve_tag(l).0)
            .collect();
        let decoder = decoder_for(&io);
        assert!(decoder.is_allowed(0, 1));

        let bio = scheme.all_tags();
        let decoder = decoder_for(&bio);
        assert!(!decoder.is_allowed(0, 2));
    }

    #[test]
    fn missing_model_directory() {
        let scheme = TagScheme::default();
        let err = NeuralTagger::load("/nonexistent/aspectra-model", &scheme)
            .err()
            .unwrap();
        assert!(matches!(err, AspectraError::ModelLoad(msg) if msg.contains(CONFIG_FILE)));
    }

    #[test]
    fn safetensors_header_shapes() {
        let header = br#"{"classifier.weight":{"dtype":"F32","shape":[9,4],"data_offsets":[0,144]}}"#;
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header);
        bytes.extend(std::iter::repeat_n(0u8, 144));

        let path = std::env::temp_dir().join(format!("aspectra-header-{}.safetensors", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();
        let shapes = read_tensor_shapes(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(shapes[CLASSIFIER_WEIGHT], [9, 4]);
        assert!(!shapes.contains_key(TRANSITIONS_WEIGHT));
    }
}
