use candle_core::{Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config, DistilBertModel};

/// DistilBERT encoder with a per-token linear classification head, the
/// layout of a Hugging Face `DistilBertForTokenClassification` checkpoint.
pub struct TokenClassifier {
    pub distilbert: DistilBertModel,
    pub classifier: Linear,
    /// Learned label transition scores, when the checkpoint carries them.
    pub transitions: Option<Tensor>,
}

impl TokenClassifier {
    /// Load the model from a var builder rooted at the checkpoint.
    ///
    /// `dim` is the encoder hidden size and `num_labels` the size of the
    /// label vocabulary; both come from the checkpoint's `config.json`.
    pub fn load(
        vb: VarBuilder,
        config: &Config,
        dim: usize,
        num_labels: usize,
        with_transitions: bool,
    ) -> Result<Self> {
        let distilbert = DistilBertModel::load(vb.pp("distilbert"), config)?;
        let classifier = candle_nn::linear(dim, num_labels, vb.pp("classifier"))?;
        let transitions = if with_transitions {
            Some(
                vb.pp("crf_transitions")
                    .get((num_labels, num_labels), "weight")?,
            )
        } else {
            None
        };

        Ok(Self {
            distilbert,
            classifier,
            transitions,
        })
    }

    /// Forward pass producing emission scores of shape
    /// `[batch_size, seq_len, num_labels]`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden_states = self.distilbert.forward(input_ids, attention_mask)?;
        self.classifier.forward(&hidden_states)
    }
}
