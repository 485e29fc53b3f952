use std::fmt;
use std::str::FromStr;

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        BiLstm, BiLstmConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend},
};
use serde::{Deserialize, Serialize};

use crate::ml::loss::MagnitudeLoss;

/// Which stack of encoder stages and head layers to build.
///
/// Deep:    [BiLSTM ×3 → attention] ×2, head 2H → 256 → 64 → 1
/// Shallow: [BiLSTM ×2 → attention] ×1, head 2H → 64 → 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Shallow,
    Deep,
}

impl ModelVariant {
    fn stage_depths(self) -> &'static [usize] {
        match self {
            ModelVariant::Shallow => &[2],
            ModelVariant::Deep    => &[3, 3],
        }
    }

    fn head_layers(self) -> &'static [(usize, f64)] {
        match self {
            ModelVariant::Shallow => &[(64, 0.2)],
            ModelVariant::Deep    => &[(256, 0.3), (64, 0.2)],
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelVariant::Shallow => f.write_str("shallow"),
            ModelVariant::Deep    => f.write_str("deep"),
        }
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Ok(ModelVariant::Shallow),
            "deep"    => Ok(ModelVariant::Deep),
            other     => Err(format!("unknown model variant '{other}' (expected shallow or deep)")),
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug, PartialEq)]
pub struct MagnitudeModelConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    pub variant:     ModelVariant,
    #[config(default = 4)]
    pub num_heads:   usize,
    #[config(default = 0.2)]
    pub attention_dropout: f64,
}

impl MagnitudeModelConfig {
    /// Width of every per-timestep representation after the first BiLSTM
    pub fn encoder_width(&self) -> usize {
        2 * self.hidden_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MagnitudeModel<B> {
        let width = self.encoder_width();

        let mut stages = Vec::new();
        let mut d_in   = self.input_size;
        for &depth in self.variant.stage_depths() {
            stages.push(self.build_stage(d_in, depth, device));
            d_in = width;
        }

        let mut hidden   = Vec::new();
        let mut dropouts = Vec::new();
        let mut d_head   = width;
        for &(d_out, p) in self.variant.head_layers() {
            hidden.push(LinearConfig::new(d_head, d_out).init(device));
            dropouts.push(DropoutConfig::new(p).init());
            d_head = d_out;
        }
        let output = LinearConfig::new(d_head, 1).init(device);

        MagnitudeModel { stages, hidden, dropouts, output }
    }

    fn build_stage<B: Backend>(&self, d_in: usize, depth: usize, device: &B::Device) -> EncoderStage<B> {
        let width = self.encoder_width();
        let lstms = (0..depth)
            .map(|i| {
                let input = if i == 0 { d_in } else { width };
                BiLstmConfig::new(input, self.hidden_size, true).init(device)
            })
            .collect();
        let attention = MultiHeadAttentionConfig::new(width, self.num_heads)
            .with_dropout(self.attention_dropout)
            .init(device);
        EncoderStage { lstms, attention }
    }
}

/// Stacked BiLSTMs followed by one self-attention block
#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    pub lstms:     Vec<BiLstm<B>>,
    pub attention: MultiHeadAttention<B>,
}

impl<B: Backend> EncoderStage<B> {
    /// [batch, seq, d_in] → [batch, seq, 2H]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut h = x;
        for lstm in &self.lstms {
            let (out, _state) = lstm.forward(h, None);
            h = out;
        }
        self.attention.forward(MhaInput::self_attn(h)).context
    }
}

#[derive(Module, Debug)]
pub struct MagnitudeModel<B: Backend> {
    pub stages:   Vec<EncoderStage<B>>,
    pub hidden:   Vec<Linear<B>>,
    pub dropouts: Vec<Dropout>,
    pub output:   Linear<B>,
}

impl<B: Backend> MagnitudeModel<B> {
    /// sequences: [batch, window, features] → predicted magnitude: [batch]
    pub fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 1> {
        let [batch_size, _, _] = sequences.dims();

        let mut x = sequences;
        for stage in &self.stages {
            x = stage.forward(x);
        }

        // Mean over time: [batch, seq, 2H] → [batch, 2H]
        let pooled = x.mean_dim(1);
        let width  = pooled.dims()[2];
        let mut z  = pooled.reshape([batch_size, width]);

        for (linear, dropout) in self.hidden.iter().zip(&self.dropouts) {
            z = dropout.forward(relu(linear.forward(z)));
        }

        self.output.forward(z).reshape([batch_size])
    }

    pub fn forward_loss(
        &self,
        sequences: Tensor<B, 3>,
        targets:   Tensor<B, 1>,
        loss_fn:   &MagnitudeLoss,
    ) -> (Tensor<B, 1>, Tensor<B, 1>)
    where
        B: AutodiffBackend,
    {
        let predictions = self.forward(sequences);
        let loss = loss_fn.forward(predictions.clone(), targets);
        (loss, predictions)
    }
}
