//! Layer descriptors: a tagged union over the four supported layer kinds.
//!
//! A descriptor borrows its parameters (`&'p [T]`, usually flash constants)
//! and, for recurrent kinds, its persistent state (`&'p mut [T]`); it never
//! owns memory. Every constructor checks parameter lengths against the
//! attributes, so a descriptor that exists is a descriptor the kernels can run.

pub mod conv;
pub mod dense;
pub mod recurrent;

use crate::backend::Backend;
use crate::config::KernelConfig;
use crate::error::{expect_len, KernelError, KernelResult};
use crate::fixed::Numeric;
use crate::kernels::conv2d::ConvGeometry;

pub use conv::Conv2dLayer;
pub use dense::LinearLayer;
pub use recurrent::{LstmLayer, RecurrentWeights, RnnLayer, LSTM_GATES};

/// Type tag of a compiled layer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LayerKind {
    Linear = 0,
    Rnn = 1,
    Lstm = 2,
    Conv2d = 3,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Linear => "linear",
            LayerKind::Rnn => "rnn",
            LayerKind::Lstm => "lstm",
            LayerKind::Conv2d => "conv2d",
        }
    }

    pub fn is_recurrent(&self) -> bool {
        matches!(self, LayerKind::Rnn | LayerKind::Lstm)
    }

    /// Number of positional attributes in a compiled record.
    pub fn attribute_count(&self) -> usize {
        match self {
            LayerKind::Linear | LayerKind::Rnn | LayerKind::Lstm => 2,
            LayerKind::Conv2d => 5,
        }
    }
}

impl TryFrom<u8> for LayerKind {
    type Error = KernelError;

    fn try_from(tag: u8) -> KernelResult<Self> {
        match tag {
            0 => Ok(LayerKind::Linear),
            1 => Ok(LayerKind::Rnn),
            2 => Ok(LayerKind::Lstm),
            3 => Ok(LayerKind::Conv2d),
            other => Err(KernelError::UnsupportedLayerType(other)),
        }
    }
}

/// Attributes of a layer record, decoded into named fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSpec {
    Linear { in_features: usize, out_features: usize },
    Rnn { input_size: usize, hidden_size: usize },
    Lstm { input_size: usize, hidden_size: usize },
    Conv2d(ConvGeometry),
}

impl LayerSpec {
    /// Decode `{tag, attributes}` as stored in a compiled network.
    ///
    /// Attribute order: Linear `[in, out]`, RNN/LSTM `[in, hidden]`,
    /// Conv2D `[in_ch, out_ch, kernel, height, width]`.
    pub fn from_record(tag: u8, attributes: &[usize]) -> KernelResult<Self> {
        let kind = LayerKind::try_from(tag)?;
        expect_len("layer attributes", kind.attribute_count(), attributes.len())?;
        let a = attributes;
        Ok(match kind {
            LayerKind::Linear => LayerSpec::Linear { in_features: a[0], out_features: a[1] },
            LayerKind::Rnn => LayerSpec::Rnn { input_size: a[0], hidden_size: a[1] },
            LayerKind::Lstm => LayerSpec::Lstm { input_size: a[0], hidden_size: a[1] },
            LayerKind::Conv2d => LayerSpec::Conv2d(ConvGeometry {
                in_channels: a[0],
                out_channels: a[1],
                kernel_size: a[2],
                height: a[3],
                width: a[4],
            }),
        })
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerSpec::Linear { .. } => LayerKind::Linear,
            LayerSpec::Rnn { .. } => LayerKind::Rnn,
            LayerSpec::Lstm { .. } => LayerKind::Lstm,
            LayerSpec::Conv2d(_) => LayerKind::Conv2d,
        }
    }

    /// Elements of persistent state a recurrent layer needs.
    pub fn state_len(&self) -> usize {
        match *self {
            LayerSpec::Rnn { hidden_size, .. } => recurrent::rnn_state_len(hidden_size),
            LayerSpec::Lstm { hidden_size, .. } => recurrent::lstm_state_len(hidden_size),
            LayerSpec::Linear { .. } | LayerSpec::Conv2d(_) => 0,
        }
    }
}

/// One step of a network.
pub enum Layer<'p, T: Numeric> {
    Linear(LinearLayer<'p, T>),
    Rnn(RnnLayer<'p, T>),
    Lstm(LstmLayer<'p, T>),
    Conv2d(Conv2dLayer<'p, T>),
}

impl<'p, T: Numeric> Layer<'p, T> {
    /// Bind a decoded record to its parameter tensors and state.
    ///
    /// Parameter order: Linear `[weights]` or `[weights, bias]`,
    /// RNN/LSTM `[w_ih, w_hh, b_ih, b_hh]`, Conv2D `[weights, bias]`.
    /// `state` must be `spec.state_len()` long (empty for feed-forward kinds).
    pub fn from_record(spec: LayerSpec, params: &[&'p [T]], state: &'p mut [T]) -> KernelResult<Self> {
        if !spec.kind().is_recurrent() {
            expect_len("layer state", 0, state.len())?;
        }
        match spec {
            LayerSpec::Linear { in_features, out_features } => {
                let bias = match params.len() {
                    1 => None,
                    2 => Some(params[1]),
                    n => return Err(KernelError::ShapeMismatch { tensor: "linear parameters", expected: 2, actual: n }),
                };
                Ok(Layer::Linear(LinearLayer::new(params[0], bias, in_features, out_features)?))
            }
            LayerSpec::Conv2d(geometry) => {
                expect_len("conv2d parameters", 2, params.len())?;
                Ok(Layer::Conv2d(Conv2dLayer::new(params[0], params[1], geometry)?))
            }
            LayerSpec::Rnn { input_size, hidden_size } => {
                let weights = RecurrentWeights::from_params(params)?;
                Ok(Layer::Rnn(RnnLayer::new(weights, input_size, hidden_size, state)?))
            }
            LayerSpec::Lstm { input_size, hidden_size } => {
                let weights = RecurrentWeights::from_params(params)?;
                Ok(Layer::Lstm(LstmLayer::new(weights, input_size, hidden_size, state)?))
            }
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Linear(_) => LayerKind::Linear,
            Layer::Rnn(_) => LayerKind::Rnn,
            Layer::Lstm(_) => LayerKind::Lstm,
            Layer::Conv2d(_) => LayerKind::Conv2d,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Elements consumed per step (per time step for recurrent kinds).
    pub fn input_len(&self) -> usize {
        match self {
            Layer::Linear(l) => l.in_features(),
            Layer::Rnn(l) => l.input_size(),
            Layer::Lstm(l) => l.input_size(),
            Layer::Conv2d(l) => l.geometry().input_len(),
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            Layer::Linear(l) => l.out_features(),
            Layer::Rnn(l) => l.hidden_size(),
            Layer::Lstm(l) => l.hidden_size(),
            Layer::Conv2d(l) => l.geometry().output_len(),
        }
    }

    /// Hidden state of a recurrent layer; it doubles as the layer output.
    pub fn state_output(&self) -> Option<&[T]> {
        match self {
            Layer::Rnn(l) => Some(l.hidden()),
            Layer::Lstm(l) => Some(l.hidden()),
            Layer::Linear(_) | Layer::Conv2d(_) => None,
        }
    }

    /// Run one layer.
    ///
    /// Linear and Conv2D write `output` and ignore `steps`. Recurrent kinds run
    /// `steps` time steps over `input`, leave the result in their hidden state
    /// and ignore `output`.
    pub fn forward<B: Backend<T>>(
        &mut self,
        backend: &B,
        config: &KernelConfig,
        input: &[T],
        output: &mut [T],
        steps: usize,
    ) -> KernelResult<()> {
        match self {
            Layer::Linear(l) => l.forward(backend, config, input, output),
            Layer::Conv2d(l) => l.forward(backend, config, input, output),
            Layer::Rnn(l) => l.forward(backend, config, input, steps).map(|_| ()),
            Layer::Lstm(l) => l.forward(backend, config, input, steps).map(|_| ()),
        }
    }

    /// Zero all persistent state.
    pub fn reset_state(&mut self) {
        match self {
            Layer::Rnn(l) => l.reset_state(),
            Layer::Lstm(l) => l.reset_state(),
            Layer::Linear(_) | Layer::Conv2d(_) => {}
        }
    }
}
