//! Network driver: run an ordered layer list over a ping-pong scratch buffer.
//!
//! ```text
//! input ─▶ L0 ─▶ A ─▶ L1 ─▶ B ─▶ L2 ─▶ A ─▶ ...      (Linear / Conv2D)
//!                 └─▶ LSTM ─▶ h ─▶ L ─▶ B            (recurrent: own state)
//! ```
//!
//! Linear and Conv2D steps write the scratch half that the previous step did
//! not, then swap. Recurrent layers leave the scratch buffer alone and expose
//! their hidden state as the next layer's input. The layer chain is checked
//! once in [`Network::new`]; everything a call depends on (input length,
//! sequence length, scratch capacity) is checked before the first kernel runs.

use log::{debug, error, trace};

use crate::backend::{Backend, Portable};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::fixed::Numeric;
use crate::layers::{Layer, LayerKind};
use crate::scratch::{Half, PingPong};

/// Hooks the driver calls around every layer (profiling, tracing, dumps).
pub trait NetworkObserver {
    fn layer_started(&mut self, _index: usize, _kind: LayerKind) {}

    fn layer_finished(&mut self, _index: usize, _kind: LayerKind, _output_len: usize) {}
}

/// No-op observer.
impl NetworkObserver for () {}

/// Where the current activation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    External,
    Scratch(Half),
    State(usize),
}

/// An ordered, shape-checked sequence of layers bound to a backend.
pub struct Network<'n, 'p, T: Numeric, B = Portable> {
    layers: &'n mut [Layer<'p, T>],
    input_len: usize,
    /// Largest Linear/Conv2D output; each scratch half must hold it.
    stage_len: usize,
    backend: B,
    config: KernelConfig,
}

impl<'n, 'p, T: Numeric> Network<'n, 'p, T, Portable>
where
    Portable: Backend<T>,
{
    /// Build with the portable backend and the default configuration.
    pub fn new(layers: &'n mut [Layer<'p, T>], input_len: usize) -> KernelResult<Self> {
        Self::with_backend(layers, input_len, Portable, KernelConfig::default())
    }
}

impl<'n, 'p, T: Numeric, B: Backend<T>> Network<'n, 'p, T, B> {
    /// Validate the chain: each layer's output length must equal the next
    /// layer's per-step input length.
    pub fn with_backend(
        layers: &'n mut [Layer<'p, T>],
        input_len: usize,
        backend: B,
        config: KernelConfig,
    ) -> KernelResult<Self> {
        if layers.is_empty() {
            error!("network has no layers");
            return Err(KernelError::EmptyNetwork);
        }

        let mut expected = input_len;
        let mut stage_len = 0;
        for (i, layer) in layers.iter().enumerate() {
            if layer.input_len() != expected {
                error!(
                    "layer {i} ({}) expects {} inputs, previous stage produces {expected}",
                    layer.name(),
                    layer.input_len()
                );
                return Err(KernelError::ShapeMismatch {
                    tensor: "layer input",
                    expected: layer.input_len(),
                    actual: expected,
                });
            }
            if !layer.kind().is_recurrent() {
                stage_len = stage_len.max(layer.output_len());
            }
            expected = layer.output_len();
        }
        trace!("network: {} layers, largest stage {stage_len} elements", layers.len());

        Ok(Self { layers, input_len, stage_len, backend, config })
    }

    /// Per-step input length of the first layer.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_len())
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, idx: usize) -> Option<&Layer<'p, T>> {
        self.layers.get(idx)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Scratch elements `infer` needs: two halves, each as large as the
    /// biggest Linear/Conv2D output. A longer buffer is split down the middle.
    pub fn required_scratch_len(&self) -> usize {
        2 * self.stage_len
    }

    /// Zero the state of every recurrent layer.
    pub fn reset_state(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.reset_state();
        }
    }

    /// Run every layer once; a leading recurrent layer consumes `seq_len` steps.
    pub fn infer<'a>(&'a mut self, input: &[T], scratch: &'a mut [T], seq_len: usize) -> KernelResult<&'a [T]> {
        self.infer_observed(input, scratch, seq_len, &mut ())
    }

    /// [`Network::infer`] with observer callbacks around each layer.
    pub fn infer_observed<'a, O: NetworkObserver>(
        &'a mut self,
        input: &[T],
        scratch: &'a mut [T],
        seq_len: usize,
        observer: &mut O,
    ) -> KernelResult<&'a [T]> {
        self.check_call(input, scratch, seq_len)?;

        let half_len = scratch.len() / 2;
        let mut buffers = PingPong::new(scratch, half_len)?;
        let mut cursor = Cursor::External;
        let mut next = Half::A;
        let backend = &self.backend;
        let config = &self.config;

        for i in 0..self.layers.len() {
            let (before, rest) = self.layers.split_at_mut(i);
            let Some(layer) = rest.first_mut() else {
                break;
            };
            let kind = layer.kind();
            let (in_len, out_len) = (layer.input_len(), layer.output_len());
            debug!("layer {i}: {} {in_len} -> {out_len}", kind.name());
            observer.layer_started(i, kind);

            if kind.is_recurrent() {
                let steps = if i == 0 { seq_len } else { 1 };
                let src = match cursor {
                    Cursor::External => input,
                    Cursor::Scratch(h) => &buffers.half(h)[..in_len],
                    Cursor::State(j) => before[j].state_output().unwrap_or(&[]),
                };
                layer.forward(backend, config, src, &mut [], steps)?;
                cursor = Cursor::State(i);
            } else {
                let (dst, other) = buffers.split(next);
                let src = match cursor {
                    Cursor::External => input,
                    Cursor::Scratch(_) => &other[..in_len],
                    Cursor::State(j) => before[j].state_output().unwrap_or(&[]),
                };
                layer.forward(backend, config, src, &mut dst[..out_len], 1)?;
                trace!("layer {i}: wrote scratch half {next:?}");
                cursor = Cursor::Scratch(next);
                next = next.other();
            }

            observer.layer_finished(i, kind, out_len);
        }

        let out_len = self.output_len();
        match cursor {
            Cursor::Scratch(h) => Ok(&buffers.into_half(h)[..out_len]),
            Cursor::State(j) => self.layers[j].state_output().ok_or(KernelError::EmptyNetwork),
            Cursor::External => Err(KernelError::EmptyNetwork),
        }
    }

    fn check_call(&self, input: &[T], scratch: &[T], seq_len: usize) -> KernelResult<()> {
        let leading_recurrent = self.layers.first().is_some_and(|l| l.kind().is_recurrent());
        if seq_len == 0 || (seq_len > 1 && !leading_recurrent) {
            error!("sequence length {seq_len} not accepted by this network");
            return Err(KernelError::InvalidSequenceLength { seq_len });
        }

        let expected = if leading_recurrent { seq_len * self.input_len } else { self.input_len };
        if input.len() != expected {
            error!("network input has {} elements, expected {expected}", input.len());
            return Err(KernelError::ShapeMismatch { tensor: "network input", expected, actual: input.len() });
        }

        let required = self.required_scratch_len();
        if scratch.len() < required {
            error!("scratch buffer holds {} elements, network needs {required}", scratch.len());
            return Err(KernelError::BufferTooSmall { required, available: scratch.len() });
        }
        Ok(())
    }
}
