//! Recurrent layers: LSTM and Elman RNN composed from the gate-fusion and
//! Linear kernels plus elementwise tensor operations.
//!
//! Both keep their state in caller-owned memory and read the input sequence
//! one time step (`input_size` elements) at a time. After a call the hidden
//! state is the layer output.

use crate::activation::Activation;
use crate::backend::Backend;
use crate::config::KernelConfig;
use crate::error::{expect_len, KernelError, KernelResult};
use crate::fixed::Numeric;
use crate::kernels::gate::{gate_fusion, Projection};
use crate::kernels::linear;
use crate::tensor::{activate_in_place, add_in_place, copy_into, fill, hadamard_in_place, tanh_tensor};

/// LSTM gate order inside the stacked parameter arrays and their nonlinearity.
pub const LSTM_GATES: [Activation; 4] = [
    Activation::Sigmoid, // i
    Activation::Sigmoid, // f
    Activation::Tanh,    // g
    Activation::Sigmoid, // o
];

/// State elements of an RNN: hidden vector and an output work vector.
pub const fn rnn_state_len(hidden_size: usize) -> usize {
    2 * hidden_size
}

/// State elements of an LSTM: `h`, `c` and four gate vectors.
pub const fn lstm_state_len(hidden_size: usize) -> usize {
    (2 + LSTM_GATES.len()) * hidden_size
}

/// Input-to-hidden and hidden-to-hidden parameters, stacked per gate.
#[derive(Debug, Clone, Copy)]
pub struct RecurrentWeights<'p, T> {
    /// `[gates][hidden][input]`
    pub weight_ih: &'p [T],
    /// `[gates][hidden][hidden]`
    pub weight_hh: &'p [T],
    /// `[gates][hidden]`
    pub bias_ih: &'p [T],
    /// `[gates][hidden]`
    pub bias_hh: &'p [T],
}

impl<'p, T: Numeric> RecurrentWeights<'p, T> {
    /// Positional `[w_ih, w_hh, b_ih, b_hh]` as found in a compiled record.
    pub fn from_params(params: &[&'p [T]]) -> KernelResult<Self> {
        expect_len("recurrent parameters", 4, params.len())?;
        Ok(Self { weight_ih: params[0], weight_hh: params[1], bias_ih: params[2], bias_hh: params[3] })
    }

    fn validate(&self, gates: usize, input_size: usize, hidden_size: usize) -> KernelResult<()> {
        if input_size == 0 {
            return Err(KernelError::InvalidAttribute { name: "input_size", value: 0 });
        }
        if hidden_size == 0 {
            return Err(KernelError::InvalidAttribute { name: "hidden_size", value: 0 });
        }
        expect_len("weight_ih", gates * hidden_size * input_size, self.weight_ih.len())?;
        expect_len("weight_hh", gates * hidden_size * hidden_size, self.weight_hh.len())?;
        expect_len("bias_ih", gates * hidden_size, self.bias_ih.len())?;
        expect_len("bias_hh", gates * hidden_size, self.bias_hh.len())
    }

    /// Parameters of gate `k` as two fusable projections.
    fn gate(self, k: usize, input_size: usize, hidden_size: usize) -> (&'p [T], &'p [T], &'p [T], &'p [T]) {
        let ih = hidden_size * input_size;
        let hh = hidden_size * hidden_size;
        (
            &self.weight_ih[k * ih..(k + 1) * ih],
            &self.weight_hh[k * hh..(k + 1) * hh],
            &self.bias_ih[k * hidden_size..(k + 1) * hidden_size],
            &self.bias_hh[k * hidden_size..(k + 1) * hidden_size],
        )
    }
}

fn check_sequence<T>(input_size: usize, input: &[T], seq_len: usize) -> KernelResult<()> {
    if seq_len == 0 {
        return Err(KernelError::InvalidSequenceLength { seq_len });
    }
    expect_len("sequence input", seq_len * input_size, input.len())
}

// =============================================================================
// LSTM
// =============================================================================

/// Long short-term memory layer.
///
/// Per step: `[i, f, g, o]` via gate fusion, then `c = f⊙c + i⊙g` and
/// `h = o⊙tanh(c)`, all in place in the layer state.
pub struct LstmLayer<'p, T> {
    weights: RecurrentWeights<'p, T>,
    input_size: usize,
    hidden_size: usize,
    h: &'p mut [T],
    c: &'p mut [T],
    gates: &'p mut [T],
}

impl<'p, T: Numeric> LstmLayer<'p, T> {
    /// `state` must hold [`lstm_state_len`]`(hidden_size)` elements; it is
    /// split into `h`, `c` and the gate work area and is not cleared.
    pub fn new(
        weights: RecurrentWeights<'p, T>,
        input_size: usize,
        hidden_size: usize,
        state: &'p mut [T],
    ) -> KernelResult<Self> {
        weights.validate(LSTM_GATES.len(), input_size, hidden_size)?;
        expect_len("lstm state", lstm_state_len(hidden_size), state.len())?;
        let (h, rest) = state.split_at_mut(hidden_size);
        let (c, gates) = rest.split_at_mut(hidden_size);
        Ok(Self { weights, input_size, hidden_size, h, c, gates })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn hidden(&self) -> &[T] {
        &*self.h
    }

    pub fn cell(&self) -> &[T] {
        &*self.c
    }

    /// Gate activations of the last step, `[i | f | g | o]`.
    pub fn gates(&self) -> &[T] {
        &*self.gates
    }

    pub fn reset_state(&mut self) {
        fill(self.h, T::ZERO);
        fill(self.c, T::ZERO);
        fill(self.gates, T::ZERO);
    }

    /// Run `seq_len` steps over `input` (`seq_len · input_size` elements).
    pub fn forward<B: Backend<T>>(
        &mut self,
        backend: &B,
        config: &KernelConfig,
        input: &[T],
        seq_len: usize,
    ) -> KernelResult<&[T]> {
        check_sequence(self.input_size, input, seq_len)?;
        for x_t in input.chunks_exact(self.input_size) {
            self.step(backend, config, x_t)?;
        }
        Ok(&*self.h)
    }

    fn step<B: Backend<T>>(&mut self, backend: &B, config: &KernelConfig, x_t: &[T]) -> KernelResult<()> {
        let hid = self.hidden_size;
        for (k, &activation) in LSTM_GATES.iter().enumerate() {
            let (w_ih, w_hh, b_ih, b_hh) = self.weights.gate(k, self.input_size, hid);
            let gate = &mut self.gates[k * hid..(k + 1) * hid];
            let fused = if config.fuse_activation { activation } else { Activation::Identity };
            gate_fusion(
                backend,
                &config.schedule,
                Projection { weights: w_ih, bias: b_ih, input: x_t },
                Projection { weights: w_hh, bias: b_hh, input: &*self.h },
                fused,
                gate,
            )?;
            if !config.fuse_activation {
                activate_in_place(backend, activation, gate);
            }
        }

        let (i, rest) = self.gates.split_at_mut(hid);
        let (f, rest) = rest.split_at_mut(hid);
        let (g, o) = rest.split_at_mut(hid);

        hadamard_in_place(self.c, f)?;
        hadamard_in_place(i, g)?;
        add_in_place(self.c, i)?;

        copy_into(self.h, self.c)?;
        tanh_tensor(backend, self.h);
        hadamard_in_place(self.h, o)
    }
}

// =============================================================================
// RNN
// =============================================================================

/// Elman RNN: `h = tanh(W_ih·x + b_ih + W_hh·h + b_hh)`.
pub struct RnnLayer<'p, T> {
    weights: RecurrentWeights<'p, T>,
    input_size: usize,
    hidden_size: usize,
    h: &'p mut [T],
    out: &'p mut [T],
}

impl<'p, T: Numeric> RnnLayer<'p, T> {
    /// `state` must hold [`rnn_state_len`]`(hidden_size)` elements.
    pub fn new(
        weights: RecurrentWeights<'p, T>,
        input_size: usize,
        hidden_size: usize,
        state: &'p mut [T],
    ) -> KernelResult<Self> {
        weights.validate(1, input_size, hidden_size)?;
        expect_len("rnn state", rnn_state_len(hidden_size), state.len())?;
        let (h, out) = state.split_at_mut(hidden_size);
        Ok(Self { weights, input_size, hidden_size, h, out })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn hidden(&self) -> &[T] {
        &*self.h
    }

    pub fn reset_state(&mut self) {
        fill(self.h, T::ZERO);
        fill(self.out, T::ZERO);
    }

    pub fn forward<B: Backend<T>>(
        &mut self,
        backend: &B,
        config: &KernelConfig,
        input: &[T],
        seq_len: usize,
    ) -> KernelResult<&[T]> {
        check_sequence(self.input_size, input, seq_len)?;
        for x_t in input.chunks_exact(self.input_size) {
            self.step(backend, config, x_t)?;
        }
        Ok(&*self.h)
    }

    fn step<B: Backend<T>>(&mut self, backend: &B, config: &KernelConfig, x_t: &[T]) -> KernelResult<()> {
        let w = &self.weights;
        let schedule = &config.schedule;
        linear(backend, schedule, w.weight_hh, Some(w.bias_hh), self.h, self.out)?;
        // h_{t-1} is consumed; reuse h for the input projection.
        linear(backend, schedule, w.weight_ih, Some(w.bias_ih), x_t, self.h)?;
        add_in_place(self.out, self.h)?;
        tanh_tensor(backend, self.out);
        copy_into(self.h, self.out)
    }
}
