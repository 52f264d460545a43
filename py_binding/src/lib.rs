//! Python bindings for fixnet-core via PyO3.
//!
//! The core library never owns memory, so `PyNetwork` keeps every parameter
//! tensor, the recurrent state and the scratch buffer in `Vec`s and rebinds
//! borrowed layer descriptors on each call.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use fixnet_core::{
    fixed, Backend, KernelConfig, KernelError, KernelResult, Layer, LayerSpec, Network, Portable, PulpExt,
};

fn to_py_err(e: KernelError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// One decoded layer record with owned parameters.
struct LayerRecord {
    spec: LayerSpec,
    params: Vec<Vec<i16>>,
}

impl LayerRecord {
    fn input_len(&self) -> usize {
        match self.spec {
            LayerSpec::Linear { in_features, .. } => in_features,
            LayerSpec::Rnn { input_size, .. } | LayerSpec::Lstm { input_size, .. } => input_size,
            LayerSpec::Conv2d(g) => g.input_len(),
        }
    }

    fn output_len(&self) -> usize {
        match self.spec {
            LayerSpec::Linear { out_features, .. } => out_features,
            LayerSpec::Rnn { hidden_size, .. } | LayerSpec::Lstm { hidden_size, .. } => hidden_size,
            LayerSpec::Conv2d(g) => g.output_len(),
        }
    }
}

/// Bind `records` to their parameters and `state`, then run one inference.
#[allow(clippy::too_many_arguments)]
fn run<B: Backend<i16>>(
    records: &[LayerRecord],
    state: &mut [i16],
    scratch: &mut Vec<i16>,
    input_len: usize,
    backend: B,
    config: KernelConfig,
    input: &[i16],
    seq_len: usize,
) -> KernelResult<Vec<i16>> {
    let mut layers = Vec::with_capacity(records.len());
    let mut rest = state;
    for record in records {
        let (mine, tail) = std::mem::take(&mut rest).split_at_mut(record.spec.state_len());
        rest = tail;
        let params: Vec<&[i16]> = record.params.iter().map(Vec::as_slice).collect();
        layers.push(Layer::from_record(record.spec, &params, mine)?);
    }

    let mut net = Network::with_backend(&mut layers, input_len, backend, config)?;
    let required = net.required_scratch_len();
    if scratch.len() < required {
        scratch.resize(required, 0);
    }
    net.infer(input, scratch, seq_len).map(<[i16]>::to_vec)
}

/// A sequential Q3.12 network: Linear, Conv2D, RNN and LSTM layers.
#[pyclass]
pub struct PyNetwork {
    input_len: usize,
    config: KernelConfig,
    activation_unit: bool,
    records: Vec<LayerRecord>,
    state: Vec<i16>,
    scratch: Vec<i16>,
}

impl PyNetwork {
    fn current_output_len(&self) -> usize {
        self.records.last().map_or(self.input_len, LayerRecord::output_len)
    }

    fn push(&mut self, spec: LayerSpec, params: Vec<Vec<i16>>) -> PyResult<()> {
        let record = LayerRecord { spec, params };
        let expected = self.current_output_len();
        if record.input_len() != expected {
            return Err(to_py_err(KernelError::ShapeMismatch {
                tensor: "layer input",
                expected: record.input_len(),
                actual: expected,
            }));
        }

        // Bind once so bad parameter lengths surface here rather than at forward().
        let refs: Vec<&[i16]> = record.params.iter().map(Vec::as_slice).collect();
        let mut probe = vec![0i16; spec.state_len()];
        Layer::from_record(spec, &refs, &mut probe).map_err(to_py_err)?;

        log::debug!("added {} layer #{}", spec.kind().name(), self.records.len());
        self.state.extend_from_slice(&probe);
        self.records.push(record);
        Ok(())
    }

    fn run_raw(&mut self, input: &[i16], seq_len: usize) -> PyResult<Vec<i16>> {
        let Self { input_len, config, activation_unit, records, state, scratch } = self;
        let result = if *activation_unit {
            run(records, state, scratch, *input_len, PulpExt, *config, input, seq_len)
        } else {
            run(records, state, scratch, *input_len, Portable, *config, input, seq_len)
        };
        result.map_err(to_py_err)
    }
}

#[pymethods]
impl PyNetwork {
    /// `preset` picks the tile schedule and activation fusion ("riscy" or
    /// "asip"); `activation_unit` selects the bit-exact hardware model.
    #[new]
    #[pyo3(signature = (input_len, preset="riscy", activation_unit=true))]
    fn new(input_len: usize, preset: &str, activation_unit: bool) -> PyResult<Self> {
        let config = match preset {
            "riscy" => KernelConfig::riscy(),
            "asip" => KernelConfig::asip(),
            other => return Err(PyValueError::new_err(format!("unknown preset '{other}'"))),
        };
        if input_len == 0 {
            return Err(to_py_err(KernelError::InvalidAttribute { name: "input_len", value: 0 }));
        }
        Ok(Self { input_len, config, activation_unit, records: Vec::new(), state: Vec::new(), scratch: Vec::new() })
    }

    #[pyo3(signature = (weights, out_features, bias=None))]
    fn add_linear(&mut self, weights: Vec<i16>, out_features: usize, bias: Option<Vec<i16>>) -> PyResult<()> {
        let in_features = self.current_output_len();
        let mut params = vec![weights];
        params.extend(bias);
        self.push(LayerSpec::Linear { in_features, out_features }, params)
    }

    /// Input is `height × width × in_channels` of the previous stage.
    fn add_conv2d(
        &mut self,
        weights: Vec<i16>,
        bias: Vec<i16>,
        in_channels: usize,
        kernel_size: usize,
        height: usize,
        width: usize,
    ) -> PyResult<()> {
        let attrs = [in_channels, bias.len(), kernel_size, height, width];
        let spec = LayerSpec::from_record(3, &attrs).map_err(to_py_err)?;
        self.push(spec, vec![weights, bias])
    }

    fn add_rnn(
        &mut self,
        hidden_size: usize,
        w_ih: Vec<i16>,
        w_hh: Vec<i16>,
        b_ih: Vec<i16>,
        b_hh: Vec<i16>,
    ) -> PyResult<()> {
        let input_size = self.current_output_len();
        self.push(LayerSpec::Rnn { input_size, hidden_size }, vec![w_ih, w_hh, b_ih, b_hh])
    }

    fn add_lstm(
        &mut self,
        hidden_size: usize,
        w_ih: Vec<i16>,
        w_hh: Vec<i16>,
        b_ih: Vec<i16>,
        b_hh: Vec<i16>,
    ) -> PyResult<()> {
        let input_size = self.current_output_len();
        self.push(LayerSpec::Lstm { input_size, hidden_size }, vec![w_ih, w_hh, b_ih, b_hh])
    }

    /// Append a compiled `{tag, attributes, parameters}` record.
    fn add_layer(&mut self, tag: u8, attributes: Vec<usize>, params: Vec<Vec<i16>>) -> PyResult<()> {
        let spec = LayerSpec::from_record(tag, &attributes).map_err(to_py_err)?;
        self.push(spec, params)
    }

    /// Quantize `input`, run the network, dequantize the result.
    #[pyo3(signature = (input, seq_len=1))]
    fn forward(&mut self, input: Vec<f32>, seq_len: usize) -> PyResult<Vec<f32>> {
        let mut raw = vec![0i16; input.len()];
        fixed::quantize_into(&input, &mut raw).map_err(to_py_err)?;
        let out = self.run_raw(&raw, seq_len)?;
        Ok(out.into_iter().map(fixed::to_f32).collect())
    }

    #[pyo3(signature = (input, seq_len=1))]
    fn forward_raw(&mut self, input: Vec<i16>, seq_len: usize) -> PyResult<Vec<i16>> {
        self.run_raw(&input, seq_len)
    }

    fn reset_state(&mut self) {
        self.state.fill(0);
    }

    fn required_scratch_len(&self) -> usize {
        let stage = self
            .records
            .iter()
            .filter(|r| !r.spec.kind().is_recurrent())
            .map(LayerRecord::output_len)
            .max()
            .unwrap_or(0);
        2 * stage
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.current_output_len()
    }

    fn num_layers(&self) -> usize {
        self.records.len()
    }

    fn layer_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.spec.kind().name().to_string()).collect()
    }
}

/// Float to Q3.12, flooring and saturating.
#[pyfunction]
fn quantize(values: Vec<f32>) -> Vec<i16> {
    values.into_iter().map(fixed::from_f32).collect()
}

#[pyfunction]
fn dequantize(values: Vec<i16>) -> Vec<f32> {
    values.into_iter().map(fixed::to_f32).collect()
}

#[pymodule]
fn fixnet_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyNetwork>()?;
    m.add_function(wrap_pyfunction!(quantize, m)?)?;
    m.add_function(wrap_pyfunction!(dequantize, m)?)?;
    Ok(())
}
