use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub name: String,
    pub nb_neurons: usize,
    pub synapse_weight: f64,
    pub bin_size: usize,
    pub duration: usize,
    pub neuron_preset: NeuronPreset,
    pub stim_mode: StimMode,
    pub stimulus_max: u32,
    pub neuron_overrides: NeuronOverrides,
    pub technical_params: TechnicalParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuronPreset {
    RegularSpiking,
    IntrinsicallyBursting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimMode {
    Off,
    On,
}

/// Constants of the two-variable neuron model, in the units of the simple model
/// (mV, pA, pF, ms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub v_rest: f64,
    pub v_threshold: f64,
    pub v_peak: f64,
    pub capacitance: f64,
    pub k: f64,
    pub tau: f64,
    pub noise_amplitude: f64,
    pub initial_voltage: f64,
    pub initial_recovery: f64,
}

/// Per-configuration replacements for preset constants that have no physiological
/// derivation of their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronOverrides {
    pub noise_amplitude: Option<f64>,
    pub initial_voltage: Option<f64>,
    pub initial_recovery: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalParams {
    pub num_threads: Option<usize>,
    pub pin_threads: bool,
    pub seed_override: Option<u64>,
}

pub const DEFAULT_NOISE_AMPLITUDE: f64 = 5.0;
pub const DEFAULT_STIMULUS_MAX: u32 = 500;

impl NeuronPreset {
    pub fn neuron_params(&self) -> NeuronParams {
        let (a, b, c, d, v_rest, v_threshold, capacitance, k) = match self {
            NeuronPreset::RegularSpiking => (0.03, -2.0, -50.0, 100.0, -60.0, -40.0, 100.0, 0.7),
            NeuronPreset::IntrinsicallyBursting => {
                (0.01, 5.0, -56.0, 130.0, -75.0, -45.0, 150.0, 1.2)
            }
        };

        NeuronParams {
            a,
            b,
            c,
            d,
            v_rest,
            v_threshold,
            v_peak: 35.0,
            capacitance,
            k,
            tau: 1.0,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
            initial_voltage: v_rest,
            initial_recovery: b * v_rest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NeuronPreset::RegularSpiking => "regular_spiking",
            NeuronPreset::IntrinsicallyBursting => "intrinsically_bursting",
        }
    }
}

impl FromStr for NeuronPreset {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular_spiking" => Ok(NeuronPreset::RegularSpiking),
            "intrinsically_bursting" => Ok(NeuronPreset::IntrinsicallyBursting),
            _ => Err(SimpleError::new(format!("unknown neuron preset: {}", s))),
        }
    }
}

impl fmt::Display for NeuronPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StimMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StimMode::Off => "off",
            StimMode::On => "on",
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, StimMode::On)
    }
}

impl FromStr for StimMode {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(StimMode::Off),
            "on" => Ok(StimMode::On),
            _ => Err(SimpleError::new(format!(
                "unknown stim_mode: {} (expected \"on\" or \"off\")",
                s
            ))),
        }
    }
}

impl fmt::Display for StimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SimulationParams {
    /// Preset constants with the configured overrides applied.
    pub fn neuron_params(&self) -> NeuronParams {
        let mut neuron_params = self.neuron_preset.neuron_params();

        if let Some(noise_amplitude) = self.neuron_overrides.noise_amplitude {
            neuron_params.noise_amplitude = noise_amplitude;
        }

        if let Some(initial_voltage) = self.neuron_overrides.initial_voltage {
            neuron_params.initial_voltage = initial_voltage;
        }

        if let Some(initial_recovery) = self.neuron_overrides.initial_recovery {
            neuron_params.initial_recovery = initial_recovery;
        }

        neuron_params
    }

    pub fn nb_bins(&self) -> usize {
        self.duration / self.bin_size
    }

    /// Length of one observation vector: one count per neuron, plus the leading
    /// stimulus sample when the stimulus is on.
    pub fn observation_width(&self) -> usize {
        if self.stim_mode.is_on() {
            self.nb_neurons + 1
        } else {
            self.nb_neurons
        }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            name: "simulation".to_string(),
            nb_neurons: 1,
            synapse_weight: 10.0,
            bin_size: 50,
            duration: 1000,
            neuron_preset: NeuronPreset::RegularSpiking,
            stim_mode: StimMode::Off,
            stimulus_max: DEFAULT_STIMULUS_MAX,
            neuron_overrides: NeuronOverrides::default(),
            technical_params: TechnicalParams::default(),
        }
    }
}

impl Default for NeuronPreset {
    fn default() -> Self {
        NeuronPreset::RegularSpiking
    }
}

impl Default for StimMode {
    fn default() -> Self {
        StimMode::Off
    }
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            num_threads: None,
            pin_threads: false,
            seed_override: None,
        }
    }
}

pub fn validate_simulation_params(params: &SimulationParams) -> Result<(), SimpleError> {
    if params.name.is_empty() {
        return Err(SimpleError::new("name must not be empty"));
    }

    if params.nb_neurons == 0 {
        return Err(SimpleError::new("nb_neurons must be strictly positive"));
    }

    if !params.synapse_weight.is_finite() {
        return Err(SimpleError::new("synapse_weight must be finite"));
    }

    if params.bin_size == 0 {
        return Err(SimpleError::new("bin_size must be strictly positive"));
    }

    if params.duration == 0 {
        return Err(SimpleError::new("duration must be strictly positive"));
    }

    if params.duration % params.bin_size != 0 {
        return Err(SimpleError::new(format!(
            "bin_size {} does not divide duration {}",
            params.bin_size, params.duration
        )));
    }

    if params.stim_mode.is_on() && params.duration < 4 {
        return Err(SimpleError::new(
            "duration must be at least 4 when stim_mode is on",
        ));
    }

    if params.stimulus_max % 2 != 0 {
        return Err(SimpleError::new("stimulus_max must be even"));
    }

    validate_neuron_params(&params.neuron_params())?;
    validate_technical_params(&params.technical_params)?;

    Ok(())
}

fn validate_neuron_params(neuron_params: &NeuronParams) -> Result<(), SimpleError> {
    let all_finite = [
        neuron_params.a,
        neuron_params.b,
        neuron_params.c,
        neuron_params.d,
        neuron_params.v_rest,
        neuron_params.v_threshold,
        neuron_params.v_peak,
        neuron_params.capacitance,
        neuron_params.k,
        neuron_params.tau,
        neuron_params.noise_amplitude,
        neuron_params.initial_voltage,
        neuron_params.initial_recovery,
    ]
    .iter()
    .all(|value| value.is_finite());

    if !all_finite {
        return Err(SimpleError::new("neuron parameters must be finite"));
    }

    if neuron_params.tau <= 0.0 {
        return Err(SimpleError::new("tau must be strictly positive"));
    }

    if neuron_params.capacitance <= 0.0 {
        return Err(SimpleError::new("capacitance must be strictly positive"));
    }

    if neuron_params.noise_amplitude < 0.0 {
        return Err(SimpleError::new("noise_amplitude must not be negative"));
    }

    if neuron_params.c >= neuron_params.v_peak {
        return Err(SimpleError::new("reset voltage c must be less than v_peak"));
    }

    if neuron_params.initial_voltage > neuron_params.v_peak {
        return Err(SimpleError::new("initial_voltage must not exceed v_peak"));
    }

    Ok(())
}

fn validate_technical_params(technical_params: &TechnicalParams) -> Result<(), SimpleError> {
    if technical_params.num_threads == Some(0) {
        return Err(SimpleError::new("num_threads must be strictly positive"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn template_params() -> SimulationParams {
        SimulationParams {
            name: "template".to_string(),
            nb_neurons: 3,
            ..SimulationParams::default()
        }
    }

    fn assert_invalid(params: &SimulationParams, message: &str) {
        let result = validate_simulation_params(params);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().as_str(), message);
    }

    #[test]
    fn valid_params() {
        assert!(validate_simulation_params(&template_params()).is_ok());
    }

    #[test]
    fn empty_name() {
        let mut params = template_params();
        params.name.clear();
        assert_invalid(&params, "name must not be empty");
    }

    #[test]
    fn zero_neurons() {
        let mut params = template_params();
        params.nb_neurons = 0;
        assert_invalid(&params, "nb_neurons must be strictly positive");
    }

    #[test]
    fn non_finite_weight() {
        let mut params = template_params();
        params.synapse_weight = f64::NAN;
        assert_invalid(&params, "synapse_weight must be finite");
    }

    #[test]
    fn zero_bin_size() {
        let mut params = template_params();
        params.bin_size = 0;
        assert_invalid(&params, "bin_size must be strictly positive");
    }

    #[test]
    fn bin_size_not_dividing_duration() {
        let mut params = template_params();
        params.bin_size = 30;
        assert_invalid(&params, "bin_size 30 does not divide duration 1000");
    }

    #[test]
    fn too_short_stimulated_duration() {
        let mut params = template_params();
        params.stim_mode = StimMode::On;
        params.duration = 2;
        params.bin_size = 1;
        assert_invalid(&params, "duration must be at least 4 when stim_mode is on");
    }

    #[test]
    fn odd_stimulus_max() {
        let mut params = template_params();
        params.stimulus_max = 501;
        assert_invalid(&params, "stimulus_max must be even");
    }

    #[test]
    fn negative_noise() {
        let mut params = template_params();
        params.neuron_overrides.noise_amplitude = Some(-1.0);
        assert_invalid(&params, "noise_amplitude must not be negative");
    }

    #[test]
    fn initial_voltage_above_peak() {
        let mut params = template_params();
        params.neuron_overrides.initial_voltage = Some(40.0);
        assert_invalid(&params, "initial_voltage must not exceed v_peak");
    }

    #[test]
    fn zero_threads() {
        let mut params = template_params();
        params.technical_params.num_threads = Some(0);
        assert_invalid(&params, "num_threads must be strictly positive");
    }

    #[test]
    fn preset_constants() {
        let rs = NeuronPreset::RegularSpiking.neuron_params();
        assert_approx_eq!(f64, rs.a, 0.03);
        assert_approx_eq!(f64, rs.k, 0.7);
        assert_approx_eq!(f64, rs.initial_voltage, -60.0);
        assert_approx_eq!(f64, rs.initial_recovery, 120.0);

        let ib = NeuronPreset::IntrinsicallyBursting.neuron_params();
        assert_approx_eq!(f64, ib.d, 130.0);
        assert_approx_eq!(f64, ib.capacitance, 150.0);
        assert_approx_eq!(f64, ib.initial_recovery, -375.0);
    }

    #[test]
    fn overrides_replace_preset_constants() {
        let mut params = template_params();
        params.neuron_overrides.noise_amplitude = Some(0.0);
        params.neuron_overrides.initial_recovery = Some(-12.0);

        let neuron_params = params.neuron_params();
        assert_approx_eq!(f64, neuron_params.noise_amplitude, 0.0);
        assert_approx_eq!(f64, neuron_params.initial_recovery, -12.0);
        assert_approx_eq!(f64, neuron_params.initial_voltage, -60.0);
    }

    #[test]
    fn observation_width() {
        let mut params = template_params();
        assert_eq!(params.observation_width(), 3);
        params.stim_mode = StimMode::On;
        assert_eq!(params.observation_width(), 4);
        assert_eq!(params.nb_bins(), 20);
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "intrinsically_bursting".parse::<NeuronPreset>().unwrap(),
            NeuronPreset::IntrinsicallyBursting
        );
        assert_eq!(
            "fast_spiking".parse::<NeuronPreset>().unwrap_err().as_str(),
            "unknown neuron preset: fast_spiking"
        );
        assert_eq!("on".parse::<StimMode>().unwrap(), StimMode::On);
        assert!("weak".parse::<StimMode>().is_err());
    }

    #[test]
    fn yaml_config() {
        let yaml = r#"
name: two_neurons
nb_neurons: 2
synapse_weight: 10.0
bin_size: 50
neuron_preset: intrinsically_bursting
stim_mode: "on"
technical_params:
  num_threads: 2
  seed_override: 7
"#;
        let params: SimulationParams = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(params.neuron_preset, NeuronPreset::IntrinsicallyBursting);
        assert_eq!(params.stim_mode, StimMode::On);
        assert_eq!(params.duration, 1000);
        assert_eq!(params.technical_params.seed_override, Some(7));
        assert!(validate_simulation_params(&params).is_ok());
    }

    #[test]
    fn yaml_unknown_preset_is_rejected() {
        let yaml = "neuron_preset: chattering\n";
        assert!(serde_yaml::from_str::<SimulationParams>(yaml).is_err());
    }
}
