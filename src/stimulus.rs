use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

/// External current profile injected into neuron 0. The run is split into four equal
/// quarters; `On` and `Weak` drive the middle two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimVariant {
    Off,
    On,
    Weak,
}

impl StimVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StimVariant::Off => "off",
            StimVariant::On => "on",
            StimVariant::Weak => "weak",
        }
    }

    fn quarter_levels(&self, stimulus_max: u32) -> [u32; 4] {
        match self {
            StimVariant::Off => [0; 4],
            StimVariant::On => [0, stimulus_max, stimulus_max, 0],
            StimVariant::Weak => [0, stimulus_max / 2, stimulus_max / 2, 0],
        }
    }

    /// Current level at tick `t`. Ticks past the last quarter keep the last level.
    pub fn level(&self, t: usize, duration: usize, stimulus_max: u32) -> u32 {
        let quarter = duration / 4;

        let quarter_idx = if quarter == 0 {
            3
        } else {
            (t / quarter).min(3)
        };

        self.quarter_levels(stimulus_max)[quarter_idx]
    }
}

impl FromStr for StimVariant {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(StimVariant::Off),
            "on" => Ok(StimVariant::On),
            "weak" => Ok(StimVariant::Weak),
            _ => Err(SimpleError::new(format!("unknown stimulus variant: {}", s))),
        }
    }
}

impl fmt::Display for StimVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarters() {
        let levels: Vec<u32> = [0, 249, 250, 499, 500, 749, 750, 999, 1000]
            .iter()
            .map(|t| StimVariant::On.level(*t, 1000, 500))
            .collect();
        assert_eq!(levels, vec![0, 0, 500, 500, 500, 500, 0, 0, 0]);

        let levels: Vec<u32> = [0, 250, 749, 750]
            .iter()
            .map(|t| StimVariant::Weak.level(*t, 1000, 500))
            .collect();
        assert_eq!(levels, vec![0, 250, 250, 0]);

        assert!((0..=1000).all(|t| StimVariant::Off.level(t, 1000, 500) == 0));
    }

    #[test]
    fn uneven_duration_clamps() {
        // quarter = 2, ticks 8 and 9 fall past the last quarter
        assert_eq!(StimVariant::On.level(2, 9, 500), 500);
        assert_eq!(StimVariant::On.level(5, 9, 500), 500);
        assert_eq!(StimVariant::On.level(6, 9, 500), 0);
        assert_eq!(StimVariant::On.level(9, 9, 500), 0);
    }

    #[test]
    fn parse() {
        assert_eq!("weak".parse::<StimVariant>().unwrap(), StimVariant::Weak);
        assert_eq!(
            "strong".parse::<StimVariant>().unwrap_err().as_str(),
            "unknown stimulus variant: strong"
        );
        assert_eq!(StimVariant::On.to_string(), "on");
    }
}
