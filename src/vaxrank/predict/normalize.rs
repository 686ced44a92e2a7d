use std::str::FromStr;

/// Units a binding predictor reports its raw values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityKind {
    /// Half-maximal inhibitory concentration in nM; lower binds stronger.
    Ic50,
    /// A score in [0, 1]; higher binds stronger.
    Score,
}

impl FromStr for AffinityKind {
    type Err = &'static str;
    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "ic50" => Ok(AffinityKind::Ic50),
            "score" => Ok(AffinityKind::Score),
            _ => Err("Invalid affinity kind. Options are: ic50, score"),
        }
    }
}

pub const IC50_MIDPOINT: f64 = 350.0;
pub const IC50_WIDTH: f64 = 150.0;
pub const IC50_CUTOFF: f64 = 5000.0;

impl AffinityKind {
    /// Maps a raw predictor value into [0, 1], higher meaning a stronger binder.
    pub fn normalize(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        match self {
            AffinityKind::Ic50 => logistic_ic50_score(value),
            AffinityKind::Score => value.clamp(0.0, 1.0),
        }
    }
}

/// Logistic transform of an IC50 centered on `IC50_MIDPOINT`, rescaled so that
/// an IC50 of 0 scores 1.0. Values at or above `IC50_CUTOFF` score 0.
pub fn logistic_ic50_score(ic50: f64) -> f64 {
    if ic50 >= IC50_CUTOFF {
        return 0.0;
    }
    let rescaled = (ic50 - IC50_MIDPOINT) / IC50_WIDTH;
    let logistic = 1.0 / (1.0 + rescaled.exp());
    let normalizer = 1.0 / (1.0 + (-IC50_MIDPOINT / IC50_WIDTH).exp());
    (logistic / normalizer).min(1.0)
}
