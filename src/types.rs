use std::str::FromStr;
use serde::Deserialize;

/// How emission is driven.
///
/// - `PerCycle`: the host pipeline calls `run_cycle` once per build; every
///   tracked file is re-emitted each cycle (default behaviour).
/// - `Continuous`: emission happens per file as filesystem changes are
///   observed; `run_cycle` is a no-op in this mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmitMode {
    PerCycle,
    Continuous,
}

impl EmitMode {
    pub fn is_continuous(self) -> bool {
        self == EmitMode::Continuous
    }
}

impl Default for EmitMode {
    fn default() -> Self {
        EmitMode::PerCycle
    }
}

impl FromStr for EmitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-cycle" => Ok(EmitMode::PerCycle),
            "continuous" => Ok(EmitMode::Continuous),
            other => Err(format!(
                "invalid mode: {other} (expected \"per-cycle\" or \"continuous\")"
            )),
        }
    }
}
