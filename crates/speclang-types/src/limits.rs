/// Compute budget for one top-level evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    pub max_steps: u64,
    pub max_nodes: u64,
    pub max_literal_bytes: u64,
    /// Wall-clock budget in milliseconds; 0 disables the check.
    pub timeout_ms: u64,
}

impl Limits {
    pub const DEFAULT_MAX_STEPS: u64 = 20_000;
    pub const DEFAULT_MAX_NODES: u64 = 20_000;
    pub const DEFAULT_MAX_LITERAL_BYTES: u64 = 262_144;
    pub const DEFAULT_TIMEOUT_MS: u64 = 200;

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: Self::DEFAULT_MAX_STEPS,
            max_nodes: Self::DEFAULT_MAX_NODES,
            max_literal_bytes: Self::DEFAULT_MAX_LITERAL_BYTES,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}
