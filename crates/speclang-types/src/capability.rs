//! Capability tokens gating effectful builtins.
//!
//! A case declares the capabilities it needs under
//! `harness.spec_lang.capabilities`; absent means no effects. Each gated
//! builtin maps to exactly one capability through [`Capability::required_for`],
//! which the interpreter consults before dispatch.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    /// Process execution, environment and clock access (`ops.os.*`).
    Os,
    /// Filesystem mutation (`ops.fs.file.set` and friends).
    Fs,
    /// External helper invocation (`ops.helper.call`).
    Helper,
    /// Registered job dispatch (`ops.job.dispatch`).
    Job,
}

/// All capabilities, in declaration order.
pub const ALL_CAPABILITIES: &[Capability] = &[
    Capability::Os,
    Capability::Fs,
    Capability::Helper,
    Capability::Job,
];

const FS_MUTATIONS: &[&str] = &[
    "ops.fs.file.set",
    "ops.fs.file.append",
    "ops.fs.file.mkdir_p",
    "ops.fs.file.remove",
];

impl Capability {
    pub fn from_name(name: &str) -> Option<Capability> {
        match name.trim() {
            "ops.os" => Some(Capability::Os),
            "ops.fs" => Some(Capability::Fs),
            "ops.helper" => Some(Capability::Helper),
            "ops.job" => Some(Capability::Job),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Capability::Os => "ops.os",
            Capability::Fs => "ops.fs",
            Capability::Helper => "ops.helper",
            Capability::Job => "ops.job",
        }
    }

    /// Stable error code prefix, e.g. `capability.ops_os.required`.
    pub fn error_code(self) -> String {
        format!("capability.{}.required", self.token().replace('.', "_"))
    }

    /// Which capability (if any) must be held to invoke `symbol`?
    pub fn required_for(symbol: &str) -> Option<Capability> {
        if symbol.starts_with("ops.os.") {
            Some(Capability::Os)
        } else if symbol == "ops.helper.call" {
            Some(Capability::Helper)
        } else if symbol == "ops.job.dispatch" {
            Some(Capability::Job)
        } else if FS_MUTATIONS.contains(&symbol) {
            Some(Capability::Fs)
        } else {
            None
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Capabilities held by one evaluation. Fixed for its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    held: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn none() -> Self {
        CapabilitySet::default()
    }

    pub fn all() -> Self {
        ALL_CAPABILITIES.iter().copied().collect()
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.held.contains(&cap)
    }

    pub fn insert(&mut self, cap: Capability) {
        self.held.insert(cap);
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.held.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        CapabilitySet {
            held: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_replaces_dots() {
        assert_eq!(Capability::Os.error_code(), "capability.ops_os.required");
        assert_eq!(
            Capability::Helper.error_code(),
            "capability.ops_helper.required"
        );
    }

    #[test]
    fn gated_symbols() {
        assert_eq!(Capability::required_for("ops.os.exec"), Some(Capability::Os));
        assert_eq!(Capability::required_for("ops.fs.file.set"), Some(Capability::Fs));
        assert_eq!(Capability::required_for("ops.fs.file.exists"), None);
        assert_eq!(Capability::required_for("std.string.contains"), None);
    }
}
