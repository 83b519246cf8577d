use std::fmt;

/// Assertion group class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Class {
    /// Every child must pass.
    Must,
    /// At least one child must pass.
    May,
    /// Every child must fail.
    MustNot,
}

impl Class {
    /// Parse a class name. The legacy lowercase names `must`, `can` and
    /// `cannot` are accepted as aliases.
    pub fn parse(raw: &str) -> Option<Class> {
        match raw.trim() {
            "MUST" | "must" => Some(Class::Must),
            "MAY" | "can" => Some(Class::May),
            "MUST_NOT" | "cannot" => Some(Class::MustNot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Class::Must => "MUST",
            Class::May => "MAY",
            Class::MustNot => "MUST_NOT",
        }
    }

    /// Lifecycle hook event fired when a clause of this class passes.
    pub fn event_name(self) -> &'static str {
        match self {
            Class::Must => "must",
            Class::May => "may",
            Class::MustNot => "must_not",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_names_map_to_classes() {
        assert_eq!(Class::parse("can"), Some(Class::May));
        assert_eq!(Class::parse("cannot"), Some(Class::MustNot));
        assert_eq!(Class::parse("MUST"), Some(Class::Must));
        assert_eq!(Class::parse("SHOULD"), None);
    }
}
