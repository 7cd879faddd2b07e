//! Porting options and their environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mapping::DiffOptions;
use crate::transform::{
    BestPositionOnConflict, ConflictPolicy, FileLevelOnConflict, OmitPositionOnConflict,
};

/// Environment variable selecting the conflict policy.
pub const CONFLICT_POLICY_ENV: &str = "PORTER_CONFLICT_POLICY";
/// Environment variable toggling copy detection (`0`/`false` disables it).
pub const DETECT_COPIES_ENV: &str = "PORTER_DETECT_COPIES";

/// Which [`ConflictPolicy`] the transformer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ConflictPolicyKind {
    /// Widen conflicting ranges over the touched hunks.
    #[default]
    Best,
    /// Drop conflicting ranges, keep the file.
    FileLevel,
    /// Drop conflicting comments.
    Omit,
}

impl ConflictPolicyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::FileLevel => "file-level",
            Self::Omit => "omit",
        }
    }

    #[must_use]
    pub fn policy(self) -> Box<dyn ConflictPolicy> {
        match self {
            Self::Best => Box::new(BestPositionOnConflict),
            Self::FileLevel => Box::new(FileLevelOnConflict),
            Self::Omit => Box::new(OmitPositionOnConflict),
        }
    }
}

#[must_use]
pub fn parse_policy(value: &str) -> Option<ConflictPolicyKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "best" => Some(ConflictPolicyKind::Best),
        "file-level" | "file" => Some(ConflictPolicyKind::FileLevel),
        "omit" => Some(ConflictPolicyKind::Omit),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Options controlling a [`crate::CommentPorter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortOptions {
    pub conflict_policy: ConflictPolicyKind,
    pub diff: DiffOptions,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicyKind::Best,
            diff: DiffOptions::default(),
        }
    }
}

impl PortOptions {
    /// Defaults overridden by `PORTER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(value) = lookup(CONFLICT_POLICY_ENV) {
            options.conflict_policy = parse_policy(&value).with_context(|| {
                format!(
                    "Invalid {CONFLICT_POLICY_ENV} value '{value}'. Expected one of: best, file-level, omit"
                )
            })?;
        }

        if let Some(value) = lookup(DETECT_COPIES_ENV) {
            options.diff.detect_copies = parse_flag(&value).with_context(|| {
                format!("Invalid {DETECT_COPIES_ENV} value '{value}'. Expected true or false")
            })?;
        }

        Ok(options)
    }
}
