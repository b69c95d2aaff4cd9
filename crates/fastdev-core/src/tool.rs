//! Which dependency manager owns a project

use serde::Serialize;
use std::fmt;

use crate::error::{FastDevError, Result};
use crate::manifest::Manifest;

/// Dependency manager inferred from the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagedTool {
    Poetry,
    Pdm,
    Uv,
    /// Plain pip project, no manager section present
    None,
}

impl ManagedTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poetry => "poetry",
            Self::Pdm => "pdm",
            Self::Uv => "uv",
            Self::None => "",
        }
    }

    /// Parse a user-supplied tool name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "poetry" => Ok(Self::Poetry),
            "pdm" => Ok(Self::Pdm),
            "uv" => Ok(Self::Uv),
            _ => Err(FastDevError::InvalidInput(format!("Unknown tool '{}'", name))),
        }
    }

    /// Section header that marks a project as managed by this tool
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Poetry => Some("[tool.poetry]"),
            Self::Pdm => Some("[tool.pdm]"),
            Self::Uv => Some("[tool.uv]"),
            Self::None => None,
        }
    }

    pub fn is_managed(&self) -> bool {
        *self != Self::None
    }

    /// Program used as `<tool> run ...`, if any
    pub fn runner(&self) -> Option<&'static str> {
        self.is_managed().then(|| self.as_str())
    }
}

impl fmt::Display for ManagedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Ordered list of tools checked during detection; first match wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOrder(pub Vec<ManagedTool>);

impl Default for DetectionOrder {
    fn default() -> Self {
        Self(vec![ManagedTool::Poetry, ManagedTool::Pdm, ManagedTool::Uv])
    }
}

impl DetectionOrder {
    /// Classify manifest text. Never fails: no marker means `ManagedTool::None`.
    pub fn detect(&self, text: &str) -> ManagedTool {
        self.0
            .iter()
            .copied()
            .find(|tool| tool.marker().is_some_and(|m| text.contains(m)))
            .unwrap_or(ManagedTool::None)
    }
}

/// Detect the managed tool with the default priority order
pub fn detect(manifest: &Manifest) -> ManagedTool {
    let tool = DetectionOrder::default().detect(&manifest.text);
    tracing::debug!(%tool, "detected managed tool");
    tool
}
