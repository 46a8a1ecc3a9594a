// SPDX-License-Identifier: GPL-3.0-only

//! Link resolution
//!
//! Turns a photo id into the value a scannable code should encode, plus the
//! display parameters handed to whatever renders the code.

use crate::constants;
use crate::errors::LookupMiss;
use crate::storage::{PhotoId, PhotoRegistry};
use crate::upload::UploadNaming;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the code encodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LinkPolicy {
    /// The data URI itself
    #[default]
    Embedded,
    /// A download URL on the upload backend
    Remote { public_base: String },
}

/// Error correction level of the rendered code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    #[default]
    High,
}

impl ErrorCorrection {
    /// Single-letter level name
    pub fn letter(&self) -> char {
        match self {
            ErrorCorrection::Low => 'L',
            ErrorCorrection::Medium => 'M',
            ErrorCorrection::Quartile => 'Q',
            ErrorCorrection::High => 'H',
        }
    }
}

/// Display parameters for the code renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeDisplay {
    /// Rendered size in pixels
    pub size: u32,
    pub level: ErrorCorrection,
    /// Quiet zone around the code
    pub include_margin: bool,
}

impl Default for CodeDisplay {
    fn default() -> Self {
        Self {
            size: constants::code::SIZE,
            level: ErrorCorrection::High,
            include_margin: constants::code::INCLUDE_MARGIN,
        }
    }
}

/// Everything a code renderer needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodePayload {
    pub value: String,
    #[serde(flatten)]
    pub display: CodeDisplay,
}

/// Resolves photo ids to code payloads
#[derive(Debug, Clone)]
pub struct LinkResolver {
    registry: PhotoRegistry,
    policy: LinkPolicy,
    naming: UploadNaming,
    display: CodeDisplay,
}

impl LinkResolver {
    pub fn new(
        registry: PhotoRegistry,
        policy: LinkPolicy,
        naming: UploadNaming,
        display: CodeDisplay,
    ) -> Self {
        Self {
            registry,
            policy,
            naming,
            display,
        }
    }

    /// Payload for `id`; unknown ids are a [`LookupMiss`], never an empty value
    pub fn resolve(&self, id: &PhotoId) -> Result<CodePayload, LookupMiss> {
        let image = self
            .registry
            .get(id)
            .ok_or_else(|| LookupMiss { id: id.to_string() })?;

        let value = match &self.policy {
            LinkPolicy::Embedded => image.as_data_uri().to_string(),
            LinkPolicy::Remote { public_base } => format!(
                "{}/{}/{}",
                public_base.trim_end_matches('/'),
                constants::code::IMAGE_ROUTE,
                self.naming.filename_for(id)
            ),
        };

        debug!(%id, len = value.len(), "Resolved link");
        Ok(CodePayload {
            value,
            display: self.display,
        })
    }
}
