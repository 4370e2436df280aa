//! Headless controller for gbextract.
//!
//! Ties the pieces together for the CLI: unwrap the project container,
//! decode the payload and hand every section with events to a sink.

mod container;
mod smf;

use gb_formats::{decode_project_with, DecodeError, DecoderConfig, Project};
use gb_ir::SectionKey;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export common types so callers don't need gb-ir/gb-formats directly.
pub use gb_formats::{hexdump, DecodeErrorKind};
pub use gb_ir::{analyze, SectionFeatures, SectionOutput};

pub use container::{load_payload, unwrap_plist, PROJECT_DATA_FILE};
pub use smf::{build_smf, section_to_smf, SectionSink, SmfSink};

/// Anything that can stop an extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("projectData is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("{} is not UTF-8 text", .0.display())]
    NotXml(PathBuf),
    #[error("{} is a binary property list; convert it to XML first", .0.display())]
    BinaryPlist(PathBuf),
    #[error("no NS.data entry in projectData")]
    MissingData,
    #[error("NS.data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ExtractError {
    /// The decode error underneath, if decoding is what failed.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of a full extraction.
#[derive(Debug)]
pub struct Extraction {
    pub project: Project,
    /// Sections handed to the sink, in discovery order
    pub written: Vec<SectionKey>,
}

/// Headless extractor: owns the decoder configuration.
pub struct Extractor {
    config: DecoderConfig,
}

impl Extractor {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read a payload from a bundle, plist or raw file.
    pub fn load(&self, path: &Path, raw: bool) -> Result<Vec<u8>, ExtractError> {
        load_payload(path, raw)
    }

    /// Decode a payload. The pitch bend override is restricted to sections
    /// whose label matches the instrument filter.
    pub fn decode(&self, payload: &[u8]) -> Result<Project, ExtractError> {
        let config = &self.config;
        let project = decode_project_with(payload, config, |label| {
            let applies = config.pitch_bend_applies_to(label);
            if applies {
                log::debug!("[GB] Pitch bend override applies to {}", label);
            }
            applies
        })?;
        log::info!(
            "[GB] {} sections, {}",
            project.sections.len(),
            project.stats
        );
        Ok(project)
    }

    /// Decode and send every section that has events to `sink`.
    pub fn extract<S: SectionSink + ?Sized>(
        &self,
        payload: &[u8],
        sink: &mut S,
    ) -> Result<Extraction, ExtractError> {
        let project = self.decode(payload)?;
        let mut written = Vec::new();
        for output in project.outputs() {
            if !output.has_events {
                log::debug!("[GB] Section {} has no events, skipping", output.stem());
                continue;
            }
            sink.write_section(&output)?;
            written.push(output.key);
        }
        Ok(Extraction { project, written })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
