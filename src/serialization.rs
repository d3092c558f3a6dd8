//! Serialization support for the connectivity store.
//!
//! With the `serde` feature enabled, [`Connections`](crate::connections::Connections)
//! and its parameter and state types implement `Serialize` and `Deserialize`,
//! and this module gives them a uniform save/load surface.
//!
//! # Supported Formats
//!
//! - **Binary** - Compact binary serialization using bincode (default)
//! - **JSON** - Human-readable JSON format using serde_json
//!
//! # Example
//!
//! ```rust
//! use dendrite::connections::Connections;
//! use dendrite::serialization::{Serializable, SerializableFormat};
//!
//! let mut conn = Connections::with_cells(16);
//! let segment = conn.create_segment(3).unwrap();
//! conn.create_synapse(segment, 7, 0.4).unwrap();
//!
//! let bytes = conn.to_bytes(SerializableFormat::Binary).unwrap();
//! let restored = Connections::from_bytes(&bytes, SerializableFormat::Binary).unwrap();
//! assert_eq!(restored, conn);
//! ```

use crate::error::{DendriteError, Result};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const LOG_TARGET: &str = "dendrite::serialization";

/// Serialization format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializableFormat {
    /// Compact binary serialization (default).
    #[default]
    Binary,

    /// Human-readable JSON, handy for inspecting a store by eye.
    Json,
}

impl std::fmt::Display for SerializableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializableFormat::Binary => write!(f, "BINARY"),
            SerializableFormat::Json => write!(f, "JSON"),
        }
    }
}

impl std::str::FromStr for SerializableFormat {
    type Err = DendriteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BINARY" | "BIN" => Ok(SerializableFormat::Binary),
            "JSON" => Ok(SerializableFormat::Json),
            _ => Err(DendriteError::InvalidParameter {
                name: "format",
                message: format!("Unknown format '{s}'. Expected: BINARY, JSON"),
            }),
        }
    }
}

fn encode_error(format: SerializableFormat, err: impl std::fmt::Display) -> DendriteError {
    DendriteError::SerializationError {
        message: format!("{format} serialization failed: {err}"),
    }
}

fn decode_error(format: SerializableFormat, err: impl std::fmt::Display) -> DendriteError {
    DendriteError::SerializationError {
        message: format!("{format} deserialization failed: {err}"),
    }
}

/// Uniform save/load surface for serde types.
///
/// Implemented for every `Serialize + DeserializeOwned` type, which covers
/// [`Connections`](crate::connections::Connections),
/// [`ConnectionsParams`](crate::connections::ConnectionsParams) and
/// [`ConnectionsState`](crate::connections::ConnectionsState).
pub trait Serializable: Serialize + DeserializeOwned + Sized {
    /// Serializes to a byte vector.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if encoding fails.
    fn to_bytes(&self, format: SerializableFormat) -> Result<Vec<u8>> {
        match format {
            SerializableFormat::Binary => {
                bincode::serialize(self).map_err(|e| encode_error(format, e))
            }
            SerializableFormat::Json => {
                serde_json::to_vec_pretty(self).map_err(|e| encode_error(format, e))
            }
        }
    }

    /// Deserializes from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if decoding fails, including when the
    /// decoded data describes an inconsistent store.
    fn from_bytes(bytes: &[u8], format: SerializableFormat) -> Result<Self> {
        match format {
            SerializableFormat::Binary => {
                bincode::deserialize(bytes).map_err(|e| decode_error(format, e))
            }
            SerializableFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| decode_error(format, e))
            }
        }
    }

    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if encoding fails.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| encode_error(SerializableFormat::Json, e))
    }

    /// Deserializes from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if decoding fails.
    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| decode_error(SerializableFormat::Json, e))
    }

    /// Serializes to a writer.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if encoding or writing fails.
    fn save<W: Write>(&self, writer: W, format: SerializableFormat) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        match format {
            SerializableFormat::Binary => {
                bincode::serialize_into(&mut writer, self).map_err(|e| encode_error(format, e))?;
            }
            SerializableFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, self)
                    .map_err(|e| encode_error(format, e))?;
            }
        }
        writer.flush().map_err(|e| DendriteError::IoError {
            message: format!("Failed to flush writer: {e}"),
        })
    }

    /// Deserializes from a reader.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if reading or decoding fails.
    fn load<R: Read>(reader: R, format: SerializableFormat) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        match format {
            SerializableFormat::Binary => {
                bincode::deserialize_from(&mut reader).map_err(|e| decode_error(format, e))
            }
            SerializableFormat::Json => {
                serde_json::from_reader(&mut reader).map_err(|e| decode_error(format, e))
            }
        }
    }

    /// Saves to a file.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be created and
    /// `SerializationError` if encoding fails.
    fn save_to_file<P: AsRef<Path>>(&self, path: P, format: SerializableFormat) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| DendriteError::IoError {
            message: format!("Failed to create {}: {e}", path.display()),
        })?;
        self.save(file, format)?;
        debug!(target: LOG_TARGET, path = %path.display(), %format, "saved");
        Ok(())
    }

    /// Loads from a file.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be opened and
    /// `SerializationError` if decoding fails.
    fn load_from_file<P: AsRef<Path>>(path: P, format: SerializableFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DendriteError::IoError {
            message: format!("Failed to open {}: {e}", path.display()),
        })?;
        let loaded = Self::load(file, format)?;
        debug!(target: LOG_TARGET, path = %path.display(), %format, "loaded");
        Ok(loaded)
    }

    /// Saves to a file, inferring format from the file extension.
    ///
    /// - `.json` -> JSON format
    /// - All other extensions -> Binary format
    ///
    /// # Errors
    ///
    /// See [`Serializable::save_to_file`].
    fn save_to_file_auto<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let format = infer_format_from_path(path.as_ref());
        self.save_to_file(path, format)
    }

    /// Loads from a file, inferring format from the file extension.
    ///
    /// # Errors
    ///
    /// See [`Serializable::load_from_file`].
    fn load_from_file_auto<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = infer_format_from_path(path.as_ref());
        Self::load_from_file(path, format)
    }
}

impl<T> Serializable for T where T: Serialize + DeserializeOwned + Sized {}

/// Infers serialization format from file extension.
fn infer_format_from_path(path: &Path) -> SerializableFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => SerializableFormat::Json,
        _ => SerializableFormat::Binary,
    }
}
