// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Transformer error types

use thiserror::Error;
use webstats_core::StatsError;

/// Result type for transformer operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors that abort a transformer pass
#[derive(Debug, Error)]
pub enum TransformError {
    /// Core invariant violation (unsupported KPI, codec mismatch, ...)
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Output sink error
    #[error("Sink error: {0}")]
    SinkError(String),

    /// A map worker died
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl From<serde_json::Error> for TransformError {
    fn from(e: serde_json::Error) -> Self {
        TransformError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for TransformError {
    fn from(e: toml::de::Error) -> Self {
        TransformError::ConfigError(e.to_string())
    }
}
