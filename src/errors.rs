//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`LanternError`] is grouped by how a failure should be
//! treated:
//! - **Configuration errors**: content or wiring bugs (illegal feature sets,
//!   bad registry lookups, passes driven out of order). Reported immediately,
//!   never retried.
//! - **Resource errors**: missing shader sources, failed compiles or links.
//!   Fatal for the shader family involved.
//! - **Ambient errors**: I/O and settings parsing.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, LanternError>`.
//!
//! ```rust,ignore
//! use lantern::errors::{LanternError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Lantern engine.
#[derive(Error, Debug)]
pub enum LanternError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A feature set contains bits the shader family never declared legal.
    #[error("Shader '{shader}': feature set [{requested}] is outside the whitelist [{whitelist}]")]
    FeatureOutsideWhitelist {
        shader: String,
        requested: String,
        whitelist: String,
    },

    /// A feature set is inside the whitelist but violates the dependency graph.
    #[error("Shader '{shader}': illegal feature set [{requested}]: {reason}")]
    IllegalFeatureCombination {
        shader: String,
        requested: String,
        reason: String,
    },

    /// A registry lookup named a resource that was never added.
    #[error("Render resource not found: '{0}'")]
    ResourceNotFound(String),

    /// A registry lookup asked for the wrong resource type.
    #[error("Render resource '{name}' is a {found}, expected {expected}")]
    ResourceTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A render pass was driven out of its state machine order.
    #[error("Render pass '{pass}' is not ready: {reason}")]
    PassNotReady { pass: &'static str, reason: String },

    /// A handle (material, geometry, node) does not refer to a live object.
    #[error("Invalid {kind} handle: {handle}")]
    InvalidHandle { kind: &'static str, handle: String },

    /// The shader library already holds this name for another feature type.
    #[error("Shader family '{0}' was registered with a different feature type")]
    ShaderFamilyMismatch(String),

    /// An `#include` line could not be parsed.
    #[error("Malformed include in '{path}' line {line}: {text}")]
    MalformedInclude {
        path: String,
        line: usize,
        text: String,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A shader source file (or one of its includes) could not be found.
    #[error("Shader '{shader}': source file not found: {path}")]
    ShaderSourceNotFound { shader: String, path: String },

    /// The device rejected a shader stage.
    #[error("Shader '{shader}' failed to compile {stage} stage: {log}")]
    ShaderCompileFailed {
        shader: String,
        stage: &'static str,
        log: String,
    },

    /// The device rejected a program link.
    #[error("Shader program '{shader}' failed to link: {log}")]
    ProgramLinkFailed { shader: String, log: String },

    /// Any other failure reported by the graphics device.
    #[error("Graphics device error: {0}")]
    Device(String),

    // ========================================================================
    // Ambient Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsError(#[from] serde_json::Error),
}

impl LanternError {
    /// Returns `true` for content or wiring bugs (as opposed to resource
    /// failures or I/O).
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::FeatureOutsideWhitelist { .. }
                | Self::IllegalFeatureCombination { .. }
                | Self::ResourceNotFound(_)
                | Self::ResourceTypeMismatch { .. }
                | Self::PassNotReady { .. }
                | Self::InvalidHandle { .. }
                | Self::ShaderFamilyMismatch(_)
                | Self::MalformedInclude { .. }
        )
    }
}

/// Alias for `Result<T, LanternError>`.
pub type Result<T> = std::result::Result<T, LanternError>;
