//! Error types for resource creation and frame rendering.
//!
//! Every variant describes a configuration or build-time defect rather than a
//! transient condition, so nothing in this crate retries. Hosts are expected to log
//! the error and stop before entering the render loop.

use std::fmt;

/// Programmable pipeline stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Reason a framebuffer could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// The color attachment has zero area.
    IncompleteAttachment,
    /// The requested size or format is not supported by the driver.
    Unsupported,
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramebufferStatus::IncompleteAttachment => f.write_str("incomplete attachment"),
            FramebufferStatus::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Errors surfaced by the registry, the pass executor and the backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A shader stage failed to compile.
    #[error("{stage} shader of program '{name}' failed to compile:\n{log}")]
    ShaderCompile {
        stage: ShaderStage,
        name: String,
        log: String,
    },

    /// The compiled stages could not be linked into a program.
    #[error("program '{name}' failed to link:\n{log}")]
    ProgramLink { name: String, log: String },

    /// An off-screen target is not usable as a color attachment.
    #[error("framebuffer incomplete: {status}")]
    FramebufferIncomplete { status: FramebufferStatus },

    /// Adapter, device or surface acquisition failed.
    #[error("graphics device error: {0}")]
    Device(String),

    /// The swap chain reported an unrecoverable error.
    #[error("surface error: {0}")]
    Surface(String),
}

impl RenderError {
    pub(crate) fn compile(stage: ShaderStage, name: &str, log: impl Into<String>) -> Self {
        RenderError::ShaderCompile {
            stage,
            name: name.to_string(),
            log: log.into(),
        }
    }

    pub(crate) fn link(name: &str, log: impl Into<String>) -> Self {
        RenderError::ProgramLink {
            name: name.to_string(),
            log: log.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_stage_and_program() {
        let err = RenderError::compile(ShaderStage::Fragment, "HorizontalBlur", "bad token");
        let text = err.to_string();
        assert!(text.contains("fragment"));
        assert!(text.contains("HorizontalBlur"));
        assert!(text.contains("bad token"));
    }

    #[test]
    fn framebuffer_status_is_reported() {
        let err = RenderError::FramebufferIncomplete {
            status: FramebufferStatus::Unsupported,
        };
        assert_eq!(err.to_string(), "framebuffer incomplete: unsupported");
    }
}
