/// Convenience result type used across framefx.
pub type FxResult<T> = Result<T, FxError>;

/// Top-level error taxonomy used by the rendering core.
///
/// Most of these are contained inside a stage: the compositor, sampler and stage slot degrade to
/// a stale or placeholder frame instead of handing the error to the host loop.
#[derive(thiserror::Error, Debug)]
pub enum FxError {
    /// Renderer, scene or camera handles are not live yet.
    #[error("missing context: {0}")]
    MissingContext(String),

    /// A surface was requested with a non-positive or unrepresentable size.
    #[error("invalid surface size: {0}")]
    SurfaceSizeInvalid(String),

    /// CPU readback of a surface failed (for example after context loss).
    #[error("readback unavailable: {0}")]
    ReadbackUnavailable(String),

    /// Frame ordering contract broken by the caller, such as advancing a feedback pair without a
    /// completed write.
    #[error("ordering violation: {0}")]
    OrderingViolation(String),

    /// Invalid parameters or mismatched buffers.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image encode/decode failure at the I/O boundary.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FxError {
    /// Build a [`FxError::MissingContext`] value.
    pub fn missing_context(msg: impl Into<String>) -> Self {
        Self::MissingContext(msg.into())
    }

    /// Build a [`FxError::SurfaceSizeInvalid`] value.
    pub fn surface_size(msg: impl Into<String>) -> Self {
        Self::SurfaceSizeInvalid(msg.into())
    }

    /// Build a [`FxError::ReadbackUnavailable`] value.
    pub fn readback(msg: impl Into<String>) -> Self {
        Self::ReadbackUnavailable(msg.into())
    }

    /// Build a [`FxError::OrderingViolation`] value.
    pub fn ordering(msg: impl Into<String>) -> Self {
        Self::OrderingViolation(msg.into())
    }

    /// Build a [`FxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return `true` for errors that are programmer mistakes rather than transient conditions.
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, Self::OrderingViolation(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
