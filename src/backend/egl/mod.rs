//! Common traits for EGLStream based rendering
//!
//! EGLStreams are producer-consumer channels between the rendering api and
//! the display hardware. On the producer side a stream is represented by a
//! surface, which rendering happens into, while the consumer side is a
//! hardware plane of a drm device.
//!
//! This module does not talk to EGL directly. Instead it describes the two
//! collaborators any stream based allocator needs:
//!
//! - a [`StreamSurfaceProvider`] (usually the drm device of a compositor), that
//!   is able to create and destroy stream surfaces for a given plane, and
//! - an [`EGLContextSource`] (usually the renderer), that hands out the
//!   rendering context the surfaces have to be created with.

use crate::backend::allocator::eglstream::PlaneId;
use crate::utils::{Buffer as BufferCoords, Size};

/// Device capable of creating EGLStream producer surfaces for its planes.
///
/// Both operations are synchronous. Creating a surface may fail, destroying one
/// is assumed to always succeed.
pub trait StreamSurfaceProvider: std::fmt::Debug {
    /// Rendering context the surfaces are created with
    type Context: std::fmt::Debug;
    /// Handle of a created stream surface
    type Surface: std::fmt::Debug;
    /// Error returned if a surface cannot be created
    type Error: std::error::Error + 'static;

    /// Create a stream surface feeding the plane `plane` with frames of `size`
    fn create_stream_surface(
        &self,
        context: &Self::Context,
        plane: PlaneId,
        size: Size<i32, BufferCoords>,
    ) -> Result<Self::Surface, Self::Error>;

    /// Destroy a surface previously returned by [`StreamSurfaceProvider::create_stream_surface`]
    fn destroy_stream_surface(&self, context: &Self::Context, surface: Self::Surface);
}

/// Accessor for the EGL rendering context of a renderer
pub trait EGLContextSource {
    /// Type of the rendering context
    type Context;

    /// Returns the rendering context, if the renderer has one
    fn egl_context(&self) -> Option<Self::Context>;
}
