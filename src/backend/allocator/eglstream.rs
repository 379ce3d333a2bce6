//! Module for buffers backed by EGLStreams.
//!
//! EGLStream capable drivers do not hand out buffer objects for scanout.
//! Instead every hardware plane is fed through a stream, whose producer end is
//! a surface the compositor renders into. The [`EglStreamAllocator`] hands out
//! [`EglStreamBuffer`]s for a given [`PlaneId`] and shares a single stream
//! surface between all buffers targeting the same plane with the same size.
//!
//! The surfaces are tracked by [`Plane`]s, which are reference counted by the
//! buffers using them. Dropping the last buffer of a plane destroys its surface.
//!
//! ```no_run
//! # use smithay_eglstream::backend::{
//! #     allocator::{eglstream::{EglStreamAllocator, PlaneId}, Allocator, BufferCaps, Fourcc},
//! #     egl::{EGLContextSource, StreamSurfaceProvider},
//! #     multi::MultiBackend,
//! # };
//! # fn example<D, R>(backends: &MultiBackend, renderer: &R)
//! # where
//! #     D: StreamSurfaceProvider + smithay_eglstream::backend::multi::Backend + Clone + 'static,
//! #     R: EGLContextSource<Context = D::Context>,
//! # {
//! let mut allocator = EglStreamAllocator::<D>::new(backends, renderer, BufferCaps::empty())
//!     .expect("No EGLStream device");
//! let buffer = allocator
//!     .create_buffer(1920, 1080, Fourcc::Argb8888, &[], PlaneId::new(5))
//!     .expect("Failed to allocate buffer");
//! assert_eq!(buffer.plane().ref_count(), 1);
//! # }
//! ```
//!
//! All types of this module are meant to be used from a single thread.

use std::collections::TryReserveError;
use std::rc::Rc;

use tracing::{info, info_span, instrument, trace, warn};

use super::{Allocator, BufferCaps, Fourcc, Modifier};
use crate::backend::egl::{EGLContextSource, StreamSurfaceProvider};
use crate::backend::multi::{Backend, MultiBackend};
use crate::utils::{Buffer as BufferCoords, Size};

mod buffer;
mod plane;

pub use self::buffer::EglStreamBuffer;
pub use self::plane::{Plane, PlaneId, WeakPlane};
use self::plane::{PlaneCache, StreamBinding};

/// Errors thrown while creating an [`EglStreamAllocator`]
#[derive(Debug, thiserror::Error)]
pub enum EglStreamAllocatorInitError {
    /// None of the backends is an EGLStream capable device
    #[error("No EGLStream capable device found among the backends")]
    BackendMissing,
}

/// Errors thrown by [`EglStreamAllocator::create_buffer`](Allocator::create_buffer)
#[derive(Debug, thiserror::Error)]
pub enum EglStreamBufferError<E: std::error::Error + 'static> {
    /// The renderer the allocator was created with has no EGL context
    #[error("The renderer has no EGL context to create stream surfaces with")]
    NoContext,
    /// The requested size cannot be represented by a stream surface
    #[error("Invalid buffer size {0}x{1}")]
    InvalidSize(u32, u32),
    /// Memory for tracking a new plane could not be allocated
    #[error("Out of memory while tracking a new plane")]
    OutOfMemory(#[from] TryReserveError),
    /// The device failed to create a stream surface
    #[error("Failed to create a stream surface for plane {plane}")]
    SurfaceCreationFailed {
        /// Plane the surface was requested for
        plane: PlaneId,
        /// Underlying device error
        #[source]
        source: E,
    },
}

/// Errors thrown when exporting an [`EglStreamBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EglStreamExportError {
    /// Stream backed buffers have no dmabuf representation
    #[error("EGLStream buffers cannot be exported as dmabufs")]
    Unsupported,
}

/// Allocator for buffers backed by the EGLStreams of a device.
///
/// All [`EglStreamBuffer`]s created by this allocator should be dropped before
/// the allocator itself. Buffers outliving it stay valid and still destroy their
/// surfaces, but are no longer reachable through [`EglStreamAllocator::find_plane`].
#[derive(Debug)]
pub struct EglStreamAllocator<D: StreamSurfaceProvider> {
    device: D,
    binding: Option<Rc<StreamBinding<D>>>,
    planes: PlaneCache<D>,
    caps: BufferCaps,
    span: tracing::Span,
}

impl<D> EglStreamAllocator<D>
where
    D: StreamSurfaceProvider + Backend + Clone,
{
    /// Create a new [`EglStreamAllocator`] bound to the device of type `D` in `backends`.
    ///
    /// If `backends` contains multiple devices of that type, the last one is used.
    /// A renderer without an EGL context is accepted, but every buffer
    /// allocation will fail with [`EglStreamBufferError::NoContext`].
    pub fn new<R>(
        backends: &MultiBackend,
        renderer: &R,
        caps: BufferCaps,
    ) -> Result<EglStreamAllocator<D>, EglStreamAllocatorInitError>
    where
        R: EGLContextSource<Context = D::Context>,
    {
        let span = info_span!("backend_eglstream");
        let _guard = span.enter();

        let device = backends
            .backends::<D>()
            .last()
            .cloned()
            .ok_or(EglStreamAllocatorInitError::BackendMissing)?;

        let binding = match renderer.egl_context() {
            Some(context) => Some(Rc::new(StreamBinding {
                device: device.clone(),
                context,
            })),
            None => {
                warn!("Renderer has no EGL context, buffer allocations will fail");
                None
            }
        };
        info!(?device, ?caps, "Initialized EGLStream allocator");

        let planes = PlaneCache::new(&span);
        drop(_guard);
        Ok(EglStreamAllocator {
            device,
            binding,
            planes,
            caps,
            span,
        })
    }
}

impl<D: StreamSurfaceProvider> EglStreamAllocator<D> {
    /// Returns the plane currently associated with `id`.
    ///
    /// This is the most recently created plane for that id, older planes with a
    /// different size stay alive through their buffers but are not returned here.
    /// The returned handle does not keep the plane alive.
    pub fn find_plane(&self, id: impl Into<PlaneId>) -> Option<WeakPlane<D>> {
        self.planes.find_by_id(id.into())
    }

    /// Number of planes currently reachable through [`EglStreamAllocator::find_plane`]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Capabilities of the buffers created by this allocator
    pub fn buffer_caps(&self) -> BufferCaps {
        self.caps
    }

    /// Device this allocator is bound to
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns `true` if the allocator got a rendering context and is able to allocate
    pub fn has_context(&self) -> bool {
        self.binding.is_some()
    }
}

impl<D: StreamSurfaceProvider + 'static> Allocator for EglStreamAllocator<D> {
    type Buffer = EglStreamBuffer<D>;
    type Error = EglStreamBufferError<D::Error>;
    type Target = PlaneId;

    #[instrument(level = "trace", parent = &self.span, skip(self, modifiers))]
    #[profiling::function]
    fn create_buffer(
        &mut self,
        width: u32,
        height: u32,
        fourcc: Fourcc,
        modifiers: &[Modifier],
        target: PlaneId,
    ) -> Result<EglStreamBuffer<D>, Self::Error> {
        let binding = self.binding.as_ref().ok_or(EglStreamBufferError::NoContext)?;

        let size: Size<i32, BufferCoords> = match (i32::try_from(width), i32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h).into(),
            _ => return Err(EglStreamBufferError::InvalidSize(width, height)),
        };

        if !modifiers.is_empty() && !modifiers.contains(&Modifier::Invalid) {
            trace!(?modifiers, "Ignoring explicit modifiers, streams use an implicit layout");
        }

        let plane = self.planes.lookup_or_create(binding, target, size)?;
        trace!(plane = %target, refs = plane.ref_count(), "Created buffer");
        Ok(EglStreamBuffer::new(plane, fourcc))
    }
}

impl<D: StreamSurfaceProvider> Drop for EglStreamAllocator<D> {
    fn drop(&mut self) {
        let _guard = self.span.enter();
        let alive = self.planes.len();
        if alive > 0 {
            warn!(planes = alive, "Dropping allocator while buffers are still in use");
        }
    }
}
