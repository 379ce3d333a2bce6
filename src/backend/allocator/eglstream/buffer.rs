use std::fmt;

use super::{EglStreamExportError, Plane};
use crate::backend::allocator::{
    dmabuf::{AsDmabuf, Dmabuf},
    Buffer, Format, Fourcc, Modifier,
};
use crate::backend::egl::StreamSurfaceProvider;
use crate::utils::{Buffer as BufferCoords, Size};

/// Buffer rendering into the EGLStream of a hardware plane.
///
/// Every buffer holds one reference on its [`Plane`], which is released exactly once
/// when the buffer is dropped or [destroyed](EglStreamBuffer::destroy).
pub struct EglStreamBuffer<D: StreamSurfaceProvider> {
    plane: Plane<D>,
    format: Format,
}

impl<D: StreamSurfaceProvider> EglStreamBuffer<D> {
    pub(super) fn new(plane: Plane<D>, fourcc: Fourcc) -> EglStreamBuffer<D> {
        EglStreamBuffer {
            plane,
            // the stream picks the memory layout, there is no explicit modifier
            format: Format {
                code: fourcc,
                modifier: Modifier::Invalid,
            },
        }
    }

    /// Plane this buffer delivers frames to
    pub fn plane(&self) -> &Plane<D> {
        &self.plane
    }

    /// Stream surface to render into for this buffer
    pub fn surface(&self) -> &D::Surface {
        self.plane.surface()
    }

    /// Destroy this buffer, releasing its reference on the plane.
    ///
    /// Equivalent to dropping it.
    pub fn destroy(self) {}
}

impl<D: StreamSurfaceProvider + 'static> EglStreamBuffer<D> {
    /// Recover an [`EglStreamBuffer`] from a type-erased buffer.
    ///
    /// Returns `None` if `buffer` is of a different backing type.
    pub fn from_buffer(buffer: &dyn Buffer) -> Option<&EglStreamBuffer<D>> {
        buffer.downcast_ref::<EglStreamBuffer<D>>()
    }
}

impl<D: StreamSurfaceProvider + 'static> Buffer for EglStreamBuffer<D> {
    fn size(&self) -> Size<i32, BufferCoords> {
        self.plane.size()
    }

    fn format(&self) -> Format {
        self.format
    }
}

impl<D: StreamSurfaceProvider> AsDmabuf for EglStreamBuffer<D> {
    type Error = EglStreamExportError;

    fn export(&self) -> Result<Dmabuf, EglStreamExportError> {
        Err(EglStreamExportError::Unsupported)
    }
}

impl<D: StreamSurfaceProvider> fmt::Debug for EglStreamBuffer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EglStreamBuffer")
            .field("plane", &self.plane)
            .field("format", &self.format)
            .finish()
    }
}
