//! Buffer allocation and management.
//!
//! Collection of common traits and implementations around
//! buffer creation and handling from various sources.
//!
//! Allocators provided:
//! - EGLStream backed buffers through [`EglStreamAllocator`](eglstream::EglStreamAllocator)
//!
//! Buffer types supported:
//! - [EglStreamBuffers](eglstream::EglStreamBuffer)
//! - [DmaBufs](dmabuf::Dmabuf)

use downcast_rs::{impl_downcast, Downcast};

use crate::utils::{Buffer as BufferCoords, Size};

pub mod dmabuf;
pub mod eglstream;

pub use drm_fourcc::{
    DrmFormat as Format, DrmFourcc as Fourcc, DrmModifier as Modifier, DrmVendor as Vendor,
    UnrecognizedFourcc, UnrecognizedVendor,
};

/// Common trait describing common properties of most types of buffers.
///
/// Buffers are downcastable, so code handling type-erased buffers
/// (e.g. `Box<dyn Buffer>`) can safely recover the concrete type of
/// a specific backing implementation.
pub trait Buffer: Downcast {
    /// Width of the two-dimensional buffer
    fn width(&self) -> u32 {
        self.size().w as u32
    }
    /// Height of the two-dimensional buffer
    fn height(&self) -> u32 {
        self.size().h as u32
    }
    /// Size of the two-dimensional buffer
    fn size(&self) -> Size<i32, BufferCoords>;
    /// Pixel format of the buffer
    fn format(&self) -> Format;
}
impl_downcast!(Buffer);

/// Interface to create Buffers
pub trait Allocator {
    /// Buffer type produced by this allocator
    type Buffer: Buffer;
    /// Error type thrown if allocations fail
    type Error: std::error::Error;
    /// Allocator specific hint where the buffer is going to be used,
    /// e.g. the hardware plane it is meant for.
    type Target;

    /// Try to create a buffer with the given dimensions and pixel format
    fn create_buffer(
        &mut self,
        width: u32,
        height: u32,
        fourcc: Fourcc,
        modifiers: &[Modifier],
        target: Self::Target,
    ) -> Result<Self::Buffer, Self::Error>;
}

bitflags::bitflags! {
    /// Capabilities of the buffers created by an allocator
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferCaps: u32 {
        /// Buffer contents can be accessed through a cpu pointer
        const DATA_PTR = 1 << 0;
        /// Buffers can be exported as dmabufs
        const DMABUF = 1 << 1;
        /// Buffers are backed by shared memory
        const SHM = 1 << 2;
    }
}
