//! Module for [dmabuf](https://docs.kernel.org/driver-api/dma-buf.html) buffers.
//!
//! Allocators that can share their buffers with other processes or devices
//! implement [`AsDmabuf`] for their buffer type. Backing types without such a
//! path report it through the error type of their [`AsDmabuf`] implementation.

use super::Format;
use crate::utils::{Buffer as BufferCoords, Size};
use std::os::unix::io::OwnedFd;

/// Exported dmabuf, one file descriptor per plane
#[derive(Debug)]
pub struct Dmabuf {
    /// The size of this buffer
    pub size: Size<i32, BufferCoords>,
    /// The format in use
    pub format: Format,
    /// File descriptors of the planes, closed on drop
    pub fds: Vec<OwnedFd>,
}

/// Buffer that can be exported as Dmabufs
pub trait AsDmabuf {
    /// Error type returned, if exporting fails
    type Error;

    /// Export this buffer as a new Dmabuf
    fn export(&self) -> Result<Dmabuf, Self::Error>;
}
