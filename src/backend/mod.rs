//! Backend helpers for buffer allocation
//!
//! Collection of common traits and implementations about
//! allocating buffers for hardware scanout planes.
//!
//! - [`multi`] bundles the sub-backends of a compositor and lets
//!   consumers look up a specific kind of backend.
//! - [`egl`] describes the EGL pieces an allocator relies on, like the
//!   rendering context and the stream surfaces of a device.
//! - [`allocator`] contains the buffer and allocator abstractions, including
//!   an [`EglStreamAllocator`](allocator::eglstream::EglStreamAllocator).

pub mod allocator;
pub mod egl;
pub mod multi;
