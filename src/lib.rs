#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
// Allow acronyms like EGL
#![allow(clippy::upper_case_acronyms)]

//! # EGLStream buffer allocation for smithay based compositors
//!
//! Drivers implementing the EGLStream api (most prominently the proprietary
//! `nvidia` driver) do not allow allocating buffer objects for scanout.
//! Frames are instead delivered to the hardware planes of a drm device through
//! streams, with a surface on the producer end the compositor renders into.
//!
//! This crate wraps this model into the usual allocator interface: an
//! [`EglStreamAllocator`](backend::allocator::eglstream::EglStreamAllocator)
//! creates buffers targeting a specific hardware plane and transparently shares
//! one stream surface between all buffers for the same plane and size.
//!
//! ## Structure of the crate
//!
//! - [`backend::allocator`] contains the generic buffer and allocator traits and
//!   the EGLStream backed implementation.
//! - [`backend::egl`] describes the device and renderer capabilities the
//!   allocator depends upon.
//! - [`backend::multi`] bundles the sub-backends of a compositor.
//! - [`utils`] contains small geometry helpers.
//!
//! ### Threading
//!
//! All types are meant to be used from the rendering thread of the compositor
//! and are neither `Send` nor `Sync`.
//!
//! ### Logging
//!
//! This crate makes extensive use of [`tracing`] for its internal logging.
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```

pub mod backend;
pub mod utils;
