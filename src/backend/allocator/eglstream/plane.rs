//! Planes and the cache keeping track of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, info_span, trace, warn};

use super::EglStreamBufferError;
use crate::backend::egl::StreamSurfaceProvider;
use crate::utils::{Buffer as BufferCoords, Size};

/// Identity of a hardware scanout plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(u32);

impl PlaneId {
    /// Create a new plane identity from its raw value
    pub const fn new(id: u32) -> PlaneId {
        PlaneId(id)
    }

    /// Raw value of this identity
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for PlaneId {
    #[inline]
    fn from(id: u32) -> PlaneId {
        PlaneId(id)
    }
}

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device and rendering context stream surfaces are created with
#[derive(Debug)]
pub(super) struct StreamBinding<D: StreamSurfaceProvider> {
    pub(super) device: D,
    pub(super) context: D::Context,
}

type PlaneMap<D> = HashMap<PlaneId, Weak<PlaneInner<D>>>;

struct PlaneInner<D: StreamSurfaceProvider> {
    id: PlaneId,
    size: Size<i32, BufferCoords>,
    surface: Option<D::Surface>,
    binding: Rc<StreamBinding<D>>,
    cache: Weak<RefCell<PlaneMap<D>>>,
    span: tracing::Span,
}

impl<D: StreamSurfaceProvider> Drop for PlaneInner<D> {
    fn drop(&mut self) {
        let this = self as *const PlaneInner<D>;
        let _guard = self.span.enter();

        if let Some(surface) = self.surface.take() {
            self.binding
                .device
                .destroy_stream_surface(&self.binding.context, surface);
            debug!(size = ?self.size, "Destroyed stream surface");
        }

        // A plane superseded by a newer one for the same id no longer owns the slot.
        if let Some(cache) = self.cache.upgrade() {
            let mut planes = cache.borrow_mut();
            if planes
                .get(&self.id)
                .map_or(false, |entry| std::ptr::eq(entry.as_ptr(), this))
            {
                planes.remove(&self.id);
                trace!("Removed plane from cache");
            }
        }
    }
}

/// Hardware plane backed by an EGLStream surface.
///
/// `Plane` is a reference counted handle. Every [`EglStreamBuffer`](super::EglStreamBuffer)
/// holds exactly one and releases it when dropped. Once the last buffer is gone the
/// stream surface is destroyed right away and the plane leaves the cache of its allocator.
///
/// To refer to a plane without keeping it alive, use a [`WeakPlane`].
pub struct Plane<D: StreamSurfaceProvider>(Rc<PlaneInner<D>>);

impl<D: StreamSurfaceProvider> Plane<D> {
    /// Identity of the hardware plane
    pub fn id(&self) -> PlaneId {
        self.0.id
    }

    /// Size of the frames delivered through this plane
    pub fn size(&self) -> Size<i32, BufferCoords> {
        self.0.size
    }

    /// Stream surface backing this plane
    pub fn surface(&self) -> &D::Surface {
        match self.0.surface.as_ref() {
            Some(surface) => surface,
            None => unreachable!("stream surface is only taken on drop"),
        }
    }

    /// Number of buffers currently using this plane
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Create a weak reference to this plane
    pub fn downgrade(&self) -> WeakPlane<D> {
        WeakPlane {
            id: self.0.id,
            size: self.0.size,
            inner: Rc::downgrade(&self.0),
        }
    }
}

impl<D: StreamSurfaceProvider> PartialEq for Plane<D> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<D: StreamSurfaceProvider> Eq for Plane<D> {}

impl<D: StreamSurfaceProvider> fmt::Debug for Plane<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("id", &self.0.id)
            .field("size", &self.0.size)
            .field("surface", &self.0.surface)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Weak reference to a [`Plane`].
///
/// Does not keep the plane alive and does not count towards [`Plane::ref_count`].
/// Once the last buffer of the plane is dropped the reference is gone.
pub struct WeakPlane<D: StreamSurfaceProvider> {
    id: PlaneId,
    size: Size<i32, BufferCoords>,
    inner: Weak<PlaneInner<D>>,
}

impl<D: StreamSurfaceProvider> WeakPlane<D> {
    /// Identity of the hardware plane
    pub fn id(&self) -> PlaneId {
        self.id
    }

    /// Size of the frames delivered through this plane
    pub fn size(&self) -> Size<i32, BufferCoords> {
        self.size
    }

    /// Returns true if no buffer uses the plane anymore and its surface was destroyed
    pub fn is_gone(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Access the stream surface of the plane, if it is still alive.
    ///
    /// The plane is only borrowed for the duration of `f`.
    pub fn with_surface<R>(&self, f: impl FnOnce(&D::Surface) -> R) -> Option<R> {
        self.upgrade().map(|plane| f(plane.surface()))
    }

    pub(super) fn upgrade(&self) -> Option<Plane<D>> {
        self.inner.upgrade().map(Plane)
    }
}

impl<D: StreamSurfaceProvider> Clone for WeakPlane<D> {
    fn clone(&self) -> Self {
        WeakPlane {
            id: self.id,
            size: self.size,
            inner: self.inner.clone(),
        }
    }
}

impl<D: StreamSurfaceProvider> PartialEq for WeakPlane<D> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}
impl<D: StreamSurfaceProvider> Eq for WeakPlane<D> {}

impl<D: StreamSurfaceProvider> PartialEq<Plane<D>> for WeakPlane<D> {
    fn eq(&self, other: &Plane<D>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&other.0))
    }
}

impl<D: StreamSurfaceProvider> fmt::Debug for WeakPlane<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPlane")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("gone", &self.is_gone())
            .finish()
    }
}

/// Cache of the planes currently in use, keyed by their identity.
///
/// The cache only holds weak references, planes are owned by the buffers using them.
/// Requesting an id with a different size replaces the entry for that id, the previous
/// plane is not evicted and stays alive for as long as its buffers do.
pub(super) struct PlaneCache<D: StreamSurfaceProvider> {
    planes: Rc<RefCell<PlaneMap<D>>>,
    span: tracing::Span,
}

impl<D: StreamSurfaceProvider> fmt::Debug for PlaneCache<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaneCache")
            .field("planes", &self.planes.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D: StreamSurfaceProvider> PlaneCache<D> {
    pub(super) fn new(span: &tracing::Span) -> PlaneCache<D> {
        PlaneCache {
            planes: Rc::new(RefCell::new(HashMap::new())),
            span: span.clone(),
        }
    }

    /// Returns the plane for `id` if it matches `size`, otherwise creates a new one.
    pub(super) fn lookup_or_create(
        &self,
        binding: &Rc<StreamBinding<D>>,
        id: PlaneId,
        size: Size<i32, BufferCoords>,
    ) -> Result<Plane<D>, EglStreamBufferError<D::Error>> {
        if let Some(plane) = self.find_by_id(id).and_then(|plane| plane.upgrade()) {
            if plane.size() == size {
                trace!(plane = %id, "Reusing cached plane");
                return Ok(plane);
            }
            debug!(
                plane = %id,
                old = ?plane.size(),
                new = ?size,
                "Plane size changed, creating a new stream surface"
            );
        }

        // reserve before touching the hardware, so a failure leaves nothing behind
        self.planes.borrow_mut().try_reserve(1)?;

        let span = info_span!(parent: &self.span, "plane", id = %id);
        let surface = {
            let _guard = span.enter();
            binding
                .device
                .create_stream_surface(&binding.context, id, size)
                .map_err(|source| {
                    warn!(?size, "Failed to create stream surface: {}", source);
                    EglStreamBufferError::SurfaceCreationFailed { plane: id, source }
                })?
        };
        debug!(plane = %id, ?size, "Created stream surface");

        let inner = Rc::new(PlaneInner {
            id,
            size,
            surface: Some(surface),
            binding: binding.clone(),
            cache: Rc::downgrade(&self.planes),
            span,
        });
        self.planes.borrow_mut().insert(id, Rc::downgrade(&inner));
        Ok(Plane(inner))
    }

    /// Returns the most recently created plane for `id`, if it is still alive.
    pub(super) fn find_by_id(&self, id: PlaneId) -> Option<WeakPlane<D>> {
        let inner = self.planes.borrow().get(&id).cloned()?;
        inner.upgrade().map(|plane| Plane(plane).downgrade())
    }

    /// Number of planes reachable through the cache
    pub(super) fn len(&self) -> usize {
        self.planes
            .borrow()
            .values()
            .filter(|plane| plane.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("stream surface rejected")]
    struct Rejected;

    #[derive(Debug, Default)]
    struct Device {
        next: Cell<u32>,
        destroyed: RefCell<Vec<u32>>,
        fail: Cell<bool>,
    }

    impl StreamSurfaceProvider for Rc<Device> {
        type Context = ();
        type Surface = u32;
        type Error = Rejected;

        fn create_stream_surface(
            &self,
            _context: &(),
            _plane: PlaneId,
            _size: Size<i32, BufferCoords>,
        ) -> Result<u32, Rejected> {
            if self.fail.get() {
                return Err(Rejected);
            }
            let surface = self.next.get();
            self.next.set(surface + 1);
            Ok(surface)
        }

        fn destroy_stream_surface(&self, _context: &(), surface: u32) {
            self.destroyed.borrow_mut().push(surface);
        }
    }

    fn setup() -> (Rc<Device>, Rc<StreamBinding<Rc<Device>>>, PlaneCache<Rc<Device>>) {
        let device = Rc::new(Device::default());
        let binding = Rc::new(StreamBinding {
            device: device.clone(),
            context: (),
        });
        (device, binding, PlaneCache::new(&tracing::Span::none()))
    }

    #[test]
    fn reuses_plane_of_same_size() {
        let (device, binding, cache) = setup();
        let size = Size::from((1920, 1080));

        let first = cache.lookup_or_create(&binding, PlaneId(5), size).unwrap();
        let second = cache.lookup_or_create(&binding, PlaneId(5), size).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ref_count(), 2);
        assert_eq!(device.next.get(), 1);

        drop(first);
        assert_eq!(cache.len(), 1);
        drop(second);
        assert_eq!(cache.len(), 0);
        assert!(cache.find_by_id(PlaneId(5)).is_none());
        assert_eq!(*device.destroyed.borrow(), vec![0]);
    }

    #[test]
    fn lookup_does_not_keep_plane_alive() {
        let (device, binding, cache) = setup();
        let plane = cache
            .lookup_or_create(&binding, PlaneId(5), Size::from((1920, 1080)))
            .unwrap();

        let weak = cache.find_by_id(PlaneId(5)).unwrap();
        assert_eq!(plane.ref_count(), 1);
        assert_eq!(weak.with_surface(|surface| *surface), Some(0));
        assert_eq!(plane.ref_count(), 1);
        assert!(!weak.is_gone());

        drop(plane);
        assert!(weak.is_gone());
        assert_eq!(weak.with_surface(|surface| *surface), None);
        assert_eq!(weak.id(), PlaneId(5));
        assert!(cache.find_by_id(PlaneId(5)).is_none());
        assert_eq!(*device.destroyed.borrow(), vec![0]);
    }

    #[test]
    fn size_change_supersedes_entry() {
        let (device, binding, cache) = setup();

        let old = cache
            .lookup_or_create(&binding, PlaneId(7), Size::from((800, 600)))
            .unwrap();
        let new = cache
            .lookup_or_create(&binding, PlaneId(7), Size::from((1024, 768)))
            .unwrap();
        assert_ne!(old, new);
        assert_eq!(cache.find_by_id(PlaneId(7)), Some(new.downgrade()));

        drop(old);
        assert_eq!(*device.destroyed.borrow(), vec![0]);
        assert_eq!(cache.find_by_id(PlaneId(7)), Some(new.downgrade()));
        assert_eq!(new.ref_count(), 1);

        drop(new);
        assert!(cache.find_by_id(PlaneId(7)).is_none());
    }

    #[test]
    fn failed_creation_leaves_cache_untouched() {
        let (device, binding, cache) = setup();
        let size = Size::from((640, 480));

        let kept = cache.lookup_or_create(&binding, PlaneId(1), size).unwrap();
        device.fail.set(true);
        let err = cache
            .lookup_or_create(&binding, PlaneId(1), Size::from((320, 240)))
            .unwrap_err();
        assert!(matches!(
            err,
            EglStreamBufferError::SurfaceCreationFailed { plane: PlaneId(1), .. }
        ));
        assert!(cache.lookup_or_create(&binding, PlaneId(2), size).is_err());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.find_by_id(PlaneId(1)), Some(kept.downgrade()));
        assert!(cache.find_by_id(PlaneId(2)).is_none());
        assert!(device.destroyed.borrow().is_empty());
    }

    #[test]
    fn plane_outliving_cache_still_tears_down() {
        let (device, binding, cache) = setup();
        let plane = cache
            .lookup_or_create(&binding, PlaneId(3), Size::from((64, 64)))
            .unwrap();
        drop(cache);
        drop(binding);

        assert_eq!(plane.id().get(), 3);
        drop(plane);
        assert_eq!(*device.destroyed.borrow(), vec![0]);
    }
}
