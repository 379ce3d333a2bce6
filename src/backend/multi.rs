//! Composite backend bundling several sub-backends.
//!
//! Compositors usually drive more than one backend at once, e.g. a drm device
//! for every gpu next to a libinput context. A [`MultiBackend`] owns all of them
//! and allows typed lookups of a specific kind of backend, which is how
//! allocators find the device they need to bind to.

use downcast_rs::{impl_downcast, Downcast};

/// A backend that can be added to a [`MultiBackend`]
pub trait Backend: std::fmt::Debug + Downcast {}
impl_downcast!(Backend);

/// Ordered collection of sub-backends
#[derive(Debug, Default)]
pub struct MultiBackend {
    backends: Vec<Box<dyn Backend>>,
}

impl MultiBackend {
    /// Create an empty [`MultiBackend`]
    pub fn new() -> MultiBackend {
        MultiBackend::default()
    }

    /// Append a sub-backend
    pub fn add<B: Backend>(&mut self, backend: B) {
        tracing::debug!(backend = ?backend, "Adding sub-backend");
        self.backends.push(Box::new(backend));
    }

    /// Remove all sub-backends of type `B`, returning them in insertion order
    pub fn remove<B: Backend>(&mut self) -> Vec<B> {
        let (removed, kept) = std::mem::take(&mut self.backends)
            .into_iter()
            .partition::<Vec<_>, _>(|backend| backend.is::<B>());
        self.backends = kept;
        removed
            .into_iter()
            .filter_map(|backend| backend.downcast::<B>().ok())
            .map(|backend| *backend)
            .collect()
    }

    /// Iterate over all sub-backends in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Backend> {
        self.backends.iter().map(|backend| &**backend)
    }

    /// Iterate over all sub-backends of type `B` in insertion order
    pub fn backends<B: Backend>(&self) -> impl Iterator<Item = &B> {
        self.backends.iter().filter_map(|backend| backend.downcast_ref::<B>())
    }

    /// Returns `true` if at least one sub-backend is of type `B`
    pub fn contains<B: Backend>(&self) -> bool {
        self.backends.iter().any(|backend| backend.is::<B>())
    }

    /// Number of sub-backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns `true` if no sub-backends were added
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, MultiBackend};

    #[derive(Debug, PartialEq)]
    struct Drm(u32);
    impl Backend for Drm {}

    #[derive(Debug)]
    struct Headless;
    impl Backend for Headless {}

    #[test]
    fn typed_lookup_skips_other_kinds() {
        let mut multi = MultiBackend::new();
        multi.add(Headless);
        multi.add(Drm(0));
        multi.add(Headless);
        multi.add(Drm(1));

        assert_eq!(multi.len(), 4);
        assert!(multi.contains::<Drm>());
        let drm = multi.backends::<Drm>().collect::<Vec<_>>();
        assert_eq!(drm, vec![&Drm(0), &Drm(1)]);
    }

    #[test]
    fn empty_lookup() {
        let mut multi = MultiBackend::new();
        assert!(multi.is_empty());
        multi.add(Headless);
        assert!(!multi.contains::<Drm>());
        assert_eq!(multi.backends::<Drm>().count(), 0);
    }

    #[test]
    fn remove_by_kind() {
        let mut multi = MultiBackend::new();
        multi.add(Drm(3));
        multi.add(Headless);
        multi.add(Drm(4));

        assert_eq!(multi.remove::<Drm>(), vec![Drm(3), Drm(4)]);
        assert_eq!(multi.len(), 1);
        assert!(multi.iter().all(|backend| backend.is::<Headless>()));
    }
}
