use std::fmt;

/// Type-level marker for the buffer coordinate space
#[derive(Debug)]
pub struct Buffer;

/// Trait for types serving as a coordinate for other geometry utils
pub trait Coordinate: Sized + PartialOrd + Default + Copy + fmt::Debug {
    /// A Coordinate that is 0
    const ZERO: Self;
    /// Test if the coordinate is not negative
    fn non_negative(self) -> bool;
}

macro_rules! coordinate_impl {
    ($($ty:ty),*) => {
        $(
            impl Coordinate for $ty {
                const ZERO: $ty = 0 as $ty;

                #[inline]
                #[allow(unused_comparisons)]
                fn non_negative(self) -> bool {
                    self >= 0 as $ty
                }
            }
        )*
    };
}

coordinate_impl!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// A size as seen by some coordinate space
///
/// Constructors of this type ensure that the values are always positive via
/// `debug_assert!()`, however manually changing the values of the fields
/// can break this invariant.
#[repr(C)]
pub struct Size<N, Kind> {
    /// horizontal coordinate
    pub w: N,
    /// vertical coordinate
    pub h: N,
    _kind: std::marker::PhantomData<Kind>,
}

impl<N: Coordinate, Kind> Size<N, Kind> {
    /// Check if this [`Size`] covers no area
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= N::ZERO || self.h <= N::ZERO
    }
}

impl<N: fmt::Debug, S> fmt::Debug for Size<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Size<{}>", std::any::type_name::<S>()))?;
        f.debug_struct("")
            .field("w", &self.w)
            .field("h", &self.h)
            .finish()
    }
}

impl<N: Coordinate, Kind> From<(N, N)> for Size<N, Kind> {
    #[inline]
    fn from((w, h): (N, N)) -> Size<N, Kind> {
        debug_assert!(
            w.non_negative() && h.non_negative(),
            "Attempting to create a `Size` of negative size: {:?}",
            (w, h)
        );
        Size {
            w,
            h,
            _kind: std::marker::PhantomData,
        }
    }
}

impl<N, Kind> From<Size<N, Kind>> for (N, N) {
    #[inline]
    fn from(size: Size<N, Kind>) -> (N, N) {
        (size.w, size.h)
    }
}

impl<N: Clone, Kind> Clone for Size<N, Kind> {
    #[inline]
    fn clone(&self) -> Self {
        Size {
            w: self.w.clone(),
            h: self.h.clone(),
            _kind: std::marker::PhantomData,
        }
    }
}

impl<N: Copy, Kind> Copy for Size<N, Kind> {}

impl<N: PartialEq, Kind> PartialEq for Size<N, Kind> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.w == other.w && self.h == other.h
    }
}

impl<N: Eq, Kind> Eq for Size<N, Kind> {}

impl<N: std::hash::Hash, Kind> std::hash::Hash for Size<N, Kind> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.w.hash(state);
        self.h.hash(state);
    }
}

impl<N: Default, Kind> Default for Size<N, Kind> {
    fn default() -> Self {
        Size {
            w: N::default(),
            h: N::default(),
            _kind: std::marker::PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Buffer, Size};

    #[test]
    fn size_equality_ignores_kind_marker() {
        let a: Size<i32, Buffer> = (1920, 1080).into();
        let b: Size<i32, Buffer> = Size::from((1920, 1080));
        assert_eq!(a, b);
        assert_ne!(a, Size::from((1024, 768)));
    }

    #[test]
    fn empty_sizes() {
        assert!(Size::<i32, Buffer>::from((0, 1080)).is_empty());
        assert!(Size::<i32, Buffer>::from((1920, 0)).is_empty());
        assert!(!Size::<i32, Buffer>::from((1, 1)).is_empty());
    }

    #[test]
    fn tuple_conversion() {
        let size: Size<u32, Buffer> = (800, 600).into();
        let (w, h): (u32, u32) = size.into();
        assert_eq!((w, h), (800, 600));
    }
}
