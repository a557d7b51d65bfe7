//! Handle newtypes for the statement/expression arena.

/// Defines a `u32` arena handle with `new`/`index`/`raw` accessors and a
/// `Name(n)` debug form.
macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => { $(
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Index into the owning arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    )* };
}

pub(crate) use define_id;

define_id!(
    /// Handle of an expression in an [`AstArena`](crate::AstArena).
    ExprId,
    /// Handle of a statement in an [`AstArena`](crate::AstArena).
    ///
    /// Break and continue targets are statement handles: two structurally
    /// identical loops are still distinct targets.
    StmtId,
);

crate::static_assert_size!(ExprId, 4);
crate::static_assert_size!(StmtId, 4);
