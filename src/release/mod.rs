/*!
 * Deep Release
 *
 * Recursively finds and releases every resource handle reachable through a
 * value's structure. Each type states how it is traversed by implementing
 * [`DeepRelease`]:
 *
 * 1. Explicit-release types run their own release and are not traversed
 *    (`#[deep_release(explicit)]` + [`ExplicitRelease`], or a manual impl)
 * 2. Records release every field in declaration order (`#[derive(DeepRelease)]`)
 * 3. Arrays release every element in index order
 * 4. `Option` releases the contained value if present
 * 5. Tagged sums release only the live variant's payload
 * 6. Primitives and other plain data are no-ops
 *
 * ## Example
 *
 * ```rust
 * use resguard::{deep_release, DeepRelease, Handle};
 * use std::sync::Arc;
 *
 * #[derive(DeepRelease)]
 * struct Pair {
 *     left: Handle<u32>,
 *     right: Option<Handle<u32>>,
 *     #[deep_release(skip)]
 *     label: std::net::Ipv4Addr,
 * }
 *
 * let owner = Arc::new(());
 * let pair = Pair {
 *     left: Handle::new(1, owner.clone(), |_, _| {}),
 *     right: Some(Handle::new(2, owner, |_, _| {})),
 *     label: std::net::Ipv4Addr::LOCALHOST,
 * };
 * deep_release(pair);
 * ```
 *
 * Untagged unions have no live-field tag to follow and are rejected:
 *
 * ```compile_fail
 * use resguard::{DeepRelease, Handle};
 * use std::mem::ManuallyDrop;
 *
 * #[derive(DeepRelease)]
 * union Slot {
 *     handle: ManuallyDrop<Handle<u32>>,
 *     bits: u64,
 * }
 * ```
 */

mod impls;

pub use resguard_derive::DeepRelease;

/// Structural release capability
///
/// Consuming `self` means a released value cannot be used or released again.
pub trait DeepRelease {
    fn deep_release(self);
}

/// Opt-out from structural traversal
///
/// Types that manage their contents themselves (or cannot be destructured,
/// such as untagged unions or types with a `Drop` impl) implement this and
/// are marked `#[deep_release(explicit)]`.
pub trait ExplicitRelease {
    fn release_explicit(self);
}

/// Release every handle reachable from `value`
#[inline]
pub fn deep_release<T: DeepRelease>(value: T) {
    value.deep_release();
}
