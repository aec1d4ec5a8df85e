/*!
 * Standard DeepRelease Implementations
 */

use super::DeepRelease;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

// ============================================================================
// Plain data: nothing to release
// ============================================================================

macro_rules! impl_noop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DeepRelease for $ty {
                #[inline]
                fn deep_release(self) {}
            }
        )*
    };
}

impl_noop!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    OsString,
    PathBuf,
    Duration,
    Instant,
    SystemTime,
);

// A borrow never carries a release obligation
impl<T: ?Sized> DeepRelease for &T {
    #[inline]
    fn deep_release(self) {}
}

impl<T: ?Sized> DeepRelease for &mut T {
    #[inline]
    fn deep_release(self) {}
}

impl<T: ?Sized> DeepRelease for PhantomData<T> {
    #[inline]
    fn deep_release(self) {}
}

// ============================================================================
// Optionals, tagged sums, fixed-size sequences
// ============================================================================

impl<T: DeepRelease> DeepRelease for Option<T> {
    #[inline]
    fn deep_release(self) {
        if let Some(value) = self {
            value.deep_release();
        }
    }
}

impl<T: DeepRelease, E: DeepRelease> DeepRelease for Result<T, E> {
    #[inline]
    fn deep_release(self) {
        match self {
            Ok(value) => value.deep_release(),
            Err(error) => error.deep_release(),
        }
    }
}

impl<T: DeepRelease, const N: usize> DeepRelease for [T; N] {
    fn deep_release(self) {
        for item in self {
            item.deep_release();
        }
    }
}

macro_rules! impl_tuple {
    ($($name:ident),+) => {
        impl<$($name: DeepRelease),+> DeepRelease for ($($name,)+) {
            #[allow(non_snake_case)]
            fn deep_release(self) {
                let ($($name,)+) = self;
                $($name.deep_release();)+
            }
        }
    };
}

impl_tuple!(A);
impl_tuple!(A, B);
impl_tuple!(A, B, C);
impl_tuple!(A, B, C, D);
impl_tuple!(A, B, C, D, E);
impl_tuple!(A, B, C, D, E, F);
impl_tuple!(A, B, C, D, E, F, G);
impl_tuple!(A, B, C, D, E, F, G, H);

// ============================================================================
// Containers with their own release logic
// ============================================================================

impl<T: DeepRelease> DeepRelease for Box<T> {
    #[inline]
    fn deep_release(self) {
        (*self).deep_release();
    }
}

impl<T: DeepRelease> DeepRelease for Vec<T> {
    fn deep_release(self) {
        for item in self {
            item.deep_release();
        }
    }
}

impl<T: DeepRelease> DeepRelease for VecDeque<T> {
    fn deep_release(self) {
        for item in self {
            item.deep_release();
        }
    }
}

/// Entries in key order, key before value
impl<K: DeepRelease, V: DeepRelease> DeepRelease for BTreeMap<K, V> {
    fn deep_release(self) {
        for (key, value) in self {
            key.deep_release();
            value.deep_release();
        }
    }
}

/// Entries in iteration order (unspecified), key before value
impl<K: DeepRelease, V: DeepRelease, S> DeepRelease for HashMap<K, V, S> {
    fn deep_release(self) {
        for (key, value) in self {
            key.deep_release();
            value.deep_release();
        }
    }
}

impl<T: DeepRelease> DeepRelease for Cell<T> {
    #[inline]
    fn deep_release(self) {
        self.into_inner().deep_release();
    }
}

impl<T: DeepRelease> DeepRelease for RefCell<T> {
    #[inline]
    fn deep_release(self) {
        self.into_inner().deep_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Journal {
        released: Mutex<Vec<u32>>,
    }

    impl Journal {
        fn record(&self, value: u32) {
            self.released.lock().push(value);
        }
    }

    fn handle(journal: &Arc<Journal>, value: u32) -> Handle<u32, Journal> {
        Handle::untracked(value, journal.clone(), Journal::record)
    }

    fn released(journal: &Journal) -> Vec<u32> {
        journal.released.lock().clone()
    }

    #[test]
    fn test_option() {
        let journal = Arc::new(Journal::default());
        Some(handle(&journal, 1)).deep_release();
        None::<Handle<u32, Journal>>.deep_release();
        assert_eq!(released(&journal), vec![1]);
    }

    #[test]
    fn test_result_live_side_only() {
        let journal = Arc::new(Journal::default());
        let ok: Result<Handle<u32, Journal>, u8> = Ok(handle(&journal, 1));
        let err: Result<u8, Handle<u32, Journal>> = Err(handle(&journal, 2));
        ok.deep_release();
        err.deep_release();
        assert_eq!(released(&journal), vec![1, 2]);
    }

    #[test]
    fn test_array_index_order() {
        let journal = Arc::new(Journal::default());
        [handle(&journal, 1), handle(&journal, 2), handle(&journal, 3)].deep_release();
        assert_eq!(released(&journal), vec![1, 2, 3]);
    }

    #[test]
    fn test_tuple_order() {
        let journal = Arc::new(Journal::default());
        (handle(&journal, 1), 7u8, handle(&journal, 2)).deep_release();
        assert_eq!(released(&journal), vec![1, 2]);
    }

    #[test]
    fn test_sequences_and_boxes() {
        let journal = Arc::new(Journal::default());
        vec![handle(&journal, 1), handle(&journal, 2)].deep_release();
        VecDeque::from(vec![handle(&journal, 3)]).deep_release();
        Box::new(handle(&journal, 4)).deep_release();
        RefCell::new(Some(handle(&journal, 5))).deep_release();
        assert_eq!(released(&journal), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_btree_map_key_order() {
        let journal = Arc::new(Journal::default());
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), handle(&journal, 2));
        map.insert("a".to_string(), handle(&journal, 1));
        map.deep_release();
        assert_eq!(released(&journal), vec![1, 2]);
    }

    #[test]
    fn test_hash_map_releases_all() {
        let journal = Arc::new(Journal::default());
        let mut map = HashMap::new();
        for i in 0..5u32 {
            map.insert(i, handle(&journal, i));
        }
        map.deep_release();

        let mut seen = released(&journal);
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
