/*!
 * Resguard Demo
 *
 * Builds a nested structure of resource handles, deep-releases it and tears
 * the registry down. Set RESGUARD_DEMO_LEAK=1 to leave one handle behind and
 * watch teardown fail.
 */

use parking_lot::Mutex;
use resguard::{
    deep_release, init_tracing, DeepRelease, ExplicitRelease, Handle, LeakRegistry,
};
use std::sync::Arc;
use tracing::info;

const DEMO_LEAK_ENV: &str = "RESGUARD_DEMO_LEAK";

/// Stand-in resource owner: hands out buffers and counts what comes back
#[derive(Default)]
struct BufferPool {
    outstanding: Mutex<usize>,
}

impl BufferPool {
    fn alloc(self: &Arc<Self>, len: usize) -> Handle<Vec<u8>, BufferPool> {
        *self.outstanding.lock() += 1;
        Handle::new(vec![0; len], self.clone(), BufferPool::free)
    }

    fn alloc_word(self: &Arc<Self>, word: u32) -> Handle<u32, BufferPool> {
        *self.outstanding.lock() += 1;
        Handle::new(word, self.clone(), BufferPool::free_word)
    }

    fn free(&self, buf: Vec<u8>) {
        info!(len = buf.len(), "buffer returned");
        *self.outstanding.lock() -= 1;
    }

    fn free_word(&self, word: u32) {
        info!(word, "word returned");
        *self.outstanding.lock() -= 1;
    }

    fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }
}

#[derive(DeepRelease)]
struct Foo {
    data: Handle<Vec<u8>, BufferPool>,
    single: Handle<u32, BufferPool>,
}

#[derive(DeepRelease)]
enum Slot {
    Foo(Foo),
    Empty,
}

/// Releases its members newest-first instead of being walked
#[derive(DeepRelease)]
#[deep_release(explicit)]
struct Stack {
    frames: Vec<Handle<Vec<u8>, BufferPool>>,
}

impl ExplicitRelease for Stack {
    fn release_explicit(self) {
        for frame in self.frames.into_iter().rev() {
            frame.release();
        }
    }
}

#[derive(DeepRelease)]
struct Scene {
    foo: Foo,
    slots: [Option<Slot>; 2],
    spare: Option<Slot>,
    stack: Stack,
}

fn build(pool: &Arc<BufferPool>) -> Scene {
    Scene {
        foo: Foo {
            data: pool.alloc(16),
            single: pool.alloc_word(1),
        },
        slots: [
            Some(Slot::Foo(Foo {
                data: pool.alloc(32),
                single: pool.alloc_word(2),
            })),
            Some(Slot::Foo(Foo {
                data: pool.alloc(64),
                single: pool.alloc_word(3),
            })),
        ],
        spare: Some(Slot::Empty),
        stack: Stack {
            frames: vec![pool.alloc(8), pool.alloc(8)],
        },
    }
}

fn main() -> miette::Result<()> {
    init_tracing();

    let registry = LeakRegistry::from_env()?;
    info!(service = registry.service_name(), "registry created");
    registry.set_active();

    let pool = Arc::new(BufferPool::default());
    let scene = build(&pool);
    info!(live = registry.live_count(), "scene built");

    if std::env::var(DEMO_LEAK_ENV).is_ok_and(|v| v == "1") {
        let Scene {
            foo,
            slots,
            spare,
            stack,
        } = scene;
        deep_release((slots, spare, stack));
        // `foo.single` is dropped without release
        foo.data.release();
    } else {
        deep_release(scene);
    }

    info!(outstanding = pool.outstanding(), "scene released");

    if let Err(report) = registry.try_teardown() {
        eprintln!("{}", report.render());
        return Err(report.into());
    }
    info!("teardown clean");
    Ok(())
}
