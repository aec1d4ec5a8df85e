/*!
 * Core Module
 * Identifiers and error types shared by handles and the registry
 */

pub mod errors;
pub mod id;

// Re-export for convenience
pub use errors::*;
pub use id::{HandleId, HandleIdAllocator};
