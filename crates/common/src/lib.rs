/**
 * Filesystem semantics on top of the store.
 *  Attribute translation, node hierarchy management,
 *  byte-range content emulation, and the dispatcher
 *  that ties them together.
 */
pub mod fs;
/**
 * The coordination-store seam.
 *  A small async trait over the six primitives we need,
 *  with a ZooKeeper implementation and an in-memory
 *  one for tests.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::fs::{
        FileAttributes, FsCall, FsError, NodeKind, PathOperationResult, Payload, WritePolicy,
        ZkFs,
    };
    pub use crate::store::{MemoryStore, NodeStat, Store, StoreError, ZkStore, MAX_PAYLOAD_BYTES};
    pub use crate::version::build_info;
}
