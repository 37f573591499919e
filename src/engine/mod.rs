pub mod cache;
pub mod cancel;
pub mod partition;
pub mod pool;

pub use cache::{CachePolicy, SnapshotCache};
pub use cancel::CancellationFlag;
pub use partition::{partition_by_provider, batches, Partition};
pub use pool::{Accumulator, ExecutionStrategy, PoolOutcome, WorkUnit, WorkerPool, DEFAULT_BATCH_SIZE};
