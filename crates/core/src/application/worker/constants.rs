// Worker constants (no magic values)

/// Worker count when not configured: one worker keeps peer messages in order
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Thread name prefix of peer queue workers
pub const DEFAULT_THREAD_NAME: &str = "mpeer";

/// Items reserved when the service queue is allocated
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
