/// Identity key to display color registry
pub mod registry;

/// Per-frame stabilization and identity tracking session
///
pub mod stabilizer;

/// Session running on a dedicated thread behind a frame queue
pub mod batch;
