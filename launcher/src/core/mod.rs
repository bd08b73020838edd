//! Pure logic: no filesystem, no processes.

pub mod envfile;
pub mod manifest;
pub mod materialize;
