/// Integration tests for cluster verification, failure attribution,
/// trigger verification and windowed statistics.

mod clusters;
mod helpers;
mod triggers;
mod windows;
