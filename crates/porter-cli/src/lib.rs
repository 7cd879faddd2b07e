//! porter: port review comments onto later revisions of a change.

pub mod cli;
pub mod logging;
pub mod manifest;
pub mod output;
