//! Turns the flat, unordered output of a parallel filesystem walk into
//! subtree-inclusive entry counts and byte sizes for every directory.

use std::path::Path;

pub mod error;
pub mod loader;
pub mod logging;
pub mod record;
pub mod report;
pub mod tree;

pub use error::{Error, Result};
pub use loader::LoadOptions;
pub use report::{NodeReport, ReportFormat};
pub use tree::{Aggregation, DirectoryTree, RootSelection};

/// Loads a scan and aggregates it, returning the tree together with the aggregation outcome.
pub fn reassemble(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<(DirectoryTree, Aggregation)> {
    let mut tree = loader::load_path(path, options)?;
    let aggregation = tree.aggregate();
    Ok((tree, aggregation))
}
