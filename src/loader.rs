use crate::{
    error::Result,
    record::parse_row,
    tree::{DirectoryTree, RootSelection, TreeBuilder},
};
use std::{io::Read, path::Path};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadOptions {
    /// The scan was written with a header line (`pwalk --header`)
    pub has_headers: bool,
    pub root_selection: RootSelection,
}

/// Reads a scan file and assembles the directory tree from its directory rows.
pub fn load_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<DirectoryTree> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading scan");

    let rdr = reader_builder(options).from_path(path)?;
    load(rdr, options)
}

pub fn load_reader(reader: impl Read, options: &LoadOptions) -> Result<DirectoryTree> {
    let rdr = reader_builder(options).from_reader(reader);
    load(rdr, options)
}

fn reader_builder(options: &LoadOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(options.has_headers)
        .delimiter(b',')
        .quote(b'"')
        .flexible(true);
    builder
}

fn load<R: Read>(mut rdr: csv::Reader<R>, options: &LoadOptions) -> Result<DirectoryTree> {
    let mut builder = TreeBuilder::new();
    let mut rows = 0u64;

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(rows + 1, |p| p.line());
        rows += 1;

        if let Some(directory) = parse_row(&record, line)? {
            builder.insert(&directory);
        }
    }

    debug!(rows, directories = builder.len(), "scan loaded");

    builder.finish(options.root_selection)
}
