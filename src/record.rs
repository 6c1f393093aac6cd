//! Row-level view of the parallel walk's CSV output.
//!
//! Every line describes one filesystem entry using the following 17 columns:
//!
//! ```text
//! inode,parent-inode,directory-depth,"filename","fileExtension",UID,GID,st_size,st_dev,
//! st_blocks,st_nlink,"st_mode",st_atime,st_mtime,st_ctime,pw_fcount,pw_dirsum
//! ```
//!
//! `pw_fcount` and `pw_dirsum` are `-1` for anything that is not a directory. For
//! directories they hold the number of immediate entries and the sum of their sizes.

use crate::error::{Error, Result};
use csv::StringRecord;
use std::{num::ParseIntError, str::FromStr};

/// Columns this crate interprets, everything else is carried along untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Inode,
    ParentInode,
    Depth,
    Size,
    FileCount,
    DirSum,
}

impl Field {
    pub fn index(self) -> usize {
        match self {
            Field::Inode => 0,
            Field::ParentInode => 1,
            Field::Depth => 2,
            Field::Size => 7,
            Field::FileCount => 15,
            Field::DirSum => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Inode => "inode",
            Field::ParentInode => "parent-inode",
            Field::Depth => "directory-depth",
            Field::Size => "st_size",
            Field::FileCount => "pw_fcount",
            Field::DirSum => "pw_dirsum",
        }
    }
}

/// A row describing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub inode: u64,
    /// `None` for the row the walk started from (parent inode `0` on disk)
    pub parent: Option<u64>,
    /// The starting directory is reported at depth `-1`
    pub depth: i64,
    /// `st_size` of the directory entry itself. Only read for the root row, zero otherwise.
    pub size: u64,
    pub file_count: u64,
    pub dir_sum: u64,
}

impl DirectoryRecord {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Parses a single row, returning `None` for rows that do not describe a directory.
///
/// Only the file count column is looked at for non-directory rows.
pub fn parse_row(record: &StringRecord, line: u64) -> Result<Option<DirectoryRecord>> {
    let file_count: i64 = parse(record, line, Field::FileCount)?;
    if file_count < 0 {
        return Ok(None);
    }

    let inode = parse(record, line, Field::Inode)?;
    let parent = match parse::<u64>(record, line, Field::ParentInode)? {
        0 => None,
        parent => Some(parent),
    };
    let depth = parse(record, line, Field::Depth)?;
    let dir_sum = parse(record, line, Field::DirSum)?;
    let size = match parent {
        None => parse(record, line, Field::Size)?,
        Some(_) => 0,
    };

    Ok(Some(DirectoryRecord {
        inode,
        parent,
        depth,
        size,
        file_count: file_count as u64,
        dir_sum,
    }))
}

fn parse<T>(record: &StringRecord, line: u64, field: Field) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    let value = record
        .get(field.index())
        .ok_or(Error::MissingField { line, field })?;

    value
        .trim()
        .parse::<T>()
        .map_err(|source| Error::InvalidField {
            line,
            field,
            value: value.to_owned(),
            source,
        })
}
