use crate::{
    error::{Error, Result},
    tree::{DirectoryNode, DirectoryTree},
};
use serde::Serialize;
use std::fmt::{self, Write};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Final state of a single directory, named after the scan's own columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub inode: u64,
    /// `0` for the root, as in the scan output
    pub parent: u64,
    pub depth: i64,
    pub file_count: u64,
    pub dir_sum: u64,
    pub total_count: u64,
    pub total_size: u64,
}

impl NodeReport {
    pub fn for_root(tree: &DirectoryTree) -> Self {
        Self::from(tree.root_node())
    }

    pub fn for_node(tree: &DirectoryTree, inode: u64) -> Result<Self> {
        tree.get(inode)
            .map(Self::from)
            .ok_or(Error::UnknownNode(inode))
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl From<&DirectoryNode> for NodeReport {
    fn from(node: &DirectoryNode) -> Self {
        Self {
            inode: node.id(),
            parent: node.parent().unwrap_or(0),
            depth: node.depth(),
            file_count: node.own().entries,
            dir_sum: node.own().bytes,
            total_count: node.aggregate().entries,
            total_size: node.aggregate().bytes,
        }
    }
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inode: {}", self.inode)?;
        writeln!(f, "parent: {}", self.parent)?;
        writeln!(f, "depth: {}", self.depth)?;
        writeln!(f, "file_count: {}", self.file_count)?;
        writeln!(f, "dir_sum: {}", self.dir_sum)?;
        writeln!(f, "total_count: {}", self.total_count)?;
        write!(f, "total_size: {}", self.total_size)
    }
}

/// Everything printed for a run: the directory count followed by one directory's report.
pub fn render_summary(
    tree: &DirectoryTree,
    report: &NodeReport,
    format: ReportFormat,
) -> Result<String> {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "Total directories: {}", tree.len());
    out.push_str(&report.render(format)?);
    out.push('\n');
    Ok(out)
}
