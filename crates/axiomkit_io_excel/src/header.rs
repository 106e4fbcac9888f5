//! Hierarchical header layout.
//!
//! Column title paths are folded into a prefix tree (one node per path
//! segment), then the tree is walked in pre-order to place every node in a
//! block of `max_depth` header rows:
//! - a leaf spans from its own depth row down to the bottom header row, one
//!   column wide, at its bound column index;
//! - a group spans one row at its own depth, across all of its leaves.

use std::collections::BTreeSet;

use crate::error::{ExcelError, ExcelResult};
use crate::spec::{SpecCellRegion, SpecColumn, SpecHeaderCell, SpecHeaderPlan};

////////////////////////////////////////////////////////////////////////////////
// #region HeaderTree

/// One title-path segment at a given depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNode {
    /// Segment text.
    pub text: String,
    /// Sum of descendant leaf widths (own effective width for leaves).
    pub width: u32,
    /// Zero-based depth; top-level nodes are at depth 0.
    pub depth: usize,
    /// Child nodes in first-insertion order.
    pub children: Vec<HeaderNode>,
    /// Bound column, set on leaves only.
    pub column: Option<SpecColumn>,
}

impl HeaderNode {
    fn new_group(text: &str) -> Self {
        Self {
            text: text.to_string(),
            width: 0,
            depth: 0,
            children: Vec::new(),
            column: None,
        }
    }

    fn new_leaf(text: &str, column: &SpecColumn) -> Self {
        Self {
            text: text.to_string(),
            width: 0,
            depth: 0,
            children: Vec::new(),
            column: Some(column.clone()),
        }
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaves in this subtree (1 for a leaf).
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.iter().map(HeaderNode::leaf_count).sum()
    }

    /// Group whose subtree holds exactly one leaf.
    pub fn is_single_child_chain(&self) -> bool {
        !self.is_leaf() && self.leaf_count() == 1
    }

    /// Bound column indices of all leaves in this subtree, in tree order.
    pub fn leaf_column_indices(&self) -> Vec<usize> {
        let mut l_indices = Vec::new();
        self.collect_leaf_column_indices(&mut l_indices);
        l_indices
    }

    fn collect_leaf_column_indices(&self, out: &mut Vec<usize>) {
        if let Some(column) = &self.column {
            out.push(column.index);
        }
        for child in &self.children {
            child.collect_leaf_column_indices(out);
        }
    }

    fn child_position(&self, text: &str) -> Option<usize> {
        self.children.iter().position(|node| node.text == text)
    }

    /// Second pass: assign depth top-down and width bottom-up.
    fn finalize(&mut self, depth: usize) -> u32 {
        self.depth = depth;
        if self.is_leaf() {
            self.width = self
                .column
                .as_ref()
                .map_or(0, SpecColumn::effective_width);
            return self.width;
        }
        self.width = self
            .children
            .iter_mut()
            .map(|child| child.finalize(depth + 1))
            .sum();
        self.width
    }

    fn max_leaf_depth(&self) -> usize {
        if self.is_leaf() {
            return self.depth;
        }
        self.children
            .iter()
            .map(HeaderNode::max_leaf_depth)
            .max()
            .unwrap_or(self.depth)
    }

    fn collect_pre_order<'a>(&'a self, out: &mut Vec<&'a HeaderNode>) {
        out.push(self);
        for child in &self.children {
            child.collect_pre_order(out);
        }
    }
}

/// Prefix tree over column title paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderTree {
    /// Top-level nodes in first-insertion order.
    pub roots: Vec<HeaderNode>,
}

impl HeaderTree {
    /// Build the tree from column declarations.
    ///
    /// Columns are folded in ascending index order. Fails on an empty title
    /// path, an empty segment, a duplicated leaf path, or a path that is both
    /// a leaf and a group.
    pub fn build(columns: &[SpecColumn]) -> ExcelResult<Self> {
        let mut l_columns: Vec<&SpecColumn> = columns.iter().collect();
        l_columns.sort_by_key(|column| column.index);
        if let Some(pair) = l_columns.windows(2).find(|pair| pair[0].index == pair[1].index) {
            return Err(ExcelError::Configuration(format!(
                "Columns {:?} and {:?} share column index {}.",
                pair[0].title, pair[1].title, pair[0].index
            )));
        }

        // Implicit root; its children become the top-level nodes.
        let mut root = HeaderNode::new_group("");
        for column in l_columns {
            insert_column(&mut root, column)?;
        }
        for node in &mut root.children {
            node.finalize(0);
        }

        Ok(Self {
            roots: root.children,
        })
    }

    /// Header block height: 1 + deepest leaf depth, or 0 when empty.
    pub fn max_depth(&self) -> usize {
        self.roots
            .iter()
            .map(|node| node.max_leaf_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order traversal (node, then all its descendants) of all top-level nodes.
    pub fn flatten(&self) -> Vec<&HeaderNode> {
        let mut l_nodes = Vec::new();
        for node in &self.roots {
            node.collect_pre_order(&mut l_nodes);
        }
        l_nodes
    }
}

fn insert_column(root: &mut HeaderNode, column: &SpecColumn) -> ExcelResult<()> {
    let Some((c_leaf, l_groups)) = column.title.split_last() else {
        return Err(ExcelError::Configuration(format!(
            "Column {} has an empty title path.",
            column.index
        )));
    };
    if let Some(n_pos) = column.title.iter().position(|seg| seg.trim().is_empty()) {
        return Err(ExcelError::Configuration(format!(
            "Column {} has an empty title segment at position {n_pos}.",
            column.index
        )));
    }

    let mut node = root;
    for c_group in l_groups {
        let n_pos = match node.child_position(c_group) {
            Some(n_pos) => n_pos,
            None => {
                node.children.push(HeaderNode::new_group(c_group));
                node.children.len() - 1
            }
        };
        node = &mut node.children[n_pos];
        if node.column.is_some() {
            return Err(ExcelError::Configuration(format!(
                "Column {} title {:?} nests under leaf {c_group:?}.",
                column.index, column.title
            )));
        }
    }

    if let Some(n_pos) = node.child_position(c_leaf) {
        let c_kind = if node.children[n_pos].column.is_some() {
            "duplicates another column's title"
        } else {
            "collides with a header group"
        };
        return Err(ExcelError::Configuration(format!(
            "Column {} title {:?} {c_kind}.",
            column.index, column.title
        )));
    }
    node.children.push(HeaderNode::new_leaf(c_leaf, column));
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderPlacement

/// Place header cells and derive merge regions for `columns`.
///
/// Regions are relative to the header block's first row; callers offset them
/// by the row where the header starts.
pub fn plan_header(columns: &[SpecColumn]) -> ExcelResult<SpecHeaderPlan> {
    let tree = HeaderTree::build(columns)?;
    let n_rows = tree.max_depth();
    if n_rows == 0 {
        return Ok(SpecHeaderPlan::default());
    }
    let n_row_last = n_rows - 1;

    let mut plan = SpecHeaderPlan {
        n_rows,
        ..SpecHeaderPlan::default()
    };

    for node in tree.flatten() {
        let region = derive_node_region(node, n_row_last)?;
        validate_region(&node.text, &region)?;

        if region.is_merge() {
            plan.merges.push(region);
        }
        if let Some(column) = &node.column {
            plan.widths.push((column.index, node.width));
        }
        plan.cells.push(SpecHeaderCell {
            text: node.text.clone(),
            region,
            column_index: node.column.as_ref().map(|column| column.index),
            comment: node.column.as_ref().and_then(|column| column.comment.clone()),
        });
    }

    validate_regions_disjoint(&plan.cells)?;
    Ok(plan)
}

/// Occupied block of one node, decided by its depth, leaf count and chain shape.
fn derive_node_region(node: &HeaderNode, n_row_last: usize) -> ExcelResult<SpecCellRegion> {
    if let Some(column) = &node.column {
        return Ok(SpecCellRegion {
            first_row: node.depth,
            last_row: n_row_last,
            first_col: column.index,
            last_col: column.index,
        });
    }

    let l_indices = node.leaf_column_indices();
    let (Some(n_col_first), Some(n_col_last)) =
        (l_indices.iter().min().copied(), l_indices.iter().max().copied())
    else {
        return Err(ExcelError::Layout(format!(
            "Header group {:?} has no leaf column.",
            node.text
        )));
    };
    if n_col_last - n_col_first + 1 != node.leaf_count() {
        return Err(ExcelError::Configuration(format!(
            "Header group {:?} spans non-contiguous columns {l_indices:?}.",
            node.text
        )));
    }

    // A single-child chain keeps one row: its only leaf already reaches the
    // bottom row, so stretching the group would overlap the leaf.
    debug_assert!(node.is_single_child_chain() == (n_col_first == n_col_last));
    Ok(SpecCellRegion {
        first_row: node.depth,
        last_row: node.depth,
        first_col: n_col_first,
        last_col: n_col_last,
    })
}

fn validate_region(text: &str, region: &SpecCellRegion) -> ExcelResult<()> {
    debug_assert!(region.first_row <= region.last_row);
    debug_assert!(region.first_col <= region.last_col);
    if region.last_row < region.first_row || region.last_col < region.first_col {
        return Err(ExcelError::Layout(format!(
            "Header cell {text:?} has an inverted region {region:?}."
        )));
    }
    Ok(())
}

fn validate_regions_disjoint(cells: &[SpecHeaderCell]) -> ExcelResult<()> {
    let mut set_occupied: BTreeSet<(usize, usize)> = BTreeSet::new();
    for cell in cells {
        let region = cell.region;
        for n_row in region.first_row..=region.last_row {
            for n_col in region.first_col..=region.last_col {
                if !set_occupied.insert((n_row, n_col)) {
                    return Err(ExcelError::Layout(format!(
                        "Header cell {:?} overlaps another header cell at ({n_row}, {n_col}).",
                        cell.text
                    )));
                }
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
