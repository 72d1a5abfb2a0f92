//! FILENAME: crosstab-engine/src/tree.rs
//! Tree Builder & Tree Sorter - Raw header forests from the primary slice.
//!
//! One pass over the primary slice grows a forest per axis: each row's
//! breakout values describe a root-to-leaf path, first-seen order. Collapse
//! marks are applied while building; explicit sort rules are applied
//! afterwards, one level at a time. Nodes are plain owned values mutated
//! through a single `&mut` cursor, never shared.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};

use resultset::Value;

use crate::error::PivotError;
use crate::settings::{SortDirection, SortRule, SortTarget};
use crate::subtotal::SubtotalIndex;

// ============================================================================
// AXIS NODES
// ============================================================================

/// A node in a raw axis forest: one distinct value at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisNode {
    pub value: Value,

    /// Next-level groups underneath this value.
    pub children: Vec<AxisNode>,

    /// Collapsed nodes keep their subtree (expanding is a settings change,
    /// not a rebuild of lost state) but render as a single position.
    pub is_collapsed: bool,
}

impl AxisNode {
    fn new(value: Value, is_collapsed: bool) -> Self {
        AxisNode {
            value,
            children: Vec::new(),
            is_collapsed,
        }
    }
}

// ============================================================================
// COLLAPSED SET
// ============================================================================

/// Parsed form of `PivotSettings::collapsed_subtotals`.
#[derive(Debug, Clone, Default)]
pub struct CollapsedSet {
    paths: FxHashSet<Vec<Value>>,
    depths: FxHashSet<usize>,
}

impl CollapsedSet {
    pub fn empty() -> Self {
        CollapsedSet::default()
    }

    /// Parses raw entries: a JSON integer collapses a whole depth, a JSON
    /// array collapses one subtree. Anything else is corrupt persisted
    /// state and fails fast.
    pub fn parse(entries: &[String]) -> Result<Self, PivotError> {
        let mut set = CollapsedSet::default();
        for raw in entries {
            if let Ok(depth) = serde_json::from_str::<usize>(raw) {
                set.depths.insert(depth);
                continue;
            }
            let path = serde_json::from_str::<Vec<Value>>(raw).map_err(|source| {
                PivotError::InvalidCollapsedPath {
                    raw: raw.clone(),
                    source,
                }
            })?;
            set.paths.insert(path);
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.depths.is_empty()
    }

    /// Whether this exact path is collapsed, by path or by depth
    /// (depth = path length, 1-based).
    pub fn contains(&self, path: &[Value]) -> bool {
        self.depths.contains(&path.len()) || self.paths.contains(path)
    }

    /// Whether the path or any of its ancestors is collapsed.
    pub fn covers(&self, path: &[Value]) -> bool {
        (1..=path.len()).any(|n| self.contains(&path[..n]))
    }
}

// ============================================================================
// TREE BUILDING
// ============================================================================

/// Grows an axis forest from the primary slice.
///
/// `positions` are the axis's breakout columns, outer to inner.
/// `sort_orders` holds each level's configured order; levels with one keep
/// themselves sorted as values arrive, all others preserve first-seen order.
pub fn build_axis_forest(
    rows: &[Vec<Value>],
    positions: &[usize],
    sort_orders: &[Option<SortDirection>],
    collapsed: &CollapsedSet,
) -> Vec<AxisNode> {
    let mut roots: Vec<AxisNode> = Vec::new();
    let mut prefix: Vec<Value> = Vec::with_capacity(positions.len());

    for row in rows {
        prefix.clear();
        let mut level = &mut roots;
        for (depth, &position) in positions.iter().enumerate() {
            let value = &row[position];
            prefix.push(value.clone());

            let idx = match level.iter().position(|n| n.value == *value) {
                Some(idx) => idx,
                None => {
                    level.push(AxisNode::new(value.clone(), collapsed.contains(&prefix)));
                    if let Some(direction) = sort_orders.get(depth).copied().flatten() {
                        sort_level_by_key(level, direction);
                        // The insert position moved; find the node again.
                        level
                            .iter()
                            .position(|n| n.value == *value)
                            .unwrap_or(level.len() - 1)
                    } else {
                        level.len() - 1
                    }
                }
            };
            level = &mut level[idx].children;
        }
    }

    roots
}

fn sort_level_by_key(level: &mut [AxisNode], direction: SortDirection) {
    level.sort_by(|a, b| directed(a.value.cmp(&b.value), direction));
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

// ============================================================================
// TREE SORTING
// ============================================================================

/// Applies explicit sort rules to the row forest, depth-first pre-order.
///
/// Each rule is keyed by the value path of the level's parent (empty for the
/// root level) and re-orders only that level's direct children.
pub fn apply_sort_rules(
    roots: &mut Vec<AxisNode>,
    rules: &FxHashMap<Vec<Value>, SortRule>,
    row_positions: &[usize],
    column_positions: &[usize],
    subtotals: &SubtotalIndex,
) {
    if rules.is_empty() {
        return;
    }
    let mut prefix: Vec<Value> = Vec::new();
    sort_forest(roots, &mut prefix, rules, row_positions, column_positions, subtotals);
}

fn sort_forest(
    level: &mut Vec<AxisNode>,
    prefix: &mut Vec<Value>,
    rules: &FxHashMap<Vec<Value>, SortRule>,
    row_positions: &[usize],
    column_positions: &[usize],
    subtotals: &SubtotalIndex,
) {
    if let Some(rule) = rules.get(prefix.as_slice()) {
        sort_level(level, prefix, rule, row_positions, column_positions, subtotals);
    }
    for node in level.iter_mut() {
        prefix.push(node.value.clone());
        sort_forest(
            &mut node.children,
            prefix,
            rules,
            row_positions,
            column_positions,
            subtotals,
        );
        prefix.pop();
    }
}

fn sort_level(
    level: &mut Vec<AxisNode>,
    prefix: &[Value],
    rule: &SortRule,
    row_positions: &[usize],
    column_positions: &[usize],
    subtotals: &SubtotalIndex,
) {
    match &rule.target {
        SortTarget::Key => sort_level_by_key(level, rule.direction),
        SortTarget::Measure {
            value_index,
            column_path,
        } => {
            // Decorate each sibling with its probed measure, sort, undecorate.
            let mut keyed: Vec<(Option<Value>, AxisNode)> = level
                .drain(..)
                .map(|node| {
                    let mut pairs: Vec<(usize, Value)> =
                        Vec::with_capacity(prefix.len() + 1 + column_path.len());
                    for (i, value) in prefix.iter().enumerate() {
                        pairs.push((row_positions[i], value.clone()));
                    }
                    pairs.push((row_positions[prefix.len()], node.value.clone()));
                    // A stale column path is probed only as far as the axis
                    // has columns.
                    for (value, &position) in column_path.iter().zip(column_positions) {
                        pairs.push((position, value.clone()));
                    }

                    let measure = subtotals
                        .lookup(pairs)
                        .and_then(|values| values.get(*value_index))
                        .cloned();
                    (measure, node)
                })
                .collect();

            keyed.sort_by(|(a, _), (b, _)| compare_measures(a, b, rule.direction));
            level.extend(keyed.into_iter().map(|(_, node)| node));
        }
    }
}

/// Groups with no pre-aggregated value sort after the rest in both
/// directions.
fn compare_measures(a: &Option<Value>, b: &Option<Value>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(b), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
