//! FILENAME: crosstab-engine/src/header.rs
//! Header Formatter - From raw axis forests to renderable header bands.
//!
//! Raw forests hold unformatted values. This module turns them into display
//! forests (formatted labels, click payloads, totals entries, measure-name
//! leaves) and flattens those into positioned [`HeaderItem`]s:
//! - Format every value once per column, memoized
//! - Insert "Totals for X" siblings and the grand total entry
//! - Replace collapsed subtrees with their subtotal
//! - Attach one leaf per measure when more than one is shown
//! - Flatten depth-first into items with leaf offsets and spans

use rustc_hash::FxHashMap;

use resultset::{ColumnSpec, Value};

use crate::engine::RenderHooks;
use crate::settings::{ColumnSettings, SortDirection, SortRule, SortTarget};
use crate::tree::AxisNode;
use crate::view::{ClickDescriptor, HeaderItem};

// ============================================================================
// LABELS
// ============================================================================

/// Label of the grand total entry on the row axis.
pub const GRAND_TOTALS_LABEL: &str = "Grand totals";

/// Label of the grand total entry on the column axis.
pub const ROW_TOTALS_LABEL: &str = "Row totals";

// ============================================================================
// DISPLAY NODES
// ============================================================================

/// A formatted header tree node, ready for flattening.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisplayNode {
    /// The raw group value. Totals and measure names have none.
    pub raw_value: Option<Value>,

    /// Formatted display text.
    pub label: String,

    pub children: Vec<DisplayNode>,

    /// Value path from the root. Subtotals keep their group's path;
    /// grand totals and measure names have none.
    pub path: Option<Vec<Value>>,

    pub is_subtotal: bool,
    pub is_grand_total: bool,
    pub is_collapsed: bool,
    pub is_value_column: bool,

    /// Active sort direction, shown on measure-name leaves.
    pub sort_state: Option<SortDirection>,

    pub clicked: Option<ClickDescriptor>,
}

impl DisplayNode {
    fn new(raw_value: Option<Value>, label: String) -> Self {
        DisplayNode {
            raw_value,
            label,
            children: Vec::new(),
            path: None,
            is_subtotal: false,
            is_grand_total: false,
            is_collapsed: false,
            is_value_column: false,
            sort_state: None,
            clicked: None,
        }
    }

    /// Creates a measure-name leaf.
    pub(crate) fn measure(label: impl Into<String>) -> Self {
        let mut node = DisplayNode::new(None, label.into());
        node.is_value_column = true;
        node
    }
}

// ============================================================================
// VALUE FORMATTING
// ============================================================================

/// Formats one column's values through the render hooks, memoized.
///
/// Axis values repeat heavily (every row of the primary slice revisits the
/// outer levels), so each distinct value is formatted once. The column's
/// resolved settings are captured up front.
pub(crate) struct MemoFormatter<'a> {
    hooks: &'a dyn RenderHooks,
    settings: ColumnSettings,
    cache: FxHashMap<Value, String>,
}

impl<'a> MemoFormatter<'a> {
    pub(crate) fn new(hooks: &'a dyn RenderHooks, settings: ColumnSettings) -> Self {
        MemoFormatter {
            hooks,
            settings,
            cache: FxHashMap::default(),
        }
    }

    pub(crate) fn format(&mut self, value: &Value) -> String {
        if let Some(label) = self.cache.get(value) {
            return label.clone();
        }
        let label = self.hooks.format_value(value, &self.settings);
        self.cache.insert(value.clone(), label.clone());
        label
    }
}

/// Formats a raw axis forest into a display forest.
///
/// `columns` and `formatters` run outer to inner, one per axis level. Each
/// group node gets a formatted label, its value path, and a header click
/// payload.
pub(crate) fn format_forest(
    nodes: Vec<AxisNode>,
    columns: &[ColumnSpec],
    formatters: &mut [MemoFormatter<'_>],
) -> Vec<DisplayNode> {
    let mut prefix = Vec::new();
    format_nodes(nodes, columns, formatters, &mut prefix)
}

fn format_nodes(
    nodes: Vec<AxisNode>,
    columns: &[ColumnSpec],
    formatters: &mut [MemoFormatter<'_>],
    prefix: &mut Vec<Value>,
) -> Vec<DisplayNode> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let Some((column, deeper_columns)) = columns.split_first() else {
        return Vec::new();
    };
    let Some((formatter, deeper_formatters)) = formatters.split_first_mut() else {
        return Vec::new();
    };

    nodes
        .into_iter()
        .map(|raw| {
            let label = formatter.format(&raw.value);
            prefix.push(raw.value.clone());
            let path = prefix.clone();
            let children =
                format_nodes(raw.children, deeper_columns, deeper_formatters, prefix);
            prefix.pop();

            let mut node = DisplayNode::new(Some(raw.value.clone()), label);
            node.children = children;
            node.path = Some(path.clone());
            node.is_collapsed = raw.is_collapsed;
            node.clicked = Some(ClickDescriptor::Header {
                column: column.name.clone(),
                value: raw.value,
                path,
            });
            node
        })
        .collect()
}

// ============================================================================
// SUBTOTALS
// ============================================================================

/// Inserts "Totals for X" siblings throughout a display forest.
///
/// `show_by_level` holds each level's per-column totals toggle.
/// A root earns a subtotal when it has multiple children, or when any
/// sibling root does; deeper groups only when they themselves have multiple
/// children. When a forest is one single-child chain per root there is
/// nothing to total, so no entries appear at all.
pub(crate) fn add_subtotals(
    roots: Vec<DisplayNode>,
    show_by_level: &[bool],
    totals_on_top: bool,
) -> Vec<DisplayNode> {
    let not_flat = roots.iter().any(|root| root.children.len() > 1);
    roots
        .into_iter()
        .flat_map(|root| {
            let wanted = root.children.len() > 1 || not_flat;
            add_subtotal(root, show_by_level, wanted, totals_on_top)
        })
        .collect()
}

fn add_subtotal(
    mut node: DisplayNode,
    show_by_level: &[bool],
    wanted: bool,
    totals_on_top: bool,
) -> Vec<DisplayNode> {
    let enabled = show_by_level.first().copied().unwrap_or(true);
    let subtotal = (wanted && enabled).then(|| {
        let mut entry = DisplayNode::new(
            node.raw_value.clone(),
            format!("Totals for {}", node.label),
        );
        entry.path = node.path.clone();
        entry.is_subtotal = true;
        entry.is_collapsed = node.is_collapsed;
        entry
    });

    // A collapsed group renders as its subtotal alone. With the subtotal
    // disabled there is nothing left to show for it.
    if node.is_collapsed {
        return subtotal.into_iter().collect();
    }

    let deeper = show_by_level.get(1..).unwrap_or(&[]);
    let mut children = Vec::with_capacity(node.children.len());
    for child in std::mem::take(&mut node.children) {
        if child.children.is_empty() {
            children.push(child);
        } else {
            let wanted = child.children.len() > 1;
            children.extend(add_subtotal(child, deeper, wanted, totals_on_top));
        }
    }
    node.children = children;

    let mut out = Vec::with_capacity(2);
    if totals_on_top {
        out.extend(subtotal);
        out.push(node);
    } else {
        out.push(node);
        out.extend(subtotal);
    }
    out
}

// ============================================================================
// GRAND TOTALS
// ============================================================================

/// Appends (or, for totals-on-top, prepends) the grand total entry.
pub(crate) fn add_grand_total(roots: &mut Vec<DisplayNode>, label: &str, on_top: bool) {
    let mut node = DisplayNode::new(None, label.to_string());
    node.is_subtotal = true;
    node.is_grand_total = true;
    if on_top {
        roots.insert(0, node);
    } else {
        roots.push(node);
    }
}

// ============================================================================
// LEAF PATHS
// ============================================================================

/// Collects every leaf's value path, in render order.
///
/// Runs after totals are inserted and before measure leaves are attached:
/// subtotal leaves contribute their short group path, the grand total entry
/// contributes nothing (its empty path is appended by the caller).
pub(crate) fn enumerate_leaf_paths(roots: &[DisplayNode]) -> Vec<Vec<Value>> {
    let mut paths = Vec::new();
    for root in roots {
        collect_paths(root, &mut paths);
    }
    paths
}

fn collect_paths(node: &DisplayNode, paths: &mut Vec<Vec<Value>>) {
    if node.is_grand_total {
        return;
    }
    if node.children.is_empty() {
        paths.push(node.path.clone().unwrap_or_default());
        return;
    }
    for child in &node.children {
        collect_paths(child, paths);
    }
}

// ============================================================================
// VALUE COLUMNS
// ============================================================================

/// Attaches measure-name leaves to a display forest.
///
/// With a single measure and a non-empty forest the headers already say
/// everything, so the forest is returned untouched. With several measures
/// every leaf (totals included) gets one child per measure. An empty forest
/// becomes the measure leaves themselves, even for a single measure.
///
/// `root_rule` is the top-level sort rule; a measure leaf whose ordinal and
/// column path match it carries the active direction.
pub(crate) fn add_value_nodes(
    roots: Vec<DisplayNode>,
    measures: &[DisplayNode],
    root_rule: Option<&SortRule>,
) -> Vec<DisplayNode> {
    if roots.is_empty() {
        return measures
            .iter()
            .enumerate()
            .map(|(ordinal, measure)| {
                let mut leaf = measure.clone();
                leaf.sort_state = sort_state_for(root_rule, ordinal, &[]);
                leaf
            })
            .collect();
    }
    if measures.len() <= 1 {
        return roots;
    }
    roots
        .into_iter()
        .map(|root| attach_measures(root, measures, root_rule))
        .collect()
}

fn attach_measures(
    mut node: DisplayNode,
    measures: &[DisplayNode],
    root_rule: Option<&SortRule>,
) -> DisplayNode {
    if node.children.is_empty() {
        let leaf_path = node.path.as_deref().unwrap_or(&[]);
        node.children = measures
            .iter()
            .enumerate()
            .map(|(ordinal, measure)| {
                let mut leaf = measure.clone();
                leaf.sort_state = sort_state_for(root_rule, ordinal, leaf_path);
                leaf
            })
            .collect();
        return node;
    }
    node.children = std::mem::take(&mut node.children)
        .into_iter()
        .map(|child| attach_measures(child, measures, root_rule))
        .collect();
    node
}

fn sort_state_for(
    rule: Option<&SortRule>,
    ordinal: usize,
    leaf_path: &[Value],
) -> Option<SortDirection> {
    let rule = rule?;
    match &rule.target {
        SortTarget::Measure {
            value_index,
            column_path,
        } if *value_index == ordinal && column_path == leaf_path => Some(rule.direction),
        _ => None,
    }
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens a display forest into positioned header items, depth-first,
/// parents before children. Offsets and spans are in leaf units.
pub(crate) fn flatten_forest(roots: &[DisplayNode]) -> Vec<HeaderItem> {
    let mut items = Vec::new();
    let mut offset = 0;
    for root in roots {
        let (span, _) = flatten_node(root, 0, offset, &mut items);
        offset += span;
    }
    items
}

fn flatten_node(
    node: &DisplayNode,
    depth: usize,
    offset: usize,
    items: &mut Vec<HeaderItem>,
) -> (usize, usize) {
    let index = items.len();
    items.push(HeaderItem {
        depth,
        offset,
        span: 1,
        max_depth_below: 0,
        path: node.path.clone(),
        raw_value: node.raw_value.clone(),
        label: node.label.clone(),
        has_children: !node.children.is_empty(),
        is_subtotal: node.is_subtotal,
        is_grand_total: node.is_grand_total,
        is_collapsed: node.is_collapsed,
        sort_state: node.sort_state,
        clicked: node.clicked.clone(),
    });
    if node.children.is_empty() {
        return (1, 0);
    }

    let mut span = 0;
    let mut max_below = 0;
    let mut child_offset = offset;
    for child in &node.children {
        let (child_span, child_below) = flatten_node(child, depth + 1, child_offset, items);
        span += child_span;
        child_offset += child_span;
        max_below = max_below.max(child_below + 1);
    }
    items[index].span = span;
    items[index].max_depth_below = max_below;
    (span, max_below)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SortDirection, SortRule, SortTarget};

    fn create_test_node(label: &str, children: Vec<DisplayNode>) -> DisplayNode {
        create_test_node_at(label, &[], children)
    }

    fn create_test_node_at(
        label: &str,
        parent_path: &[Value],
        children: Vec<DisplayNode>,
    ) -> DisplayNode {
        let value = Value::text(label);
        let mut path = parent_path.to_vec();
        path.push(value.clone());
        let mut node = DisplayNode::new(Some(value), label.to_string());
        node.path = Some(path);
        node.children = children;
        node
    }

    fn labels(nodes: &[DisplayNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn test_subtotal_follows_multi_child_group() {
        let a = Value::text("A");
        let roots = vec![
            create_test_node(
                "A",
                vec![
                    create_test_node_at("X", &[a.clone()], vec![]),
                    create_test_node_at("Y", &[a.clone()], vec![]),
                ],
            ),
            create_test_node("B", vec![create_test_node_at("X", &[Value::text("B")], vec![])]),
        ];

        let result = add_subtotals(roots, &[true, true], false);
        assert_eq!(
            labels(&result),
            vec!["A", "Totals for A", "B", "Totals for B"]
        );

        let totals = &result[1];
        assert!(totals.is_subtotal);
        assert!(!totals.is_grand_total);
        assert_eq!(totals.raw_value, Some(Value::text("A")));
        // Subtotals keep the group's own path.
        assert_eq!(totals.path, Some(vec![Value::text("A")]));
    }

    #[test]
    fn test_single_child_roots_sprout_totals_when_any_sibling_branches() {
        // "B" has one child, but "A" branches, so B still gets a subtotal.
        let roots = vec![
            create_test_node(
                "A",
                vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
            ),
            create_test_node("B", vec![create_test_node("X", vec![])]),
        ];
        let result = add_subtotals(roots, &[true, true], false);
        assert!(result.iter().any(|n| n.label == "Totals for B"));
    }

    #[test]
    fn test_all_single_child_roots_skip_totals() {
        let roots = vec![
            create_test_node("A", vec![create_test_node("X", vec![])]),
            create_test_node("B", vec![create_test_node("X", vec![])]),
        ];
        let result = add_subtotals(roots, &[true, true], false);
        assert_eq!(labels(&result), vec!["A", "B"]);
    }

    #[test]
    fn test_deeper_levels_require_multiple_children() {
        // A -> X -> {1, 2}; A -> Y -> {1}. X branches, Y does not.
        let roots = vec![create_test_node(
            "A",
            vec![
                create_test_node(
                    "X",
                    vec![create_test_node("1", vec![]), create_test_node("2", vec![])],
                ),
                create_test_node("Y", vec![create_test_node("1", vec![])]),
            ],
        )];
        let result = add_subtotals(roots, &[true, true, true], false);

        let a = &result[0];
        assert_eq!(labels(&a.children), vec!["X", "Totals for X", "Y"]);
    }

    #[test]
    fn test_per_level_toggle_suppresses_subtotals() {
        let roots = vec![
            create_test_node(
                "A",
                vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
            ),
            create_test_node("B", vec![create_test_node("X", vec![])]),
        ];
        let result = add_subtotals(roots, &[false, true], false);
        assert_eq!(labels(&result), vec!["A", "B"]);
    }

    #[test]
    fn test_collapsed_group_reduces_to_its_subtotal() {
        let mut a = create_test_node(
            "A",
            vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
        );
        a.is_collapsed = true;
        let roots = vec![a, create_test_node("B", vec![create_test_node("X", vec![])])];

        let result = add_subtotals(roots, &[true, true], false);
        assert_eq!(labels(&result), vec!["Totals for A", "B", "Totals for B"]);
        assert!(result[0].is_collapsed, "stand-in advertises expandability");
        assert!(result[0].children.is_empty());
    }

    #[test]
    fn test_collapsed_group_without_subtotal_vanishes() {
        let mut a = create_test_node(
            "A",
            vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
        );
        a.is_collapsed = true;
        let roots = vec![a, create_test_node("B", vec![create_test_node("X", vec![])])];

        let result = add_subtotals(roots, &[false, true], false);
        assert_eq!(labels(&result), vec!["B"]);
    }

    #[test]
    fn test_totals_on_top_precede_their_group() {
        let roots = vec![
            create_test_node(
                "A",
                vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
            ),
            create_test_node("B", vec![create_test_node("X", vec![])]),
        ];
        let result = add_subtotals(roots, &[true, true], true);
        assert_eq!(
            labels(&result),
            vec!["Totals for A", "A", "Totals for B", "B"]
        );
    }

    #[test]
    fn test_grand_total_placement() {
        let mut roots = vec![create_test_node("A", vec![])];
        add_grand_total(&mut roots, GRAND_TOTALS_LABEL, false);
        assert_eq!(labels(&roots), vec!["A", "Grand totals"]);
        assert!(roots[1].is_grand_total);
        assert!(roots[1].is_subtotal);
        assert_eq!(roots[1].path, None);

        let mut roots = vec![create_test_node("A", vec![])];
        add_grand_total(&mut roots, GRAND_TOTALS_LABEL, true);
        assert_eq!(labels(&roots), vec!["Grand totals", "A"]);
    }

    #[test]
    fn test_leaf_paths_in_render_order() {
        let a = Value::text("A");
        let roots = vec![
            create_test_node(
                "A",
                vec![
                    create_test_node_at("X", &[a.clone()], vec![]),
                    create_test_node_at("Y", &[a.clone()], vec![]),
                ],
            ),
            create_test_node("B", vec![create_test_node_at("X", &[Value::text("B")], vec![])]),
        ];
        let mut roots = add_subtotals(roots, &[true, true], false);
        add_grand_total(&mut roots, GRAND_TOTALS_LABEL, false);

        let paths = enumerate_leaf_paths(&roots);
        assert_eq!(
            paths,
            vec![
                vec![Value::text("A"), Value::text("X")],
                vec![Value::text("A"), Value::text("Y")],
                vec![Value::text("A")], // subtotal's short path
                vec![Value::text("B"), Value::text("X")],
                vec![Value::text("B")],
            ]
        );
    }

    #[test]
    fn test_value_nodes_attach_under_every_leaf() {
        let roots = vec![
            create_test_node(
                "A",
                vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
            ),
            create_test_node("B", vec![]),
        ];
        let measures = vec![DisplayNode::measure("Count"), DisplayNode::measure("Sum")];
        let result = add_value_nodes(roots, &measures, None);

        assert_eq!(labels(&result[0].children[0].children), vec!["Count", "Sum"]);
        assert_eq!(labels(&result[1].children), vec!["Count", "Sum"]);
        assert!(result[1].children[0].is_value_column);
    }

    #[test]
    fn test_single_measure_leaves_forest_untouched() {
        let roots = vec![create_test_node("A", vec![])];
        let measures = vec![DisplayNode::measure("Count")];
        let result = add_value_nodes(roots, &measures, None);
        assert!(result[0].children.is_empty());
    }

    #[test]
    fn test_empty_forest_becomes_measure_roots() {
        let measures = vec![DisplayNode::measure("Count")];
        let result = add_value_nodes(Vec::new(), &measures, None);
        assert_eq!(labels(&result), vec!["Count"]);
    }

    #[test]
    fn test_sorted_measure_leaf_carries_direction() {
        let roots = vec![create_test_node("A", vec![]), create_test_node("B", vec![])];
        let measures = vec![DisplayNode::measure("Count"), DisplayNode::measure("Sum")];
        let rule = SortRule {
            target: SortTarget::Measure {
                value_index: 1,
                column_path: vec![Value::text("A")],
            },
            direction: SortDirection::Descending,
        };
        let result = add_value_nodes(roots, &measures, Some(&rule));

        assert_eq!(result[0].children[0].sort_state, None);
        assert_eq!(
            result[0].children[1].sort_state,
            Some(SortDirection::Descending)
        );
        // Same measure under a different column leaf stays unmarked.
        assert_eq!(result[1].children[1].sort_state, None);
    }

    #[test]
    fn test_flatten_assigns_offsets_and_spans() {
        let roots = vec![
            create_test_node(
                "A",
                vec![create_test_node("X", vec![]), create_test_node("Y", vec![])],
            ),
            create_test_node("B", vec![create_test_node("Z", vec![])]),
        ];
        let items = flatten_forest(&roots);

        let by_label: Vec<(&str, usize, usize, usize, usize)> = items
            .iter()
            .map(|i| (i.label.as_str(), i.depth, i.offset, i.span, i.max_depth_below))
            .collect();
        assert_eq!(
            by_label,
            vec![
                ("A", 0, 0, 2, 1),
                ("X", 1, 0, 1, 0),
                ("Y", 1, 1, 1, 0),
                ("B", 0, 2, 1, 1),
                ("Z", 1, 2, 1, 0),
            ]
        );

        // Root spans account for every leaf exactly once.
        let root_span: usize = items.iter().filter(|i| i.depth == 0).map(|i| i.span).sum();
        let leaf_count = items.iter().filter(|i| !i.has_children).count();
        assert_eq!(root_span, leaf_count);
    }

    #[test]
    fn test_flatten_empty_forest() {
        assert!(flatten_forest(&[]).is_empty());
    }
}
