//! Batched graph mutation
//!
//! [`update_graph`] removes nodes by name, splices in replacement nodes and
//! registers value-info, all or nothing. Every check runs against the
//! unmodified graph; the node list is only replaced once the new order is
//! known to be a valid topological order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{OnnxResult, TransformError};
use crate::proto::{GraphProto, NodeProto, ValueInfoProto};

/// Consumer name reported when a graph output dangles
pub const GRAPH_OUTPUT_CONSUMER: &str = "<graph output>";

/// What an update changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Nodes removed
    pub nodes_removed: usize,
    /// Nodes added
    pub nodes_added: usize,
    /// Value-info entries added or replaced
    pub value_infos_added: usize,
    /// Value-info entries dropped with the tensors of removed nodes
    pub value_infos_pruned: usize,
    /// Whether the added nodes had to be moved to restore topological order
    pub reordered: bool,
}

/// Checked, not yet applied, update
struct UpdatePlan {
    /// Per original position: is the node removed
    removed: Vec<bool>,
    /// New order as indices into `survivors ++ added`
    order: Vec<usize>,
    /// Tensors of removed nodes that nothing produces any more
    dropped: FxHashSet<String>,
}

/// Apply one edit to `graph`
///
/// - every name in `remove` must name exactly one existing node, listed once;
/// - added node names and outputs must not collide with surviving nodes or
///   each other;
/// - tensors produced by removed nodes that are still read (by a surviving
///   node, an added node or a graph output) must be produced by an added node;
/// - each added node is placed right before the first surviving node that
///   needs it (directly or through other added nodes), the rest go last in
///   the given order, and surviving nodes keep their relative order;
/// - if an added node reads a tensor produced by a surviving node placed
///   after one of its consumers, no such splice exists and the whole list is
///   sorted with a stable topological sort instead;
/// - value-info for tensors that no longer have a producer is dropped.
///
/// On error the graph is untouched. An empty edit is the identity.
pub fn update_graph(
    graph: &mut GraphProto,
    remove: &[String],
    add: Vec<NodeProto>,
    value_infos: Vec<ValueInfoProto>,
) -> OnnxResult<UpdateStats> {
    if remove.is_empty() && add.is_empty() && value_infos.is_empty() {
        return Ok(UpdateStats::default());
    }

    let plan = plan_update(graph, remove, &add)?;

    let mut stats = UpdateStats {
        nodes_removed: plan.removed.iter().filter(|&&r| r).count(),
        nodes_added: add.len(),
        value_infos_added: value_infos.len(),
        value_infos_pruned: 0,
        reordered: plan.order.iter().enumerate().any(|(i, &o)| i != o),
    };

    let mut combined: Vec<Option<NodeProto>> = std::mem::take(&mut graph.node)
        .into_iter()
        .zip(&plan.removed)
        .filter(|&(_, &removed)| !removed)
        .map(|(node, _)| Some(node))
        .chain(add.into_iter().map(Some))
        .collect();
    graph.node = plan
        .order
        .iter()
        .filter_map(|&i| combined[i].take())
        .collect();

    let before = graph.value_info.len();
    graph.value_info.retain(|v| !plan.dropped.contains(&v.name));
    stats.value_infos_pruned = before - graph.value_info.len();

    for vi in value_infos {
        match graph.value_info.iter_mut().find(|v| v.name == vi.name) {
            Some(existing) => *existing = vi,
            None => graph.value_info.push(vi),
        }
    }

    if stats.reordered {
        debug!(nodes = graph.node.len(), "restored topological order");
    }
    Ok(stats)
}

fn plan_update(graph: &GraphProto, remove: &[String], add: &[NodeProto]) -> OnnxResult<UpdatePlan> {
    // Removal set
    let mut removal: IndexSet<&str> = IndexSet::with_capacity(remove.len());
    for name in remove {
        if !removal.insert(name.as_str()) {
            return Err(TransformError::MutationConflict(name.clone()));
        }
    }

    let existing: FxHashSet<&str> = graph
        .node
        .iter()
        .filter(|n| !n.name.is_empty())
        .map(|n| n.name.as_str())
        .collect();
    if let Some(missing) = removal.iter().find(|name| !existing.contains(*name)) {
        return Err(TransformError::NodeNotFound(missing.to_string()));
    }

    let removed: Vec<bool> = graph
        .node
        .iter()
        .map(|n| !n.name.is_empty() && removal.contains(n.name.as_str()))
        .collect();

    let survivors: Vec<&NodeProto> = graph
        .node
        .iter()
        .zip(&removed)
        .filter(|&(_, &r)| !r)
        .map(|(n, _)| n)
        .collect();

    // Names and outputs of the resulting node list
    let mut names: FxHashSet<&str> = survivors
        .iter()
        .filter(|n| !n.name.is_empty())
        .map(|n| n.name.as_str())
        .collect();
    let mut producers: FxHashMap<&str, usize> = FxHashMap::default();
    for (idx, node) in survivors.iter().enumerate() {
        for output in node.output.iter().filter(|o| !o.is_empty()) {
            producers.entry(output.as_str()).or_insert(idx);
        }
    }

    for (offset, node) in add.iter().enumerate() {
        if !node.name.is_empty() && !names.insert(&node.name) {
            return Err(TransformError::DuplicateNodeName(node.name.clone()));
        }
        for output in node.output.iter().filter(|o| !o.is_empty()) {
            if producers.insert(output, survivors.len() + offset).is_some() {
                return Err(TransformError::DuplicateOutput {
                    output: output.clone(),
                    node: node.name.clone(),
                });
            }
        }
    }

    // Boundary tensors must still be produced
    let orphaned: FxHashSet<&str> = graph
        .node
        .iter()
        .zip(&removed)
        .filter(|&(_, &r)| r)
        .flat_map(|(n, _)| &n.output)
        .map(String::as_str)
        .filter(|o| !o.is_empty() && !producers.contains_key(o))
        .collect();

    let all_nodes: Vec<&NodeProto> = survivors.iter().copied().chain(add).collect();
    if !orphaned.is_empty() {
        for node in &all_nodes {
            if let Some(tensor) = node.input.iter().find(|i| orphaned.contains(i.as_str())) {
                return Err(TransformError::DanglingReference {
                    tensor: tensor.clone(),
                    consumer: node.name.clone(),
                });
            }
        }
        if let Some(output) = graph
            .output
            .iter()
            .find(|o| orphaned.contains(o.name.as_str()))
        {
            return Err(TransformError::DanglingReference {
                tensor: output.name.clone(),
                consumer: GRAPH_OUTPUT_CONSUMER.to_string(),
            });
        }
    }

    let deps = dependencies(&all_nodes, &producers);
    let order = match splice_order(&deps, survivors.len()) {
        Some(order) => order,
        None => stable_topological_order(&deps)?,
    };

    Ok(UpdatePlan {
        removed,
        order,
        dropped: orphaned.into_iter().map(str::to_string).collect(),
    })
}

/// Distinct producer indices of each node's inputs
fn dependencies(nodes: &[&NodeProto], producers: &FxHashMap<&str, usize>) -> Vec<Vec<usize>> {
    nodes
        .iter()
        .map(|node| {
            let mut deps: Vec<usize> = Vec::new();
            for input in node.input.iter().filter(|i| !i.is_empty()) {
                if let Some(&producer) = producers.get(input.as_str()) {
                    if !deps.contains(&producer) {
                        deps.push(producer);
                    }
                }
            }
            deps
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Survivors in their current order, each preceded by the added nodes it
/// needs; leftover added nodes last
///
/// `None` when that would need a survivor to move or the nodes form a cycle.
fn splice_order(deps: &[Vec<usize>], survivors: usize) -> Option<Vec<usize>> {
    let mut state = vec![Visit::New; deps.len()];
    let mut order = Vec::with_capacity(deps.len());
    for idx in 0..deps.len() {
        place(idx, deps, survivors, &mut state, &mut order)?;
    }
    Some(order)
}

fn place(
    idx: usize,
    deps: &[Vec<usize>],
    survivors: usize,
    state: &mut [Visit],
    order: &mut Vec<usize>,
) -> Option<()> {
    match state[idx] {
        Visit::Done => return Some(()),
        Visit::Active => return None,
        Visit::New => {}
    }
    state[idx] = Visit::Active;
    for &dep in &deps[idx] {
        // pulling a survivor forward would reorder survivors
        if dep < survivors && state[dep] != Visit::Done {
            return None;
        }
        place(dep, deps, survivors, state, order)?;
    }
    state[idx] = Visit::Done;
    order.push(idx);
    Some(())
}

/// Kahn's algorithm, always picking the ready node with the lowest index
///
/// An already valid order is returned unchanged.
fn stable_topological_order(deps: &[Vec<usize>]) -> OnnxResult<Vec<usize>> {
    let mut in_degree: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); deps.len()];
    for (idx, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            dependents[dep].push(idx);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(deps.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != deps.len() {
        return Err(TransformError::CycleDetected(deps.len() - order.len()));
    }

    Ok(order)
}
