//! Shaping the flat resource catalog into an application → module →
//! function tree with per-node grant flags.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;
use warden_core::models::resource::{NodeType, ResourceNode};

/// Maximum nesting followed when walking parents or building children.
/// Guards against cycles in corrupt catalog data.
const MAX_TREE_DEPTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    /// Granted nodes and the ancestors needed to reach them.
    Effective,
    /// The whole catalog, every node flagged.
    Editable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub node_type: NodeType,
    pub name: String,
    pub alias: String,
    pub granted: bool,
    pub children: Vec<PermissionNode>,
}

impl PermissionNode {
    /// Ids of this node and all its descendants, depth first.
    pub fn flatten(&self) -> Vec<Uuid> {
        let mut ids = vec![self.id];
        for child in &self.children {
            ids.extend(child.flatten());
        }
        ids
    }

    /// Ids of granted nodes in this subtree, depth first.
    pub fn granted_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        if self.granted {
            ids.push(self.id);
        }
        for child in &self.children {
            ids.extend(child.granted_ids());
        }
        ids
    }
}

struct Builder<'a> {
    nodes: HashMap<Uuid, &'a ResourceNode>,
    children: HashMap<Uuid, Vec<&'a ResourceNode>>,
    granted: &'a HashSet<Uuid>,
    keep: Option<HashSet<Uuid>>,
}

impl Builder<'_> {
    fn included(&self, id: Uuid) -> bool {
        self.keep.as_ref().is_none_or(|keep| keep.contains(&id))
    }

    fn build(&self, node: &ResourceNode, depth: usize) -> PermissionNode {
        let children = if depth >= MAX_TREE_DEPTH {
            Vec::new()
        } else {
            self.children
                .get(&node.id)
                .into_iter()
                .flatten()
                .filter(|child| self.included(child.id))
                .map(|child| self.build(child, depth + 1))
                .collect()
        };
        PermissionNode {
            id: node.id,
            parent_id: node.parent_id,
            node_type: node.node_type,
            name: node.name.clone(),
            alias: node.alias.clone(),
            granted: self.granted.contains(&node.id),
            children,
        }
    }

    /// Granted nodes plus every ancestor present in the catalog.
    fn granted_with_ancestors(&self) -> HashSet<Uuid> {
        let mut keep = HashSet::new();
        for id in self.granted {
            let mut current = self.nodes.get(id).copied();
            for _ in 0..MAX_TREE_DEPTH {
                let Some(node) = current else { break };
                if !keep.insert(node.id) {
                    break;
                }
                current = node.parent_id.and_then(|p| self.nodes.get(&p).copied());
            }
        }
        keep
    }
}

/// Build the permission tree for `catalog`.
///
/// Siblings are ordered by `sort_index`, then creation time. Nodes whose
/// parent is missing from `catalog` are unreachable and dropped.
pub fn build_tree(
    catalog: &[ResourceNode],
    granted: &HashSet<Uuid>,
    mode: TreeMode,
) -> Vec<PermissionNode> {
    let mut sorted: Vec<&ResourceNode> = catalog.iter().collect();
    sorted.sort_by(|a, b| {
        a.sort_index
            .cmp(&b.sort_index)
            .then(a.created_at.cmp(&b.created_at))
    });

    let mut builder = Builder {
        nodes: sorted.iter().map(|n| (n.id, *n)).collect(),
        children: HashMap::new(),
        granted,
        keep: None,
    };
    for node in &sorted {
        if let Some(parent_id) = node.parent_id {
            builder.children.entry(parent_id).or_default().push(*node);
        }
    }
    if mode == TreeMode::Effective {
        builder.keep = Some(builder.granted_with_ancestors());
    }

    sorted
        .iter()
        .filter(|n| n.node_type == NodeType::Application && n.parent_id.is_none())
        .filter(|n| builder.included(n.id))
        .map(|n| builder.build(n, 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn catalog() -> (Vec<ResourceNode>, [Uuid; 6]) {
        let ids = [(); 6].map(|_| Uuid::new_v4());
        let [crm, contacts, export, search, hr, payroll] = ids;
        let base = Utc::now();
        let node = |i: i64, id, app_id, parent_id, node_type, name: &str, sort_index| ResourceNode {
            id,
            app_id,
            parent_id,
            node_type,
            name: name.into(),
            alias: name.to_lowercase(),
            sort_index,
            created_at: base + Duration::seconds(i),
        };
        (
            vec![
                node(0, crm, crm, None, NodeType::Application, "CRM", 1),
                node(1, contacts, crm, Some(crm), NodeType::Module, "Contacts", 0),
                node(2, export, crm, Some(contacts), NodeType::Function, "Export", 2),
                node(3, search, crm, Some(contacts), NodeType::Function, "Search", 1),
                node(4, hr, hr, None, NodeType::Application, "HR", 0),
                node(5, payroll, hr, Some(hr), NodeType::Module, "Payroll", 0),
            ],
            ids,
        )
    }

    #[test]
    fn effective_tree_keeps_granted_nodes_and_their_ancestors() {
        let (catalog, [crm, contacts, export, _search, _hr, _payroll]) = catalog();
        let granted = HashSet::from([export]);

        let tree = build_tree(&catalog, &granted, TreeMode::Effective);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, crm);
        assert!(!tree[0].granted);
        assert_eq!(tree[0].flatten(), vec![crm, contacts, export]);
        assert_eq!(tree[0].granted_ids(), vec![export]);
    }

    #[test]
    fn editable_tree_lists_everything_in_sort_order() {
        let (catalog, [crm, contacts, export, search, hr, payroll]) = catalog();
        let granted = HashSet::from([search]);

        let tree = build_tree(&catalog, &granted, TreeMode::Editable);
        let roots: Vec<Uuid> = tree.iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![hr, crm]);
        assert_eq!(tree[0].flatten(), vec![hr, payroll]);
        assert_eq!(tree[1].flatten(), vec![crm, contacts, search, export]);
        assert_eq!(tree[1].granted_ids(), vec![search]);
    }

    #[test]
    fn nothing_granted_means_empty_effective_tree() {
        let (catalog, _) = catalog();
        assert!(build_tree(&catalog, &HashSet::new(), TreeMode::Effective).is_empty());
    }

    #[test]
    fn grants_outside_the_catalog_are_ignored() {
        let (catalog, _) = catalog();
        let granted = HashSet::from([Uuid::new_v4()]);
        assert!(build_tree(&catalog, &granted, TreeMode::Effective).is_empty());
        assert!(build_tree(&[], &granted, TreeMode::Editable).is_empty());
    }

    #[test]
    fn cyclic_parents_terminate() {
        let (mut catalog, [_, _, export, ..]) = catalog();
        // contacts <-> export
        catalog[1].parent_id = Some(export);
        let granted = HashSet::from([export]);
        let tree = build_tree(&catalog, &granted, TreeMode::Effective);
        assert!(tree.is_empty());
    }
}
