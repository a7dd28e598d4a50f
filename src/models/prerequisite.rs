use serde::{Deserialize, Serialize};

/// Game item identifier.
pub type ItemId = u32;

/// Path from a gearpiece root to one of its nodes, as child indices.
///
/// The empty path addresses the root itself.
pub type NodePath = [usize];

/// One node of a prerequisite tree.
///
/// Every node carries the derived `collected` flag and an independent manual
/// `locked` flag. While `locked` is set, resolution never writes `collected`
/// (nor, for atoms, `owned`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteNode {
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// The shape of a prerequisite node.
///
/// - `Atom`: one concrete item in a required quantity
/// - `AllOf`: every child is needed (e.g. an upgrade token plus the base piece)
/// - `OneOf`: alternative acquisition paths for the same requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Atom {
        item_id: ItemId,
        required: u32,
        /// Quantity observed in tracked inventories at the last resolve.
        #[serde(default)]
        owned: u32,
    },
    AllOf {
        children: Vec<PrerequisiteNode>,
    },
    OneOf {
        children: Vec<PrerequisiteNode>,
        /// Index of the alternative shown as "the" path.
        #[serde(default)]
        active: Option<usize>,
    },
}

impl PrerequisiteNode {
    pub fn atom(item_id: ItemId, required: u32) -> Self {
        Self::from_kind(NodeKind::Atom {
            item_id,
            required,
            owned: 0,
        })
    }

    pub fn all_of(children: Vec<PrerequisiteNode>) -> Self {
        Self::from_kind(NodeKind::AllOf { children })
    }

    pub fn one_of(children: Vec<PrerequisiteNode>) -> Self {
        Self::from_kind(NodeKind::OneOf {
            children,
            active: None,
        })
    }

    fn from_kind(kind: NodeKind) -> Self {
        Self {
            collected: false,
            locked: false,
            kind,
        }
    }

    pub fn children(&self) -> &[PrerequisiteNode] {
        match &self.kind {
            NodeKind::Atom { .. } => &[],
            NodeKind::AllOf { children } | NodeKind::OneOf { children, .. } => children,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.kind, NodeKind::Atom { .. })
    }

    /// Item id for atom nodes.
    pub fn item_id(&self) -> Option<ItemId> {
        match self.kind {
            NodeKind::Atom { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    /// Follow `path` down from this node.
    pub fn node(&self, path: &NodePath) -> Option<&PrerequisiteNode> {
        match path.split_first() {
            None => Some(self),
            Some((&i, rest)) => self.children().get(i)?.node(rest),
        }
    }

    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut PrerequisiteNode> {
        match path.split_first() {
            None => Some(self),
            Some((&i, rest)) => match &mut self.kind {
                NodeKind::Atom { .. } => None,
                NodeKind::AllOf { children } | NodeKind::OneOf { children, .. } => {
                    children.get_mut(i)?.node_mut(rest)
                }
            },
        }
    }

    /// Visit every atom in the subtree, depth-first.
    pub fn for_each_atom<'a>(&'a self, f: &mut impl FnMut(&'a PrerequisiteNode)) {
        match &self.kind {
            NodeKind::Atom { .. } => f(self),
            NodeKind::AllOf { children } | NodeKind::OneOf { children, .. } => {
                for child in children {
                    child.for_each_atom(f);
                }
            }
        }
    }

    /// Number of atoms in the subtree.
    pub fn atom_count(&self) -> usize {
        let mut count = 0;
        self.for_each_atom(&mut |_| count += 1);
        count
    }

    /// Number of collected atoms in the subtree.
    pub fn collected_atom_count(&self) -> usize {
        let mut count = 0;
        self.for_each_atom(&mut |atom| {
            if atom.collected {
                count += 1;
            }
        });
        count
    }

    /// Depth of the subtree; a lone atom has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Self::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon_tree() -> PrerequisiteNode {
        PrerequisiteNode::one_of(vec![
            PrerequisiteNode::atom(100, 1),
            PrerequisiteNode::all_of(vec![
                PrerequisiteNode::atom(200, 1),
                PrerequisiteNode::atom(300, 3),
            ]),
        ])
    }

    #[test]
    fn test_path_lookup() {
        let tree = weapon_tree();
        assert_eq!(tree.node(&[]).map(|n| n.atom_count()), Some(3));
        assert_eq!(tree.node(&[1, 1]).and_then(|n| n.item_id()), Some(300));
        assert!(tree.node(&[0, 0]).is_none());
        assert!(tree.node(&[2]).is_none());
    }

    #[test]
    fn test_depth() {
        assert_eq!(PrerequisiteNode::atom(1, 1).depth(), 1);
        assert_eq!(weapon_tree().depth(), 3);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(PrerequisiteNode::atom(7, 2)).unwrap();
        assert_eq!(json["type"], "atom");
        assert_eq!(json["item_id"], 7);
        assert_eq!(json["required"], 2);
        assert_eq!(json["locked"], false);

        let parsed: PrerequisiteNode = serde_json::from_str(
            r#"{"type":"one_of","children":[{"type":"atom","item_id":1,"required":1}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.children().len(), 1);
        assert!(!parsed.collected);
    }
}
