//! Text tree rendering for prerequisite trees.

use crate::models::{Gearpiece, NodeKind, PrerequisiteNode};

const COLLECTED: char = '●';
const MISSING: char = '○';

fn state_symbol(collected: bool) -> char {
    if collected {
        COLLECTED
    } else {
        MISSING
    }
}

/// Render a gearpiece and its prerequisites as a text tree.
///
/// Example output:
/// ```text
/// ○ Weapon [main_hand]
/// └── ○ one of
///     ├── ○ #100 0/1 (active)
///     └── ○ all of
///         ├── ● #200 1/1
///         └── ○ #300 2/3 [locked]
/// ```
pub fn render_gearpiece(piece: &Gearpiece) -> String {
    let mut output = String::new();
    output.push(state_symbol(piece.collected));
    output.push(' ');
    output.push_str(&piece.name);
    output.push_str(" [");
    output.push_str(piece.slot.as_str());
    output.push(']');
    if piece.locked {
        output.push_str(" [locked]");
    }
    output.push('\n');
    render_node(&mut output, &piece.root, "", true, false);
    output
}

fn label(node: &PrerequisiteNode) -> String {
    match &node.kind {
        NodeKind::Atom {
            item_id,
            required,
            owned,
        } => format!("#{} {}/{}", item_id, owned, required),
        NodeKind::AllOf { .. } => "all of".to_string(),
        NodeKind::OneOf { .. } => "one of".to_string(),
    }
}

/// Recursively render a node and its children.
fn render_node(
    output: &mut String,
    node: &PrerequisiteNode,
    prefix: &str,
    is_last: bool,
    is_active: bool,
) {
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(prefix);
    output.push_str(branch);
    output.push(state_symbol(node.collected));
    output.push(' ');
    output.push_str(&label(node));
    if is_active {
        output.push_str(" (active)");
    }
    if node.locked {
        output.push_str(" [locked]");
    }
    output.push('\n');

    let continuation = if is_last { "    " } else { "│   " };
    let child_prefix = format!("{}{}", prefix, continuation);
    let active = match node.kind {
        NodeKind::OneOf { active, .. } => active,
        _ => None,
    };

    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        let child_is_last = i == children.len() - 1;
        render_node(
            output,
            child,
            &child_prefix,
            child_is_last,
            active == Some(i),
        );
    }
}
