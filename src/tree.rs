//! Fold a fragment's flat file map into a nested tree for display.

use serde_json::{Value, json};

use crate::domain::FileMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    File(String),
    Folder(String, Vec<TreeItem>),
}

impl TreeItem {
    /// Wire form: a file is its name, a folder is `[name, ...children]`
    pub fn to_value(&self) -> Value {
        match self {
            TreeItem::File(name) => json!(name),
            TreeItem::Folder(name, children) => {
                let mut items = vec![json!(name)];
                items.extend(children.iter().map(TreeItem::to_value));
                Value::Array(items)
            }
        }
    }
}

/// Children kept in first-seen order of the sorted paths
#[derive(Default)]
struct Node {
    children: Vec<(String, Option<Node>)>,
}

impl Node {
    fn folder(&mut self, name: &str) -> &mut Node {
        let idx = match self.children.iter().position(|(n, c)| n == name && c.is_some()) {
            Some(idx) => idx,
            None => {
                self.children.push((name.to_string(), Some(Node::default())));
                self.children.len() - 1
            }
        };
        // the entry at idx is always a folder
        self.children[idx].1.get_or_insert_with(Node::default)
    }

    fn into_items(self) -> Vec<TreeItem> {
        self.children
            .into_iter()
            .map(|(name, child)| match child {
                None => TreeItem::File(name),
                Some(node) => TreeItem::Folder(name, node.into_items()),
            })
            .collect()
    }
}

pub fn convert_files_to_tree_items(files: &FileMap) -> Vec<TreeItem> {
    let mut root = Node::default();

    // FileMap iterates in sorted path order
    for path in files.keys() {
        let mut parts: Vec<&str> = path.split('/').collect();
        let Some(filename) = parts.pop() else {
            continue;
        };
        let mut current = &mut root;
        for part in parts {
            current = current.folder(part);
        }
        current.children.push((filename.to_string(), None));
    }

    root.into_items()
}

/// Indented listing, folders suffixed with `/`
pub fn render_tree(items: &[TreeItem]) -> String {
    fn walk(items: &[TreeItem], depth: usize, out: &mut String) {
        for item in items {
            let indent = "  ".repeat(depth);
            match item {
                TreeItem::File(name) => out.push_str(&format!("{}{}\n", indent, name)),
                TreeItem::Folder(name, children) => {
                    out.push_str(&format!("{}{}/\n", indent, name));
                    walk(children, depth + 1, out);
                }
            }
        }
    }

    let mut out = String::new();
    walk(items, 0, &mut out);
    out
}
