//! Directory-style navigation over slash-separated script paths.
//!
//! Registered paths such as `net/ping` form a tree; each menu level lists
//! subdirectories first, then scripts, with `..` to go back up. Selection
//! runs as a terminal menu loop and resolves to a full script path.

use std::collections::BTreeMap;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use crate::coerce::CollectionError;
use crate::prompt::dialog_err;

/// One level of the path tree. A node can be both a directory and a script
/// when a registered path is a prefix of another; a directory is promoted to
/// a script when its path is later inserted as a leaf, never demoted back.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Node {
    children: BTreeMap<String, Node>,
    /// Full registry path when this node is itself runnable.
    script: Option<String>,
}

impl Node {
    fn is_dir(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Tree over every registered script path.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NavigatorTree {
    root: Node,
}

impl NavigatorTree {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for segment in &segments {
            node = node.children.entry((*segment).to_string()).or_default();
        }
        node.script = Some(segments.join("/"));
    }

    /// Menu loop over the tree. Returns the chosen script path, or `None`
    /// when the user backs out of the root or cancels.
    pub fn select(&self) -> Result<Option<String>, CollectionError> {
        let theme = ColorfulTheme::default();
        let mut stack: Vec<&Node> = vec![&self.root];
        let mut crumbs: Vec<String> = Vec::new();
        loop {
            let Some(node) = stack.last().copied() else {
                return Ok(None);
            };
            let entries = menu_entries(node, stack.len() > 1);
            if entries.is_empty() {
                eprintln!("{}", style("No scripts registered.").yellow());
                return Ok(None);
            }
            let labels: Vec<String> = entries.iter().map(MenuEntry::label).collect();
            let prompt = if crumbs.is_empty() {
                "Scripts".to_string()
            } else {
                format!("Scripts / {}", crumbs.join(" / "))
            };
            let picked = Select::with_theme(&theme)
                .with_prompt(prompt)
                .items(&labels)
                .default(0)
                .interact_opt()
                .map_err(dialog_err)?;
            let Some(picked) = picked else {
                return Ok(None);
            };
            match &entries[picked] {
                MenuEntry::Up => {
                    stack.pop();
                    crumbs.pop();
                }
                MenuEntry::Dir(name) => {
                    if let Some(child) = node.children.get(name) {
                        stack.push(child);
                        crumbs.push(name.clone());
                    }
                }
                MenuEntry::Script { path, .. } => return Ok(Some(path.clone())),
            }
        }
    }
}

/// One row of a navigation menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Up,
    Dir(String),
    Script { name: String, path: String },
}

impl MenuEntry {
    pub fn label(&self) -> String {
        match self {
            MenuEntry::Up => "..".to_string(),
            MenuEntry::Dir(name) => format!("{name}/"),
            MenuEntry::Script { name, .. } => name.clone(),
        }
    }
}

/// Rows for one tree level: `..` when below the root, then directories,
/// then scripts, both groups alphabetical.
pub fn menu_entries(node: &Node, below_root: bool) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    if below_root {
        entries.push(MenuEntry::Up);
    }
    for (name, child) in &node.children {
        if child.is_dir() {
            entries.push(MenuEntry::Dir(name.clone()));
        }
    }
    for (name, child) in &node.children {
        if let Some(path) = &child.script {
            entries.push(MenuEntry::Script {
                name: name.clone(),
                path: path.clone(),
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(entries: &[MenuEntry]) -> Vec<String> {
        entries.iter().map(MenuEntry::label).collect()
    }

    #[test]
    fn root_lists_directories_before_scripts() {
        let tree =
            NavigatorTree::from_paths(["deploy", "net/ping", "net/trace", "notes/daily"]);
        let entries = menu_entries(&tree.root, false);
        assert_eq!(labels(&entries), vec!["net/", "notes/", "deploy"]);
    }

    #[test]
    fn root_has_no_up_entry() {
        let tree = NavigatorTree::from_paths(["a/b"]);
        let entries = menu_entries(&tree.root, false);
        assert!(!entries.contains(&MenuEntry::Up));
    }

    #[test]
    fn nested_level_starts_with_up() {
        let tree = NavigatorTree::from_paths(["net/ping", "net/trace"]);
        let net = tree.root.children.get("net").unwrap();
        let entries = menu_entries(net, true);
        assert_eq!(labels(&entries), vec!["..", "ping", "trace"]);
    }

    #[test]
    fn script_entries_carry_full_paths() {
        let tree = NavigatorTree::from_paths(["net/ping"]);
        let net = tree.root.children.get("net").unwrap();
        let entries = menu_entries(net, true);
        assert!(entries.contains(&MenuEntry::Script {
            name: "ping".to_string(),
            path: "net/ping".to_string(),
        }));
    }

    #[test]
    fn prefix_path_shows_as_both_directory_and_script() {
        let tree = NavigatorTree::from_paths(["net", "net/ping"]);
        let entries = menu_entries(&tree.root, false);
        assert_eq!(labels(&entries), vec!["net/", "net"]);
    }

    #[test]
    fn empty_tree_has_no_entries() {
        let tree = NavigatorTree::from_paths(Vec::<String>::new());
        assert!(menu_entries(&tree.root, false).is_empty());
    }

    #[test]
    fn groups_sort_alphabetically() {
        let tree = NavigatorTree::from_paths(["z", "a", "m/x", "b/y"]);
        let entries = menu_entries(&tree.root, false);
        assert_eq!(labels(&entries), vec!["b/", "m/", "a", "z"]);
    }

    #[test]
    fn file_style_paths_split_into_dir_and_leaf() {
        let tree = NavigatorTree::from_paths(["a/b.py", "a/c.py", "d.py"]);
        let root = menu_entries(&tree.root, false);
        assert_eq!(labels(&root), vec!["a/", "d.py"]);
        let a = tree.root.children.get("a").unwrap();
        assert!(a.script.is_none());
        let inside = menu_entries(a, true);
        assert!(inside.contains(&MenuEntry::Script {
            name: "b.py".to_string(),
            path: "a/b.py".to_string(),
        }));
    }

    #[test]
    fn every_leaf_is_reachable_and_marked() {
        let paths = ["x/y/z", "x/w", "solo"];
        let tree = NavigatorTree::from_paths(paths);
        for path in paths {
            let mut node = &tree.root;
            for segment in path.split('/') {
                node = node.children.get(segment).unwrap();
            }
            assert_eq!(node.script.as_deref(), Some(path));
        }
        // Intermediate components never become scripts on their own.
        let x = tree.root.children.get("x").unwrap();
        assert!(x.script.is_none());
        assert!(x.children.get("y").unwrap().script.is_none());
    }

    #[test]
    fn construction_is_deterministic() {
        let paths = ["net/ping", "net", "deploy", "notes/daily"];
        assert_eq!(
            NavigatorTree::from_paths(paths),
            NavigatorTree::from_paths(paths)
        );
    }

    #[test]
    fn surrounding_slashes_are_stripped() {
        let tree = NavigatorTree::from_paths(["/net/ping/"]);
        let net = tree.root.children.get("net").unwrap();
        let ping = net.children.get("ping").unwrap();
        assert_eq!(ping.script.as_deref(), Some("net/ping"));
    }
}
