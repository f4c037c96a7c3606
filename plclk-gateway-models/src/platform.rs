//! In-memory snapshot of the platform configuration tree.
//!
//! The tree is consumed read-only as a lookup source: it is loaded once at
//! bind time, either from a flattened on-disk tree (one directory per node,
//! one file per property) or fabricated directly for tests. Resolution logic
//! lives elsewhere and operates purely on this snapshot.

use std::{collections::BTreeMap, fs, io, path::Path};
use tracing::debug;

/// Raw property bytes with typed views.
///
/// String lists are NUL-separated (with a trailing NUL), cell lists are
/// big-endian u32s, matching the flattened-tree encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue(pub Vec<u8>);

impl PropertyValue {
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Self {
        let mut raw = Vec::new();
        for v in values {
            raw.extend_from_slice(v.as_ref().as_bytes());
            raw.push(0);
        }
        PropertyValue(raw)
    }

    pub fn from_u32s(values: &[u32]) -> Self {
        let mut raw = Vec::with_capacity(values.len() * 4);
        for v in values {
            raw.extend_from_slice(&v.to_be_bytes());
        }
        PropertyValue(raw)
    }

    /// NUL-separated string view. Trailing terminator yields no element.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.0
            .split(|b| *b == 0)
            .filter(|s| !s.is_empty())
            .filter_map(|s| std::str::from_utf8(s).ok())
    }

    /// Big-endian cell view. A trailing partial cell is dropped.
    pub fn u32s(&self) -> impl Iterator<Item = u32> + '_ {
        self.0
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }
}

#[derive(Debug, Clone)]
pub struct PlatformNode {
    /// Leaf name of the node (no path components).
    pub name: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl PlatformNode {
    pub fn new(name: impl Into<String>) -> Self {
        PlatformNode {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_strings<S: AsRef<str>>(mut self, property: &str, values: &[S]) -> Self {
        self.properties
            .insert(property.to_string(), PropertyValue::from_strings(values));
        self
    }

    pub fn with_u32s(mut self, property: &str, values: &[u32]) -> Self {
        self.properties
            .insert(property.to_string(), PropertyValue::from_u32s(values));
        self
    }

    #[inline]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Whether the node's `compatible` list contains `compat` exactly.
    pub fn is_compatible(&self, compat: &str) -> bool {
        self.property("compatible")
            .map(|p| p.strings().any(|s| s == compat))
            .unwrap_or(false)
    }
}

/// Flat snapshot of all nodes. Node order follows discovery order, which the
/// lookup tie-breaks below rely on (first match wins).
#[derive(Debug, Clone, Default)]
pub struct PlatformTree {
    nodes: Vec<PlatformNode>,
}

impl PlatformTree {
    pub fn new(nodes: Vec<PlatformNode>) -> Self {
        PlatformTree { nodes }
    }

    /// Load a snapshot from a flattened tree directory. Directories are
    /// nodes, regular files are properties. Unreadable entries are skipped
    /// with a debug log; the platform tree is best-effort by nature.
    pub fn load(root: &Path) -> io::Result<Self> {
        let mut nodes = Vec::new();
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        load_node(root, root_name, &mut nodes)?;
        debug!(nodes = nodes.len(), root = %root.display(), "loaded platform tree");
        Ok(PlatformTree { nodes })
    }

    #[inline]
    pub fn nodes(&self) -> &[PlatformNode] {
        &self.nodes
    }

    /// First node with exactly this leaf name.
    pub fn find_node(&self, name: &str) -> Option<&PlatformNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// First node whose `compatible` list contains `compat`.
    pub fn find_compatible(&self, compat: &str) -> Option<&PlatformNode> {
        self.nodes.iter().find(|n| n.is_compatible(compat))
    }
}

fn load_node(dir: &Path, name: String, nodes: &mut Vec<PlatformNode>) -> io::Result<()> {
    let mut node = PlatformNode::new(name);
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %dir.display(), err = %e, "skipping unreadable tree entry");
                continue;
            }
        };
        let path = entry.path();
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            children.push((path, entry_name));
        } else {
            match fs::read(&path) {
                Ok(raw) => {
                    node.properties.insert(entry_name, PropertyValue(raw));
                }
                Err(e) => {
                    debug!(path = %path.display(), err = %e, "skipping unreadable property");
                }
            }
        }
    }
    nodes.push(node);
    for (path, child_name) in children {
        load_node(&path, child_name, nodes)?;
    }
    Ok(())
}

/// How the one managed clock is located in the platform tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockLocator {
    /// Exact-name node lookup; the node's first associated clock is taken.
    Node { name: String },
    /// Provider lookup by compatibility string, then output-name scan.
    Provider { compatible: String, output: String },
}

/// A resolved clock: which provider output to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockId {
    /// Zero-based output index at the provider.
    pub index: u32,
    /// Output name, used by providers that address outputs by name.
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn string_list_splits_on_nul() {
        let prop = PropertyValue::from_strings(&["a", "b", "pl0"]);
        assert_eq!(prop.strings().collect::<Vec<_>>(), vec!["a", "b", "pl0"]);
        // raw encoding carries the trailing terminator
        assert_eq!(prop.0.last(), Some(&0u8));
    }

    #[test]
    fn cell_list_is_big_endian() {
        let prop = PropertyValue::from_u32s(&[71, 2]);
        assert_eq!(prop.u32s().collect::<Vec<_>>(), vec![71, 2]);
        assert_eq!(&prop.0[..4], &[0, 0, 0, 71]);
    }

    #[test]
    fn compatible_match_is_exact() {
        let node = PlatformNode::new("clkc").with_strings("compatible", &["xlnx,zynqmp-clkc"]);
        assert!(node.is_compatible("xlnx,zynqmp-clkc"));
        assert!(!node.is_compatible("xlnx,zynqmp"));
    }

    #[test]
    fn load_reads_nodes_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        let clkc = dir.path().join("clkc");
        fs::create_dir(&clkc).unwrap();
        fs::write(clkc.join("compatible"), b"xlnx,zynqmp-clkc\0").unwrap();
        fs::write(clkc.join("clock-output-names"), b"pl0\0pl1\0").unwrap();

        let tree = PlatformTree::load(dir.path()).unwrap();
        let node = tree.find_compatible("xlnx,zynqmp-clkc").unwrap();
        assert_eq!(node.name, "clkc");
        assert_eq!(
            node.property("clock-output-names")
                .unwrap()
                .strings()
                .collect::<Vec<_>>(),
            vec!["pl0", "pl1"]
        );
        assert!(tree.find_node("absent").is_none());
    }
}
