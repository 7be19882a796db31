//! Types for the manifest module.

use serde::Serialize;

use crate::resolver::ResourceRef;

/// One flattened manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub group: String,
    pub resource: ResourceRef,
}

impl ManifestEntry {
    pub fn new(group: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            group: group.into(),
            resource,
        }
    }
}

/// A named group of items processed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub items: Vec<ResourceRef>,
}

/// Groups entries by name, keeping first-seen group order and item order.
pub fn group_entries(entries: Vec<ManifestEntry>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|g| g.name == entry.group) {
            Some(group) => group.items.push(entry.resource),
            None => groups.push(Group {
                name: entry.group,
                items: vec![entry.resource],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_entries_preserves_order() {
        let entries = vec![
            ManifestEntry::new("B", ResourceRef::new("https://x/1", "")),
            ManifestEntry::new("A", ResourceRef::new("https://x/2", "")),
            ManifestEntry::new("B", ResourceRef::new("https://x/3", "")),
        ];
        let groups = group_entries(entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "B");
        assert_eq!(groups[0].items[1].entry_url, "https://x/3");
        assert_eq!(groups[1].name, "A");
    }
}
