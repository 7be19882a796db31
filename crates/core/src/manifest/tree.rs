//! Hierarchical JSON manifests.
//!
//! ```json
//! {
//!   "Anatomy": {
//!     "title": "Anatomy",
//!     "resources": { "pdfs": ["..."], "mp4": ["..."], "others": ["..."] },
//!     "children": [ { "title": "Week 1", "resources": { ... }, "children": [] } ]
//!   }
//! }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::resolver::ResourceRef;

use super::error::ManifestError;
use super::types::ManifestEntry;

/// One node with its children left unparsed until the walk reaches them.
#[derive(Debug, Default)]
struct TreeNode {
    title: Option<String>,
    resources: Resources,
    children: Vec<Value>,
}

impl TreeNode {
    fn from_value(value: Value) -> Result<Self, ManifestError> {
        let Value::Object(mut fields) = value else {
            return Err(ManifestError::Shape(
                "manifest node must be an object".to_string(),
            ));
        };

        let children = match fields.remove("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(children)) => children,
            Some(_) => {
                return Err(ManifestError::Shape(
                    "node children must be an array".to_string(),
                ))
            }
        };
        let resources = match fields.remove("resources") {
            None | Some(Value::Null) => Resources::default(),
            Some(resources) => serde_json::from_value(resources)?,
        };
        let title = match fields.remove("title") {
            Some(Value::String(title)) => Some(title),
            _ => None,
        };

        Ok(Self {
            title,
            resources,
            children,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct Resources {
    #[serde(default)]
    pdfs: Vec<ResourceEntry>,
    #[serde(default)]
    mp4: Vec<ResourceEntry>,
    #[serde(default)]
    others: Vec<ResourceEntry>,
}

/// A resource is either a bare URL or an object with a title.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        extension: Option<String>,
    },
}

impl ResourceEntry {
    fn into_ref(self, list_extension: Option<&str>) -> ResourceRef {
        match self {
            Self::Url(url) => with_hint(ResourceRef::new(url, ""), list_extension),
            Self::Detailed {
                url,
                title,
                extension,
            } => with_hint(
                ResourceRef::new(url, title),
                extension.as_deref().or(list_extension),
            ),
        }
    }
}

fn with_hint(resource: ResourceRef, extension: Option<&str>) -> ResourceRef {
    match extension {
        Some(ext) => resource.with_extension(ext),
        None => resource,
    }
}

/// Parses and flattens a tree manifest.
///
/// Nesting depth is not limited.
pub fn parse_tree(json: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let root = Value::deserialize(&mut de)?;
    de.end()?;

    let Value::Object(groups) = root else {
        return Err(ManifestError::Shape(
            "top level must map group names to nodes".to_string(),
        ));
    };
    flatten_groups(groups)
}

fn flatten_groups(groups: Map<String, Value>) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut entries = Vec::new();
    for (group, node) in groups {
        flatten_node(&group, node, &mut entries)?;
    }
    Ok(entries)
}

/// Depth-first, pre-order walk with an explicit stack.
///
/// Within a node, lists are taken in `pdfs`, `mp4`, `others` order.
fn flatten_node(
    group: &str,
    root: Value,
    out: &mut Vec<ManifestEntry>,
) -> Result<(), ManifestError> {
    let mut stack = vec![root];

    while let Some(value) = stack.pop() {
        let node = TreeNode::from_value(value)?;
        if let Some(ref title) = node.title {
            tracing::trace!(group, node = %title, "Visiting manifest node");
        }

        let Resources { pdfs, mp4, others } = node.resources;
        let lists = [(pdfs, Some("pdf")), (mp4, Some("mp4")), (others, None)];
        for (list, extension) in lists {
            out.extend(
                list.into_iter()
                    .map(|entry| ManifestEntry::new(group, entry.into_ref(extension))),
            );
        }

        // Reversed so the first child is visited next.
        stack.extend(node.children.into_iter().rev());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_level_tree_counts_every_list() {
        let json = r#"{
            "Course": {
                "title": "Course",
                "resources": { "pdfs": ["https://x/l1a.pdf"], "mp4": ["https://x/l1.mp4"] },
                "children": [
                    {
                        "title": "Level 2",
                        "resources": { "others": ["https://x/l2.zip", "https://x/l2b.zip"] },
                        "children": [
                            {
                                "title": "Level 3",
                                "resources": { "pdfs": ["https://x/l3.pdf"] },
                                "children": [
                                    {
                                        "title": "Level 4",
                                        "resources": {
                                            "pdfs": ["https://x/l4.pdf"],
                                            "mp4": ["https://x/l4a.mp4", "https://x/l4b.mp4"],
                                            "others": ["https://x/l4.txt"]
                                        }
                                    }
                                ]
                            }
                        ]
                    },
                    { "title": "Level 2b", "resources": { "mp4": ["https://x/l2b.mp4"] } }
                ]
            }
        }"#;

        let entries = parse_tree(json).unwrap();
        assert_eq!(entries.len(), 2 + 2 + 1 + 4 + 1);
        assert!(entries.iter().all(|e| e.group == "Course"));

        let urls: Vec<_> = entries.iter().map(|e| e.resource.entry_url.as_str()).collect();
        assert_eq!(urls[0], "https://x/l1a.pdf");
        assert_eq!(urls[2], "https://x/l2.zip");
        assert_eq!(urls[4], "https://x/l3.pdf");
        assert_eq!(urls[5], "https://x/l4.pdf");
        assert_eq!(urls[9], "https://x/l2b.mp4");
    }

    #[test]
    fn test_group_order_and_hints() {
        let json = r#"{
            "Zoology": { "resources": { "mp4": ["https://x/z"] } },
            "Anatomy": { "resources": { "pdfs": [{"url": "https://x/a", "title": "Skeleton"}] } }
        }"#;
        let entries = parse_tree(json).unwrap();
        assert_eq!(entries[0].group, "Zoology");
        assert_eq!(entries[0].resource.hinted_extension.as_deref(), Some("mp4"));
        assert_eq!(entries[1].group, "Anatomy");
        assert_eq!(entries[1].resource.display_title, "Skeleton");
        assert_eq!(entries[1].resource.hinted_extension.as_deref(), Some("pdf"));
    }

    #[test]
    fn test_empty_group_yields_nothing() {
        let entries = parse_tree(r#"{ "Empty": { "children": [ {} ] } }"#).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(matches!(parse_tree("[1, 2]"), Err(ManifestError::Shape(_))));
        assert!(matches!(parse_tree("{"), Err(ManifestError::Json(_))));
        assert!(matches!(parse_tree("{} {}"), Err(ManifestError::Json(_))));
    }

    #[test]
    fn test_bad_children_rejected() {
        let err = parse_tree(r#"{ "G": { "children": {} } }"#).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
        let err = parse_tree(r#"{ "G": { "children": [42] } }"#).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    /// A chain of `depth` nodes below the group root, one pdf at every level.
    fn chain(depth: usize) -> String {
        let node = |i: usize| {
            format!(
                r#"{{"title":"L{i}","resources":{{"pdfs":["https://x/{i}.pdf"]}},"children":["#
            )
        };
        let mut json = String::from(r#"{"Deep":"#);
        for i in 0..=depth {
            json.push_str(&node(i));
        }
        for _ in 0..=depth {
            json.push_str("]}");
        }
        json.push('}');
        json
    }

    #[test]
    fn test_deep_nesting_visits_every_level() {
        let depth = 100;
        let entries = parse_tree(&chain(depth)).unwrap();
        assert_eq!(entries.len(), depth + 1);
        assert_eq!(entries[0].resource.entry_url, "https://x/0.pdf");
        assert_eq!(
            entries[depth].resource.entry_url,
            format!("https://x/{}.pdf", depth)
        );
        assert!(entries.iter().all(|e| e.group == "Deep"));
    }
}
