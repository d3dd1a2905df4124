use serde_json::Value;

use super::ConversionError;
use super::fields::Fields;
use crate::model::{ChildWork, Genre};

/// Deepest nesting accepted in child-work and genre trees.
pub const MAX_TREE_DEPTH: usize = 64;

/// Depth offset of entries below an author bibliography block header.
const BIBLIOGRAPHY_DEPTH_OFFSET: u32 = 2;

const CHILD_WORK: &str = "child_work";
const GENRE: &str = "genre";
const BIBLIOGRAPHY_BLOCK: &str = "bibliography_block";

/// Flattens a child-work tree into pre-order, keeping source order at each
/// level.
///
/// `node` is either a single node or an array of sibling nodes; nested nodes
/// live under `children`. Each entry's depth is its structural depth plus
/// `offset`, where the structural depth is the node's `deep` value when the
/// service already reports it and its traversal depth otherwise.
pub fn flatten_child_tree(node: &Value, offset: u32) -> Result<Vec<ChildWork>, ConversionError> {
    let mut out = Vec::new();
    match node {
        Value::Array(nodes) => flatten_into(nodes, 0, offset, &mut out)?,
        Value::Object(_) => flatten_into(std::slice::from_ref(node), 0, offset, &mut out)?,
        _ => {}
    }
    Ok(out)
}

fn flatten_into(
    nodes: &[Value],
    level: usize,
    offset: u32,
    out: &mut Vec<ChildWork>,
) -> Result<(), ConversionError> {
    if level > MAX_TREE_DEPTH {
        return Err(ConversionError::too_deep(CHILD_WORK, "children"));
    }
    for node in nodes {
        let fields = Fields::new(CHILD_WORK, node);
        let structural = if fields.has("deep") {
            u32::try_from(fields.int("deep").max(0)).unwrap_or(u32::MAX)
        } else {
            level as u32
        };
        out.push(child_work(&fields, structural.saturating_add(offset)));
        flatten_into(fields.array("children"), level + 1, offset, out)?;
    }
    Ok(())
}

fn child_work(fields: &Fields<'_>, depth: u32) -> ChildWork {
    ChildWork {
        id: u64::try_from(fields.int("work_id")).unwrap_or(0),
        name: fields.str("work_name"),
        orig_name: fields.str("work_name_orig"),
        name_bonus: fields.str("work_name_bonus"),
        rating: fields.float("val_midmark_by_weight"),
        votes: fields.int("val_voters"),
        work_type: fields.str("work_type"),
        work_type_key: fields.str("work_type_name"),
        publish_status: fields.str("publish_status"),
        is_published: fields.bool("work_published"),
        year: fields.int("work_year"),
        depth,
        plus: fields.bool("plus"),
    }
}

/// Builds an author's bibliography from named blocks.
///
/// Blocks are visited in ascending key order. Each contributes a section
/// header (depth 1) followed by its flattened `list`, offset by two levels.
pub fn build_author_bibliography(blocks: &Value) -> Result<Vec<ChildWork>, ConversionError> {
    let Some(blocks) = blocks.as_object() else {
        return Ok(Vec::new());
    };

    let mut keys: Vec<&String> = blocks.keys().collect();
    keys.sort();

    let mut out = Vec::new();
    for key in keys {
        let block = Fields::new(BIBLIOGRAPHY_BLOCK, &blocks[key.as_str()]);
        out.push(ChildWork::section_header(block.str("title")));
        out.extend(flatten_child_tree(
            block.get("list"),
            BIBLIOGRAPHY_DEPTH_OFFSET,
        )?);
    }
    Ok(out)
}

/// Converts one genre node and its nested `genre` list, keeping the tree.
pub fn convert_genre_tree(node: &Value) -> Result<Genre, ConversionError> {
    genre_at(node, 0)
}

fn genre_at(node: &Value, level: usize) -> Result<Genre, ConversionError> {
    if level > MAX_TREE_DEPTH {
        return Err(ConversionError::too_deep(GENRE, "genre"));
    }
    let fields = Fields::new(GENRE, node);
    let children = fields
        .array("genre")
        .iter()
        .map(|child| genre_at(child, level + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Genre {
        id: fields.required_id("genre_id")?,
        label: fields.str("label"),
        votes: fields.int("votes"),
        percent: fields.float("percent"),
        children,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::FieldErrorKind;

    fn node(id: u64, children: Value) -> Value {
        json!({ "work_id": id, "work_name": format!("w{id}"), "children": children })
    }

    #[test]
    fn single_leaf_yields_one_entry_at_offset() {
        let leaf = json!({ "work_id": 7, "work_name": "Solaris" });
        let flat = flatten_child_tree(&leaf, 0).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].id, 7);
        assert_eq!(flat[0].depth, 0);

        let flat = flatten_child_tree(&leaf, 2).unwrap();
        assert_eq!(flat[0].depth, 2);
    }

    #[test]
    fn flatten_is_preorder_with_structural_depth() {
        let tree = json!([
            node(1, json!([node(2, json!([node(3, json!([]))])), node(4, json!([]))])),
            node(5, json!([])),
        ]);

        let flat = flatten_child_tree(&tree, 0).unwrap();
        let ids: Vec<u64> = flat.iter().map(|c| c.id).collect();
        let depths: Vec<u32> = flat.iter().map(|c| c.depth).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);

        let offset: Vec<u32> = flatten_child_tree(&tree, 2)
            .unwrap()
            .iter()
            .map(|c| c.depth)
            .collect();
        assert_eq!(offset, vec![2, 3, 4, 3, 2]);
    }

    #[test]
    fn explicit_deep_is_kept_for_preflattened_lists() {
        let list = json!([
            { "work_id": 1, "deep": 0 },
            { "work_id": 2, "deep": 1 },
            { "work_id": 3, "deep": "2" },
        ]);
        let depths: Vec<u32> = flatten_child_tree(&list, 0)
            .unwrap()
            .iter()
            .map(|c| c.depth)
            .collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn flatten_rejects_runaway_nesting() {
        let mut tree = json!({ "work_id": 1 });
        for id in 2..(MAX_TREE_DEPTH as u64 + 4) {
            tree = node(id, json!([tree]));
        }
        let err = flatten_child_tree(&tree, 0).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::TooDeep);
        assert_eq!(err.entity, "child_work");
    }

    #[test]
    fn bibliography_headers_and_offsets() {
        let blocks = json!({
            "b_novels": {
                "title": "Романы",
                "list": [node(10, json!([node(11, json!([]))]))],
            },
            "a_cycles": {
                "title": "Циклы",
                "list": [{ "work_id": 20, "deep": 0 }],
            },
        });

        let flat = build_author_bibliography(&blocks).unwrap();
        let summary: Vec<(u64, &str, u32)> = flat
            .iter()
            .map(|c| (c.id, c.name.as_str(), c.depth))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "Циклы", 1),
                (20, "", 2),
                (0, "Романы", 1),
                (10, "w10", 2),
                (11, "w11", 3),
            ]
        );
        assert!(flat[0].is_section_header());
        assert!(flat[0].is_published);
    }

    #[test]
    fn genre_tree_is_mirrored() {
        let genre = json!({
            "genre_id": 1,
            "label": "Фантастика",
            "votes": 10,
            "percent": 0.5,
            "genre": [
                { "genre_id": 2, "label": "Научная", "genre": [{ "genre_id": 3 }] },
                { "genre_id": 4 },
            ],
        });

        let tree = convert_genre_tree(&genre).unwrap();
        assert_eq!(tree.subtree_size(), 4);
        assert_eq!(tree.children[0].label, "Научная");
        assert_eq!(tree.children[0].children[0].id, 3);
        assert!(tree.children[1].children.is_empty());
        assert_eq!(tree.percent, 0.5);
    }

    #[test]
    fn genre_rejects_runaway_nesting() {
        let mut genre = json!({ "genre_id": 1 });
        for id in 2..=(MAX_TREE_DEPTH as u64 + 2) {
            genre = json!({ "genre_id": id, "genre": [genre] });
        }
        let err = convert_genre_tree(&genre).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::TooDeep);
        assert_eq!(err.entity, "genre");
    }

    #[test]
    fn genre_at_depth_limit_converts() {
        let mut genre = json!({ "genre_id": 1 });
        for id in 2..=(MAX_TREE_DEPTH as u64 + 1) {
            genre = json!({ "genre_id": id, "genre": [genre] });
        }
        let tree = convert_genre_tree(&genre).unwrap();
        assert_eq!(tree.subtree_size(), MAX_TREE_DEPTH + 1);
    }

    #[test]
    fn genre_without_id_fails() {
        let genre = json!({ "genre_id": 1, "genre": [{ "label": "x" }] });
        let err = convert_genre_tree(&genre).unwrap_err();
        assert_eq!(err, ConversionError::missing("genre", "genre_id"));
    }
}
