//! Page tree plumbing.
//!
//! Edits operate on a flat page list. Before the root `Pages` node is
//! rewritten, attributes a page may inherit from its ancestors are copied
//! onto the page itself, so flattening never changes how a page renders.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{PdfEditError, Result};

/// Page attributes that may be inherited from ancestor `Pages` nodes.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Object id of the root `Pages` node.
pub fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    let catalog = doc
        .catalog()
        .map_err(|e| PdfEditError::page_tree(format!("Failed to get catalog: {e}")))?;

    catalog
        .get(b"Pages")
        .and_then(|p| p.as_reference())
        .map_err(|e| PdfEditError::page_tree(format!("Failed to get pages reference: {e}")))
}

/// Page object ids in document order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Look up `key` on a page, walking up the `Parent` chain if needed.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        node_id = node.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
    }

    None
}

/// Copy inherited attributes down onto the page dictionary.
fn push_down_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter_map(|key| {
            let own = doc
                .get_dictionary(page_id)
                .map(|d| d.has(key))
                .unwrap_or(false);
            if own {
                None
            } else {
                inherited_attribute(doc, page_id, key).map(|value| (*key, value))
            }
        })
        .collect();

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

/// Rewrite the root `Pages` node so its kids are exactly `page_ids`, in order.
///
/// Every page is re-parented to the root and keeps its effective inherited
/// attributes. Intermediate `Pages` nodes are left unreachable for
/// [`Document::prune_objects`] to collect.
pub fn rebuild(doc: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = root_pages_id(doc)?;

    for &page_id in page_ids {
        push_down_inherited(doc, page_id)?;
    }

    for &page_id in page_ids {
        page_dict_mut(doc, page_id)?.set("Parent", Object::Reference(pages_id));
    }

    let pages = doc
        .get_object_mut(pages_id)
        .map_err(|e| PdfEditError::page_tree(format!("Failed to get pages object: {e}")))?;

    if let Object::Dictionary(dict) = pages {
        let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
        dict.set("Kids", Object::Array(kids));
        dict.set("Count", Object::Integer(page_ids.len() as i64));
    } else {
        return Err(PdfEditError::page_tree("Pages object is not a dictionary"));
    }

    Ok(())
}

/// Mutable access to a page dictionary.
pub fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(dict)) => Ok(dict),
        Ok(_) => Err(PdfEditError::page_tree(format!(
            "Page object {} {} is not a dictionary",
            page_id.0, page_id.1
        ))),
        Err(e) => Err(PdfEditError::page_tree(format!("Failed to get page: {e}"))),
    }
}

/// Effective `MediaBox` of a page as `[x0, y0, x1, y1]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let value = inherited_attribute(doc, page_id, b"MediaBox")?;
    let array = match value {
        Object::Array(array) => array,
        Object::Reference(id) => doc.get_object(id).ok()?.as_array().ok()?.clone(),
        _ => return None,
    };

    if array.len() < 4 {
        return None;
    }

    let mut rect = [0.0f32; 4];
    for (slot, obj) in rect.iter_mut().zip(array.iter()) {
        *slot = obj.as_float().ok()?;
    }
    Some(rect)
}

/// Effective `/Rotate` of a page, defaulting to 0.
pub fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|r| r.as_i64().ok())
        .unwrap_or(0)
}

/// Drop `Kids` entries that do not resolve to a page or pages node.
///
/// Returns the number of entries removed. Used by repair before the tree is
/// flattened.
pub fn drop_dangling_kids(doc: &mut Document) -> Result<usize> {
    let root = root_pages_id(doc)?;
    let mut removed = 0;
    let mut stack = vec![root];
    let mut visited = std::collections::HashSet::new();

    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) {
            continue;
        }

        let kids = match doc.get_dictionary(node_id).and_then(|d| d.get(b"Kids")) {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => continue,
        };

        let mut kept = Vec::with_capacity(kids.len());
        for kid in kids {
            let Ok(kid_id) = kid.as_reference() else {
                removed += 1;
                continue;
            };
            match doc.get_dictionary(kid_id) {
                Ok(dict) if is_node_type(dict, b"Pages") => {
                    stack.push(kid_id);
                    kept.push(kid);
                }
                Ok(dict) if is_node_type(dict, b"Page") || !dict.has(b"Kids") => kept.push(kid),
                _ => removed += 1,
            }
        }

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(node_id) {
            dict.set("Kids", Object::Array(kept));
        }
    }

    Ok(removed)
}

fn is_node_type(dict: &Dictionary, name: &[u8]) -> bool {
    dict.get(b"Type")
        .and_then(|t| t.as_name())
        .map(|n| n == name)
        .unwrap_or(false)
}
