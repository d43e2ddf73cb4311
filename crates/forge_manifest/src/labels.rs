//! Default label injection.

use tracing::{debug, warn};

use crate::value::{Mapping, Value};

/// Merge `defaults` into `metadata.labels` of every record in `tree`.
///
/// `tree` is either one record or a sequence of records. Labels the record
/// already defines are never overwritten.
pub fn inject_labels(mut tree: Value, defaults: &Mapping) -> Value {
    inject_labels_in_place(&mut tree, defaults);
    tree
}

/// In-place form of [`inject_labels`].
pub fn inject_labels_in_place(tree: &mut Value, defaults: &Mapping) {
    match tree {
        Value::Mapping(record) => inject_record(record, defaults),
        Value::Sequence(records) => {
            for record in records.iter_mut() {
                if let Value::Mapping(record) = record {
                    inject_record(record, defaults);
                }
            }
        }
        _ => debug!("Skipping label injection for non-record value"),
    }
}

fn inject_record(record: &mut Mapping, defaults: &Mapping) {
    let metadata = ensure_mapping(record, "metadata");
    let labels = ensure_mapping(metadata, "labels");

    for (key, value) in defaults.iter() {
        labels.insert_if_absent(key, value.clone());
    }
}

/// Return the mapping stored under `key`, creating or replacing it when needed.
fn ensure_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    match parent.get(key) {
        Some(Value::Mapping(_)) => {}
        Some(Value::Null) | None => {
            parent.insert(key, Mapping::new());
        }
        Some(_) => {
            warn!("Replacing non-mapping '{}' with an empty mapping", key);
            parent.insert(key, Mapping::new());
        }
    }

    match parent.get_mut(key) {
        Some(Value::Mapping(m)) => m,
        _ => unreachable!("'{}' was just set to a mapping", key),
    }
}
