//! Finalizer handling for SimpleOperator cleanup
//!
//! The same finalizer token guards the owner and each managed resource:
//! 1. It is put on the owner before any managed resource is created
//! 2. It is put on each managed resource when that resource is created
//! 3. Cleanup strips it from every managed resource, then from the owner
//!
//! These helpers only edit metadata in memory; persisting is the caller's job.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Check if the object carries the finalizer
pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|t| t == finalizer))
}

/// Add the finalizer if absent. Returns whether metadata changed.
pub fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    if has_finalizer(meta, finalizer) {
        return false;
    }
    meta.finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Remove every occurrence of the finalizer. Returns whether metadata changed.
pub fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    let Some(finalizers) = meta.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|t| t != finalizer);
    before != finalizers.len()
}

/// Check if the object is being deleted
///
/// A deletion timestamp indicates the user has requested deletion,
/// but finalizers are preventing the actual removal.
pub fn is_being_deleted(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}
