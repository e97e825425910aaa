//! Pod-to-service naming convention
//!
//! Deployment-managed pods are named `<service>-<replicaset-hash>-<suffix>`.
//! The owning service is recovered by stripping the last two hyphen-delimited
//! segments. The convention is inferred from production naming patterns: a
//! service whose own name contains extra hyphens is still handled (only the
//! trailing two segments are removed), but a bare pod name that coincidentally
//! ends in two hyphenated tokens would be misclassified.

/// Derive the owning service name from a pod name.
///
/// Names with fewer than three hyphen-delimited segments are returned whole,
/// since there is nothing to strip that could be a hash/replica suffix.
pub fn service_for(pod_name: &str) -> &str {
    let segments = pod_name.split('-').count();
    if segments < 3 {
        return pod_name;
    }

    // Cut before the second hyphen from the right.
    match pod_name.rmatch_indices('-').nth(1) {
        Some((idx, _)) => &pod_name[..idx],
        None => pod_name,
    }
}
