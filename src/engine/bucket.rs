//! Deterministic percentile bucketing for gradual rollouts
//!
//! The hash only needs determinism and reasonable uniformity, not
//! cryptographic strength: the same `(user, experiment)` pair must land in
//! the same bucket on every call, on every node, with no stored state.

/// 32-bit polynomial rolling hash over the input bytes.
///
/// Computes `h = h * 31 + byte` in wrapping 32-bit arithmetic, expressed as
/// `(h << 5) - h + byte`.
#[must_use]
pub fn string_hash(input: &str) -> i32 {
    let mut hash: i32 = 0;
    for byte in input.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(byte));
    }
    hash
}

/// Percentile bucket (0–99) for a user within a named experiment.
///
/// Scoped per experiment: the same user gets independent buckets in
/// different rollouts.
#[must_use]
pub fn bucket_for(user_id: &str, experiment_name: &str) -> u32 {
    let mut key = String::with_capacity(user_id.len() + experiment_name.len());
    key.push_str(user_id);
    key.push_str(experiment_name);
    string_hash(&key).unsigned_abs() % 100
}
