//! Temporary keys for records that the server has not confirmed yet.

use rand::Rng;

/// Prefix on every temporary key. Server keys are UUIDs and never carry it.
pub const TEMP_ID_PREFIX: &str = "tmp-";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a temporary key: the prefix followed by `len` random
/// lowercase base-36 characters.
pub fn temp_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(TEMP_ID_PREFIX.len() + len);
    out.push_str(TEMP_ID_PREFIX);
    for _ in 0..len {
        out.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
    }
    out
}

/// Whether `id` was produced by [`temp_id`].
pub fn is_temp_id(id: &str) -> bool {
    id.strip_prefix(TEMP_ID_PREFIX).is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
    })
}
