use std::collections::BTreeMap;
use xxhash_rust::xxh3::Xxh3;

/// Stable identity of an alerting entity.
///
/// The hash is XXH3-64 with a fixed seed, so it's identical across processes
/// and platforms and may be persisted. Each component is length-delimited,
/// and `tags` is iterated in sorted key order.
pub fn state_id(namespace: &str, alert_id: i64, tags: &BTreeMap<String, String>) -> u64 {
    let mut h = Xxh3::new();

    update_str(&mut h, namespace);
    h.update(&alert_id.to_be_bytes());
    h.update(&(tags.len() as u64).to_be_bytes());

    for (key, value) in tags {
        update_str(&mut h, key);
        update_str(&mut h, value);
    }
    h.digest()
}

fn update_str(h: &mut Xxh3, s: &str) {
    h.update(&(s.len() as u64).to_be_bytes());
    h.update(s.as_bytes());
}
