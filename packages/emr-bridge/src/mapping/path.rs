use serde_json::Value;

/// Resolve a dotted/bracketed path such as `entry[0].resource.name` against `root`.
///
/// Object segments index by key, array segments by an all-digit in-range index.
/// Any other combination, and any JSON `null` met along the way, yields `None`.
/// Empty segments are skipped, so an empty path resolves to `root` itself.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    let flat = path.replace(']', "");
    for part in flat.split('[') {
        for segment in part.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) if is_index(segment) => {
                    items.get(segment.parse::<usize>().ok()?)?
                }
                _ => return None,
            };
            if current.is_null() {
                return None;
            }
        }
    }
    Some(current)
}

fn is_index(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit())
}
