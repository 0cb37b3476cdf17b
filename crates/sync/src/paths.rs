//! Remote path construction.

use std::path::{Component, Path};

/// Joins a local relative path onto the remote root with `/` separators.
///
/// Only normal components are kept, so `.` and `..` never reach the
/// remote namespace.
pub fn remote_path(cloud_root: &str, rel: &Path) -> String {
    let mut path = cloud_root.trim_end_matches('/').to_string();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            path.push('/');
            path.push_str(&part.to_string_lossy());
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
