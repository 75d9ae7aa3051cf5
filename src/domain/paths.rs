//! Canonical lakehouse path construction.
//!
//! OneLake addresses table and file directories as
//! `<workspace>/<lakehouse>.Lakehouse/<Tables|Files>/<path>`. Callers pass
//! names in several near-canonical shapes (with or without the `.Lakehouse`
//! suffix, with or without a leading slash or kind prefix), so every remote
//! operation funnels through [`normalize_lakehouse_path`]. A path that does
//! not match the expected layout would not fail remotely, it would silently
//! create a wrong directory.

use std::fmt;

/// The two top-level data areas of a lakehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathKind {
    #[default]
    Files,
    Tables,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Files => "Files",
            PathKind::Tables => "Tables",
        }
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the canonical remote path for a directory inside a lakehouse.
///
/// Rules, applied in order:
/// 1. append `.Lakehouse` to the lakehouse name unless already present;
/// 2. strip exactly one leading `/` from the relative path;
/// 3. if a workspace is given, strip one leading and one trailing `/` from
///    it and prepend it to the lakehouse segment;
/// 4. strip an already-present `<kind>/` prefix from the relative path so
///    the kind segment never doubles;
/// 5. join as `<workspace?>/<lakehouse>/<kind>/<path>`.
///
/// Deterministic, no I/O. Repeated suffixes and kind prefixes collapse, so
/// `normalize("lh", "Tables/foo", None, Tables)` and
/// `normalize("lh.Lakehouse", "foo", None, Tables)` agree.
pub fn normalize_lakehouse_path(
    lakehouse_name: &str,
    relative_path: &str,
    workspace_name: Option<&str>,
    kind: PathKind,
) -> String {
    let mut lakehouse = if lakehouse_name.ends_with(".Lakehouse") {
        lakehouse_name.to_string()
    } else {
        format!("{}.Lakehouse", lakehouse_name)
    };

    let mut path = relative_path.strip_prefix('/').unwrap_or(relative_path);

    if let Some(workspace) = workspace_name {
        let workspace = workspace.strip_prefix('/').unwrap_or(workspace);
        let workspace = workspace.strip_suffix('/').unwrap_or(workspace);
        lakehouse = format!("{}/{}", workspace, lakehouse);
    }

    let kind_prefix = format!("{}/", kind.as_str());
    if let Some(stripped) = path.strip_prefix(kind_prefix.as_str()) {
        path = stripped;
    }

    format!("{}/{}/{}", lakehouse, kind.as_str(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_and_kind_prefix_collapse() {
        let a = normalize_lakehouse_path("lh", "Tables/foo", None, PathKind::Tables);
        let b = normalize_lakehouse_path("lh.Lakehouse", "foo", None, PathKind::Tables);
        assert_eq!(a, "lh.Lakehouse/Tables/foo");
        assert_eq!(a, b);
    }

    #[test]
    fn test_strips_single_leading_slash_only() {
        assert_eq!(
            normalize_lakehouse_path("lh", "/a/b", None, PathKind::Files),
            "lh.Lakehouse/Files/a/b"
        );
        // Internal slashes are kept verbatim; only one leading slash goes.
        assert_eq!(
            normalize_lakehouse_path("lh", "//a", None, PathKind::Files),
            "lh.Lakehouse/Files//a"
        );
    }

    #[test]
    fn test_workspace_prefix_is_trimmed() {
        assert_eq!(
            normalize_lakehouse_path("lh", "foo", Some("/FabricDW [Dev]/"), PathKind::Files),
            "FabricDW [Dev]/lh.Lakehouse/Files/foo"
        );
        assert_eq!(
            normalize_lakehouse_path("lh", "foo", Some("ws"), PathKind::Tables),
            "ws/lh.Lakehouse/Tables/foo"
        );
    }

    #[test]
    fn test_foreign_kind_prefix_is_kept() {
        // Only the requested kind's own prefix is deduplicated.
        assert_eq!(
            normalize_lakehouse_path("lh", "Files/x", None, PathKind::Tables),
            "lh.Lakehouse/Tables/Files/x"
        );
    }

    #[test]
    fn test_default_kind_is_files() {
        assert_eq!(
            normalize_lakehouse_path("lh", "temp/export", None, PathKind::default()),
            "lh.Lakehouse/Files/temp/export"
        );
    }
}
