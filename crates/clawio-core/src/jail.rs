//! # Path Jailing
//!
//! Confines untrusted logical paths to a root directory.
//!
//! ## Security Invariant
//!
//! For every input, [`jail(root, p)`](jail) returns `root` joined with a
//! relative path that contains no `..` components. The input is treated as
//! anchored at a virtual `/`: `.` segments are dropped, `..` pops one segment
//! and is a no-op at the virtual root, and any root or drive prefix is
//! discarded. The filesystem is never consulted.
//!
//! Lexical jailing is sufficient as long as `data_dir` contains no symlinks.
//! A store that admits symlinks needs a canonicalizing containment check
//! instead.
//!
//! ## Layout
//!
//! ```text
//! {data_dir}/{first letter of username}/{username}/{logical path}
//! ```

use std::path::{Component, Path, PathBuf};

use crate::identity::Identity;

/// Join `user_path` onto `root` such that the result is always under `root`.
///
/// An empty (or fully cancelled-out) `user_path` resolves to `root` itself.
pub fn jail(root: impl AsRef<Path>, user_path: impl AsRef<Path>) -> PathBuf {
    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
    for component in user_path.as_ref().components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::ParentDir => {
                segments.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let mut jailed = root.as_ref().to_path_buf();
    jailed.extend(segments);
    jailed
}

/// Home directory of `identity`, relative to a virtual root:
/// `/{initial}/{username}`.
pub fn home_dir(identity: &Identity) -> PathBuf {
    let layout = format!("{}/{}", identity.initial(), identity.username());
    jail("/", layout)
}

/// Resolves `(identity, logical path)` pairs to physical storage paths under
/// a fixed data directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    data_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The root that every resolved path is contained in.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Physical location of `identity`'s home directory.
    pub fn home(&self, identity: &Identity) -> PathBuf {
        jail(&self.data_dir, home_dir(identity))
    }

    /// Physical storage path for `logical_path` owned by `identity`.
    ///
    /// `jail(data_dir, jail(home, logical_path))`: the logical path is first
    /// confined to the home, then the home-anchored result is re-rooted under
    /// the data directory.
    pub fn resolve(&self, identity: &Identity, logical_path: &str) -> PathBuf {
        let in_home = jail(home_dir(identity), logical_path);
        jail(&self.data_dir, in_home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Identity {
        Identity::new("test").unwrap()
    }

    #[test]
    fn plain_relative_path() {
        assert_eq!(jail("/data", "a/b/c"), PathBuf::from("/data/a/b/c"));
    }

    #[test]
    fn empty_resolves_to_root() {
        assert_eq!(jail("/data", ""), PathBuf::from("/data"));
        assert_eq!(jail("/data", "/"), PathBuf::from("/data"));
        assert_eq!(jail("/data", "."), PathBuf::from("/data"));
    }

    #[test]
    fn parent_segments_cannot_escape() {
        assert_eq!(jail("/data", "../../etc/passwd"), PathBuf::from("/data/etc/passwd"));
        assert_eq!(jail("/abspath/t/test", "../../.."), PathBuf::from("/abspath/t/test"));
        assert_eq!(jail("/data", "a/../../b"), PathBuf::from("/data/b"));
    }

    #[test]
    fn absolute_input_is_reanchored() {
        assert_eq!(jail("/data", "/etc/passwd"), PathBuf::from("/data/etc/passwd"));
        assert_eq!(jail("/data", "//a///b//"), PathBuf::from("/data/a/b"));
    }

    #[test]
    fn dot_segments_are_dropped() {
        assert_eq!(jail("/data", "./a/./b/."), PathBuf::from("/data/a/b"));
    }

    #[test]
    fn inner_parent_is_resolved_lexically() {
        assert_eq!(jail("/data", "a/b/../c"), PathBuf::from("/data/a/c"));
    }

    #[test]
    fn relative_root_is_kept() {
        assert_eq!(
            jail("../../relativePath/t/test", "../../../../"),
            PathBuf::from("../../relativePath/t/test")
        );
    }

    #[test]
    fn home_layout() {
        assert_eq!(home_dir(&user()), PathBuf::from("/t/test"));
    }

    #[test]
    fn resolve_places_blob_under_home() {
        let resolver = PathResolver::new("/srv/data");
        assert_eq!(
            resolver.resolve(&user(), "myblob"),
            PathBuf::from("/srv/data/t/test/myblob")
        );
        assert_eq!(resolver.home(&user()), PathBuf::from("/srv/data/t/test"));
    }

    #[test]
    fn resolve_cannot_leave_home() {
        let resolver = PathResolver::new("/srv/data");
        let home = resolver.home(&user());
        for p in ["../../other/secret", "/../../..", "..", "a/../../../b"] {
            let resolved = resolver.resolve(&user(), p);
            assert!(resolved.starts_with(&home), "{p:?} resolved to {resolved:?}");
        }
    }

    #[test]
    fn resolve_empty_is_home() {
        let resolver = PathResolver::new("/srv/data");
        assert_eq!(resolver.resolve(&user(), ""), resolver.home(&user()));
    }
}
