//! Conversion between physical translation files and (group, key) addresses.
//!
//! The layouts under a language root are:
//!
//! ```text
//! <lang>/<locale>/<name>.php                 plain group
//! <lang>/<locale>/<sub>/<name>.php           nested group  "<sub>/<name>"
//! <lang>/vendor/<package>/<locale>/<name>.php vendor group "vendor/<package>/<name>"
//! <lang>/<locale>.json                       JSON namespace "_json"
//! ```

use std::ffi::OsStr;
use std::path::{
    Component,
    Path,
    PathBuf,
};

use crate::types::JSON_GROUP;

/// Extension of group files.
pub const GROUP_FILE_EXTENSION: &str = "php";
/// Extension of JSON namespace files.
pub const JSON_FILE_EXTENSION: &str = "json";
/// Directory name that marks vendor packages under the language root.
pub const VENDOR_DIR: &str = "vendor";

/// The kind of a group, decided once from its address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Application group; `name` may contain `/` for nested folders.
    Plain { name: String },
    /// Group shipped by a third-party package.
    Vendor { package: String, name: String },
    /// The flat JSON namespace.
    Json,
}

impl GroupKind {
    /// Classifies a stored group string.
    ///
    /// `_json` is the JSON namespace, `vendor/<package>/<name>` with both parts
    /// present is a vendor group, everything else is a plain group.
    #[must_use]
    pub fn parse(group: &str) -> Self {
        if group == JSON_GROUP {
            return Self::Json;
        }

        if let Some(rest) = group.strip_prefix("vendor/")
            && let Some((package, name)) = rest.split_once('/')
            && !package.is_empty()
            && !name.is_empty()
        {
            return Self::Vendor { package: package.to_string(), name: name.to_string() };
        }

        Self::Plain { name: group.to_string() }
    }

    /// The group string stored in the database.
    #[must_use]
    pub fn group(&self) -> String {
        match self {
            Self::Plain { name } => name.clone(),
            Self::Vendor { package, name } => format!("{VENDOR_DIR}/{package}/{name}"),
            Self::Json => JSON_GROUP.to_string(),
        }
    }

    #[must_use]
    pub const fn is_vendor(&self) -> bool {
        matches!(self, Self::Vendor { .. })
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    /// Path of this group's file for `locale`, relative to the language root.
    ///
    /// `None` when the locale, the package or a group segment is not a single
    /// plain path component (empty, `.`, `..`, absolute or holding a
    /// separator), so the path can never leave the language root.
    #[must_use]
    pub fn resolve_path(&self, locale: &str) -> Option<PathBuf> {
        if !is_plain_segment(locale) {
            return None;
        }
        match self {
            Self::Plain { name } => {
                let mut path = PathBuf::from(locale);
                push_group_segments(&mut path, name)?;
                Some(path)
            }
            Self::Vendor { package, name } => {
                if !is_plain_segment(package) {
                    return None;
                }
                let mut path = PathBuf::from(VENDOR_DIR);
                path.push(package);
                path.push(locale);
                push_group_segments(&mut path, name)?;
                Some(path)
            }
            Self::Json => Some(PathBuf::from(format!("{locale}.{JSON_FILE_EXTENSION}"))),
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.group())
    }
}

/// Appends `/`-separated group segments as host path components, the last one
/// as the group file name. Dots inside the name are kept.
fn push_group_segments(path: &mut PathBuf, name: &str) -> Option<()> {
    let mut segments = name.split('/').peekable();
    while let Some(segment) = segments.next() {
        if !is_plain_segment(segment) {
            return None;
        }
        if segments.peek().is_some() {
            path.push(segment);
        } else {
            path.push(format!("{segment}.{GROUP_FILE_EXTENSION}"));
        }
    }
    Some(())
}

/// True when `segment` is exactly one normal path component.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    !segment.contains('/')
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

/// Resolves the group address of a file inside a locale directory.
///
/// The sub-folder path relative to `locale_dir` is joined with `/` whatever
/// the host separator is, then prefixed with `vendor/<package>/` for package
/// files. Returns `None` when `file_path` is not below `locale_dir` or has no
/// usable file stem.
#[must_use]
pub fn resolve_group(
    locale_dir: &Path,
    file_path: &Path,
    vendor_package: Option<&str>,
) -> Option<GroupKind> {
    let relative = file_path.strip_prefix(locale_dir).ok()?;
    let stem = relative.file_stem()?.to_str()?;

    let mut segments = Vec::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
    }
    segments.push(stem);
    let name = segments.join("/");

    Some(match vendor_package {
        Some(package) => GroupKind::Vendor { package: package.to_string(), name },
        None => GroupKind::Plain { name },
    })
}

/// Locale of a JSON namespace file (`<lang>/<locale>.json`). The extension is
/// matched case-sensitively.
#[must_use]
pub fn json_file_locale(file_path: &Path) -> Option<&str> {
    if file_path.extension()? != OsStr::new(JSON_FILE_EXTENSION) {
        return None;
    }
    file_path.file_stem()?.to_str()
}

/// True for files that hold a translation group.
///
/// Extensions match case-sensitively, the same way group files are looked up
/// again by [`GroupKind::resolve_path`].
#[must_use]
pub fn is_group_file(file_path: &Path) -> bool {
    file_path.extension().is_some_and(|e| e == OsStr::new(GROUP_FILE_EXTENSION))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn plain(name: &str) -> GroupKind {
        GroupKind::Plain { name: name.to_string() }
    }

    fn vendor(package: &str, name: &str) -> GroupKind {
        GroupKind::Vendor { package: package.to_string(), name: name.to_string() }
    }

    #[rstest]
    #[case::plain("auth", plain("auth"))]
    #[case::nested("admin/users", plain("admin/users"))]
    #[case::vendor("vendor/acme/messages", vendor("acme", "messages"))]
    #[case::vendor_nested("vendor/acme/admin/panel", vendor("acme", "admin/panel"))]
    #[case::json("_json", GroupKind::Json)]
    #[case::vendor_without_name("vendor/acme", plain("vendor/acme"))]
    #[case::vendor_lookalike("vendors/list", plain("vendors/list"))]
    fn parse_classifies_groups(#[case] group: &str, #[case] expected: GroupKind) {
        let kind = GroupKind::parse(group);

        assert_eq!(kind, expected);
        assert_that!(kind.group(), eq(group));
    }

    #[rstest]
    #[case::plain(plain("auth"), "en", "en/auth.php")]
    #[case::nested(plain("admin/report"), "fr", "fr/admin/report.php")]
    #[case::vendor(vendor("acme", "messages"), "en", "vendor/acme/en/messages.php")]
    #[case::vendor_nested(vendor("acme", "admin/panel"), "nl", "vendor/acme/nl/admin/panel.php")]
    #[case::json(GroupKind::Json, "en", "en.json")]
    #[case::dotted_name(plain("validation.custom"), "en", "en/validation.custom.php")]
    fn resolve_path_builds_relative_paths(
        #[case] kind: GroupKind,
        #[case] locale: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(kind.resolve_path(locale), Some(PathBuf::from(expected)));
    }

    #[rstest]
    #[case::parent_locale(plain("auth"), "..")]
    #[case::current_locale(plain("auth"), ".")]
    #[case::empty_locale(plain("auth"), "")]
    #[case::absolute_locale(plain("auth"), "/tmp")]
    #[case::locale_with_separator(plain("auth"), "en/../..")]
    #[case::parent_segment(plain("../../outside"), "en")]
    #[case::inner_parent_segment(plain("admin/../../x"), "en")]
    #[case::empty_segment(plain("admin//users"), "en")]
    #[case::trailing_separator(plain("admin/"), "en")]
    #[case::parent_package(vendor("..", "messages"), "en")]
    #[case::parent_vendor_name(vendor("acme", "../../x"), "en")]
    #[case::json_parent_locale(GroupKind::Json, "../escaped")]
    fn resolve_path_rejects_escaping_segments(#[case] kind: GroupKind, #[case] locale: &str) {
        assert_eq!(kind.resolve_path(locale), None);
    }

    #[rstest]
    #[case::plain("lang/en", "lang/en/auth.php", None, plain("auth"))]
    #[case::nested("lang/en", "lang/en/admin/users/list.php", None, plain("admin/users/list"))]
    #[case::vendor(
        "lang/vendor/acme/en",
        "lang/vendor/acme/en/messages.php",
        Some("acme"),
        vendor("acme", "messages")
    )]
    #[case::vendor_nested(
        "lang/vendor/acme/en",
        "lang/vendor/acme/en/admin/panel.php",
        Some("acme"),
        vendor("acme", "admin/panel")
    )]
    fn resolve_group_from_file(
        #[case] locale_dir: &str,
        #[case] file: &str,
        #[case] package: Option<&str>,
        #[case] expected: GroupKind,
    ) {
        let kind = resolve_group(Path::new(locale_dir), Path::new(file), package);

        assert_eq!(kind, Some(expected));
    }

    #[googletest::test]
    fn resolve_group_outside_locale_dir() {
        let kind = resolve_group(Path::new("lang/en"), Path::new("lang/fr/auth.php"), None);

        expect_that!(kind, none());
    }

    /// The group resolved from a file maps back to the same file.
    #[rstest]
    #[case("en/auth.php", None)]
    #[case("en/admin/report.php", None)]
    #[case("vendor/acme/en/messages.php", Some("acme"))]
    #[case("vendor/acme/en/admin/panel.php", Some("acme"))]
    fn path_and_group_round_trip(#[case] relative: &str, #[case] package: Option<&str>) {
        let lang = Path::new("/srv/app/lang");
        let locale_dir = match package {
            Some(package) => lang.join(VENDOR_DIR).join(package).join("en"),
            None => lang.join("en"),
        };

        let kind = resolve_group(&locale_dir, &lang.join(relative), package).unwrap();
        let reparsed = GroupKind::parse(&kind.group());

        assert_eq!(reparsed, kind);
        assert_eq!(reparsed.resolve_path("en"), Some(PathBuf::from(relative)));
    }

    #[rstest]
    #[case("lang/en.json", Some("en"))]
    #[case("lang/pt-BR.json", Some("pt-BR"))]
    #[case("lang/en.JSON", None)]
    #[case("lang/en.php", None)]
    #[case("lang/README", None)]
    fn json_file_locale_detection(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(json_file_locale(Path::new(path)), expected);
    }

    #[rstest]
    #[case("lang/en/auth.php", true)]
    #[case("lang/en/auth.PHP", false)]
    #[case("lang/en/.gitkeep", false)]
    #[case("lang/en/notes.txt", false)]
    fn group_file_detection(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_group_file(Path::new(path)), expected);
    }
}
