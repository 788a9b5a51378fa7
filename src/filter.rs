//! Group and locale inclusion/exclusion.
//!
//! Group lists hold exact names (`routes`) or folder wildcards (`admin/*`).
//! A wildcard keeps its `/`, so `admin/*` covers `admin/users` but neither
//! `admin` nor `administration/users`. A `*` anywhere else is literal.

/// One entry of a group list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupPattern {
    Exact(String),
    /// Prefix ending in `/`, from an entry ending in `/*`.
    Prefix(String),
}

impl GroupPattern {
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        pattern.strip_suffix("/*").map_or_else(
            || Self::Exact(pattern.to_string()),
            |folder| Self::Prefix(format!("{folder}/")),
        )
    }

    #[must_use]
    pub fn matches(&self, group: &str) -> bool {
        match self {
            Self::Exact(name) => group == name,
            Self::Prefix(prefix) => group.starts_with(prefix.as_str()),
        }
    }
}

/// Parses a raw option list into patterns.
#[must_use]
pub fn parse_patterns(patterns: &[String]) -> Vec<GroupPattern> {
    patterns.iter().map(|p| GroupPattern::parse(p)).collect()
}

/// Whether any pattern in the list matches `group`.
fn any_matches(patterns: &[String], group: &str) -> bool {
    patterns.iter().any(|p| GroupPattern::parse(p).matches(group))
}

/// A locale is allowed unless it is listed exactly in `ignore_locales`.
#[must_use]
pub fn locale_allowed(locale: &str, ignore_locales: Option<&[String]>) -> bool {
    !ignore_locales.is_some_and(|ignored| ignored.iter().any(|l| l == locale))
}

/// Decides whether `group` takes part in a run.
///
/// A non-empty `only_groups` must match, then a non-empty `ignore_groups` must
/// not. Unset and empty lists impose nothing.
#[must_use]
pub fn group_allowed(
    group: &str,
    only_groups: Option<&[String]>,
    ignore_groups: Option<&[String]>,
) -> bool {
    if let Some(only) = only_groups
        && !only.is_empty()
        && !any_matches(only, group)
    {
        return false;
    }

    if let Some(ignore) = ignore_groups
        && !ignore.is_empty()
        && any_matches(ignore, group)
    {
        return false;
    }

    true
}

/// Filters supplied by the invoking command for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub ignore_locales: Option<Vec<String>>,
    pub ignore_groups: Option<Vec<String>>,
    pub only_groups: Option<Vec<String>>,
}

impl FilterSpec {
    #[must_use]
    pub fn locale_allowed(&self, locale: &str) -> bool {
        locale_allowed(locale, self.ignore_locales.as_deref())
    }

    #[must_use]
    pub fn group_allowed(&self, group: &str) -> bool {
        group_allowed(group, self.only_groups.as_deref(), self.ignore_groups.as_deref())
    }

    /// Names of lists that contain an empty entry.
    ///
    /// An empty entry is kept as a literal filter on the empty name, which no
    /// real group or locale has.
    #[must_use]
    pub fn lists_with_empty_entries(&self) -> Vec<&'static str> {
        [
            ("ignore-locales", &self.ignore_locales),
            ("ignore-groups", &self.ignore_groups),
            ("only-groups", &self.only_groups),
        ]
        .into_iter()
        .filter(|(_, list)| list.as_ref().is_some_and(|l| l.iter().any(String::is_empty)))
        .map(|(name, _)| name)
        .collect()
    }
}
