use crate::error::{CoreError, Result};

/// Outcome of matching a free-text name against a user directory.
#[derive(Debug)]
pub struct Resolved<'a, T> {
    pub user: &'a T,
    /// `true` when some name matched exactly (ignoring case).
    pub exact: bool,
    /// Other partial matches passed over in favour of `user`.
    pub passed_over: Vec<&'a T>,
}

impl<T> Resolved<'_, T> {
    pub fn is_ambiguous(&self) -> bool {
        !self.passed_over.is_empty()
    }
}

/// Pick the user `query` refers to.
///
/// Policy, in order:
/// 1. the first candidate with any name equal to `query`, ignoring case;
/// 2. otherwise the first candidate (in listing order) with any name
///    containing `query`, ignoring case. The other partial matches are
///    returned in `passed_over` and logged.
///
/// `names` yields every name a candidate goes by (handle, real name,
/// display name); empty names never match.
pub fn resolve<'a, T, F>(query: &str, candidates: &'a [T], names: F) -> Result<Resolved<'a, T>>
where
    F: Fn(&T) -> Vec<&str>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(CoreError::IdentityNotFound(query.to_string()));
    }

    let lowered = |c: &T| -> Vec<String> {
        names(c)
            .into_iter()
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
            .collect()
    };

    if let Some(user) = candidates
        .iter()
        .find(|c| lowered(*c).iter().any(|n| *n == needle))
    {
        return Ok(Resolved {
            user,
            exact: true,
            passed_over: Vec::new(),
        });
    }

    let mut partial = candidates
        .iter()
        .filter(|c| lowered(*c).iter().any(|n| n.contains(&needle)));
    let Some(user) = partial.next() else {
        return Err(CoreError::IdentityNotFound(query.to_string()));
    };
    let passed_over: Vec<&T> = partial.collect();

    if !passed_over.is_empty() {
        let others: Vec<String> = passed_over
            .iter()
            .filter_map(|c| names(*c).into_iter().find(|n| !n.is_empty()).map(String::from))
            .collect();
        tracing::warn!(
            query,
            chosen = names(user).into_iter().find(|n| !n.is_empty()).unwrap_or_default(),
            others = %others.join(", "),
            "multiple users match; using the first"
        );
    }

    Ok(Resolved {
        user,
        exact: false,
        passed_over,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User {
        handle: &'static str,
        real_name: &'static str,
    }

    fn directory() -> Vec<User> {
        vec![
            User { handle: "annabel", real_name: "Annabel Lee" },
            User { handle: "ann", real_name: "" },
            User { handle: "joanna", real_name: "Joanna Smith" },
            User { handle: "bob", real_name: "Robert Ann-Marie" },
        ]
    }

    fn names(u: &User) -> Vec<&str> {
        vec![u.handle, u.real_name]
    }

    #[test]
    fn exact_match_beats_earlier_partial_matches() {
        let users = directory();
        let r = resolve("ANN", &users, names).unwrap();
        assert_eq!(r.user.handle, "ann");
        assert!(r.exact);
        assert!(!r.is_ambiguous());
    }

    #[test]
    fn exact_match_on_real_name() {
        let users = directory();
        let r = resolve("joanna smith", &users, names).unwrap();
        assert_eq!(r.user.handle, "joanna");
        assert!(r.exact);
    }

    #[test]
    fn first_partial_match_wins_and_reports_the_rest() {
        let users = directory();
        let r = resolve("  anna ", &users, names).unwrap();
        assert_eq!(r.user.handle, "annabel");
        assert!(!r.exact);
        let others: Vec<_> = r.passed_over.iter().map(|u| u.handle).collect();
        assert_eq!(others, vec!["joanna"]);
    }

    #[test]
    fn unique_partial_match_is_not_ambiguous() {
        let users = directory();
        let r = resolve("robert", &users, names).unwrap();
        assert_eq!(r.user.handle, "bob");
        assert!(!r.is_ambiguous());
    }

    #[test]
    fn no_match_is_an_error() {
        let users = directory();
        assert!(matches!(
            resolve("zed", &users, names),
            Err(CoreError::IdentityNotFound(q)) if q == "zed"
        ));
        assert!(resolve("   ", &users, names).is_err());
    }
}
