//! RFC 3986 generic-syntax URI splitting (C1).
//!
//! `parse` performs no percent-decoding and no validation beyond the
//! generic-syntax separators; every field is a borrowed slice of the input.
//! Re-encoding percent escapes, if desired, is the caller's job.

use crate::error::{Error, Result};

/// The authority component: `[userinfo@]host[:port]`.
///
/// Present-but-empty (`scheme://path`) is represented by `Uri::authority`
/// being `Some(Authority::default())`, distinct from `None` (`scheme:path`,
/// no `//` at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Authority<'a> {
    pub userinfo: Option<&'a str>,
    pub host: &'a str,
    pub port: Option<&'a str>,
}

/// A parsed URI: `scheme:[//authority]path[?query][#fragment]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uri<'a> {
    pub scheme: &'a str,
    pub authority: Option<Authority<'a>>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

fn is_scheme_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

impl<'a> Uri<'a> {
    /// Parses `input` per RFC 3986's generic syntax.
    ///
    /// Fails with [`Error::InvalidInput`] if the scheme is malformed or the
    /// `:` separator after it is missing.
    pub fn parse(input: &'a str) -> Result<Self> {
        let (scheme, rest) = split_scheme(input)?;

        let (authority, rest) = if let Some(after_slashes) = rest.strip_prefix("//") {
            let end = after_slashes
                .find(['/', '?', '#'])
                .unwrap_or(after_slashes.len());
            let (auth_str, rest) = after_slashes.split_at(end);
            (Some(parse_authority(auth_str)), rest)
        } else {
            (None, rest)
        };

        let (path_and_query, fragment) = match rest.split_once('#') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };

        let (path, query) = match path_and_query.split_once('?') {
            Some((head, tail)) => (head, Some(tail)),
            None => (path_and_query, None),
        };

        Ok(Uri {
            scheme,
            authority,
            path,
            query,
            fragment,
        })
    }

    /// Reassembles the URI into an owned string. For any parser output this
    /// round-trips to a string that re-parses to the same `Uri` (property 1
    /// in spec.md §8) — separators are reinserted, nothing is decoded.
    pub fn to_owned_string(&self) -> String {
        let mut out = String::with_capacity(self.path.len() + self.scheme.len() + 8);
        out.push_str(self.scheme);
        out.push(':');
        if let Some(authority) = &self.authority {
            out.push_str("//");
            if let Some(userinfo) = authority.userinfo {
                out.push_str(userinfo);
                out.push('@');
            }
            out.push_str(authority.host);
            if let Some(port) = authority.port {
                out.push(':');
                out.push_str(port);
            }
        }
        out.push_str(self.path);
        if let Some(query) = self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

fn split_scheme(input: &str) -> Result<(&str, &str)> {
    let colon = input
        .find(':')
        .ok_or_else(|| Error::invalid_input("missing ':' after scheme"))?;
    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    let first = chars
        .next()
        .ok_or_else(|| Error::invalid_input("empty scheme"))?;
    if !is_scheme_start(first) || !chars.all(is_scheme_char) {
        return Err(Error::invalid_input(format!("malformed scheme: {scheme}")));
    }
    Ok((scheme, &input[colon + 1..]))
}

fn parse_authority(auth: &str) -> Authority<'_> {
    let (userinfo, host_port) = match auth.split_once('@') {
        Some((user, rest)) => (Some(user), rest),
        None => (None, auth),
    };
    let (host, port) = match host_port.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    };
    Authority {
        userinfo,
        host,
        port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_full_uri() {
        let uri = Uri::parse("mongo://user:pw@db.example:27017/rbh?x=1#f").unwrap();
        assert_eq!(uri.scheme, "mongo");
        let authority = uri.authority.unwrap();
        assert_eq!(authority.userinfo, Some("user:pw"));
        assert_eq!(authority.host, "db.example");
        assert_eq!(authority.port, Some("27017"));
        assert_eq!(uri.path, "/rbh");
        assert_eq!(uri.query, Some("x=1"));
        assert_eq!(uri.fragment, Some("f"));
    }

    #[test]
    fn s2_no_authority() {
        let uri = Uri::parse("file:/tmp/x").unwrap();
        assert_eq!(uri.scheme, "file");
        assert!(uri.authority.is_none());
        assert_eq!(uri.path, "/tmp/x");
        assert!(uri.query.is_none());
        assert!(uri.fragment.is_none());
    }

    #[test]
    fn empty_authority_is_distinct_from_absent() {
        let uri = Uri::parse("file:///tmp/x").unwrap();
        let authority = uri.authority.expect("empty but present authority");
        assert_eq!(authority.host, "");
        assert_eq!(uri.path, "/tmp/x");
    }

    #[test]
    fn plugin_style_uri() {
        let uri = Uri::parse("rbh:myplugin:arg").unwrap();
        assert_eq!(uri.scheme, "rbh");
        assert!(uri.authority.is_none());
        assert_eq!(uri.path, "myplugin:arg");
    }

    #[test]
    fn missing_colon_is_invalid() {
        assert!(matches!(
            Uri::parse("not-a-uri"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn scheme_must_start_with_letter() {
        assert!(matches!(Uri::parse("7up:thing"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn scheme_rejects_bad_chars() {
        assert!(matches!(
            Uri::parse("mo ngo:thing"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn round_trip() {
        for input in [
            "mongo://user:pw@db.example:27017/rbh?x=1#f",
            "file:/tmp/x",
            "file:///tmp/x",
            "rbh:myplugin:arg",
        ] {
            let uri = Uri::parse(input).unwrap();
            let reassembled = uri.to_owned_string();
            let reparsed = Uri::parse(&reassembled).unwrap();
            assert_eq!(uri, reparsed);
        }
    }

    proptest::proptest! {
        // Property 1 (spec.md §8): parsing is lossless over the generic
        // syntax's separators. Components are restricted to delimiter-free
        // characters since the parser never percent-decodes — feeding it a
        // raw `/`, `?`, `#`, `@` or `:` inside a component would just be
        // handing it a *different*, differently-structured URI, not
        // testing round-tripping.
        #[test]
        fn round_trip_holds_for_arbitrary_safe_components(
            scheme in "[a-zA-Z][a-zA-Z0-9+.-]{0,15}",
            host in "[a-zA-Z0-9]{0,10}",
            path_segment in "[a-zA-Z0-9]{0,10}",
            query in proptest::option::of("[a-zA-Z0-9=]{0,10}"),
        ) {
            let mut input = format!("{scheme}://{host}/{path_segment}");
            if let Some(q) = &query {
                input.push('?');
                input.push_str(q);
            }
            let uri = Uri::parse(&input).unwrap();
            let reassembled = uri.to_owned_string();
            let reparsed = Uri::parse(&reassembled).unwrap();
            proptest::prop_assert_eq!(uri, reparsed);
        }
    }
}
