use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HASH_FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(.*)::h[a-f0-9]{16}$
    "#,
    )
    .expect("valid hash regex")
});

static CRATE_HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(\[[a-f0-9]{16}\])
    ",
    )
    .expect("valid crate hash regex")
});

static COMMON_RUST_SYMBOL_ESCAPES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \$
            (SP|BP|RF|LT|GT|LP|RP|C|
                u7e|u20|u27|u5b|u5d|u7b|u7d|u3b|u2b|u22)
        \$
    ",
    )
    .expect("valid symbol escape regex")
});

/// Returns the base name of a file path.
pub fn filename(s: &str) -> &str {
    s.rsplit(&['/', '\\'][..]).next().unwrap_or(s)
}

/// Strips the trailing `::h<hash>` and any `[<hash>]` crate disambiguators
/// from a demangled symbol.
pub fn strip_symbol(s: &str) -> Cow<'_, str> {
    let stripped_trailing_hash = HASH_FUNC_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map_or(s, |m| m.as_str());

    CRATE_HASH_RE.replace_all(stripped_trailing_hash, "")
}

/// Replaces the `$LT$`-style escapes of legacy Rust symbols.
pub fn demangle_symbol(s: &str) -> String {
    COMMON_RUST_SYMBOL_ESCAPES_RE
        .replace_all(s, |caps: &Captures<'_>| match &caps[1] {
            "SP" => "@",
            "BP" => "*",
            "RF" => "&",
            "LT" => "<",
            "GT" => ">",
            "LP" => "(",
            "RP" => ")",
            "C" => ",",
            "u7e" => "~",
            "u20" => " ",
            "u27" => "'",
            "u5b" => "[",
            "u5d" => "]",
            "u7b" => "{",
            "u7d" => "}",
            "u3b" => ";",
            "u2b" => "+",
            "u22" => "\"",
            _ => "",
        })
        .into_owned()
}

/// Shortens a fully-qualified function name to its function and the module
/// that contains it.
///
/// Only `::` separators outside of generic arguments and trait impl brackets
/// count as path separators.  Closure segments such as `{{closure}}` are kept
/// attached to the function they belong to, so `app::jobs::run::{{closure}}`
/// becomes `jobs::run::{{closure}}`.  A trailing symbol hash is kept, but
/// never taken for the function itself.
pub fn short_function_name(func: &str) -> &str {
    let bytes = func.as_bytes();
    let mut segments = vec![0];
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(i + 2);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let segment = |index: usize| {
        let end = segments.get(index + 1).map_or(func.len(), |next| next - 2);
        &func[segments[index]..end]
    };
    let named = (0..segments.len())
        .rposition(|index| {
            let segment = segment(index);
            !segment.starts_with('{') && !is_symbol_hash(segment)
        })
        .unwrap_or(0);
    let start = segments[named.saturating_sub(1)];
    &func[start..]
}

/// Returns `true` for the `h<16 hex digits>` segment of legacy symbols.
fn is_symbol_hash(segment: &str) -> bool {
    segment.len() == 17
        && segment.starts_with('h')
        && segment[1..].bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn strip_crate_hash() {
        assert_eq!(
            &strip_symbol("std::panic::catch_unwind::hd044952603e5f56c"),
            "std::panic::catch_unwind"
        );
        assert_eq!(
            &strip_symbol("std[550525b9dd91a68e]::rt::lang_start::<()>"),
            "std::rt::lang_start::<()>"
        );
        assert_eq!(
            &strip_symbol("<fn() as core[bb3d6b31f0e973c8]::ops::function::FnOnce<()>>::call_once"),
            "<fn() as core::ops::function::FnOnce<()>>::call_once"
        );
    }

    #[test]
    fn demangle_escapes() {
        assert_eq!(
            demangle_symbol("_$LT$alloc..boxed..Box$LT$F$GT$$u20$as$u20$core..ops..FnOnce$GT$"),
            "_<alloc..boxed..Box<F> as core..ops..FnOnce>"
        );
        assert_eq!(demangle_symbol("app::run"), "app::run");
    }

    #[rstest]
    #[case("/home/user/app/src/main.rs", "main.rs")]
    #[case("C:\\src\\app\\lib.rs", "lib.rs")]
    #[case("lib.rs", "lib.rs")]
    #[case("", "")]
    fn test_filename(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(filename(path), expected);
    }

    #[rstest]
    #[case("main", "main")]
    #[case("unknown", "unknown")]
    #[case("app::main", "app::main")]
    #[case("app::jobs::queue::run", "queue::run")]
    #[case("app::jobs::run::{{closure}}", "jobs::run::{{closure}}")]
    #[case("app::jobs::run::{{closure}}::{{closure}}", "jobs::run::{{closure}}::{{closure}}")]
    #[case("app::jobs::run::{closure#0}", "jobs::run::{closure#0}")]
    #[case("<app::Worker as core::fmt::Debug>::fmt", "<app::Worker as core::fmt::Debug>::fmt")]
    #[case("app::Worker<alloc::string::String>::start", "Worker<alloc::string::String>::start")]
    #[case("app::map::<fn() -> u32>::call", "<fn() -> u32>::call")]
    #[case("app::jobs::run::h701c6a1a3d5c4b52", "jobs::run::h701c6a1a3d5c4b52")]
    #[case(
        "app::jobs::run::{{closure}}::h701c6a1a3d5c4b52",
        "jobs::run::{{closure}}::h701c6a1a3d5c4b52"
    )]
    fn test_short_function_name(#[case] func: &str, #[case] expected: &str) {
        assert_eq!(short_function_name(func), expected);
    }
}
