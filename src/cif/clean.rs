//! String clean-up helpers for values pulled out of CIF files.

use std::borrow::Cow;

use regex::Regex;

/// An ordered list of regex substitutions, compiled once.
///
/// ```ignore
/// let cleaner = LineCleaner::new(&[(r",\s+", ","), ("'", "")])?;
/// assert_eq!(cleaner.apply("'x,  y, z'"), "x,y,z");
/// ```
#[derive(Debug, Clone)]
pub struct LineCleaner {
    rules: Vec<(Regex, String)>,
}

impl LineCleaner {
    pub fn new(patterns: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let rules = patterns
            .iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, replacement.to_string())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Apply every substitution, in order, to `line`.
    pub fn apply<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(line);
        for (pattern, replacement) in &self.rules {
            let replaced = match pattern.replace_all(&out, replacement.as_str()) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = replaced {
                out = Cow::Owned(s);
            }
        }
        out
    }
}

/// Replace whitespace enclosed in quotes with `replacement`.
///
/// Quote state flips on every `'` or `"`, without pairing them up.
pub fn remove_nondelimiting_whitespace(s: &str, replacement: &str) -> String {
    let mut in_quotes = false;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if in_quotes && c == ' ' {
            out.push_str(replacement);
            continue;
        }
        out.push(c);
        if c == '\'' || c == '"' {
            in_quotes = !in_quotes;
        }
    }
    out
}
