// src/product/name.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{BakeError, Result};
use crate::glob::pattern::is_identifier;

/// A product name with an optional set of parameter bindings.
///
/// The canonical form sorts bindings by key, e.g. `cc["arch":"arm","os":"linux"]`.
/// Two names are equal iff their canonical forms are.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundName {
    canonical: String,
    bindings: BTreeMap<String, String>,
}

impl BoundName {
    /// Parse `foo`, `a.b.c` or `foo["x":"y", ...]`.
    pub fn parse(s: &str) -> Result<Self> {
        let (ident, rest) = match s.find('[') {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };

        if !is_dotted_identifier(ident) {
            return Err(BakeError::InvalidName(format!("{s} is not a valid identifier")));
        }

        let bindings = match rest {
            None => BTreeMap::new(),
            Some(rest) => BindingParser::new(s, rest).parse()?,
        };

        Ok(Self::from_parts(ident, bindings))
    }

    fn from_parts(ident: &str, bindings: BTreeMap<String, String>) -> Self {
        Self {
            canonical: canonical_form(ident, &bindings),
            bindings,
        }
    }

    /// The same identifier bound to a new set of bindings.
    pub fn with_bindings(&self, bindings: BTreeMap<String, String>) -> Self {
        Self::from_parts(self.raw_ident(), bindings)
    }

    /// The identifier without bindings: `foo` for `foo["x":"y"]`.
    pub fn raw_ident(&self) -> &str {
        match self.canonical.find('[') {
            Some(i) if !self.bindings.is_empty() => &self.canonical[..i],
            _ => &self.canonical,
        }
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl FromStr for BoundName {
    type Err = BakeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundName").field(&self.canonical).finish()
    }
}

fn is_dotted_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_identifier)
}

fn canonical_form(ident: &str, bindings: &BTreeMap<String, String>) -> String {
    if bindings.is_empty() {
        return ident.to_string();
    }

    let mut out = String::with_capacity(ident.len() + 16 * bindings.len());
    out.push_str(ident);
    let mut sep = '[';
    for (key, value) in bindings {
        out.push(sep);
        push_quoted(&mut out, key);
        out.push(':');
        push_quoted(&mut out, value);
        sep = ',';
    }
    out.push(']');
    out
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Parser for the `"k":"v", ... ]` tail of a bound name.
struct BindingParser<'a> {
    whole: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> BindingParser<'a> {
    fn new(whole: &'a str, tail: &'a str) -> Self {
        Self {
            whole,
            chars: tail.chars().peekable(),
        }
    }

    fn error(&self, what: &str) -> BakeError {
        BakeError::InvalidName(format!("{what} in {}", self.whole))
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn check(&mut self, expected: char) -> bool {
        self.skip_ws();
        self.chars.next_if_eq(&expected).is_some()
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.check(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn string(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse(mut self) -> Result<BTreeMap<String, String>> {
        let mut bindings = BTreeMap::new();

        if !self.check(']') {
            loop {
                let key = self.string()?;
                self.expect(':')?;
                let value = self.string()?;
                if let Some(old) = bindings.insert(key.clone(), value.clone()) {
                    if old != value {
                        return Err(self.error(&format!(
                            "duplicate binding {key:?} with values {old:?} and {value:?}"
                        )));
                    }
                }
                if !self.check(',') {
                    break;
                }
            }
            self.expect(']')?;
        }

        self.skip_ws();
        if self.chars.peek().is_some() {
            return Err(self.error("trailing characters"));
        }
        Ok(bindings)
    }
}
