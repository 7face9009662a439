// src/glob/pattern.rs

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::errors::{BakeError, Result};
use crate::glob::overlap::Nfa;

/// `{a,b}` group used for shell-style expansion in plan files.
static BRACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^,}]*,[^}]*)\}").expect("static regex"));

/// One syntactic element of a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Literal(String),
    Sep,
    /// `*`: any run of characters except `/`.
    Star(Option<String>),
    /// `**`: any run of characters.
    DoubleStar(Option<String>),
}

impl Part {
    fn is_star(&self) -> bool {
        matches!(self, Part::Star(_) | Part::DoubleStar(_))
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Part::Literal(s) => out.push_str(s),
            Part::Sep => out.push('/'),
            Part::Star(hole) | Part::DoubleStar(hole) => {
                out.push_str(if matches!(self, Part::Star(_)) { "*" } else { "**" });
                if let Some(name) = hole {
                    out.push('(');
                    out.push_str(name);
                    out.push(')');
                }
            }
        }
    }
}

/// Artifacts derived from the parts once at parse time.
#[derive(Debug)]
struct Compiled {
    regex: Regex,
    /// Hole name for each capture group, in group order.
    holes: Vec<String>,
    nfa: Nfa,
}

/// A pattern that matches a group of files.
///
/// Equality, ordering and hashing use the normalized text, so `a//b/` and
/// `a/b` are the same glob.
#[derive(Clone)]
pub struct Glob {
    text: String,
    parts: Vec<Part>,
    compiled: Arc<Compiled>,
}

impl Glob {
    /// Parse a single glob. Brace groups are not expanded here; see
    /// [`Glob::expand`].
    pub fn parse(pattern: &str) -> Result<Self> {
        let normalized = normalize(pattern);
        let parts = parse_parts(&normalized).ok_or_else(|| bad_glob(pattern))?;
        Self::from_parts(parts).map_err(|_| bad_glob(pattern))
    }

    /// Shell-style expansion of `{x,y}` groups followed by parsing, e.g.
    /// `src/*.{c,h}` yields `[src/*.c, src/*.h]`.
    pub fn expand(pattern: &str) -> Result<Vec<Self>> {
        let mut expanded = Vec::new();
        expand_braces(pattern, &mut expanded);
        expanded.iter().map(|g| Self::parse(g)).collect()
    }

    fn from_parts(parts: Vec<Part>) -> std::result::Result<Self, regex::Error> {
        let mut text = String::new();
        for part in &parts {
            part.write_to(&mut text);
        }

        let mut holes = Vec::new();
        let regex = Regex::new(&to_regex(&parts, &mut holes))?;
        let nfa = Nfa::from_parts(&parts);

        Ok(Self {
            text,
            parts,
            compiled: Arc::new(Compiled { regex, holes, nfa }),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Names of the parameter holes in this glob, in order of appearance
    /// (repeats included).
    pub fn hole_names(&self) -> impl Iterator<Item = &str> {
        self.compiled.holes.iter().map(String::as_str)
    }

    pub fn has_holes(&self) -> bool {
        !self.compiled.holes.is_empty()
    }

    /// True iff this glob matches the given normalized path.
    pub fn matches(&self, path: &str) -> bool {
        self.match_with_bindings(path, &mut BTreeMap::new())
    }

    /// True iff this glob matches `path` consistently with `bindings`.
    ///
    /// Holes already present in `bindings` must capture exactly the bound
    /// value. On success, values captured by holes that were not yet bound
    /// are added to `bindings`; on failure `bindings` is left untouched.
    pub fn match_with_bindings(&self, path: &str, bindings: &mut BTreeMap<String, String>) -> bool {
        let Some(caps) = self.compiled.regex.captures(path) else {
            return false;
        };

        let mut fresh: BTreeMap<String, String> = BTreeMap::new();
        for (idx, name) in self.compiled.holes.iter().enumerate() {
            let value = caps.get(idx + 1).map(|m| m.as_str()).unwrap_or("");
            if let Some(bound) = bindings.get(name) {
                if bound != value {
                    return false;
                }
            } else if let Some(previous) = fresh.insert(name.clone(), value.to_string()) {
                if previous != value {
                    return false;
                }
            }
        }

        bindings.extend(fresh);
        true
    }

    /// True iff some path is matched by both globs.
    pub fn overlaps(&self, other: &Glob) -> bool {
        self.compiled.nfa.intersects(&other.compiled.nfa)
    }

    /// Substitute parameter values for the named holes they bind.
    ///
    /// Unbound holes are kept. Empty values collapse the separators around
    /// them, so `out/*(arch)/lib` with `arch = ""` becomes `out/lib`.
    pub fn subst(&self, bindings: &BTreeMap<String, String>) -> Result<Self> {
        if !self.has_holes() {
            return Ok(self.clone());
        }

        let mut text = String::new();
        for part in &self.parts {
            match part {
                Part::Star(Some(name)) | Part::DoubleStar(Some(name)) => match bindings.get(name) {
                    Some(value) => {
                        if value.contains('*') {
                            return Err(BakeError::InvalidParameters(format!(
                                "value {value:?} for parameter '{name}' of glob {} contains '*'",
                                self.text
                            )));
                        }
                        text.push_str(value);
                    }
                    None => part.write_to(&mut text),
                },
                other => other.write_to(&mut text),
            }
        }

        let text = if self.text.starts_with('/') {
            text.as_str()
        } else {
            text.trim_start_matches('/')
        };
        Self::parse(text)
    }
}

impl fmt::Display for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.text).finish()
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Glob {}

impl Hash for Glob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for Glob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Glob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

fn bad_glob(pattern: &str) -> BakeError {
    BakeError::InvalidGlob(format!("'{pattern}'"))
}

/// Fold runs of `/` and drop a trailing `/` (except for the root glob `/`).
fn normalize(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn parse_parts(s: &str) -> Option<Vec<Part>> {
    let chars: Vec<char> = s.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                let double = chars.get(i + 1) == Some(&'*');
                i += if double { 2 } else { 1 };
                if chars.get(i) == Some(&'*') {
                    return None;
                }

                let mut hole = None;
                if chars.get(i) == Some(&'(') {
                    let close = i + chars[i..].iter().position(|&c| c == ')')?;
                    let name: String = chars[i + 1..close].iter().collect();
                    if !is_identifier(&name) {
                        return None;
                    }
                    hole = Some(name);
                    i = close + 1;
                }

                parts.push(if double {
                    Part::DoubleStar(hole)
                } else {
                    Part::Star(hole)
                });
            }
            '/' => {
                parts.push(Part::Sep);
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != '/' && chars[i] != '*' {
                    i += 1;
                }
                parts.push(Part::Literal(chars[start..i].iter().collect()));
            }
        }
    }

    // `.` and `..` are not allowed as path segments.
    for segment in parts.split(|p| *p == Part::Sep) {
        if let [Part::Literal(lit)] = segment {
            if lit == "." || lit == ".." {
                return None;
            }
        }
    }

    Some(parts)
}

/// Build an anchored regex for the parts, recording the hole name of each
/// capture group in `holes`.
fn to_regex(parts: &[Part], holes: &mut Vec<String>) -> String {
    let mut re = String::from("^(?s:");
    let n = parts.len();
    let mut i = 0;

    let mut group = |hole: &Option<String>, body: &str, re: &mut String| match hole {
        Some(name) => {
            holes.push(name.clone());
            re.push('(');
            re.push_str(body);
            re.push(')');
        }
        None => re.push_str(body),
    };

    while i < n {
        match &parts[i] {
            Part::Literal(s) => re.push_str(&regex::escape(s)),
            Part::Star(hole) => group(hole, "[^/]*", &mut re),
            Part::DoubleStar(hole) => {
                if parts.get(i + 1) == Some(&Part::Sep) {
                    // a/**/b also matches a/b
                    re.push_str("(?:");
                    group(hole, ".+", &mut re);
                    re.push_str("/)?");
                    i += 1;
                } else {
                    group(hole, ".*", &mut re);
                }
            }
            Part::Sep => {
                if i + 2 == n && parts[i + 1].is_star() {
                    // a/* and a/** also match a
                    re.push_str("(?:/");
                    match &parts[i + 1] {
                        Part::Star(hole) => group(hole, "[^/]*", &mut re),
                        Part::DoubleStar(hole) => group(hole, ".*", &mut re),
                        _ => unreachable!("checked by is_star"),
                    }
                    re.push_str(")?");
                    i += 1;
                } else {
                    re.push('/');
                }
            }
        }
        i += 1;
    }

    re.push_str(")$");
    re
}

fn expand_braces(pattern: &str, out: &mut Vec<String>) {
    let group = BRACES
        .captures(pattern)
        .and_then(|caps| Some((caps.get(0)?, caps.get(1)?)));
    match group {
        None => out.push(pattern.to_string()),
        Some((whole, options)) => {
            for option in options.as_str().split(',') {
                let candidate = format!(
                    "{}{}{}",
                    &pattern[..whole.start()],
                    option,
                    &pattern[whole.end()..]
                );
                expand_braces(&candidate, out);
            }
        }
    }
}
