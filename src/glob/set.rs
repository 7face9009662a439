// src/glob/set.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::Result;
use crate::glob::Glob;

/// A sorted, duplicate-free union of globs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobSet {
    globs: Vec<Glob>,
}

impl GlobSet {
    pub fn new<I: IntoIterator<Item = Glob>>(globs: I) -> Self {
        let unique: BTreeSet<Glob> = globs.into_iter().collect();
        Self {
            globs: unique.into_iter().collect(),
        }
    }

    /// Parse patterns as written in a plan file, expanding `{a,b}` groups.
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut globs = Vec::new();
        for pattern in patterns {
            globs.extend(Glob::expand(pattern.as_ref())?);
        }
        Ok(Self::new(globs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glob> {
        self.globs.iter()
    }

    pub fn len(&self) -> usize {
        self.globs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// True iff some path is matched by a glob of `self` and a glob of `other`.
    pub fn overlaps(&self, other: &GlobSet) -> bool {
        self.globs
            .iter()
            .any(|a| other.globs.iter().any(|b| a.overlaps(b)))
    }

    /// True iff any glob in the set matches the literal path.
    pub fn matches(&self, path: &str) -> bool {
        self.globs.iter().any(|g| g.matches(path))
    }

    /// Every hole name used by any glob in the set.
    pub fn hole_names(&self) -> BTreeSet<String> {
        self.globs
            .iter()
            .flat_map(|g| g.hole_names().map(str::to_string))
            .collect()
    }

    pub fn subst(&self, bindings: &BTreeMap<String, String>) -> Result<Self> {
        let globs = self
            .globs
            .iter()
            .map(|g| g.subst(bindings))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(globs))
    }

    /// Union of two sets.
    pub fn union(&self, other: &GlobSet) -> Self {
        Self::new(self.globs.iter().chain(other.globs.iter()).cloned())
    }
}

impl FromIterator<Glob> for GlobSet {
    fn from_iter<I: IntoIterator<Item = Glob>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a GlobSet {
    type Item = &'a Glob;
    type IntoIter = std::slice::Iter<'a, Glob>;

    fn into_iter(self) -> Self::IntoIter {
        self.globs.iter()
    }
}

impl fmt::Display for GlobSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, glob) in self.globs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{glob}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> GlobSet {
        GlobSet::parse(patterns).unwrap()
    }

    #[test]
    fn sorted_and_deduplicated() {
        let s = set(&["*.c", "*.a", "*.c", "src//*.a"]);
        assert_eq!(s.to_string(), "[*.a, *.c, src/*.a]");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn overlap_is_any_pair() {
        assert!(set(&["*.b", "*.d", "*.e"]).overlaps(&set(&["*.e"])));
        assert!(!set(&["*.b", "*.d"]).overlaps(&set(&["*.e", "*.f"])));
        assert!(!GlobSet::default().overlaps(&set(&["**"])));
    }

    #[test]
    fn collects_hole_names() {
        let s = set(&["out/*(arch)/*.o", "lib/*(arch)/**(path)"]);
        let names: Vec<String> = s.hole_names().into_iter().collect();
        assert_eq!(names, vec!["arch", "path"]);
    }
}
