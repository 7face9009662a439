// src/glob/overlap.rs

//! Glob intersection test.
//!
//! Each glob is compiled into a small NFA over characters whose transitions
//! are labelled with a literal character, "any character but `/`" (`*`) or
//! "any character" (`**`). Two globs overlap iff the product automaton can
//! reach the pair of accepting states, which a depth-first search over state
//! pairs decides exactly. The special cases mirror the matching regex:
//! `a/**/b` also matches `a/b`, and a trailing `/*` or `/**` also matches
//! the directory itself.

use std::collections::HashSet;

use crate::glob::pattern::Part;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Char(char),
    NotSep,
    Any,
}

impl Label {
    /// Whether some single character satisfies both labels.
    fn compatible(self, other: Label) -> bool {
        match (self, other) {
            (Label::Char(a), Label::Char(b)) => a == b,
            (Label::Char(c), Label::NotSep) | (Label::NotSep, Label::Char(c)) => c != '/',
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Nfa {
    epsilon: Vec<Vec<usize>>,
    steps: Vec<Vec<(Label, usize)>>,
    accept: usize,
}

impl Nfa {
    fn state(&mut self) -> usize {
        self.epsilon.push(Vec::new());
        self.steps.push(Vec::new());
        self.steps.len() - 1
    }

    fn eps(&mut self, from: usize, to: usize) {
        self.epsilon[from].push(to);
    }

    fn step(&mut self, from: usize, label: Label, to: usize) {
        self.steps[from].push((label, to));
    }

    /// Kleene star of `label` starting at `cur`; returns the state after it.
    fn repeat(&mut self, cur: usize, label: Label) -> usize {
        let looped = self.state();
        self.eps(cur, looped);
        self.step(looped, label, looped);
        let next = self.state();
        self.eps(looped, next);
        next
    }

    pub(crate) fn from_parts(parts: &[Part]) -> Self {
        let mut nfa = Nfa::default();
        let mut cur = nfa.state();
        let n = parts.len();
        let mut i = 0;

        while i < n {
            match &parts[i] {
                Part::Literal(s) => {
                    for c in s.chars() {
                        let next = nfa.state();
                        nfa.step(cur, Label::Char(c), next);
                        cur = next;
                    }
                }
                Part::Star(_) => cur = nfa.repeat(cur, Label::NotSep),
                Part::DoubleStar(_) if matches!(parts.get(i + 1), Some(Part::Sep)) => {
                    // (?:.+/)?
                    let after = nfa.state();
                    let inner = nfa.state();
                    nfa.eps(cur, after);
                    nfa.step(cur, Label::Any, inner);
                    nfa.step(inner, Label::Any, inner);
                    nfa.step(inner, Label::Char('/'), after);
                    cur = after;
                    i += 1;
                }
                Part::DoubleStar(_) => cur = nfa.repeat(cur, Label::Any),
                Part::Sep if i + 2 == n && matches!(parts[i + 1], Part::Star(_) | Part::DoubleStar(_)) => {
                    // (?:/[^/]*)? or (?:/.*)?
                    let label = if matches!(parts[i + 1], Part::Star(_)) {
                        Label::NotSep
                    } else {
                        Label::Any
                    };
                    let end = nfa.state();
                    let slash = nfa.state();
                    nfa.eps(cur, end);
                    nfa.step(cur, Label::Char('/'), slash);
                    nfa.step(slash, label, slash);
                    nfa.eps(slash, end);
                    cur = end;
                    i += 1;
                }
                Part::Sep => {
                    let next = nfa.state();
                    nfa.step(cur, Label::Char('/'), next);
                    cur = next;
                }
            }
            i += 1;
        }

        nfa.accept = cur;
        nfa
    }

    /// True iff some string is accepted by both automata.
    pub(crate) fn intersects(&self, other: &Nfa) -> bool {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut stack = vec![(0usize, 0usize)];

        while let Some((p, q)) = stack.pop() {
            if !seen.insert((p, q)) {
                continue;
            }
            if p == self.accept && q == other.accept {
                return true;
            }

            stack.extend(self.epsilon[p].iter().map(|&p2| (p2, q)));
            stack.extend(other.epsilon[q].iter().map(|&q2| (p, q2)));

            for &(a, p2) in &self.steps[p] {
                for &(b, q2) in &other.steps[q] {
                    if a.compatible(b) {
                        stack.push((p2, q2));
                    }
                }
            }
        }

        false
    }
}
