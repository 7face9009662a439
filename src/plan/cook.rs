// src/plan/cook.rs

//! Driving a [`Recipe`] to completion against a [`Chef`].
//!
//! The engine is a non-blocking state machine. All bookkeeping for one
//! cooking run sits behind a single mutex. Ready ingredients go onto a queue
//! that is drained by one caller at a time, outside the lock, so a chef may
//! report completion synchronously from inside `cook` without the stack
//! growing with the length of a dependency chain.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::plan::{Ingredient, Recipe};
use crate::product::BoundName;

/// The worker side of a cooking run.
pub trait Chef: Send + Sync + 'static {
    /// Build one ingredient and eventually report through `when_done`.
    ///
    /// Called once per ingredient, only after all its prerequisites have
    /// succeeded.
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone);

    /// Called exactly once when every ingredient has been cooked or skipped.
    fn done(&self, all_succeeded: bool);
}

impl Recipe {
    /// Start cooking. Returns as soon as the initial ingredients have been
    /// handed to the chef; progress is driven by [`WhenDone::call`].
    pub fn cook(self, chef: Arc<dyn Chef>) {
        if self.is_empty() {
            info!("empty recipe; nothing to cook");
            chef.done(true);
            return;
        }
        Cooker::start(self, chef);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    Dispatched,
    Cooked,
    Failed,
    Skipped,
}

#[derive(Debug)]
struct CookState {
    waiting_on: Vec<usize>,
    status: Vec<Status>,
    /// Ingredients marked dispatched but not yet handed to the chef.
    ready: VecDeque<usize>,
    /// Set while some caller is handing `ready` to the chef.
    draining: bool,
    finalized: usize,
    failed: bool,
    finished: bool,
}

impl CookState {
    /// Queue newly ready ingredients ahead of older ones, so they are
    /// dispatched depth-first in recipe order. Returns whether the caller
    /// must drain the queue.
    fn enqueue(&mut self, newly_ready: Vec<usize>) -> bool {
        for index in newly_ready.into_iter().rev() {
            self.status[index] = Status::Dispatched;
            self.ready.push_front(index);
        }
        if self.draining || self.ready.is_empty() {
            return false;
        }
        self.draining = true;
        true
    }
}

struct Cooker {
    ingredients: Vec<Ingredient>,
    dependents: Vec<Vec<usize>>,
    chef: Arc<dyn Chef>,
    state: Mutex<CookState>,
}

impl Cooker {
    fn start(recipe: Recipe, chef: Arc<dyn Chef>) {
        let n = recipe.ingredients.len();
        let cooker = Arc::new(Cooker {
            ingredients: recipe.ingredients,
            dependents: recipe.dependents,
            chef,
            state: Mutex::new(CookState {
                waiting_on: recipe.waiting_on,
                status: vec![Status::Pending; n],
                ready: VecDeque::new(),
                draining: false,
                finalized: 0,
                failed: false,
                finished: false,
            }),
        });

        info!(ingredients = n, "cooking recipe");

        let drain = {
            let mut state = cooker.lock();
            let ready: Vec<usize> = (0..n).filter(|&i| state.waiting_on[i] == 0).collect();
            state.enqueue(ready)
        };
        if drain {
            cooker.drain();
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand queued ingredients to the chef until the queue is empty. Only the
    /// caller that set `draining` runs this; reports arriving meanwhile only
    /// enqueue.
    fn drain(self: &Arc<Self>) {
        loop {
            let index = {
                let mut state = self.lock();
                match state.ready.pop_front() {
                    Some(index) => index,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            let ingredient = self.ingredients[index].clone();
            debug!(product = %ingredient.product, "dispatching ingredient");
            let when_done = WhenDone {
                cooker: Arc::clone(self),
                index,
                reported: false,
            };
            self.chef.cook(ingredient, when_done);
        }
    }

    fn finish(self: &Arc<Self>, index: usize, success: bool) {
        let product = &self.ingredients[index].product;

        let (drain, outcome) = {
            let mut state = self.lock();
            if state.status[index] != Status::Dispatched {
                warn!(product = %product, status = ?state.status[index], "ignoring report for ingredient that is not cooking");
                return;
            }

            let mut ready = Vec::new();
            state.finalized += 1;

            if success {
                state.status[index] = Status::Cooked;
                for &d in &self.dependents[index] {
                    state.waiting_on[d] -= 1;
                    if state.waiting_on[d] == 0 && state.status[d] == Status::Pending {
                        ready.push(d);
                    }
                }
                debug!(product = %product, "ingredient cooked");
            } else {
                state.status[index] = Status::Failed;
                state.failed = true;
                let skipped = self.skip_dependents(&mut state, index);
                warn!(product = %product, skipped, "ingredient failed; skipping its dependents");
            }

            let drain = state.enqueue(ready);
            let outcome = if state.finalized == self.ingredients.len() && !state.finished {
                state.finished = true;
                Some(!state.failed)
            } else {
                None
            };
            (drain, outcome)
        };

        if let Some(all_succeeded) = outcome {
            info!(all_succeeded, "recipe finished");
            self.chef.done(all_succeeded);
        }
        if drain {
            self.drain();
        }
    }

    /// Mark every pending transitive dependent of `failed` as skipped.
    fn skip_dependents(&self, state: &mut CookState, failed: usize) -> usize {
        let mut stack: Vec<usize> = self.dependents[failed].clone();
        let mut skipped = 0;

        while let Some(i) = stack.pop() {
            if state.status[i] != Status::Pending {
                continue;
            }
            state.status[i] = Status::Skipped;
            state.finalized += 1;
            skipped += 1;
            debug!(product = %self.ingredients[i].product, "skipped after upstream failure");
            stack.extend(self.dependents[i].iter().copied());
        }

        skipped
    }
}

/// Completion handle for one dispatched ingredient.
///
/// Consumed by [`WhenDone::call`], so each dispatch is reported at most once.
/// Dropping it unreported leaves the recipe unfinished and logs a warning.
#[must_use = "the recipe cannot finish until every ingredient is reported"]
pub struct WhenDone {
    cooker: Arc<Cooker>,
    index: usize,
    reported: bool,
}

impl WhenDone {
    pub fn product(&self) -> &BoundName {
        &self.cooker.ingredients[self.index].product
    }

    pub fn call(mut self, success: bool) {
        self.reported = true;
        self.cooker.finish(self.index, success);
    }
}

impl fmt::Debug for WhenDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenDone")
            .field("product", self.product())
            .field("reported", &self.reported)
            .finish()
    }
}

impl Drop for WhenDone {
    fn drop(&mut self) {
        if !self.reported {
            warn!(product = %self.product(), "completion handle dropped without a report; recipe will not finish");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanGraph;

    /// Reports synchronously, failing the named products.
    struct Logger {
        burnt: Vec<&'static str>,
        log: Mutex<Vec<String>>,
        held: Mutex<Vec<WhenDone>>,
        hold: bool,
    }

    impl Logger {
        fn new(burnt: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                burnt,
                log: Mutex::new(Vec::new()),
                held: Mutex::new(Vec::new()),
                hold: false,
            })
        }

        fn log(&self) -> String {
            self.log.lock().unwrap().join(" ")
        }
    }

    impl Chef for Logger {
        fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
            let name = ingredient.product.to_string();
            self.log.lock().unwrap().push(name.clone());
            if self.hold {
                self.held.lock().unwrap().push(when_done);
            } else {
                when_done.call(!self.burnt.contains(&name.as_str()));
            }
        }

        fn done(&self, all_succeeded: bool) {
            self.log
                .lock()
                .unwrap()
                .push(if all_succeeded { "OK" } else { "FAIL" }.to_string());
        }
    }

    fn n(s: &str) -> BoundName {
        BoundName::parse(s).unwrap()
    }

    fn chain() -> PlanGraph {
        PlanGraph::builder()
            .edge(n("A"), n("B"))
            .edge(n("B"), n("C"))
            .node(n("X"))
            .build()
    }

    #[test]
    fn empty_recipe_finishes_immediately() {
        let chef = Logger::new(vec![]);
        chain().make_recipe(&[]).unwrap().cook(chef.clone());
        assert_eq!(chef.log(), "OK");
    }

    #[test]
    fn failure_skips_dependents_but_not_siblings() {
        let chef = Logger::new(vec!["A"]);
        chain().make_recipe(&[n("C"), n("X")]).unwrap().cook(chef.clone());
        assert_eq!(chef.log(), "A X FAIL");
    }

    #[test]
    fn held_handles_complete_out_of_order() {
        let chef = Arc::new(Logger {
            burnt: vec![],
            log: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            hold: true,
        });
        chain().make_recipe(&[n("C"), n("X")]).unwrap().cook(chef.clone());
        assert_eq!(chef.log(), "A X");

        // X then A; B only becomes ready once A reports.
        let mut held: Vec<WhenDone> = chef.held.lock().unwrap().drain(..).collect();
        let a = held.remove(0);
        let x = held.remove(0);
        assert_eq!(x.product(), &n("X"));
        x.call(true);
        a.call(true);
        assert_eq!(chef.log(), "A X B");

        let b = chef.held.lock().unwrap().pop().unwrap();
        b.call(true);
        let c = chef.held.lock().unwrap().pop().unwrap();
        c.call(true);
        assert_eq!(chef.log(), "A X B C OK");
    }
}
