use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bakeplan::plan::{Chef, Ingredient, WhenDone};
use bakeplan::product::BoundName;

/// A chef that:
/// - logs each product name as it is handed over
/// - reports success at once unless the product is "burnt"
/// - logs `OK` or `FAIL` when the whole recipe is done.
pub struct RecordingChef {
    burnt: BTreeSet<String>,
    log: Mutex<Vec<String>>,
}

impl RecordingChef {
    pub fn new() -> Arc<Self> {
        Self::burning(&[])
    }

    /// Products named in `burnt` fail.
    pub fn burning(burnt: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            burnt: burnt.iter().map(|s| s.to_string()).collect(),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Space-separated log, e.g. `"A B C OK"`.
    pub fn log(&self) -> String {
        self.log.lock().unwrap().join(" ")
    }
}

impl Chef for RecordingChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        let name = ingredient.product.to_string();
        let success = !self.burnt.contains(&name);
        self.log.lock().unwrap().push(name);
        when_done.call(success);
    }

    fn done(&self, all_succeeded: bool) {
        self.log
            .lock()
            .unwrap()
            .push(if all_succeeded { "OK" } else { "FAIL" }.to_string());
    }
}

/// A chef that keeps every completion handle until the test releases it,
/// so completion order is under test control.
pub struct HoldingChef {
    held: Mutex<Vec<WhenDone>>,
    started: Mutex<Vec<BoundName>>,
    finished: Mutex<Option<bool>>,
}

impl HoldingChef {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(None),
        })
    }

    /// Take every handle currently waiting for a report.
    pub fn take_held(&self) -> Vec<WhenDone> {
        self.held.lock().unwrap().drain(..).collect()
    }

    pub fn started(&self) -> Vec<BoundName> {
        self.started.lock().unwrap().clone()
    }

    /// `Some(all_succeeded)` once the recipe is done.
    pub fn finished(&self) -> Option<bool> {
        *self.finished.lock().unwrap()
    }
}

impl Chef for HoldingChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        self.started.lock().unwrap().push(ingredient.product);
        self.held.lock().unwrap().push(when_done);
    }

    fn done(&self, all_succeeded: bool) {
        let mut finished = self.finished.lock().unwrap();
        assert!(finished.is_none(), "done reported twice");
        *finished = Some(all_succeeded);
    }
}

/// A chef that cooks every ingredient on its own OS thread after a short
/// sleep, checking that prerequisites always finish first. Burnt products
/// report failure.
pub struct ThreadedChef {
    burnt: BTreeSet<String>,
    started: Mutex<Vec<BoundName>>,
    completed: Arc<Mutex<Vec<BoundName>>>,
    violations: Arc<Mutex<Vec<String>>>,
    done_calls: Mutex<Vec<bool>>,
    finished: Mutex<Option<mpsc::Sender<bool>>>,
}

impl ThreadedChef {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<bool>) {
        Self::burning(&[])
    }

    pub fn burning(burnt: &[&str]) -> (Arc<Self>, mpsc::Receiver<bool>) {
        let (tx, rx) = mpsc::channel();
        let chef = Arc::new(Self {
            burnt: burnt.iter().map(|s| s.to_string()).collect(),
            started: Mutex::new(Vec::new()),
            completed: Arc::new(Mutex::new(Vec::new())),
            violations: Arc::new(Mutex::new(Vec::new())),
            done_calls: Mutex::new(Vec::new()),
            finished: Mutex::new(Some(tx)),
        });
        (chef, rx)
    }

    /// Every product handed to the chef, in dispatch order.
    pub fn started(&self) -> Vec<BoundName> {
        self.started.lock().unwrap().clone()
    }

    /// Products that finished successfully, in completion order.
    pub fn completed(&self) -> Vec<BoundName> {
        self.completed.lock().unwrap().clone()
    }

    /// Products started before one of their prerequisites completed.
    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }

    /// Every `done` report received.
    pub fn done_calls(&self) -> Vec<bool> {
        self.done_calls.lock().unwrap().clone()
    }
}

impl Chef for ThreadedChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        self.started.lock().unwrap().push(ingredient.product.clone());
        let success = !self.burnt.contains(ingredient.product.as_str());
        let completed = Arc::clone(&self.completed);
        let violations = Arc::clone(&self.violations);

        thread::spawn(move || {
            {
                let done = completed.lock().unwrap();
                for prereq in &ingredient.prerequisites {
                    if !done.contains(prereq) {
                        violations
                            .lock()
                            .unwrap()
                            .push(format!("{} before {}", ingredient.product, prereq));
                    }
                }
            }
            let jitter = ingredient.product.as_str().len() as u64 % 3;
            thread::sleep(Duration::from_millis(1 + jitter));
            if success {
                completed.lock().unwrap().push(ingredient.product.clone());
            }
            when_done.call(success);
        });
    }

    fn done(&self, all_succeeded: bool) {
        self.done_calls.lock().unwrap().push(all_succeeded);
        if let Some(tx) = self.finished.lock().unwrap().take() {
            let _ = tx.send(all_succeeded);
        }
    }
}
