// src/exec/chef.rs

//! The production [`Chef`]: one tokio task per ingredient, gated by a
//! semaphore sized to `jobs`.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, warn};

use crate::exec::ChefSettings;
use crate::exec::action_runner::cook_product;
use crate::plan::{Chef, Ingredient, WhenDone};
use crate::product::BoundName;

#[derive(Debug, Default)]
struct Outcomes {
    succeeded: Vec<BoundName>,
    failed: Vec<BoundName>,
}

/// Runs each ingredient's actions as shell processes.
///
/// Must be created inside a tokio runtime; `cook` spawns onto it.
pub struct ProcessChef {
    settings: Arc<ChefSettings>,
    permits: Arc<Semaphore>,
    handle: Handle,
    outcomes: Arc<Mutex<Outcomes>>,
    finished: Mutex<Option<oneshot::Sender<bool>>>,
}

impl ProcessChef {
    /// `finished` receives `all_succeeded` once the recipe is done.
    pub fn new(settings: ChefSettings, finished: oneshot::Sender<bool>) -> Self {
        let jobs = settings.jobs.max(1);
        Self {
            settings: Arc::new(settings),
            permits: Arc::new(Semaphore::new(jobs)),
            handle: Handle::current(),
            outcomes: Arc::new(Mutex::new(Outcomes::default())),
            finished: Mutex::new(Some(finished)),
        }
    }

    /// Products that succeeded and failed so far, in completion order.
    pub fn outcomes(&self) -> (Vec<BoundName>, Vec<BoundName>) {
        let outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        (outcomes.succeeded.clone(), outcomes.failed.clone())
    }
}

impl Chef for ProcessChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        let settings = Arc::clone(&self.settings);
        let permits = Arc::clone(&self.permits);
        let outcomes = Arc::clone(&self.outcomes);

        self.handle.spawn(async move {
            let success = match &ingredient.definition {
                None => {
                    warn!(product = %ingredient.product, "no definition for product; cannot cook it");
                    false
                }
                Some(product) => match permits.acquire_owned().await {
                    Ok(_permit) => cook_product(product, &settings).await,
                    Err(err) => {
                        warn!(product = %ingredient.product, error = %err, "job semaphore closed");
                        false
                    }
                },
            };

            {
                let mut outcomes = outcomes.lock().unwrap_or_else(PoisonError::into_inner);
                if success {
                    outcomes.succeeded.push(ingredient.product.clone());
                } else {
                    outcomes.failed.push(ingredient.product.clone());
                }
            }
            debug!(product = %ingredient.product, success, "reporting ingredient");
            when_done.call(success);
        });
    }

    fn done(&self, all_succeeded: bool) {
        let sender = self
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(all_succeeded);
        }
    }
}
