pub mod runner;

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::meter::Meter;
use crate::notify::{Channel, Sender};
use crate::repository::models::binding::Binding;
use crate::repository::Repo;

/// Schedule times on bindings are local campus time, which is fixed UTC+8.
const LOCAL_UTC_OFFSET_HOURS: u32 = 8;

/// Collaborators a timer firing needs. Everything is a `'static` handle, so
/// the context is freely copied into each spawned job.
#[derive(Clone, Copy)]
pub struct JobContext {
    pub repo: Repo,
    pub meter: Meter,
    pub sender: Sender,
    pub default_channel: Channel,
}

/// In-memory registry of one recurring timer task per active binding.
///
/// The map is the only shared state; it is touched solely under the mutex and
/// only for insert/remove/abort. Meter reads and push sends happen inside the
/// spawned task, never while the lock is held.
pub struct JobScheduler {
    jobs: Mutex<HashMap<i32, JoinHandle<()>>>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        JobScheduler {
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

impl JobScheduler {
    /// Leaks a scheduler for the life of the process, matching the repository
    /// and collaborator handles.
    pub fn initialize() -> &'static JobScheduler {
        Box::leak(Box::new(JobScheduler::default()))
    }

    /// Registers a daily timer for the binding, retiring any existing timer
    /// for the same id first so one binding never has two live jobs.
    pub fn schedule(
        &'static self,
        binding: &Binding,
        ctx: JobContext,
    ) -> Result<(), Error> {
        if binding.id == 0 {
            return Err(Error::Configuration(
                "Binding is missing an id at schedule time.".to_string(),
            ));
        }

        // Rows are validated on the way in, but restore schedules whatever
        // the store holds; a corrupt row must not panic inside the timer.
        if !(0..=23).contains(&binding.schedule_hour)
            || !(0..=59).contains(&binding.schedule_minute)
        {
            return Err(Error::Configuration(format!(
                "Binding {} has schedule time {:02}:{:02} out of range.",
                binding.id, binding.schedule_hour, binding.schedule_minute
            )));
        }

        let (hour, minute) =
            local_to_utc(binding.schedule_hour as u32, binding.schedule_minute as u32);
        let binding = binding.clone();
        let id = binding.id;

        let handle = tokio::spawn(async move {
            loop {
                let wait = until_next_occurrence(Utc::now(), hour, minute);
                tokio::time::sleep(wait).await;

                runner::check_binding(&binding, self, ctx).await;
            }
        });

        let mut jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(e) => {
                handle.abort();
                return Err(Error::Internal(anyhow!(
                    "job registry lock poisoned: {}",
                    e
                )));
            }
        };

        if let Some(old) = jobs.insert(id, handle) {
            old.abort();
        }

        tracing::debug!(
            target = module_path!(),
            binding_id = id,
            utc_hour = hour,
            utc_minute = minute,
            "Scheduled daily electricity check"
        );

        Ok(())
    }

    /// Stops future firings for the id. Unknown ids are a no-op. An already
    /// started firing may still run to completion.
    pub fn cancel(&self, binding_id: i32) {
        let handle = match self.jobs.lock() {
            Ok(mut jobs) => jobs.remove(&binding_id),
            Err(e) => {
                tracing::error!(
                    target = module_path!(),
                    error = e.to_string(),
                    "Could not lock job registry for cancel"
                );
                return;
            }
        };

        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!(
                target = module_path!(),
                binding_id = binding_id,
                "Cancelled scheduled job"
            );
        }
    }

    pub fn is_scheduled(&self, binding_id: i32) -> bool {
        match self.jobs.lock() {
            Ok(jobs) => jobs.contains_key(&binding_id),
            Err(_) => false,
        }
    }

    pub fn active_jobs(&self) -> usize {
        match self.jobs.lock() {
            Ok(jobs) => jobs.len(),
            Err(_) => 0,
        }
    }
}

/// Translates a local (UTC+8) wall-clock time into the UTC recurrence the
/// timers run on, wrapping across midnight.
pub fn local_to_utc(hour: u32, minute: u32) -> (u32, u32) {
    ((hour + 24 - LOCAL_UTC_OFFSET_HOURS) % 24, minute)
}

/// Next UTC instant with the given hour and minute, strictly after `now`.
pub fn next_occurrence(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .expect("hour and minute are validated before scheduling")
        .and_utc();

    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

fn until_next_occurrence(now: DateTime<Utc>, hour: u32, minute: u32) -> std::time::Duration {
    (next_occurrence(now, hour, minute) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}
