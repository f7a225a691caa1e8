use serde::Deserialize;

use crate::error::Error;
use crate::jobs::{JobContext, JobScheduler};
use crate::notify::{Alert, Channel};
use crate::repository::models::binding::{Binding, NewBinding};

/// Identifies the subscriber: who the bindings are for and where pushes go.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub student_id: String,
    pub device_token: String,
}

/// One desired subscription slot, before it has been validated or persisted.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingSpec {
    pub campus: String,
    pub building: String,
    pub room: String,
    pub schedule_hour: i32,
    pub schedule_minute: i32,
    pub channel: Option<String>,
}

/// Owns the binding lifecycle: validation, persistence, and the scheduled
/// job that mirrors each persisted row. All collaborators are injected
/// `'static` handles, so the service itself is a cheap `Copy`.
#[derive(Clone, Copy)]
pub struct BindingService {
    ctx: JobContext,
    scheduler: &'static JobScheduler,
    confirm_on_create: bool,
}

impl BindingService {
    pub fn new(
        ctx: JobContext,
        scheduler: &'static JobScheduler,
        confirm_on_create: bool,
    ) -> Self {
        BindingService {
            ctx,
            scheduler,
            confirm_on_create,
        }
    }

    /// Validates one spec in a fixed order: location existence, time range,
    /// then a live meter read. The live read proves the room actually
    /// reports data before we commit to querying it every day.
    async fn validate_spec(&self, spec: &BindingSpec) -> Result<(), Error> {
        if !self.ctx.meter.valid_location(&spec.campus, &spec.building) {
            return Err(Error::Validation(format!(
                "Unknown location: {} / {}.",
                spec.campus, spec.building
            )));
        }

        if !(0..=23).contains(&spec.schedule_hour) || !(0..=59).contains(&spec.schedule_minute) {
            return Err(Error::Validation(format!(
                "Schedule time {:02}:{:02} is out of range.",
                spec.schedule_hour, spec.schedule_minute
            )));
        }

        if let Some(channel) = &spec.channel {
            channel
                .parse::<Channel>()
                .map_err(Error::Validation)?;
        }

        self.ctx
            .meter
            .get_electricity(spec.campus.clone(), spec.building.clone(), spec.room.clone())
            .await
            .map_err(|e| {
                Error::DataUnavailable(format!(
                    "Could not read electricity for {} {} {}: {}",
                    spec.campus, spec.building, spec.room, e
                ))
            })?;

        Ok(())
    }

    fn to_new_binding(&self, device: &DeviceIdentity, spec: &BindingSpec) -> NewBinding {
        NewBinding {
            student_id: device.student_id.clone(),
            device_token: device.device_token.clone(),
            campus: spec.campus.clone(),
            building: spec.building.clone(),
            room: spec.room.clone(),
            schedule_hour: spec.schedule_hour,
            schedule_minute: spec.schedule_minute,
            channel: spec.channel.clone(),
        }
    }

    /// Creates a single binding: validate, optionally prove the device token
    /// with a live confirmation push, persist, schedule.
    #[tracing::instrument(skip(self, spec), fields(device_token = device.device_token.as_str()))]
    pub async fn create(
        &self,
        device: DeviceIdentity,
        spec: BindingSpec,
    ) -> Result<Binding, Error> {
        self.validate_spec(&spec).await?;

        if self.confirm_on_create {
            let alert = Alert {
                title: "电量定时查询设置成功".to_string(),
                body: format!("您的宿舍{}已成功绑定定时电量查询", spec.room),
            };
            let channel = Channel::from_record(spec.channel.as_deref(), self.ctx.default_channel);

            self.ctx
                .sender
                .send(alert, device.device_token.clone(), channel)
                .await
                .map_err(|e| {
                    Error::Validation(format!("Device token was rejected: {}", e))
                })?;
        }

        let binding = self
            .ctx
            .repo
            .create_binding(self.to_new_binding(&device, &spec))
            .await?;

        self.scheduler.schedule(&binding, self.ctx)?;

        Ok(binding)
    }

    /// Atomically replaces the device's whole binding set.
    ///
    /// Every desired spec is validated before anything is touched; a single
    /// failure aborts the call with the offending item and leaves the
    /// existing bindings and jobs untouched. An empty list is a valid
    /// unsubscribe-all. A re-sync of an identical set still cancels and
    /// recreates every job, which opens a brief scheduling gap; with a daily
    /// period that gap is acceptable.
    #[tracing::instrument(skip(self, desired), fields(device_token = device.device_token.as_str(), count = desired.len()))]
    pub async fn sync(
        &self,
        device: DeviceIdentity,
        desired: Vec<BindingSpec>,
    ) -> Result<Vec<Binding>, Error> {
        for (index, spec) in desired.iter().enumerate() {
            self.validate_spec(spec).await.map_err(|e| match e {
                Error::Validation(reason) => {
                    Error::Validation(format!("Binding {}: {}", index + 1, reason))
                }
                Error::DataUnavailable(reason) => {
                    Error::DataUnavailable(format!("Binding {}: {}", index + 1, reason))
                }
                other => other,
            })?;
        }

        let existing = self
            .ctx
            .repo
            .bindings_for_device(device.device_token.clone())
            .await?;

        // The store mutates first. A failed replace rolls back and the old
        // rows keep their timers; cancelling is infallible, so the jobs only
        // change once the rows have.
        let desired = desired
            .iter()
            .map(|spec| self.to_new_binding(&device, spec))
            .collect();
        let replaced = self
            .ctx
            .repo
            .replace_device_bindings(device.device_token.clone(), desired)
            .await?;

        for binding in &existing {
            self.scheduler.cancel(binding.id);
        }
        for binding in &replaced {
            self.scheduler.schedule(binding, self.ctx)?;
        }

        tracing::info!(
            target = module_path!(),
            device_token = device.device_token.as_str(),
            replaced = existing.len(),
            active = replaced.len(),
            "Synchronized device bindings"
        );

        Ok(replaced)
    }

    /// Number of live timer tasks; exposed for the info probe.
    pub fn active_jobs(&self) -> usize {
        self.scheduler.active_jobs()
    }

    pub async fn list(&self, device_token: String) -> Result<Vec<Binding>, Error> {
        self.ctx.repo.bindings_for_device(device_token).await
    }

    pub async fn get(&self, device_token: String, binding_id: i32) -> Result<Binding, Error> {
        self.ctx.repo.binding_by_id(device_token, binding_id).await
    }

    /// Deletes one binding, cancelling its job first. Returns the device's
    /// remaining bindings.
    pub async fn delete(
        &self,
        device_token: String,
        binding_id: i32,
    ) -> Result<Vec<Binding>, Error> {
        let binding = self
            .ctx
            .repo
            .binding_by_id(device_token.clone(), binding_id)
            .await?;

        self.scheduler.cancel(binding.id);
        self.ctx.repo.delete_binding(binding.id).await?;

        self.ctx.repo.bindings_for_device(device_token).await
    }

    /// Removes every binding the device owns, cancelling jobs first.
    pub async fn delete_all(&self, device_token: String) -> Result<Vec<Binding>, Error> {
        let existing = self
            .ctx
            .repo
            .bindings_for_device(device_token.clone())
            .await?;

        for binding in &existing {
            self.scheduler.cancel(binding.id);
            self.ctx.repo.delete_binding(binding.id).await?;
        }

        Ok(Vec::new())
    }

    /// Rebuilds the job registry from the store. Timers do not survive a
    /// restart; the store is the single source of truth. Scheduling retires
    /// any existing handle per id, so restoring is idempotent.
    pub async fn restore(&self) -> Result<usize, Error> {
        let bindings = self.ctx.repo.all_bindings().await?;
        let count = bindings.len();

        for binding in &bindings {
            self.scheduler.schedule(binding, self.ctx)?;
        }

        Ok(count)
    }
}
