use crate::jobs::{JobContext, JobScheduler};
use crate::notify::{Alert, Channel, DeliveryError};
use crate::repository::models::binding::Binding;

/// Body of one timer firing. Nothing here returns an error: there is no
/// caller waiting on a firing, so every outcome is logged, and only a
/// permanently dead token mutates state by pruning the binding.
pub async fn check_binding(binding: &Binding, scheduler: &JobScheduler, ctx: JobContext) {
    let electricity = match ctx
        .meter
        .get_electricity(
            binding.campus.clone(),
            binding.building.clone(),
            binding.room.clone(),
        )
        .await
    {
        Ok(value) => value,
        Err(e) => {
            // Transient by definition; the next daily trigger retries.
            tracing::error!(
                target = module_path!(),
                binding_id = binding.id,
                error = e.to_string(),
                "Could not read electricity meter"
            );
            return;
        }
    };

    let alert = Alert {
        title: "电量定时查询结果".to_string(),
        body: format!("您的宿舍{}当前电量为 {} 度", binding.room, electricity),
    };
    let channel = Channel::from_record(binding.channel.as_deref(), ctx.default_channel);

    match ctx
        .sender
        .send(alert, binding.device_token.clone(), channel)
        .await
    {
        Ok(()) => {
            tracing::info!(
                target = module_path!(),
                binding_id = binding.id,
                room = binding.room.as_str(),
                "Sent electricity notification"
            );
        }
        Err(DeliveryError::Transient(e)) => {
            tracing::warn!(
                target = module_path!(),
                binding_id = binding.id,
                error = e.to_string(),
                "Transient push failure, will retry at next trigger"
            );
        }
        Err(DeliveryError::Permanent(reason)) => {
            tracing::info!(
                target = module_path!(),
                binding_id = binding.id,
                reason = reason.as_str(),
                "Device token is permanently invalid, pruning binding"
            );

            if let Err(e) = ctx.repo.delete_binding(binding.id).await {
                tracing::error!(
                    target = module_path!(),
                    binding_id = binding.id,
                    error = e.to_string(),
                    "Could not delete pruned binding"
                );
            }

            // cancel() aborts the task this firing runs on, so it has to be
            // the last thing the firing does.
            scheduler.cancel(binding.id);
        }
    }
}
