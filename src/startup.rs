use actix_web::{dev::Server, error::ErrorBadRequest, web, web::Data, web::JsonConfig, App,
    HttpServer};
use anyhow::Context;
use serde_json::json;
use std::net::TcpListener;

use crate::bindings::BindingService;
use crate::config::Settings;
use crate::controllers::{binding::binding_routes, info::info};
use crate::jobs::{JobContext, JobScheduler};
use crate::meter;
use crate::notify::{self, Channel};
use crate::repository::{self, Repo};

pub struct Application {
    port: u16,
    server: Server,
    pub service: BindingService,
    pub repo: Repo,
    pub scheduler: &'static JobScheduler,
}

impl Application {
    /// Two-phase startup: every collaborator is fully built and the job
    /// registry is rebuilt from the store before the listener accepts
    /// traffic. Nothing initializes lazily on first request.
    pub async fn build(settings: Settings) -> Result<Application, anyhow::Error> {
        let repo = repository::implementation(settings.database_url.clone()).await?;
        let meter = meter::campus_card::initialize(&settings.meter).await?;
        let sender = notify::apns::initialize(&settings.apns)?;
        let scheduler = JobScheduler::initialize();

        let default_channel: Channel = settings
            .apns
            .default_channel
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid default channel: {}", e))?;

        let ctx = JobContext {
            repo,
            meter,
            sender,
            default_channel,
        };
        let service = BindingService::new(ctx, scheduler, settings.confirm_on_create);

        let restored = service.restore().await?;
        tracing::info!(
            target = module_path!(),
            count = restored,
            "Restored scheduled jobs from storage"
        );

        let (port, listener) = web_server_config(&settings)?;
        let service_data = Data::new(service);

        let server = HttpServer::new(move || {
            App::new()
                .service(info)
                .service(web::scope("/bindings").configure(binding_routes))
                .app_data(Self::json_cfg())
                .app_data(service_data.clone())
        })
        .listen(listener)
        .with_context(|| format!("Could not listen on port {}", port))?
        .run();

        Ok(Application {
            server,
            port,
            service,
            repo,
            scheduler,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }

    fn json_cfg() -> JsonConfig {
        JsonConfig::default().error_handler(|err, _req| {
            ErrorBadRequest(json!({
                "reason": err.to_string()
            }))
        })
    }
}

fn web_server_config(settings: &Settings) -> Result<(u16, TcpListener), anyhow::Error> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener =
        TcpListener::bind(&address).with_context(|| format!("Could not bind {}", address))?;

    let port = listener
        .local_addr()
        .context("Could not get server address.")?
        .port();

    Ok((port, listener))
}
