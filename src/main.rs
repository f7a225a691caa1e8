use std::process::exit;

use dormwatt::config::Settings;
use dormwatt::middleware::telemetry;
use dormwatt::startup::Application;

/// Start the application after loading settings, telemetry, and the meter
/// roster, then serve until stopped.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_exit_handler();

    let settings = Settings::new().expect("Could not load settings.");
    telemetry::init_tracer();

    let application = Application::build(settings)
        .await
        .expect("Could not build application.");

    application.run_until_stopped().await?;

    Ok(())
}

// actix-web will handle signals to exit, but doesn't offer a hook to customize it.
fn init_exit_handler() {
    ctrlc::set_handler(move || {
        exit(0);
    })
    .expect("Error setting Ctrl-C handler");
}
