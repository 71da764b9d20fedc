// ABOUTME: Interactive menu command.
// ABOUTME: Keeps one engine connection open and dispatches menu picks to the other commands.

use super::clean::{CleanTarget, print_report, run_clean};
use super::close;
use super::list::{show_containers, show_images, show_info};
use dregs::config::Config;
use dregs::connection::Connection;
use dregs::engine::Engine;
use dregs::error::Result;
use dregs::output::Output;
use dregs::prompt::{Menu, Prompt};

const OPTIONS: [&str; 6] = [
    "Clean dangling images",
    "Clean all images",
    "List images",
    "List dangling images",
    "List containers",
    "Show engine info",
];

pub async fn menu(config: &Config, prompt: &mut dyn Prompt, output: Output) -> Result<()> {
    let connection = Connection::open(config, &output).await?;
    let result = run_menu(connection.engine(), prompt, &output).await;
    close(connection, &output).await;
    result
}

async fn run_menu(engine: &dyn Engine, prompt: &mut dyn Prompt, output: &Output) -> Result<()> {
    let menu = Menu::new("What would you like to do?", OPTIONS);

    while let Some(choice) = prompt.choose(&menu) {
        tracing::debug!(choice = OPTIONS[choice], "menu pick");
        let result = match choice {
            0 => run_clean(engine, CleanTarget::Dangling, prompt, output)
                .await
                .map(|report| print_report(&report, output)),
            1 => run_clean(engine, CleanTarget::All, prompt, output)
                .await
                .map(|report| print_report(&report, output)),
            2 => show_images(engine, false, output).await,
            3 => show_images(engine, true, output).await,
            4 => show_containers(engine, true, output).await,
            _ => show_info(engine, output).await,
        };

        // Engine failures end the session; anything else lets the operator retry.
        if let Err(e) = result {
            if is_fatal(&e) {
                return Err(e);
            }
            output.error(&e.to_string());
        }
    }
    Ok(())
}

fn is_fatal(err: &dregs::error::Error) -> bool {
    use dregs::error::Error;
    use dregs::inventory::InventoryError;
    use dregs::reconcile::ReconcileError;

    match err {
        Error::Engine(e) => e.is_unavailable(),
        Error::Inventory(InventoryError::EngineUnavailable(_)) => true,
        Error::Reconcile(ReconcileError::EngineUnavailable(_)) => true,
        _ => false,
    }
}
