// ABOUTME: Command module aggregator for the dregs CLI.
// ABOUTME: Re-exports clean, listing, and menu command handlers.

mod clean;
mod list;
mod menu;

pub use clean::{CleanTarget, clean};
pub use list::{containers, images, info};
pub use menu::menu;

use dregs::connection::Connection;
use dregs::diagnostics::Diagnostics;
use dregs::output::Output;

/// Close `connection`, reporting a failed disconnect as a warning.
async fn close(connection: Connection, output: &Output) {
    let mut diag = Diagnostics::default();
    connection.close(&mut diag).await;
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
