//! Ticket export command

use super::helpers::build_store;
use chrono::Local;
use std::{io::Write, path::PathBuf};
use studentdesk_core::{
    error::{PortalError, Result},
    export::{render_ticket_with, DocumentStyle},
    PortalConfig,
};
use tracing::debug;

/// Render a ticket as printable HTML to `output`, or stdout
pub async fn handle(config: PortalConfig, ticket_id: String, output: Option<PathBuf>) -> Result<()> {
    let store = build_store(&config)?;

    let ticket = store
        .get_ticket(&ticket_id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("ticket {}", ticket_id)))?;
    let procedures = store.list_procedures().await?;
    let style = DocumentStyle::new(config.portal.city.clone(), &config.portal.organization);

    let html = render_ticket_with(&ticket, &procedures, Local::now().date_naive(), &style);

    match output {
        Some(path) => {
            debug!("Writing export of ticket {} to {}", ticket_id, path.display());
            std::fs::write(&path, html)?;
            println!("✓ Exported \"{}\" to {}", ticket.title, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
