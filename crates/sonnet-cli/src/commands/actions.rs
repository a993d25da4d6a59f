use std::path::Path;

use sonnet_core::models::{available_actions, DocumentAction};

use crate::commands::common::{
    document_service, document_title, load_settings, open_database, parse_document_id,
};
use crate::error::CliError;

pub async fn run_actions(id: &str, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let document_id = parse_document_id(id)?;
    let settings = load_settings(profile)?;
    let database = open_database(db_path, &settings).await?;
    let service = document_service(&database, &settings)?;

    let document = service.get(&document_id).await?;

    let actions = available_actions(&document);
    println!("{}", document_title(&document, 60));
    if actions.is_empty() {
        println!("  (no actions available)");
    }
    for action in actions {
        println!("  {:<10} {}", action.name(), action.description());
    }

    database.close().await?;
    Ok(())
}

pub async fn run_action(
    id: &str,
    action: DocumentAction,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let document_id = parse_document_id(id)?;
    let settings = load_settings(profile)?;
    let database = open_database(db_path, &settings).await?;
    let service = document_service(&database, &settings)?;

    let document = service.execute(&document_id, action).await?;
    println!("{}  {action}", document.id);

    database.close().await?;
    Ok(())
}
