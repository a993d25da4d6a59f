use std::path::Path;

use crate::commands::common::{document_service, load_settings, open_database, parse_document_id};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let document_id = parse_document_id(id)?;
    let settings = load_settings(profile)?;
    let database = open_database(db_path, &settings).await?;
    let service = document_service(&database, &settings)?;

    let report = service.soft_delete(&document_id).await?;
    println!(
        "{document_id}  marked {} document(s) for deletion",
        report.updated
    );

    database.close().await?;
    Ok(())
}
