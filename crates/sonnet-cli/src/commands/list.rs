use std::path::Path;

use sonnet_core::Document;

use crate::commands::common::{
    document_to_list_item, format_document_lines, load_settings, open_database, owner_session,
    DocumentListItem,
};
use crate::error::CliError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Listing {
    Library,
    Trash,
}

pub async fn run_list(
    listing: Listing,
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let settings = load_settings(profile)?;
    let owner = owner_session(&settings)?.require_owner().await?;
    let database = open_database(db_path, &settings).await?;
    let store = database.documents();

    let documents = match listing {
        Listing::Library => store.list_visible(&owner).await?,
        Listing::Trash => store.list_trash(&owner).await?,
    };
    print_documents(&documents, listing, as_json)?;

    database.close().await?;
    Ok(())
}

fn print_documents(
    documents: &[Document],
    listing: Listing,
    as_json: bool,
) -> Result<(), CliError> {
    if as_json {
        let json_items = documents
            .iter()
            .map(document_to_list_item)
            .collect::<Vec<DocumentListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if documents.is_empty() {
        match listing {
            Listing::Library => println!("No documents yet."),
            Listing::Trash => println!("Trash is empty."),
        }
        return Ok(());
    }

    for line in format_document_lines(documents) {
        println!("{line}");
    }
    Ok(())
}
