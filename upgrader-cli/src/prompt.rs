//! Interactive prompts.

use anyhow::Context;
use inquire::{InquireError, MultiSelect};
use std::sync::Arc;
use upgrader_core::ports::{CodemodSelector, Confirm};
use upgrader_types::VersionedCollection;

/// Asks on the terminal; cancelling counts as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct InquireConfirm;

impl Confirm for InquireConfirm {
    fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        match inquire::Confirm::new(message).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(err) => Err(err).context("read confirmation"),
        }
    }
}

pub fn collection_label(collection: &VersionedCollection) -> String {
    let n = collection.len();
    format!(
        "{} ({} codemod{})",
        collection.version,
        n,
        if n == 1 { "" } else { "s" }
    )
}

/// Collections whose label was picked, in their original order.
pub fn keep_selected(
    collections: Vec<VersionedCollection>,
    picked: &[String],
) -> Vec<VersionedCollection> {
    collections
        .into_iter()
        .filter(|c| picked.contains(&collection_label(c)))
        .collect()
}

/// Lets the user untick versions before they run. Everything starts ticked.
pub fn multi_select_selector() -> CodemodSelector {
    Arc::new(
        |collections: Vec<VersionedCollection>| -> anyhow::Result<Vec<VersionedCollection>> {
            if collections.is_empty() {
                return Ok(collections);
            }
            let options: Vec<String> = collections.iter().map(collection_label).collect();
            let all: Vec<usize> = (0..options.len()).collect();
            let picked = match MultiSelect::new("Select codemod versions to run:", options)
                .with_default(&all)
                .prompt()
            {
                Ok(picked) => picked,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    Vec::new()
                }
                Err(err) => return Err(err).context("select codemods"),
            };
            Ok(keep_selected(collections, &picked))
        },
    )
}
