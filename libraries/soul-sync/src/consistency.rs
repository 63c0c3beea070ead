//! Provider mapping consistency checks
//!
//! Every item a provider yields must carry exactly one mapping, pointing at
//! the issuing instance and the id the item was fetched by. Items that break
//! this are rejected one by one without touching the library.

use soul_core::{LibraryItem, MediaItem, Result, SoulError};

/// Reject items whose mapping set is not exactly their own self-mapping
pub fn validate_self_mapping(item: &MediaItem, provider_instance: &str) -> Result<()> {
    match item.provider_mappings.as_slice() {
        _ if item.provider != provider_instance => Err(SoulError::consistency(format!(
            "{} reported by {} names {} as its provider",
            item.uri(),
            provider_instance,
            item.provider
        ))),
        [mapping] if mapping.is(provider_instance, &item.item_id) => Ok(()),
        [mapping] => Err(SoulError::consistency(format!(
            "{} reported by {} maps to {}/{}",
            item.uri(),
            provider_instance,
            mapping.provider_instance,
            mapping.item_id
        ))),
        mappings => Err(SoulError::consistency(format!(
            "{} carries {} provider mappings, expected exactly one",
            item.uri(),
            mappings.len()
        ))),
    }
}

/// Set `in_library` on the item's own mappings
pub fn set_own_in_library(item: &mut MediaItem, provider_instance: &str, in_library: bool) {
    for mapping in item
        .provider_mappings
        .iter_mut()
        .filter(|m| m.provider_instance == provider_instance)
    {
        mapping.in_library = in_library;
    }
}

/// Whether `existing` already reflects the observed self-mapping
///
/// The observed mapping's `in_library` is set to `in_library` first. Returns
/// `false` when the library entity has no mapping for (instance, item id) or
/// when `in_library` or `available` differ.
pub fn check_mappings(
    existing: &LibraryItem,
    item: &mut MediaItem,
    provider_instance: &str,
    in_library: bool,
) -> Result<bool> {
    validate_self_mapping(item, provider_instance)?;
    set_own_in_library(item, provider_instance, in_library);

    let Some(observed) = item.provider_mappings.first() else {
        return Ok(false);
    };
    let Some(library) = existing.mapping(provider_instance, &observed.item_id) else {
        return Ok(false);
    };
    Ok(library.in_library == observed.in_library && library.available == observed.available)
}
