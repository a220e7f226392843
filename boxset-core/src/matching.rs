//! Key-building and batching helpers shared by the resolver and the
//! collection synchronizer.

use std::collections::HashSet;

use boxset_model::{ExternalItem, IdentifierKey, IdentifierNamespace};

/// Upper bound on identifiers sent to either collaborator in one call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Clamp a configured batch size into `1..=MAX_BATCH_SIZE`.
pub fn effective_batch_size(requested: usize) -> usize {
    requested.clamp(1, MAX_BATCH_SIZE)
}

/// Split `items` into consecutive chunks no larger than the effective batch
/// size for `requested`.
pub fn chunked<T>(items: &[T], requested: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(effective_batch_size(requested))
}

/// Keys an external item may be found under in the catalog: its primary id
/// plus whichever secondary ids it carries.
pub fn or_set_for(item: &ExternalItem) -> Vec<IdentifierKey> {
    [
        IdentifierNamespace::Primary,
        IdentifierNamespace::Imdb,
        IdentifierNamespace::Tmdb,
    ]
    .into_iter()
    .filter_map(|namespace| item.identifiers.key(namespace))
    .collect()
}

/// Union of the per-item OR-sets, de-duplicated, in first-seen order.
pub fn group_or_set(items: &[ExternalItem]) -> Vec<IdentifierKey> {
    let mut seen = HashSet::new();
    items
        .iter()
        .flat_map(or_set_for)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Name of the collection container for a plan. Per-library collections get
/// the library name appended so each scope owns a distinct container.
pub fn collection_name(base: &str, scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("{base} ({scope})"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(
        primary: &str,
        imdb: Option<&str>,
        tmdb: Option<&str>,
    ) -> ExternalItem {
        let mut item = ExternalItem::new(format!("item {primary}"))
            .with_identifier(IdentifierNamespace::Primary, primary);
        if let Some(imdb) = imdb {
            item = item.with_identifier(IdentifierNamespace::Imdb, imdb);
        }
        if let Some(tmdb) = tmdb {
            item = item.with_identifier(IdentifierNamespace::Tmdb, tmdb);
        }
        item
    }

    #[test]
    fn or_set_includes_present_secondaries_only() {
        let keys = or_set_for(&item("326", Some("tt0111161"), None));
        assert_eq!(
            keys,
            vec![
                IdentifierKey::primary("326").unwrap(),
                IdentifierKey::imdb("tt0111161").unwrap(),
            ]
        );
    }

    #[test]
    fn group_or_set_drops_duplicates_across_items() {
        let group = vec![
            item("1", Some("tt1"), Some("10")),
            item("2", Some("tt1"), None),
        ];
        let keys = group_or_set(&group);
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0], IdentifierKey::primary("1").unwrap());
        assert_eq!(keys[3], IdentifierKey::primary("2").unwrap());
    }

    #[test]
    fn batch_size_is_clamped() {
        assert_eq!(effective_batch_size(0), 1);
        assert_eq!(effective_batch_size(40), 40);
        assert_eq!(effective_batch_size(1_000), MAX_BATCH_SIZE);

        let values: Vec<u32> = (0..250).collect();
        let sizes: Vec<usize> =
            chunked(&values, 500).map(<[u32]>::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn per_library_names_carry_scope_suffix() {
        assert_eq!(collection_name("Top 250", None), "Top 250");
        assert_eq!(
            collection_name("Top 250", Some("4K Movies")),
            "Top 250 (4K Movies)"
        );
    }
}
