mod support;

use boxset_core::collections::{
    CollectionPlan, CollectionReport, CollectionSynchronizer, ScopeFilter,
    ScopeOutcome,
};
use boxset_core::matching::MAX_BATCH_SIZE;
use boxset_core::ports::{CatalogGateway, MissingPrimaryQuery};
use boxset_core::{IdentityResolver, SyncError};
use boxset_model::IdentifierNamespace::{Imdb, Primary, Tmdb};
use boxset_model::{
    CatalogEntry, ChangeKind, CollectionContainer, EntryHandle, EntryKind,
    EntryKinds, ExternalItem, IdentifierNamespace, Library, LibraryId,
    LibraryKind,
};
use support::{RecordingCatalog, RecordingLookup, context, item};
use tokio_util::sync::CancellationToken;

async fn library(catalog: &RecordingCatalog, name: &str) -> LibraryId {
    catalog
        .inner
        .add_library(Library::new(name, LibraryKind::Movies))
        .await
}

async fn on_disk(
    catalog: &RecordingCatalog,
    library: LibraryId,
    name: &str,
    ids: &[(IdentifierNamespace, &str)],
) -> EntryHandle {
    let entry = ids.iter().fold(
        CatalogEntry::new(name, library, EntryKind::Movie)
            .with_path(format!("/media/{name}.mkv")),
        |entry, (namespace, value)| entry.with_identifier(*namespace, value),
    );
    catalog.inner.add_entry(entry).await
}

async fn only_container(
    catalog: &RecordingCatalog,
    name: &str,
) -> CollectionContainer {
    let mut found = catalog.inner.containers_named(name).await;
    assert_eq!(found.len(), 1, "expected exactly one container named {name}");
    found.remove(0)
}

fn top_four() -> Vec<ExternalItem> {
    vec![
        item(
            "The Shawshank Redemption",
            &[(Primary, "278"), (Imdb, "tt0111161")],
        ),
        item("The Godfather", &[(Primary, "238"), (Imdb, "tt0068646")]),
        item("The Dark Knight", &[(Primary, "155"), (Imdb, "tt0468569")]),
        item("12 Angry Men", &[(Primary, "389"), (Imdb, "tt0050083")]),
    ]
}

fn top_plan() -> CollectionPlan {
    CollectionPlan::new("collection:top", "top250", "Top")
        .with_kinds(EntryKinds::MOVIES)
}

async fn sync(
    catalog: &RecordingCatalog,
    plan: &CollectionPlan,
    items: &[ExternalItem],
) -> Result<CollectionReport, SyncError> {
    let synchronizer =
        CollectionSynchronizer::new(context(&RecordingLookup::new(), catalog));
    let scopes = synchronizer.scopes(plan).await?;
    synchronizer
        .synchronize(plan, items, &scopes, &CancellationToken::new(), |_, _| {})
        .await
}

#[tokio::test]
async fn first_run_creates_the_container_with_initial_members() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let shawshank =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let godfather =
        on_disk(&catalog, movies, "Godfather", &[(Imdb, "tt0068646")]).await;
    on_disk(&catalog, movies, "Heat", &[(Imdb, "tt0113277")]).await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(report.external_items, 4);
    assert_eq!(report.scopes.len(), 1);
    assert_eq!(report.scopes[0].collection, "Top");
    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Created { members: 2 }
    );
    assert!(catalog.memberships.lock().await.is_empty());
    assert_eq!(*catalog.created.lock().await, vec!["Top".to_string()]);

    let roots = catalog.inner.containers_named("Collections").await;
    assert_eq!(roots.len(), 1);
    assert!(roots[0].is_root());

    let top = only_container(&catalog, "Top").await;
    assert_eq!(top.parent, Some(roots[0].handle));
    assert_eq!(top.members, vec![shawshank, godfather]);
}

#[tokio::test]
async fn existing_container_is_topped_up() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let shawshank =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let godfather =
        on_disk(&catalog, movies, "Godfather", &[(Imdb, "tt0068646")]).await;

    let root = catalog
        .inner
        .ensure_root_collections_container()
        .await
        .unwrap();
    let top = catalog
        .inner
        .create_collection_container("Top", root.handle, &[shawshank])
        .await
        .unwrap();

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Updated { added: 1, already_members: 1 }
    );
    assert_eq!(
        *catalog.memberships.lock().await,
        vec![(godfather, top.handle, true)]
    );
    assert_eq!(
        *catalog.persisted.lock().await,
        vec![(godfather, ChangeKind::MembershipUpdate)]
    );
    assert!(catalog.created.lock().await.is_empty());

    let stored = catalog.inner.container(top.handle).await.unwrap();
    assert_eq!(stored.members, vec![shawshank, godfather]);
    let stored_godfather = catalog.inner.entry(godfather).await.unwrap();
    assert!(stored_godfather.is_member_of(top.handle));
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    on_disk(&catalog, movies, "Godfather", &[(Imdb, "tt0068646")]).await;

    sync(&catalog, &top_plan(), &top_four()).await.unwrap();
    let before = catalog.inner.snapshot().await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Updated { added: 0, already_members: 2 }
    );
    assert_eq!(report.added_total(), 0);
    assert!(catalog.memberships.lock().await.is_empty());
    assert!(catalog.persisted.lock().await.is_empty());
    assert_eq!(catalog.created.lock().await.len(), 1);
    assert_eq!(catalog.inner.snapshot().await, before);
}

#[tokio::test]
async fn an_entry_matches_through_any_shared_identifier() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let by_tmdb =
        on_disk(&catalog, movies, "Toy Story", &[(Tmdb, "862")]).await;
    let by_primary =
        on_disk(&catalog, movies, "Up", &[(Primary, "14160")]).await;
    on_disk(&catalog, movies, "Cars", &[(Tmdb, "920")]).await;

    let items = vec![
        item(
            "Toy Story",
            &[(Primary, "862"), (Imdb, "tt0114709"), (Tmdb, "862")],
        ),
        item("Up", &[(Primary, "14160")]),
    ];
    let plan = CollectionPlan::new("collection:pixar", "pixar", "Pixar");
    sync(&catalog, &plan, &items).await.unwrap();

    let pixar = only_container(&catalog, "Pixar").await;
    assert_eq!(pixar.members, vec![by_tmdb, by_primary]);
}

#[tokio::test]
async fn ambiguous_names_leave_the_catalog_untouched() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;

    let root = catalog
        .inner
        .ensure_root_collections_container()
        .await
        .unwrap();
    for _ in 0..2 {
        catalog
            .inner
            .create_collection_container("Top", root.handle, &[])
            .await
            .unwrap();
    }

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Ambiguous { matches: 2 }
    );
    assert_eq!(catalog.touched().await, 0);
}

#[tokio::test]
async fn containers_outside_the_root_folder_are_not_considered() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    catalog
        .inner
        .add_container(CollectionContainer::new("Top", None, Vec::new()))
        .await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Created { members: 1 }
    );
    assert_eq!(catalog.inner.containers_named("Top").await.len(), 2);
}

#[tokio::test]
async fn per_library_plans_get_one_container_per_library() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    let hd =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let remux =
        on_disk(&catalog, uhd, "Shawshank", &[(Imdb, "tt0111161")]).await;

    let report = sync(&catalog, &top_plan().per_library(), &top_four())
        .await
        .unwrap();

    let names: Vec<_> =
        report.scopes.iter().map(|s| s.collection.as_str()).collect();
    assert_eq!(names, vec!["Top (Movies)", "Top (4K)"]);
    assert_eq!(
        only_container(&catalog, "Top (Movies)").await.members,
        vec![hd]
    );
    assert_eq!(
        only_container(&catalog, "Top (4K)").await.members,
        vec![remux]
    );
}

#[tokio::test]
async fn merged_plans_pool_every_library() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    let hd =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let remux =
        on_disk(&catalog, uhd, "Godfather", &[(Imdb, "tt0068646")]).await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(report.scopes.len(), 1);
    assert_eq!(report.scopes[0].library, None);
    assert_eq!(
        only_container(&catalog, "Top").await.members,
        vec![hd, remux]
    );
}

#[tokio::test]
async fn scope_filter_limits_the_libraries_searched() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    catalog
        .inner
        .add_library(Library::new("Shows", LibraryKind::Series))
        .await;
    let hd =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    on_disk(&catalog, uhd, "Godfather", &[(Imdb, "tt0068646")]).await;

    let plan =
        top_plan().with_scope_filter(ScopeFilter::named(["movies", "Shows"]));
    let synchronizer = CollectionSynchronizer::new(context(
        &RecordingLookup::new(),
        &catalog,
    ));
    let scopes = synchronizer.scopes(&plan).await.unwrap();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].name, "Movies");

    sync(&catalog, &plan, &top_four()).await.unwrap();
    assert_eq!(
        only_container(&catalog, "Top").await.members,
        vec![hd]
    );
}

#[tokio::test]
async fn a_failing_library_does_not_block_the_others() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let remux =
        on_disk(&catalog, uhd, "Shawshank", &[(Imdb, "tt0111161")]).await;
    catalog.fail_queries_for(movies).await;

    let report = sync(&catalog, &top_plan().per_library(), &top_four())
        .await
        .unwrap();

    assert!(matches!(report.scopes[0].outcome, ScopeOutcome::Failed(_)));
    assert_eq!(
        report.scopes[1].outcome,
        ScopeOutcome::Created { members: 1 }
    );
    assert_eq!(report.failed_scopes(), 1);
    assert_eq!(
        only_container(&catalog, "Top (4K)").await.members,
        vec![remux]
    );
}

#[tokio::test]
async fn no_matches_creates_nothing() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    on_disk(&catalog, movies, "Heat", &[(Imdb, "tt0113277")]).await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(report.scopes[0].outcome, ScopeOutcome::NoCandidates);
    assert_eq!(catalog.touched().await, 0);
    assert!(catalog.inner.containers_named("Collections").await.is_empty());
}

#[tokio::test]
async fn empty_groups_are_reported_before_touching_the_catalog() {
    let catalog = RecordingCatalog::new();
    library(&catalog, "Movies").await;

    let err = sync(&catalog, &top_plan(), &[]).await.unwrap_err();

    assert!(matches!(err, SyncError::EmptyExternalGroup { .. }));
    assert!(catalog.query_sizes.lock().await.is_empty());
    assert_eq!(catalog.touched().await, 0);
}

#[tokio::test]
async fn catalog_queries_stay_within_the_batch_limit() {
    let catalog = RecordingCatalog::new();
    library(&catalog, "Movies").await;
    let items: Vec<ExternalItem> = (0..150)
        .map(|n| {
            item(
                &format!("Film {n}"),
                &[
                    (Primary, n.to_string().as_str()),
                    (Imdb, format!("tt{n:07}").as_str()),
                ],
            )
        })
        .collect();

    sync(&catalog, &top_plan(), &items).await.unwrap();

    let sizes = catalog.query_sizes.lock().await.clone();
    assert_eq!(sizes, vec![100, 100, 100]);
    assert!(sizes.iter().all(|size| *size <= MAX_BATCH_SIZE));
}

#[tokio::test]
async fn cancellation_stops_after_the_current_library() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    on_disk(&catalog, uhd, "Shawshank", &[(Imdb, "tt0111161")]).await;

    let plan = top_plan().per_library();
    let synchronizer = CollectionSynchronizer::new(context(
        &RecordingLookup::new(),
        &catalog,
    ));
    let scopes = synchronizer.scopes(&plan).await.unwrap();
    let cancel = CancellationToken::new();
    let mut seen = Vec::new();
    let err = synchronizer
        .synchronize(&plan, &top_four(), &scopes, &cancel, |done, total| {
            seen.push((done, total));
            cancel.cancel();
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(seen, vec![(1, 2)]);
    assert_eq!(
        *catalog.created.lock().await,
        vec!["Top (Movies)".to_string()]
    );
}

#[tokio::test]
async fn merged_plans_stop_when_cancelled_after_the_last_library() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    on_disk(&catalog, uhd, "Godfather", &[(Imdb, "tt0068646")]).await;

    let plan = top_plan();
    let synchronizer = CollectionSynchronizer::new(context(
        &RecordingLookup::new(),
        &catalog,
    ));
    let scopes = synchronizer.scopes(&plan).await.unwrap();
    let cancel = CancellationToken::new();
    let mut seen = Vec::new();
    let err = synchronizer
        .synchronize(&plan, &top_four(), &scopes, &cancel, |done, total| {
            seen.push((done, total));
            if done == total {
                cancel.cancel();
            }
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(seen, vec![(1, 2), (2, 2)]);
    assert_eq!(catalog.touched().await, 0);
    assert!(catalog.inner.containers_named("Collections").await.is_empty());
}

#[tokio::test]
async fn overlapping_fill_and_collection_runs_keep_both_edits() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let heat = on_disk(&catalog, movies, "Heat", &[(Imdb, "tt0113277")]).await;
    let lookup = RecordingLookup::new().map(Imdb, "tt0113277", "949");

    // The backfill loads its batch before the collection run starts.
    let loaded = catalog
        .query_missing_primary(&MissingPrimaryQuery {
            kinds: EntryKinds::ALL,
            libraries: Vec::new(),
        })
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);

    let plan = CollectionPlan::new("collection:mann", "mann", "Mann");
    let mann = vec![item("Heat", &[(Primary, "949"), (Imdb, "tt0113277")])];
    sync(&catalog, &plan, &mann).await.unwrap();

    let report = IdentityResolver::new(context(&lookup, &catalog))
        .resolve(loaded, &CancellationToken::new(), |_, _| {})
        .await
        .unwrap();
    assert_eq!(report.resolved_total(), 1);

    let container = only_container(&catalog, "Mann").await;
    let stored = catalog.inner.entry(heat).await.unwrap();
    assert_eq!(stored.identifier(Primary), Some("949"));
    assert!(container.contains(heat));
    assert!(stored.is_member_of(container.handle));

    let again = sync(&catalog, &plan, &mann).await.unwrap();
    assert_eq!(
        again.scopes[0].outcome,
        ScopeOutcome::Updated { added: 0, already_members: 1 }
    );
}

#[tokio::test]
async fn a_membership_known_only_to_the_container_is_restored() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let shawshank =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let root = catalog
        .inner
        .ensure_root_collections_container()
        .await
        .unwrap();
    let top = catalog
        .inner
        .add_container(CollectionContainer::new(
            "Top",
            Some(root.handle),
            vec![shawshank],
        ))
        .await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Updated { added: 0, already_members: 1 }
    );
    assert!(catalog.memberships.lock().await.is_empty());
    assert_eq!(
        *catalog.persisted.lock().await,
        vec![(shawshank, ChangeKind::MembershipUpdate)]
    );
    let stored = catalog.inner.entry(shawshank).await.unwrap();
    assert!(stored.is_member_of(top));
    assert_eq!(
        catalog.inner.container(top).await.unwrap().members,
        vec![shawshank]
    );
}

#[tokio::test]
async fn a_false_membership_reply_counts_as_already_a_member() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let shawshank =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let godfather =
        on_disk(&catalog, movies, "Godfather", &[(Imdb, "tt0068646")]).await;
    let root = catalog
        .inner
        .ensure_root_collections_container()
        .await
        .unwrap();
    let top = catalog
        .inner
        .create_collection_container("Top", root.handle, &[])
        .await
        .unwrap();
    catalog.member_elsewhere(godfather).await;

    let report = sync(&catalog, &top_plan(), &top_four()).await.unwrap();

    assert_eq!(
        report.scopes[0].outcome,
        ScopeOutcome::Updated { added: 1, already_members: 1 }
    );
    assert_eq!(
        *catalog.memberships.lock().await,
        vec![(shawshank, top.handle, true), (godfather, top.handle, false)]
    );
    assert_eq!(
        *catalog.persisted.lock().await,
        vec![(shawshank, ChangeKind::MembershipUpdate)]
    );
}

/// Two movie libraries, each holding one Shawshank copy and an empty
/// per-library "Top" container.
async fn split_top_catalog() -> (RecordingCatalog, EntryHandle, EntryHandle) {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    let hd =
        on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let remux =
        on_disk(&catalog, uhd, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let root = catalog
        .inner
        .ensure_root_collections_container()
        .await
        .unwrap();
    for name in ["Top (Movies)", "Top (4K)"] {
        catalog
            .inner
            .create_collection_container(name, root.handle, &[])
            .await
            .unwrap();
    }
    (catalog, hd, remux)
}

#[tokio::test]
async fn a_failed_container_creation_only_fails_its_library() {
    let catalog = RecordingCatalog::new();
    let movies = library(&catalog, "Movies").await;
    let uhd = library(&catalog, "4K").await;
    on_disk(&catalog, movies, "Shawshank", &[(Imdb, "tt0111161")]).await;
    let remux =
        on_disk(&catalog, uhd, "Shawshank", &[(Imdb, "tt0111161")]).await;
    catalog.fail_create_for("Top (Movies)").await;

    let report = sync(&catalog, &top_plan().per_library(), &top_four())
        .await
        .unwrap();

    assert!(matches!(report.scopes[0].outcome, ScopeOutcome::Failed(_)));
    assert_eq!(
        report.scopes[1].outcome,
        ScopeOutcome::Created { members: 1 }
    );
    assert!(catalog.inner.containers_named("Top (Movies)").await.is_empty());
    assert_eq!(
        only_container(&catalog, "Top (4K)").await.members,
        vec![remux]
    );
}

#[tokio::test]
async fn a_failed_membership_write_only_fails_its_library() {
    let (catalog, hd, remux) = split_top_catalog().await;
    catalog.fail_membership_for(hd).await;

    let report = sync(&catalog, &top_plan().per_library(), &top_four())
        .await
        .unwrap();

    assert!(matches!(report.scopes[0].outcome, ScopeOutcome::Failed(_)));
    assert_eq!(
        report.scopes[1].outcome,
        ScopeOutcome::Updated { added: 1, already_members: 0 }
    );
    assert_eq!(
        *catalog.persisted.lock().await,
        vec![(remux, ChangeKind::MembershipUpdate)]
    );
    assert!(only_container(&catalog, "Top (Movies)").await.members.is_empty());
}

#[tokio::test]
async fn a_failed_persist_only_fails_its_library() {
    let (catalog, hd, remux) = split_top_catalog().await;
    catalog.fail_persist_for(hd).await;

    let report = sync(&catalog, &top_plan().per_library(), &top_four())
        .await
        .unwrap();

    assert!(matches!(report.scopes[0].outcome, ScopeOutcome::Failed(_)));
    assert_eq!(report.failed_scopes(), 1);
    assert_eq!(
        report.scopes[1].outcome,
        ScopeOutcome::Updated { added: 1, already_members: 0 }
    );
    assert_eq!(
        only_container(&catalog, "Top (4K)").await.members,
        vec![remux]
    );
}
