//! Properties of the loader and link builder over generated inputs

use flow_formatter::{Formatter, Storage};
use flow_model::{EntityId, EntityKind, PageTitle, Revision, RevisionKind, StoredEntity, Workflow};
use flow_test_utils::{post_revision, RecordingStorage};
use proptest::prelude::*;
use std::sync::Arc;

struct Fixture {
    storage: Arc<RecordingStorage>,
    formatter: Formatter,
    workflows: Vec<Workflow>,
    posts: Vec<Revision>,
    headers: Vec<Revision>,
}

fn fixture() -> Fixture {
    let workflows: Vec<Workflow> = (0..4).map(|_| Workflow::topic(EntityId::new())).collect();
    let posts: Vec<Revision> = workflows
        .iter()
        .map(|w| post_revision(w, "new-post", "title"))
        .collect();
    let headers: Vec<Revision> = workflows
        .iter()
        .map(|w| {
            Revision::builder(RevisionKind::Header, w.id())
                .change_type("edit-header")
                .content("about")
                .build()
        })
        .collect();

    let entities = workflows
        .iter()
        .cloned()
        .map(StoredEntity::from)
        .chain(posts.iter().cloned().map(StoredEntity::from))
        .chain(headers.iter().cloned().map(StoredEntity::from));
    let storage = Arc::new(RecordingStorage::with_entities(entities));
    let formatter = Formatter::builder(Arc::clone(&storage) as Arc<dyn Storage>).build();
    Fixture {
        storage,
        formatter,
        workflows,
        posts,
        headers,
    }
}

/// Picks from `known`, or a fresh unknown identifier past its end
fn pick(known: &[EntityId], picks: &[usize]) -> Vec<EntityId> {
    picks
        .iter()
        .map(|&i| known.get(i).copied().unwrap_or_else(EntityId::new))
        .collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn one_storage_call_per_kind(
        workflow_picks in prop::collection::vec(0usize..6, 0..24),
        post_picks in prop::collection::vec(0usize..6, 0..24),
        more_post_picks in prop::collection::vec(0usize..6, 0..8),
        header_picks in prop::collection::vec(0usize..6, 0..24),
    ) {
        let f = fixture();
        let workflow_ids: Vec<_> = f.workflows.iter().map(Workflow::id).collect();
        let post_ids: Vec<_> = f.posts.iter().map(Revision::id).collect();
        let header_ids: Vec<_> = f.headers.iter().map(Revision::id).collect();

        block_on(async {
            f.formatter.load_workflows(pick(&workflow_ids, &workflow_picks)).await.unwrap();
            f.formatter
                .load_revisions([
                    (RevisionKind::Post, pick(&post_ids, &post_picks)),
                    (RevisionKind::Header, pick(&header_ids, &header_picks)),
                    (RevisionKind::Post, pick(&post_ids, &more_post_picks)),
                ])
                .await
                .unwrap();
        });

        prop_assert!(f.storage.calls_for(EntityKind::Workflow) <= 1);
        prop_assert!(f.storage.calls_for(EntityKind::Revision(RevisionKind::Post)) <= 1);
        prop_assert!(f.storage.calls_for(EntityKind::Revision(RevisionKind::Header)) <= 1);
        for (_, ids) in f.storage.calls() {
            let mut unique = ids.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), ids.len());
        }
    }

    #[test]
    fn resolving_twice_is_idempotent(picks in prop::collection::vec(0usize..4, 1..16)) {
        let f = fixture();
        let ids = pick(&f.posts.iter().map(Revision::id).collect::<Vec<_>>(), &picks);

        let (first, second, calls_between) = block_on(async {
            let first = f.formatter.load_revisions([(RevisionKind::Post, ids.clone())]).await.unwrap();
            let calls = f.storage.call_count();
            let second = f.formatter.load_revisions([(RevisionKind::Post, ids.clone())]).await.unwrap();
            (first, second, f.storage.call_count() - calls)
        });

        prop_assert_eq!(first, second);
        prop_assert_eq!(calls_between, 0);
    }

    #[test]
    fn unknown_change_types_degrade(change_type in "[a-z]{1,12}(-[a-z]{1,8})?") {
        let f = fixture();
        prop_assume!(!f.formatter.taxonomy().is_change_type(&change_type));
        prop_assume!(f.formatter.taxonomy().entry(&change_type).is_none());

        let workflow = &f.workflows[0];
        let revision = post_revision(workflow, &change_type, "body");
        prop_assert!(f
            .formatter
            .links_for(workflow.page(), Some(change_type.as_str()), workflow.id(), revision.post_id())
            .is_none());

        let description = f.formatter.describe(workflow, "topic", &revision);
        prop_assert!(description.contains("Unknown change"));
        prop_assert!(description.contains(change_type.as_str()));
    }

    #[test]
    fn aliases_link_like_their_canonical_type(seed in any::<u64>(), with_post in any::<bool>()) {
        let f = fixture();
        let workflow_id = EntityId::from_parts(seed >> 16, u128::from(seed));
        let post_id = with_post.then(EntityId::new);
        let page = PageTitle::new(flow_model::NS_TOPIC, workflow_id.canonical());

        for (alias, canonical) in [("censor-post", "suppress-post"), ("censor-topic", "suppress-topic")] {
            let via_alias = f.formatter.links_for(&page, Some(alias), workflow_id, post_id);
            let direct = f.formatter.links_for(&page, Some(canonical), workflow_id, post_id);
            prop_assert!(direct.is_some());
            prop_assert_eq!(via_alias, direct);
        }
    }
}

#[test]
fn missing_predecessor_counts_as_empty() {
    let f = fixture();
    let diff = f.formatter.char_diff(&f.posts[0], None).unwrap();
    assert_eq!(diff.delta(), i64::try_from(f.posts[0].content_raw().len()).unwrap());
}
