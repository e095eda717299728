use detour_core::{RuleDraft, SharedStatusTable, StatusTable};
use detour_registry::{Registry, RegistryError, RegistryService, SaveMode};
use detour_resolver::ResolverService;
use detour_storage::InMemoryRuleStore;

struct Fixture {
    store: InMemoryRuleStore,
    registry: RegistryService<InMemoryRuleStore>,
    resolver: ResolverService<InMemoryRuleStore, SharedStatusTable>,
    statuses: SharedStatusTable,
}

impl Fixture {
    fn new() -> Self {
        let store = InMemoryRuleStore::new();
        let statuses = SharedStatusTable::new(StatusTable::default());
        Self {
            registry: RegistryService::new(store.clone()),
            resolver: ResolverService::new(store.clone(), statuses.clone()),
            store,
            statuses,
        }
    }

    async fn destination(&self, path: &str) -> Option<String> {
        self.resolver
            .resolve(path)
            .await
            .unwrap()
            .map(|rule| rule.destination)
    }
}

fn draft(source: &str, destination: &str) -> RuleDraft {
    RuleDraft::builder()
        .source(source)
        .destination(destination)
        .status(301)
        .build()
}

#[tokio::test]
async fn saved_with_slashes_resolves_without() {
    let fixture = Fixture::new();

    fixture
        .registry
        .create(draft("/foo/bar/", "/landing/"))
        .await
        .unwrap();

    assert_eq!(fixture.destination("foo/bar").await.as_deref(), Some("landing"));
    assert_eq!(fixture.destination("/foo/bar/").await.as_deref(), Some("landing"));
}

#[tokio::test]
async fn chain_collapses_to_single_hop() {
    let fixture = Fixture::new();

    for (source, destination) in [("/a", "/b"), ("/b", "/c"), ("/c", "/d")] {
        fixture
            .registry
            .save(draft(source, destination), SaveMode::Create)
            .await
            .unwrap();
    }

    for path in ["a", "b", "c"] {
        assert_eq!(fixture.destination(path).await.as_deref(), Some("d"));
    }
    assert!(fixture.destination("d").await.is_none());
    assert!(fixture
        .store
        .rules()
        .await
        .iter()
        .all(|rule| rule.destination == "d"));
}

#[tokio::test]
async fn reverse_pair_is_replaced() {
    let fixture = Fixture::new();
    fixture.registry.create(draft("/new", "/old")).await.unwrap();

    fixture.registry.create(draft("/old", "/new")).await.unwrap();

    assert_eq!(fixture.destination("old").await.as_deref(), Some("new"));
    assert!(fixture.destination("new").await.is_none());
    assert_eq!(fixture.store.len().await, 1);
}

#[tokio::test]
async fn self_redirect_persists_nothing() {
    let fixture = Fixture::new();

    let err = fixture
        .registry
        .create(draft("https://example.com/page/", "/page"))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::SameUrls { .. }));
    assert!(fixture.store.is_empty().await);
    assert!(fixture.destination("page").await.is_none());
}

#[tokio::test]
async fn root_rule_resolves_from_slash_and_empty_path() {
    let fixture = Fixture::new();

    fixture
        .registry
        .create(draft("https://example.com/", "/welcome"))
        .await
        .unwrap();

    assert_eq!(fixture.destination("/").await.as_deref(), Some("welcome"));
    assert_eq!(fixture.destination("").await.as_deref(), Some("welcome"));
}

#[tokio::test]
async fn external_destination_is_stored_verbatim() {
    let fixture = Fixture::new();

    let saved = fixture
        .registry
        .create(
            RuleDraft::builder()
                .source("/promo")
                .destination("http://example.com/page/")
                .external(true)
                .status(302)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(saved.destination, "http://example.com/page");
    assert_eq!(
        fixture.destination("promo").await.as_deref(),
        Some("http://example.com/page")
    );
}

#[tokio::test]
async fn latest_save_wins_for_shared_source() {
    let fixture = Fixture::new();
    fixture.registry.create(draft("/sale", "/spring")).await.unwrap();
    fixture.registry.create(draft("/sale", "/summer")).await.unwrap();

    for _ in 0..3 {
        assert_eq!(fixture.destination("sale").await.as_deref(), Some("summer"));
    }
}

#[tokio::test]
async fn disallowed_status_is_not_served_until_configured() {
    let fixture = Fixture::new();
    fixture
        .registry
        .create(
            RuleDraft::builder()
                .source("/moved")
                .destination("/here")
                .status(308)
                .build(),
        )
        .await
        .unwrap();

    assert!(fixture.destination("moved").await.is_none());

    fixture
        .statuses
        .replace(StatusTable::new([(301, "Permanent (301)"), (308, "Permanent (308)")]));

    assert_eq!(fixture.destination("moved").await.as_deref(), Some("here"));
}

#[tokio::test]
async fn raw_path_text_resolves_as_saved() {
    let fixture = Fixture::new();

    for (index, source) in ["/foo bar/", "/café/", "/a/../b/", "/docs\\guide/"]
        .into_iter()
        .enumerate()
    {
        let destination = format!("/target-{index}");
        fixture
            .registry
            .create(draft(source, &destination))
            .await
            .unwrap();

        assert_eq!(
            fixture.destination(source).await,
            Some(format!("target-{index}")),
            "lookup for {source:?}"
        );
    }

    assert_eq!(fixture.destination("foo bar").await.as_deref(), Some("target-0"));
    assert!(fixture.destination("foo%20bar").await.is_none());
    assert!(fixture.destination("b").await.is_none());
}

#[tokio::test]
async fn saving_through_a_redirected_path_stays_one_hop() {
    let fixture = Fixture::new();
    fixture.registry.create(draft("/b", "/c")).await.unwrap();

    fixture.registry.create(draft("/a", "/b")).await.unwrap();

    assert_eq!(fixture.destination("a").await.as_deref(), Some("c"));
}
