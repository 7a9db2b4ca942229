//! End-to-end search tests against the in-memory store

mod common;

use chat_history_search::models::TagDocument;
use chat_history_search::search::*;
use common::{seeded_service, utc, ConversationFixture};
use uuid::Uuid;

fn titles(response: &SearchResponse) -> Vec<&str> {
    response.conversations.iter().map(|c| c.title.as_str()).collect()
}

#[tokio::test]
async fn test_exact_title_match_outranks_plural_message_match() {
    let planning = ConversationFixture::new("Budget Planning 2024")
        .message("Let's go over the numbers")
        .build();
    let review = ConversationFixture::new("Quarterly review")
        .message("In the meeting the annual budgets were discussed")
        .build();
    let (_, service) = seeded_service(&[review, planning]).await;

    let response = service.search(&SearchQuery::new("budget")).await.unwrap();

    assert_eq!(titles(&response), vec!["Budget Planning 2024", "Quarterly review"]);
    assert!(response.conversations[0].score > response.conversations[1].score);
    assert!(response.conversations[0]
        .matched_fields
        .contains(&MatchedField::Title));
}

#[tokio::test]
async fn test_matched_messages_are_backfilled_to_three() {
    let doc = ConversationFixture::new("Code cleanup")
        .message("hello there")
        .message("we should refactor the parser")
        .message("sounds good")
        .message("the refactor is done")
        .message("thanks")
        .build();
    let expected = vec![doc.messages[1].id, doc.messages[3].id, doc.messages[0].id];
    let (_, service) = seeded_service(&[doc]).await;

    let response = service.search(&SearchQuery::new("refactor")).await.unwrap();

    assert_eq!(response.conversations.len(), 1);
    let result = &response.conversations[0];
    let ids: Vec<Uuid> = result.messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, expected);
    assert!(result.matched_fields.contains(&MatchedField::MessageContent));
    assert!(result.messages.iter().all(|m| m.matched_fields == vec!["content"]));
}

#[tokio::test]
async fn test_message_cap_holds_even_when_configured_higher() {
    let mut fixture = ConversationFixture::new("Cleanup");
    for i in 0..6 {
        fixture = fixture.message(&format!("refactor step {}", i));
    }
    let store = std::sync::Arc::new(InMemoryStore::new());
    store.index_document(common::INDEX, &fixture.build()).await.unwrap();
    let config = SearchConfigBuilder::new().max_matched_messages(6).build();
    let service = SearchService::new(store, common::INDEX, config);

    let response = service.search(&SearchQuery::new("refactor")).await.unwrap();

    assert_eq!(response.conversations[0].messages.len(), MAX_MATCHED_MESSAGES);
}

#[tokio::test]
async fn test_title_only_match_attaches_no_messages() {
    let doc = ConversationFixture::new("Kubernetes notes")
        .message("pods and services")
        .build();
    let (_, service) = seeded_service(&[doc]).await;

    let response = service.search(&SearchQuery::new("kubernetes")).await.unwrap();

    assert_eq!(response.conversations.len(), 1);
    assert!(response.conversations[0].messages.is_empty());
    assert_eq!(response.conversations[0].matched_fields, vec![MatchedField::Title]);
}

#[tokio::test]
async fn test_tag_filter_without_query() {
    let work = TagDocument::new("work");
    let tagged_a = ConversationFixture::new("Standup").tag(work.clone()).build();
    let tagged_b = ConversationFixture::new("Retro").tag(work.clone()).build();
    let untagged = ConversationFixture::new("Vacation plans")
        .tag(TagDocument::new("personal"))
        .build();
    let (_, service) = seeded_service(&[tagged_a, untagged, tagged_b]).await;

    let response = service
        .search(&SearchQuery::filter_only().with_tag(work.id))
        .await
        .unwrap();

    let mut found = titles(&response);
    found.sort();
    assert_eq!(found, vec!["Retro", "Standup"]);
    assert_eq!(response.total, 2);
    assert!(response
        .conversations
        .iter()
        .all(|c| c.matched_fields.is_empty() && c.messages.is_empty()));
}

#[tokio::test]
async fn test_date_range_end_is_inclusive_to_last_second() {
    let inside = ConversationFixture::new("late january")
        .created_at(utc(2024, 1, 31, 23, 0, 0))
        .build();
    let outside = ConversationFixture::new("early february")
        .created_at(utc(2024, 2, 1, 0, 0, 1))
        .build();
    let before = ConversationFixture::new("last year")
        .created_at(utc(2023, 12, 31, 12, 0, 0))
        .build();
    let (_, service) = seeded_service(&[inside, outside, before]).await;

    let range = DateRange::from_dates(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
        chrono::NaiveDate::from_ymd_opt(2024, 1, 31),
    );
    let response = service
        .search(&SearchQuery::filter_only().with_date_range(range))
        .await
        .unwrap();

    assert_eq!(titles(&response), vec!["late january"]);
}

#[tokio::test]
async fn test_user_and_provider_filters_combine_with_query() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let docs = [
        ConversationFixture::new("rust lifetimes").user(alice).provider("claude").build(),
        ConversationFixture::new("rust traits").user(alice).provider("openai").build(),
        ConversationFixture::new("rust macros").user(bob).provider("claude").build(),
    ];
    let (_, service) = seeded_service(&docs).await;

    let response = service
        .search(&SearchQuery::new("rust").with_user(alice).with_provider("claude"))
        .await
        .unwrap();

    assert_eq!(titles(&response), vec!["rust lifetimes"]);
}

#[tokio::test]
async fn test_every_result_contains_the_keyword() {
    let docs = [
        ConversationFixture::new("cat pictures").build(),
        ConversationFixture::new("catalog of parts").build(),
        ConversationFixture::new("a cats story").build(),
        ConversationFixture::new("unrelated").message("my cat sleeps").build(),
    ];
    let (_, service) = seeded_service(&docs).await;

    let response = service.search(&SearchQuery::new("cat")).await.unwrap();

    let mut found = titles(&response);
    found.sort();
    assert_eq!(found, vec!["cat pictures", "unrelated"]);
    assert_eq!(
        response.total as usize,
        response.conversations.len() + response.filtered_out + response.skipped
    );
}

#[tokio::test]
async fn test_cjk_keyword_matches_inside_running_text() {
    let docs = [
        ConversationFixture::new("学习计划").message("我想提高英语水平").build(),
        ConversationFixture::new("旅行").message("去英国玩").build(),
    ];
    let (_, service) = seeded_service(&docs).await;

    let response = service.search(&SearchQuery::new("英语")).await.unwrap();

    assert_eq!(titles(&response), vec!["学习计划"]);
}

#[tokio::test]
async fn test_equal_scores_keep_store_order() {
    let older = ConversationFixture::new("deploy notes")
        .created_at(utc(2024, 3, 1, 0, 0, 0))
        .build();
    let newer = ConversationFixture::new("deploy notes")
        .created_at(utc(2024, 3, 2, 0, 0, 0))
        .build();
    let (newer_id, older_id) = (newer.id, older.id);
    let (_, service) = seeded_service(&[older, newer]).await;

    let response = service.search(&SearchQuery::new("deploy")).await.unwrap();

    let ids: Vec<Uuid> = response.conversations.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![newer_id, older_id]);
}

#[tokio::test]
async fn test_pagination_reports_page_and_limit() {
    let docs: Vec<_> = (0..5)
        .map(|i| {
            ConversationFixture::new(&format!("note {}", i))
                .created_at(utc(2024, 1, 1 + i, 0, 0, 0))
                .build()
        })
        .collect();
    let (_, service) = seeded_service(&docs).await;

    let response = service
        .search(&SearchQuery::new("note").with_page(2).with_limit(2))
        .await
        .unwrap();

    assert_eq!(response.page, 2);
    assert_eq!(response.limit, 2);
    assert_eq!(response.total, 5);
    assert_eq!(response.conversations.len(), 2);
}

#[tokio::test]
async fn test_message_updates_are_searchable() {
    let doc = ConversationFixture::new("chat").message("first").build();
    let id = doc.id;
    let (store, service) = seeded_service(&[doc]).await;

    let mut message = chat_history_search::models::MessageDocument::new(
        chat_history_search::models::Role::Assistant,
        "let us talk about observability",
    );
    message.conversation_id = id;
    tokio_test::assert_ok!(service.add_message(id, &message).await);

    let response = service.search(&SearchQuery::new("observability")).await.unwrap();
    assert_eq!(response.conversations.len(), 1);

    service.remove_message(id, message.id).await.unwrap();
    let response = service.search(&SearchQuery::new("observability")).await.unwrap();
    assert!(response.conversations.is_empty());

    assert_eq!(store.document(common::INDEX, id).unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_sync_then_search() {
    let docs = vec![
        ConversationFixture::new("imported one").build(),
        ConversationFixture::new("imported two").build(),
    ];
    let (store, service) = seeded_service(&[]).await;
    let sync = SyncService::new(
        std::sync::Arc::new(StaticSource::new(docs)),
        store.clone(),
        common::INDEX,
    );

    let report = tokio_test::assert_ok!(sync.sync_all().await);
    assert_eq!(report.indexed, 2);

    let response = service.search(&SearchQuery::new("imported")).await.unwrap();
    assert_eq!(response.conversations.len(), 2);
}
