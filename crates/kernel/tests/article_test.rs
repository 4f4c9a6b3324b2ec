//! Integration tests for article content.
//!
//! ## Test Coverage
//!
//! - Publishing and the `published_at` stamp
//! - Rendered views and draft visibility
//! - List filters
//! - Reference validation for categories and tags

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use uuid::Uuid;

use common::TestApp;
use quill_kernel::error::AppError;
use quill_kernel::models::{ArticleFilter, CreateArticle, CreateTag, STATUS_PUBLISHED, UpdateArticle};
use quill_test_utils::{test_article, test_tag};

fn input(fixture: quill_test_utils::TestArticle) -> CreateArticle {
    serde_json::from_value(fixture.to_json()).unwrap()
}

#[tokio::test]
async fn draft_has_no_publish_date_until_published() {
    let app = TestApp::new().await;
    let articles = app.state.articles();

    let draft = articles.create(input(test_article("Draft"))).await.unwrap();
    assert_eq!(draft.article.published_at, None);

    let published = articles
        .update(
            draft.article.id,
            UpdateArticle {
                status: Some(STATUS_PUBLISHED),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
    let stamp = published.article.published_at.expect("stamped on publish");

    // Unpublish and republish: the first stamp is kept
    articles
        .update(
            draft.article.id,
            UpdateArticle {
                status: Some(0),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
    let republished = articles
        .update(
            draft.article.id,
            UpdateArticle {
                status: Some(STATUS_PUBLISHED),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(republished.article.published_at, Some(stamp));
}

#[tokio::test]
async fn view_renders_markdown_and_hides_drafts() {
    let app = TestApp::new().await;
    let articles = app.state.articles();

    let published = articles
        .create(input(
            test_article("Hello World")
                .with_body("Some **bold** text<script>alert(1)</script>")
                .published(),
        ))
        .await
        .unwrap();
    articles
        .create(input(test_article("Secret Draft")))
        .await
        .unwrap();

    let view = articles.view(&published.article.slug).await.unwrap();
    assert_eq!(view.slug, "hello-world");
    assert!(view.html.contains("<strong>bold</strong>"));
    assert!(!view.html.contains("<script>"));
    assert!(view.text.contains("bold"));

    let err = articles.view("secret-draft").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn plain_text_is_escaped() {
    let app = TestApp::new().await;
    let created = app
        .state
        .articles()
        .create(input(
            test_article("Plain")
                .plain_text()
                .with_body("a < b\nnext line")
                .published(),
        ))
        .await
        .unwrap();

    let view = app.state.articles().view(&created.article.slug).await.unwrap();
    assert!(view.html.contains("a &lt; b"));
    assert!(view.html.contains("<br>"));
}

#[tokio::test]
async fn list_filters_by_status_and_tag() {
    let app = TestApp::new().await;
    let rust: CreateTag = serde_json::from_value(test_tag("Rust").to_json()).unwrap();
    let rust = app.state.tags().create(rust).await.unwrap().id;

    let a1 = app
        .state
        .articles()
        .create(input(test_article("One").published().with_tags(&[rust])))
        .await
        .unwrap()
        .article
        .id;
    app.state
        .articles()
        .create(input(test_article("Two").with_tags(&[rust])))
        .await
        .unwrap();
    app.state
        .articles()
        .create(input(test_article("Three").published()))
        .await
        .unwrap();

    let filter = ArticleFilter {
        status: Some(STATUS_PUBLISHED),
        tag_id: Some(rust),
        ..ArticleFilter::default()
    };
    let found = app.state.articles().list(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, a1);

    let all = app
        .state
        .articles()
        .list(&ArticleFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let app = TestApp::new().await;

    let err = app
        .state
        .articles()
        .create(input(test_article("Lost").in_category(Uuid::now_v7())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = app
        .state
        .articles()
        .create(input(test_article("Lost").with_tags(&[Uuid::now_v7()])))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn update_replaces_tags_only_when_given() {
    let app = TestApp::new().await;
    let t1: CreateTag = serde_json::from_value(test_tag("One").to_json()).unwrap();
    let t1 = app.state.tags().create(t1).await.unwrap().id;
    let t2: CreateTag = serde_json::from_value(test_tag("Two").to_json()).unwrap();
    let t2 = app.state.tags().create(t2).await.unwrap().id;

    let id = app
        .state
        .articles()
        .create(input(test_article("Tagged").with_tags(&[t1])))
        .await
        .unwrap()
        .article
        .id;

    let renamed = app
        .state
        .articles()
        .update(
            id,
            UpdateArticle {
                title: Some("Renamed".to_string()),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.tag_ids, vec![t1]);
    assert_eq!(renamed.article.slug, "renamed");

    let retagged = app
        .state
        .articles()
        .update(
            id,
            UpdateArticle {
                tag_ids: Some(vec![t2]),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(retagged.tag_ids, vec![t2]);
}
