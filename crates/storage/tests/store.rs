use chrono::{Duration, NaiveDate, NaiveDateTime};
use domain::{build_forest, CommentId};
use storage::Db;

fn at(minutes: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
        + Duration::minutes(minutes)
}

async fn fresh_db() -> Db {
    let db = Db::in_memory().await.expect("open in-memory db");
    db.create_schema().await.expect("create schema");
    db
}

#[tokio::test]
async fn reply_scenario_orders_newest_first() {
    let db = fresh_db().await;
    let u1 = db.insert_user("one@example.com", "one").await.unwrap();
    let u2 = db.insert_user("two@example.com", "two").await.unwrap();

    let c1 = db.insert_comment(u2, None, "hello", at(0)).await.unwrap();
    let c2 = db.insert_comment(u1, Some(c1), "hi back", at(1)).await.unwrap();

    let page = db.fetch_comments_page(25, 0).await.unwrap();
    let ids: Vec<CommentId> = page.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![c2, c1]);
    assert_eq!(page[0].author_email, "one@example.com");
    assert_eq!(page[0].parent_id, Some(c1));
    assert_eq!(page[1].author_email, "two@example.com");
    assert_eq!(page[1].text, "hello");

    let forest = build_forest(&page);
    assert_eq!(forest.roots().len(), 1);
    assert_eq!(forest.roots()[0].id(), c1);
    assert_eq!(forest.roots()[0].replies[0].id(), c2);
}

#[tokio::test]
async fn pages_split_at_offset() {
    let db = fresh_db().await;
    let user = db.insert_user("user@example.com", "ferris").await.unwrap();
    for i in 0..30 {
        db.insert_comment(user, None, &format!("comment {i}"), at(i))
            .await
            .unwrap();
    }

    let first = db.fetch_comments_page(25, 0).await.unwrap();
    let second = db.fetch_comments_page(25, 25).await.unwrap();
    assert_eq!(first.len(), 25);
    assert_eq!(second.len(), 5);
    assert_eq!(first[0].text, "comment 29");
    assert_eq!(second[4].text, "comment 0");
    assert!(first.last().unwrap().created_at > second[0].created_at);
    assert_eq!(db.count_comments().await.unwrap(), 30);
}

#[tokio::test]
async fn equal_timestamps_break_ties_by_id() {
    let db = fresh_db().await;
    let user = db.insert_user("user@example.com", "ferris").await.unwrap();
    let a = db.insert_comment(user, None, "a", at(0)).await.unwrap();
    let b = db.insert_comment(user, None, "b", at(0)).await.unwrap();

    let page = db.fetch_comments_page(25, 0).await.unwrap();
    assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), vec![b, a]);
}

#[tokio::test]
async fn unknown_parent_is_rejected_by_foreign_key() {
    let db = fresh_db().await;
    let user = db.insert_user("user@example.com", "ferris").await.unwrap();

    let result = db
        .insert_comment(user, Some(CommentId::new(404)), "orphan", at(0))
        .await;
    assert!(result.is_err());
    assert_eq!(db.count_comments().await.unwrap(), 0);
}

#[tokio::test]
async fn users_round_trip() {
    let db = fresh_db().await;
    let id = db.insert_user("user@example.com", "ferris").await.unwrap();

    let user = db.get_user(id).await.unwrap().expect("user exists");
    assert_eq!(user.email, "user@example.com");
    assert_eq!(user.username, "ferris");
}

#[tokio::test]
async fn file_database_persists_between_handles() {
    let dir = std::env::temp_dir().join(format!("threads-store-{}", std::process::id()));
    let url = format!("sqlite://{}/nested/threads.db", dir.display());

    {
        let db = Db::new(&url).await.unwrap();
        db.create_schema().await.unwrap();
        let user = db.insert_user("user@example.com", "ferris").await.unwrap();
        db.insert_comment(user, None, "persisted", at(0)).await.unwrap();
    }

    let db = Db::new(&url).await.unwrap();
    db.create_schema().await.unwrap();
    let page = db.fetch_comments_page(25, 0).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "persisted");

    let _ = std::fs::remove_dir_all(dir);
}
