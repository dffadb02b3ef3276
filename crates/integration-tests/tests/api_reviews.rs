use axum::http::StatusCode;
use integration_tests::{parse_id, Account, TestApp};
use serde_json::json;
use uuid::Uuid;

struct Fixture {
    app: TestApp,
    alice: Account,
    rita: Account,
    remy: Account,
    question: Uuid,
    answer: Uuid,
}

/// alice asks and answers; rita and remy are reviewers.
async fn fixture() -> Fixture {
    let app = TestApp::spawn().await;
    let admin = app.account("admin").await;
    let alice = app.account("alice").await;
    let rita = app.account("rita").await;
    let remy = app.account("remy").await;
    app.grant(&admin, &rita, "reviewer").await;
    app.grant(&admin, &remy, "reviewer").await;

    let question = app.ask(&alice, "Reviewed question").await;
    let answer = app.answer(&alice, question, "My own attempt.").await;
    Fixture { app, alice, rita, remy, question, answer }
}

#[tokio::test]
async fn only_reviewers_write_reviews_once() {
    let f = fixture().await;
    let uri = format!("/api/answers/{}/reviews", f.answer);

    let body = json!({ "body": "Clear and correct." });
    assert_eq!(f.app.post(&uri, &f.alice.token, body.clone()).await.0, StatusCode::FORBIDDEN);

    let (status, review) = f.app.post(&uri, &f.rita.token, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["author_username"], "rita");

    assert_eq!(f.app.post(&uri, &f.rita.token, body).await.0, StatusCode::CONFLICT);
}

#[tokio::test]
async fn review_votes_count_as_helpfulness() {
    let f = fixture().await;
    let uri = format!("/api/answers/{}/reviews", f.answer);
    let (_, review) = f.app.post(&uri, &f.rita.token, json!({ "body": "Helpful." })).await;
    let review_id = parse_id(&review["id"]);

    let vote_uri = format!("/api/reviews/{review_id}/vote");
    f.app.post(&vote_uri, &f.alice.token, json!({ "direction": "up" })).await;
    f.app.post(&vote_uri, &f.remy.token, json!({ "direction": "down" })).await;

    let (_, reviews) = f.app.get(&uri, &f.alice.token).await;
    assert_eq!(reviews[0]["helpful"], 1);
    assert_eq!(reviews[0]["not_helpful"], 1);

    let (status, _) = f.app.post(&vote_uri, &f.rita.token, json!({ "direction": "up" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trusted_filter_narrows_reviews_and_search() {
    let f = fixture().await;
    let uri = format!("/api/answers/{}/reviews", f.answer);
    f.app.post(&uri, &f.remy.token, json!({ "body": "Looks fine." })).await;
    let other = f.app.ask(&f.alice, "Unreviewed question").await;

    let (_, trusted) = f.app.get("/api/questions?trusted_only=true", &f.alice.token).await;
    assert_eq!(trusted.as_array().map(Vec::len), Some(0));

    // Trusting requires the reviewer role.
    let (status, _) = f.app.post("/api/trusted", &f.alice.token, json!({ "username": "admin" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = f.app.post("/api/trusted", &f.alice.token, json!({ "username": "remy" })).await;
    assert_eq!(status, StatusCode::CREATED);
    f.app.post(&uri, &f.rita.token, json!({ "body": "Needs work." })).await;

    let (_, trusted) = f.app.get("/api/questions?trusted_only=true", &f.alice.token).await;
    assert_eq!(trusted.as_array().map(Vec::len), Some(1));
    assert_eq!(trusted[0]["id"], f.question.to_string());
    assert_ne!(trusted[0]["id"], other.to_string());

    let (_, reviews) = f.app.get(&format!("{uri}?trusted_only=true"), &f.alice.token).await;
    assert_eq!(reviews.as_array().map(Vec::len), Some(1));
    assert_eq!(reviews[0]["author_username"], "remy");

    let (_, list) = f.app.get("/api/trusted", &f.alice.token).await;
    assert_eq!(list[0]["username"], "remy");

    assert_eq!(f.app.delete("/api/trusted/remy", &f.alice.token).await.0, StatusCode::NO_CONTENT);
    assert_eq!(f.app.delete("/api/trusted/remy", &f.alice.token).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviewers_cannot_review_their_own_answers() {
    let f = fixture().await;
    let own = f.app.answer(&f.rita, f.question, "Reviewer's answer.").await;
    let (status, _) = f
        .app
        .post(&format!("/api/answers/{own}/reviews"), &f.rita.token, json!({ "body": "Great!" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
