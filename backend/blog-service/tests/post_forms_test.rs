//! Post create/edit forms and comments over HTTP.

#[macro_use]
mod common;

use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::test;
use base64::{engine::general_purpose, Engine as _};
use blog_service::db::{BlogRepository, PostFilter};
use common::TestContext;
use serde_json::{json, Value};

const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

#[actix_web::test]
async fn test_anonymous_create_redirects_to_login() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .set_json(json!({ "text": "Тестовый текст" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(LOCATION).unwrap(),
        "/auth/login/?next=%2Fcreate%2F"
    );
    assert_eq!(ctx.repo.count_posts(&PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_create_form_lists_groups() {
    let ctx = TestContext::new();
    let auth = ctx.user("auth").await;
    ctx.group("Тестовая группа", "test-slug").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header(ctx.bearer(&auth))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["is_edit"], false);
    assert_eq!(body["form"]["text"], "");
    assert_eq!(body["groups"][0]["slug"], "test-slug");
}

#[actix_web::test]
async fn test_create_post_with_image_redirects_to_profile() {
    let ctx = TestContext::new();
    let auth = ctx.user("auth").await;
    let group = ctx.group("Тестовая группа", "test-slug").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&auth))
        .set_json(json!({
            "text": "Тестовый текст",
            "group": group.id,
            "image": {
                "name": "small.gif",
                "data": general_purpose::STANDARD.encode(SMALL_GIF),
            },
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(LOCATION).unwrap(), "/profile/auth/");

    let posts = ctx.repo.list_posts(&PostFilter::All, 0, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post.text, "Тестовый текст");
    assert_eq!(post.group.as_ref().map(|g| g.id), Some(group.id));
    let reference = post.image.as_deref().expect("image stored");
    assert!(reference.starts_with("posts/"));
    assert!(ctx.media.path().join(reference).exists());

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["post"]["image_url"],
        format!("/media/{}", reference)
    );
}

#[actix_web::test]
async fn test_invalid_create_rerenders_form() {
    let ctx = TestContext::new();
    let auth = ctx.user("auth").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&auth))
        .set_json(json!({
            "text": "   ",
            "image": { "name": "notes.txt", "data": general_purpose::STANDARD.encode("plain") },
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["text"][0], "This field is required.");
    assert!(body["errors"]["image"][0]
        .as_str()
        .unwrap()
        .starts_with("Upload a valid image."));
    assert_eq!(body["form"]["text"], "   ");
    assert_eq!(body["is_edit"], false);
    assert_eq!(ctx.repo.count_posts(&PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_non_author_edit_redirects_and_leaves_post_unchanged() {
    let ctx = TestContext::new();
    let author = ctx.user("author").await;
    let intruder = ctx.user("intruder").await;
    let post = ctx.post(&author, "Исходный текст", None).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&intruder))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(LOCATION).unwrap().to_str().unwrap(),
        format!("/posts/{}/", post.id)
    );

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&intruder))
        .set_json(json!({ "text": "Взломано" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let reloaded = ctx.repo.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(reloaded, post);
}

#[actix_web::test]
async fn test_author_edit() {
    let ctx = TestContext::new();
    let author = ctx.user("author").await;
    let group = ctx.group("Тестовая группа", "test-slug").await;
    let post = ctx.post(&author, "Исходный текст", Some(group.id)).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_edit"], true);
    assert_eq!(body["form"]["text"], "Исходный текст");
    assert_eq!(body["form"]["group"], group.id);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "text": "", "group": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_edit"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "text": "Новый текст", "group": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(LOCATION).unwrap().to_str().unwrap(),
        format!("/posts/{}/", post.id)
    );

    let reloaded = ctx.repo.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(reloaded.text, "Новый текст");
    assert_eq!(reloaded.group, None);
    assert_eq!(reloaded.created_at, post.created_at);
}

#[actix_web::test]
async fn test_comments() {
    let ctx = TestContext::new();
    let author = ctx.user("author").await;
    let post = ctx.post(&author, "Пост", None).await;
    let app = init_app!(ctx);

    // Anonymous comment goes to login.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .set_json(json!({ "text": "аноним" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp
        .headers()
        .get(LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("/auth/login/?next="));

    // Blank comment is dropped with a redirect back to the post.
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "text": "  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(ctx.repo.list_comments(post.id).await.unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "text": "Комментарий" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(ctx.repo.list_comments(post.id).await.unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/posts/9999/comment/")
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "text": "Комментарий" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
