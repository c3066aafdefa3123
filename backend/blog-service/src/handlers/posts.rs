/// Post handlers - detail, create and edit
use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::debug;

use super::{post_url, profile_url, redirect, AppState, PostResponse};
use crate::error::{AppError, FieldErrors, Result};
use crate::forms::{CommentForm, PostForm};
use crate::models::{AuthUser, CommentView, Group, Viewer};

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentView>,
    pub comment_form: CommentForm,
    pub can_edit: bool,
}

/// Form page: the payload to (re)submit, its field errors and the groups to pick from.
#[derive(Debug, Serialize)]
pub struct PostFormResponse {
    pub form: PostForm,
    pub errors: FieldErrors,
    pub is_edit: bool,
    pub groups: Vec<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: Viewer,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = state.posts.post_detail(post_id.into_inner(), &viewer).await?;

    Ok(HttpResponse::Ok().json(PostDetailResponse {
        post: PostResponse::from_view(detail.post, &state.settings),
        comments: detail.comments,
        comment_form: CommentForm::default(),
        can_edit: detail.can_edit,
    }))
}

pub async fn create_form(_user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(PostFormResponse {
        form: PostForm::default(),
        errors: FieldErrors::new(),
        is_edit: false,
        groups: state.posts.groups().await?,
        post_id: None,
    }))
}

pub async fn post_create(
    user: AuthUser,
    state: web::Data<AppState>,
    form: web::Json<PostForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    match state.posts.create_post(&user, &form).await {
        Ok(_) => Ok(redirect(profile_url(&user.username))),
        Err(AppError::Validation(errors)) => rerender(&state, form, errors, None).await,
        Err(e) => Err(e),
    }
}

pub async fn edit_form(
    user: AuthUser,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();

    match state.posts.post_for_edit(post_id, &user).await {
        Ok(post) => Ok(HttpResponse::Ok().json(PostFormResponse {
            form: PostForm::prefilled(&post.text, post.group.map(|g| g.id)),
            errors: FieldErrors::new(),
            is_edit: true,
            groups: state.posts.groups().await?,
            post_id: Some(post_id),
        })),
        Err(AppError::Forbidden(_)) => Ok(redirect(post_url(post_id))),
        Err(e) => Err(e),
    }
}

pub async fn post_edit(
    user: AuthUser,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    form: web::Json<PostForm>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let form = form.into_inner();

    match state.posts.edit_post(post_id, &user, &form).await {
        Ok(_) => Ok(redirect(post_url(post_id))),
        Err(AppError::Forbidden(_)) => {
            debug!(post_id, user = %user.username, "Non-author sent back to post");
            Ok(redirect(post_url(post_id)))
        }
        Err(AppError::Validation(errors)) => rerender(&state, form, errors, Some(post_id)).await,
        Err(e) => Err(e),
    }
}

async fn rerender(
    state: &AppState,
    form: PostForm,
    errors: FieldErrors,
    post_id: Option<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::BadRequest().json(PostFormResponse {
        form,
        errors,
        is_edit: post_id.is_some(),
        groups: state.posts.groups().await?,
        post_id,
    }))
}
