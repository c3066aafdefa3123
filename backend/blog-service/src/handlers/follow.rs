/// Follow handlers - follow and unfollow authors by username
use actix_web::{web, HttpResponse};

use super::{profile_url, redirect, AppState};
use crate::error::{AppError, Result};
use crate::models::{AuthUser, User};

async fn find_author(state: &AppState, username: &str) -> Result<User> {
    state
        .repo
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user '{}'", username)))
}

/// Follow an author, then return to their profile. Following yourself
/// changes nothing and redirects the same way.
pub async fn profile_follow(
    user: AuthUser,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let author = find_author(&state, &username).await?;
    state.repo.ensure_user(user.id, &user.username).await?;

    match state.follows.follow(user.id, author.id).await {
        Ok(_) | Err(AppError::SelfFollowRejected) => Ok(redirect(profile_url(&author.username))),
        Err(e) => Err(e),
    }
}

/// Unfollow an author. Not following them is a 404.
pub async fn profile_unfollow(
    user: AuthUser,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let author = find_author(&state, &username).await?;

    if author.id != user.id {
        state.follows.unfollow(user.id, author.id).await?;
    }

    Ok(redirect(profile_url(&author.username)))
}
