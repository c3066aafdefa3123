/// Comment handlers
use actix_web::{web, HttpResponse};
use tracing::debug;

use super::{post_url, redirect, AppState};
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::models::AuthUser;

/// Add a comment and return to the post. A blank or unreadable submission
/// stores nothing and also returns to the post.
pub async fn add_comment(
    user: AuthUser,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    form: Option<web::Json<CommentForm>>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let form = form.map(|f| f.into_inner()).unwrap_or_default();

    match state.comments.add_comment(post_id, &user, &form).await {
        Ok(_) => Ok(redirect(post_url(post_id))),
        Err(AppError::Validation(errors)) => {
            debug!(post_id, %errors, "Discarded invalid comment");
            Ok(redirect(post_url(post_id)))
        }
        Err(e) => Err(e),
    }
}
