/// Comment service - handles comment creation and retrieval
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::metrics::blog::record_mutation;
use crate::models::{AuthUser, Comment, CommentView, NewComment};
use std::sync::Arc;
use tracing::info;

pub struct CommentService {
    repo: Arc<dyn BlogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Add a comment to an existing post.
    ///
    /// Fails with `NotFound` for an unknown post before the text is looked at.
    pub async fn add_comment(
        &self,
        post_id: i64,
        author: &AuthUser,
        form: &CommentForm,
    ) -> Result<Comment> {
        let result = self.add_comment_inner(post_id, author, form).await;
        record_mutation("add_comment", &result);
        result
    }

    async fn add_comment_inner(
        &self,
        post_id: i64,
        author: &AuthUser,
        form: &CommentForm,
    ) -> Result<Comment> {
        if self.repo.find_post(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("post {}", post_id)));
        }

        let text = form.clean().map_err(AppError::Validation)?;
        self.repo.ensure_user(author.id, &author.username).await?;

        let comment = self
            .repo
            .insert_comment(NewComment {
                post_id,
                author_id: author.id,
                text,
            })
            .await?;

        info!(post_id, comment_id = comment.id, author = %author.username, "Comment added");
        Ok(comment)
    }

    /// Get comments for a post, newest first
    pub async fn get_post_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        self.repo.list_comments(post_id).await
    }
}
