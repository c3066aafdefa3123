/// Authorization checks for blog content
///
/// Only the author of a post may modify it. Checks run before any field of the
/// target is touched.
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::PostView;

/// Check if a user authored a post
pub fn check_post_ownership(user_id: Uuid, post: &PostView) -> Result<()> {
    if post.is_authored_by(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to modify this post".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;

    #[test]
    fn only_author_passes() {
        let author = User {
            id: Uuid::new_v4(),
            username: "author".into(),
            created_at: Utc::now(),
        };
        let post = PostView {
            id: 1,
            text: "text".into(),
            author: author.clone(),
            group: None,
            image: None,
            created_at: Utc::now(),
        };

        assert!(check_post_ownership(author.id, &post).is_ok());
        assert!(matches!(
            check_post_ownership(Uuid::new_v4(), &post),
            Err(AppError::Forbidden(_))
        ));
    }
}
