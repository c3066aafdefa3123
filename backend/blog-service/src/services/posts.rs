/// Post service - handles post creation, editing and retrieval
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::forms::{CleanedPost, PostForm};
use crate::media::BlobStore;
use crate::metrics::blog::record_mutation;
use crate::middleware::check_post_ownership;
use crate::models::{AuthUser, CommentView, Group, NewPost, PostChanges, PostView, Viewer};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A post with its comments, as shown on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    /// Newest first
    pub comments: Vec<CommentView>,
    /// Whether the viewer may edit the post
    pub can_edit: bool,
}

pub struct PostService {
    repo: Arc<dyn BlogRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl PostService {
    pub fn new(repo: Arc<dyn BlogRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repo, blobs }
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: i64) -> Result<PostView> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))
    }

    pub async fn post_detail(&self, post_id: i64, viewer: &Viewer) -> Result<PostDetail> {
        let post = self.get_post(post_id).await?;
        let comments = self.repo.list_comments(post_id).await?;
        let can_edit = viewer
            .user_id()
            .map(|id| post.is_authored_by(id))
            .unwrap_or(false);

        Ok(PostDetail {
            post,
            comments,
            can_edit,
        })
    }

    /// Groups a post can be filed under.
    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.repo.list_groups().await
    }

    /// Create a new post authored by `author`.
    pub async fn create_post(&self, author: &AuthUser, form: &PostForm) -> Result<PostView> {
        let result = self.create_post_inner(author, form).await;
        record_mutation("create_post", &result);
        result
    }

    async fn create_post_inner(&self, author: &AuthUser, form: &PostForm) -> Result<PostView> {
        let cleaned = form.clean().map_err(AppError::Validation)?;
        self.ensure_group(cleaned.group_id).await?;
        self.repo.ensure_user(author.id, &author.username).await?;

        let image = self.store_image(&cleaned).await?;
        let post = self
            .repo
            .insert_post(NewPost {
                author_id: author.id,
                text: cleaned.text,
                group_id: cleaned.group_id,
                image,
            })
            .await?;

        info!(
            post_id = post.id,
            author = %author.username,
            preview = %post.preview(),
            "Post created"
        );
        Ok(post)
    }

    /// Load a post for editing. Only its author may open it.
    pub async fn post_for_edit(&self, post_id: i64, editor: &AuthUser) -> Result<PostView> {
        let post = self.get_post(post_id).await?;
        check_post_ownership(editor.id, &post)?;
        Ok(post)
    }

    /// Replace a post's text and group, and its image when one is uploaded.
    ///
    /// Ownership is checked before anything is validated or written.
    pub async fn edit_post(
        &self,
        post_id: i64,
        editor: &AuthUser,
        form: &PostForm,
    ) -> Result<PostView> {
        let result = self.edit_post_inner(post_id, editor, form).await;
        record_mutation("edit_post", &result);
        result
    }

    async fn edit_post_inner(
        &self,
        post_id: i64,
        editor: &AuthUser,
        form: &PostForm,
    ) -> Result<PostView> {
        let post = self.get_post(post_id).await?;
        if let Err(e) = check_post_ownership(editor.id, &post) {
            warn!(post_id, editor = %editor.username, "Rejected edit by non-author");
            return Err(e);
        }

        let cleaned = form.clean().map_err(AppError::Validation)?;
        self.ensure_group(cleaned.group_id).await?;

        let image = self.store_image(&cleaned).await?;
        let updated = self
            .repo
            .update_post(
                post_id,
                PostChanges {
                    text: cleaned.text,
                    group_id: cleaned.group_id,
                    image,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

        info!(post_id, editor = %editor.username, "Post updated");
        Ok(updated)
    }

    async fn ensure_group(&self, group_id: Option<i64>) -> Result<()> {
        match group_id {
            Some(id) if self.repo.find_group(id).await?.is_none() => {
                Err(AppError::not_found(format!("group {}", id)))
            }
            _ => Ok(()),
        }
    }

    async fn store_image(&self, cleaned: &CleanedPost) -> Result<Option<String>> {
        match &cleaned.image {
            Some(image) => {
                let reference = self.blobs.put(&image.file_name, &image.bytes).await?;
                Ok(Some(reference))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryBlogRepository;
    use crate::forms::ImageUpload;
    use crate::models::NewGroup;
    use base64::{engine::general_purpose, Engine as _};
    use mockall::mock;
    use mockall::predicate::*;
    use uuid::Uuid;

    mock! {
        pub Blobs {}

        #[async_trait::async_trait]
        impl BlobStore for Blobs {
            async fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;
        }
    }

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn auth_user(name: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: name.to_string(),
        }
    }

    fn form(text: &str, group: Option<i64>) -> PostForm {
        PostForm {
            text: text.to_string(),
            group,
            image: None,
        }
    }

    fn service(repo: Arc<InMemoryBlogRepository>, blobs: MockBlobs) -> PostService {
        PostService::new(repo, Arc::new(blobs))
    }

    #[tokio::test]
    async fn create_with_image_stores_blob_reference() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let group = repo
            .create_group(NewGroup::new("Group", "group", ""))
            .await
            .unwrap();

        let mut blobs = MockBlobs::new();
        blobs
            .expect_put()
            .with(function(|name: &str| name == "small.gif"), always())
            .times(1)
            .returning(|name, _| Ok(format!("posts/{}", name)));

        let posts = service(repo.clone(), blobs);
        let author = auth_user("author");
        let mut payload = form("Тестовый текст", Some(group.id));
        payload.image = Some(ImageUpload {
            name: "small.gif".into(),
            data: general_purpose::STANDARD.encode(SMALL_GIF),
        });

        let post = posts.create_post(&author, &payload).await.unwrap();

        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
        assert_eq!(post.group, Some(group));
        assert_eq!(post.author.username, "author");
        assert!(repo.find_user(author.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_form_stores_nothing() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let mut blobs = MockBlobs::new();
        blobs.expect_put().never();
        let posts = service(repo.clone(), blobs);

        let err = posts
            .create_post(&auth_user("author"), &form("   ", None))
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => assert!(errors.get("text").is_some()),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(
            repo.count_posts(&crate::db::PostFilter::All).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let posts = service(repo, MockBlobs::new());

        let err = posts
            .create_post(&auth_user("author"), &form("text", Some(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_author_edit_is_forbidden_and_post_unchanged() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let posts = service(repo.clone(), MockBlobs::new());
        let author = auth_user("author");
        let intruder = auth_user("intruder");
        let post = posts
            .create_post(&author, &form("original", None))
            .await
            .unwrap();

        // Invalid payload too: the ownership check must win.
        let err = posts
            .edit_post(post.id, &intruder, &form("", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let reloaded = posts.get_post(post.id).await.unwrap();
        assert_eq!(reloaded, post);
    }

    #[tokio::test]
    async fn edit_keeps_image_and_clears_group() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let group = repo
            .create_group(NewGroup::new("Group", "group", ""))
            .await
            .unwrap();
        let author = auth_user("author");
        repo.ensure_user(author.id, &author.username).await.unwrap();
        let post = repo
            .insert_post(NewPost {
                author_id: author.id,
                text: "before".into(),
                group_id: Some(group.id),
                image: Some("posts/old.gif".into()),
            })
            .await
            .unwrap();

        let posts = service(repo, MockBlobs::new());
        let edited = posts
            .edit_post(post.id, &author, &form("after", None))
            .await
            .unwrap();

        assert_eq!(edited.text, "after");
        assert_eq!(edited.group, None);
        assert_eq!(edited.image.as_deref(), Some("posts/old.gif"));
        assert_eq!(edited.created_at, post.created_at);
    }

    #[tokio::test]
    async fn detail_lists_comments_and_edit_permission() {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let posts = service(repo.clone(), MockBlobs::new());
        let author = auth_user("author");
        let post = posts.create_post(&author, &form("text", None)).await.unwrap();

        let as_author = posts
            .post_detail(post.id, &Viewer::from(author.clone()))
            .await
            .unwrap();
        assert!(as_author.can_edit);
        assert!(as_author.comments.is_empty());

        let anonymous = posts.post_detail(post.id, &Viewer::Anonymous).await.unwrap();
        assert!(!anonymous.can_edit);

        assert!(posts.get_post(post.id + 100).await.unwrap_err().is_not_found());
    }
}
