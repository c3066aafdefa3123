//! Process-local repository.
//!
//! Mirrors the PostgreSQL schema rules (cascades, unique follow pairs, unique
//! slugs and usernames) behind a single lock, so every write is an atomic
//! check-and-write. Used by the test suites and `STORAGE_BACKEND=memory`.

use crate::db::{BlogRepository, PostFilter};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, Post, PostChanges,
    PostView, User,
};
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
    next_group_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
    next_follow_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl MemoryState {
    fn post_view(&self, post: &Post) -> Result<PostView> {
        let author = self.users.get(&post.author_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("post {} references missing author", post.id))
        })?;
        let group = post
            .group_id
            .and_then(|group_id| self.groups.get(&group_id).cloned());

        Ok(PostView {
            id: post.id,
            text: post.text.clone(),
            author,
            group,
            image: post.image.clone(),
            created_at: post.created_at,
        })
    }

    fn matches(post: &Post, filter: &PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(*group_id),
            PostFilter::Author(author_id) => post.author_id == *author_id,
            PostFilter::Authors(author_ids) => author_ids.contains(&post.author_id),
        }
    }

    fn ordered_posts(&self, filter: &PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| Self::matches(post, filter))
            .collect();
        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));
        posts
    }

    fn remove_post(&mut self, id: i64) -> bool {
        let removed = self.posts.remove(&id).is_some();
        if removed {
            self.comments.retain(|_, comment| comment.post_id != id);
        }
        removed
    }
}

#[derive(Default)]
pub struct InMemoryBlogRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogRepository for InMemoryBlogRepository {
    async fn ensure_user(&self, id: Uuid, username: &str) -> Result<User> {
        let mut state = self.state.write().await;

        if state
            .users
            .values()
            .any(|user| user.username == username && user.id != id)
        {
            return Err(AppError::Conflict("username already exists".to_string()));
        }

        let user = state.users.entry(id).or_insert_with(|| User {
            id,
            username: username.to_string(),
            created_at: Utc::now(),
        });
        user.username = username.to_string();

        Ok(user.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let authored: Vec<i64> = state
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in authored {
            state.remove_post(post_id);
        }
        state.comments.retain(|_, comment| comment.author_id != id);
        state
            .follows
            .retain(|_, follow| follow.user_id != id && follow.author_id != id);

        Ok(true)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        group.check_slug()?;
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict("group slug already exists".to_string()));
        }

        let id = next_id(&mut state.next_group_id);
        let created = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        state.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn find_group(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.groups.remove(&id).is_none() {
            return Ok(false);
        }
        for post in state.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostView> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&post.author_id) {
            return Err(AppError::not_found("author"));
        }
        if let Some(group_id) = post.group_id {
            if !state.groups.contains_key(&group_id) {
                return Err(AppError::not_found("group"));
            }
        }

        let id = next_id(&mut state.next_post_id);
        let stored = Post {
            id,
            text: post.text,
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
            created_at: Utc::now(),
        };
        let view = state.post_view(&stored)?;
        state.posts.insert(id, stored);
        Ok(view)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<PostView>> {
        let mut state = self.state.write().await;
        if let Some(group_id) = changes.group_id {
            if !state.groups.contains_key(&group_id) {
                return Err(AppError::not_found("group"));
            }
        }

        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        if let Some(image) = changes.image {
            post.image = Some(image);
        }

        let updated = post.clone();
        state.post_view(&updated).map(Some)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostView>> {
        let state = self.state.read().await;
        state
            .posts
            .get(&id)
            .map(|post| state.post_view(post))
            .transpose()
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        Ok(self.state.write().await.remove_post(id))
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|post| MemoryState::matches(post, filter))
            .count())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PostView>> {
        let state = self.state.read().await;
        state
            .ordered_posts(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| state.post_view(post))
            .collect()
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::not_found("post"));
        }
        if !state.users.contains_key(&comment.author_id) {
            return Err(AppError::not_found("author"));
        }

        let id = next_id(&mut state.next_comment_id);
        let stored = Comment {
            id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        state.comments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by_key(|comment| Reverse((comment.created_at, comment.id)));

        comments
            .into_iter()
            .map(|comment| {
                let author = state.users.get(&comment.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("comment {} references missing author", comment.id))
                })?;
                Ok(CommentView {
                    id: comment.id,
                    post_id: comment.post_id,
                    author,
                    text: comment.text.clone(),
                    created_at: comment.created_at,
                })
            })
            .collect()
    }

    async fn insert_follow_if_absent(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<(Follow, bool)> {
        if user_id == author_id {
            return Err(AppError::SelfFollowRejected);
        }

        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) || !state.users.contains_key(&author_id) {
            return Err(AppError::not_found("user"));
        }
        if let Some(existing) = state
            .follows
            .values()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok((existing.clone(), false));
        }

        let id = next_id(&mut state.next_follow_id);
        let follow = Follow {
            id,
            user_id,
            author_id,
            created_at: Utc::now(),
        };
        state.follows.insert(id, follow.clone());
        Ok((follow, true))
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn find_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn followed_author_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut authors: Vec<Uuid> = state
            .follows
            .values()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.author_id)
            .collect();
        authors.sort_by_key(|id| Reverse(*id));
        Ok(authors)
    }
}
