/// Follow service - manages follower -> author edges
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::metrics::blog::record_mutation;
use crate::models::{Follow, User, Viewer};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct FollowService {
    repo: Arc<dyn BlogRepository>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Create the edge if absent. Repeated calls return the stored edge.
    ///
    /// Following yourself fails with `SelfFollowRejected` and stores nothing.
    pub async fn follow(&self, follower: Uuid, author: Uuid) -> Result<Follow> {
        let result = self.follow_inner(follower, author).await;
        record_mutation("follow", &result);
        result
    }

    async fn follow_inner(&self, follower: Uuid, author: Uuid) -> Result<Follow> {
        if follower == author {
            debug!(%follower, "Rejected self-follow");
            return Err(AppError::SelfFollowRejected);
        }

        let (edge, created) = self.repo.insert_follow_if_absent(follower, author).await?;
        if created {
            info!(%follower, %author, "Follow edge created");
        } else {
            debug!(%follower, %author, "Follow edge already present");
        }
        Ok(edge)
    }

    /// Remove the edge. Fails with `NotFollowing` when there is none.
    pub async fn unfollow(&self, follower: Uuid, author: Uuid) -> Result<()> {
        let result = match self.repo.delete_follow(follower, author).await {
            Ok(true) => {
                info!(%follower, %author, "Follow edge removed");
                Ok(())
            }
            Ok(false) => Err(AppError::NotFollowing),
            Err(e) => Err(e),
        };
        record_mutation("unfollow", &result);
        result
    }

    pub async fn is_following(&self, follower: Uuid, author: Uuid) -> Result<bool> {
        Ok(self.repo.find_follow(follower, author).await?.is_some())
    }

    /// Authors `follower` receives posts from, ordered by author id descending.
    pub async fn followed_authors(&self, follower: Uuid) -> Result<Vec<Uuid>> {
        self.repo.followed_author_ids(follower).await
    }

    /// Whether `viewer` follows `author`. Anonymous viewers follow nobody.
    pub async fn viewer_follows(&self, viewer: &Viewer, author: &User) -> Result<bool> {
        match viewer.user_id() {
            Some(id) => self.is_following(id, author.id).await,
            None => Ok(false),
        }
    }
}
