//! Domain types for the posts list.
//!
//! A [`ListState`] holds the posts loaded so far plus the transient flags the
//! UI needs to render loading indicators and errors. [`PostsAction`] carries
//! both the intents the UI dispatches and the results the coordinator feeds
//! back into the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Author id stamped on locally added posts
pub const DEFAULT_AUTHOR_ID: u64 = 1;

/// Unique identifier for a post
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);

impl PostId {
    /// Creates a `PostId` from its numeric value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A single post
///
/// The listing endpoint calls the author field `userId`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: PostId,
    /// Author of the post
    #[serde(rename = "userId")]
    pub author_id: u64,
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
}

impl Post {
    /// Creates a new post
    #[must_use]
    pub fn new(id: PostId, author_id: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            author_id,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Why a [`NewPost`] was rejected by the add form
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewPostError {
    /// Title was empty or whitespace
    #[error("Title is required")]
    MissingTitle,
    /// Body was empty or whitespace
    #[error("Content is required")]
    MissingBody,
}

/// Payload of an add intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
}

impl NewPost {
    /// Creates a new payload
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Checks the payload the way the add form does before dispatching
    ///
    /// # Errors
    ///
    /// Returns the first missing field, title first.
    pub fn validate(&self) -> Result<(), NewPostError> {
        if self.title.trim().is_empty() {
            return Err(NewPostError::MissingTitle);
        }
        if self.body.trim().is_empty() {
            return Err(NewPostError::MissingBody);
        }
        Ok(())
    }
}

/// State of the posts list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    /// Posts in arrival order
    pub posts: Vec<Post>,
    /// First page fetch outstanding
    pub loading: bool,
    /// Next page fetch outstanding
    pub loading_more: bool,
    /// Last failure message, cleared by the next request
    pub error: Option<String>,
    /// Last successfully loaded page
    pub page: u32,
    /// Whether the server has posts beyond those loaded
    pub has_more: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            loading: false,
            loading_more: false,
            error: None,
            page: 1,
            has_more: true,
        }
    }
}

impl ListState {
    /// Creates the initial, empty list state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of loaded posts
    #[must_use]
    pub fn count(&self) -> usize {
        self.posts.len()
    }

    /// Returns a post by ID
    #[must_use]
    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    /// Page a scroll to the bottom asks for next
    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }

    /// Id a locally added post receives: one past the largest, or 1
    ///
    /// When the largest id is `u64::MAX` the lowest unused id is taken
    /// instead.
    #[must_use]
    pub fn next_id(&self) -> PostId {
        let Some(max) = self.posts.iter().map(|post| post.id.get()).max() else {
            return PostId::new(1);
        };

        max.checked_add(1).map_or_else(|| self.lowest_free_id(), PostId::new)
    }

    fn lowest_free_id(&self) -> PostId {
        let taken: BTreeSet<u64> = self.posts.iter().map(|post| post.id.get()).collect();
        // Fewer than u64::MAX posts fit in memory, so a gap always exists
        PostId::new((1..u64::MAX).find(|id| !taken.contains(id)).unwrap_or(u64::MAX))
    }
}

/// Actions for the posts list
///
/// `*Request` variants are intents dispatched by the UI. The coordinator
/// answers each with the matching `*Success` or `*Failure` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostsAction {
    // ========== First page ==========
    /// Intent: load a page, replacing the list
    FetchPostsRequest {
        /// Page to load, starting at 1
        page: u32,
    },

    /// Result: a page replaced the list
    FetchPostsSuccess {
        /// Posts of the page
        posts: Vec<Post>,
        /// Page that was loaded
        page: u32,
        /// Whether more posts remain on the server
        has_more: bool,
    },

    /// Result: loading a page failed
    FetchPostsFailure {
        /// Human-readable failure message
        error: String,
    },

    // ========== Next page ==========
    /// Intent: load a page and append it
    FetchMorePostsRequest {
        /// Page to load
        page: u32,
    },

    /// Result: a page was appended
    FetchMorePostsSuccess {
        /// Posts of the page
        posts: Vec<Post>,
        /// Page that was loaded
        page: u32,
        /// Whether more posts remain on the server
        has_more: bool,
    },

    /// Result: loading the next page failed
    FetchMorePostsFailure {
        /// Human-readable failure message
        error: String,
    },

    /// Result: a refresh superseded an outstanding next page fetch
    FetchMorePostsCancelled {
        /// Page that was abandoned
        page: u32,
    },

    // ========== Local edits ==========
    /// Intent: add a post
    AddPostRequest {
        /// Title and body of the new post
        post: NewPost,
    },

    /// Result: the post was accepted
    AddPostSuccess {
        /// Title line
        title: String,
        /// Body text
        body: String,
    },

    /// Result: adding the post failed
    AddPostFailure {
        /// Human-readable failure message
        error: String,
    },

    /// Intent: remove a post
    RemovePostRequest {
        /// Post to remove
        id: PostId,
    },

    /// Result: the post was removed
    RemovePostSuccess {
        /// Removed post
        id: PostId,
    },

    /// Result: removing the post failed
    RemovePostFailure {
        /// Human-readable failure message
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64) -> Post {
        Post::new(PostId::new(id), DEFAULT_AUTHOR_ID, format!("title {id}"), "body")
    }

    #[test]
    fn test_initial_state() {
        let state = ListState::new();
        assert!(state.posts.is_empty());
        assert!(!state.loading);
        assert!(!state.loading_more);
        assert_eq!(state.error, None);
        assert_eq!(state.page, 1);
        assert!(state.has_more);
    }

    #[test]
    fn test_next_id() {
        let mut state = ListState::new();
        assert_eq!(state.next_id(), PostId::new(1));

        state.posts = vec![post(1), post(3)];
        assert_eq!(state.next_id(), PostId::new(4));
    }

    #[test]
    fn test_next_id_after_largest_possible_id() {
        let mut state = ListState::new();
        state.posts = vec![post(u64::MAX)];
        assert_eq!(state.next_id(), PostId::new(1));

        state.posts = vec![post(1), post(2), post(u64::MAX), post(4)];
        assert_eq!(state.next_id(), PostId::new(3));
    }

    #[test]
    fn test_next_page() {
        let mut state = ListState::new();
        assert_eq!(state.next_page(), 2);

        state.page = u32::MAX;
        assert_eq!(state.next_page(), u32::MAX);
    }

    #[test]
    fn test_new_post_validation() {
        assert_eq!(NewPost::new("t", "b").validate(), Ok(()));
        assert_eq!(NewPost::new("  ", "b").validate(), Err(NewPostError::MissingTitle));
        assert_eq!(NewPost::new("", "").validate(), Err(NewPostError::MissingTitle));
        assert_eq!(NewPost::new("t", "\n").validate(), Err(NewPostError::MissingBody));
        assert_eq!(NewPostError::MissingTitle.to_string(), "Title is required");
        assert_eq!(NewPostError::MissingBody.to_string(), "Content is required");
    }

    #[test]
    fn test_post_wire_format() -> Result<(), serde_json::Error> {
        let json = r#"{"userId":7,"id":12,"title":"hello","body":"world"}"#;
        let post: Post = serde_json::from_str(json)?;
        assert_eq!(post, Post::new(PostId::new(12), 7, "hello", "world"));

        let back = serde_json::to_value(&post)?;
        assert_eq!(back["userId"], 7);
        assert_eq!(back["id"], 12);
        Ok(())
    }
}
