//! Intent constructors the UI dispatches.
//!
//! These never validate; see [`NewPost::validate`] for the form checks.

use crate::types::{NewPost, PostId, PostsAction};

/// Page a refresh loads
pub const DEFAULT_PAGE: u32 = 1;

/// Load `page`, replacing the list
#[must_use]
pub const fn fetch_posts(page: u32) -> PostsAction {
    PostsAction::FetchPostsRequest { page }
}

/// Reload the first page
#[must_use]
pub const fn refresh() -> PostsAction {
    fetch_posts(DEFAULT_PAGE)
}

/// Load `page` and append it
#[must_use]
pub const fn fetch_more_posts(page: u32) -> PostsAction {
    PostsAction::FetchMorePostsRequest { page }
}

/// Add a post
#[must_use]
pub fn add_post(post: NewPost) -> PostsAction {
    PostsAction::AddPostRequest { post }
}

/// Remove the post with `id`
#[must_use]
pub const fn remove_post(id: PostId) -> PostsAction {
    PostsAction::RemovePostRequest { id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(fetch_posts(3), PostsAction::FetchPostsRequest { page: 3 });
        assert_eq!(refresh(), PostsAction::FetchPostsRequest { page: 1 });
        assert_eq!(fetch_more_posts(2), PostsAction::FetchMorePostsRequest { page: 2 });
        assert_eq!(
            remove_post(PostId::new(9)),
            PostsAction::RemovePostRequest { id: PostId::new(9) }
        );
    }

    #[test]
    fn test_add_post_does_not_validate() {
        let empty = NewPost::new("", "");
        assert_eq!(
            add_post(empty.clone()),
            PostsAction::AddPostRequest { post: empty }
        );
    }
}
