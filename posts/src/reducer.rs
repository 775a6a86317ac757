//! Reducer for the posts list.
//!
//! The reducer only updates state. Network I/O for the request intents is
//! owned by the [`coordinator`](crate::coordinator), which observes the same
//! actions after they are reduced.

use crate::environment::PostsEnvironment;
use crate::types::{ListState, Post, PostsAction};
use postboard_core::{SmallVec, effect::Effect, reducer::Reducer};

/// Reducer for the posts list
#[derive(Clone, Debug)]
pub struct PostsReducer;

impl PostsReducer {
    /// Creates a new `PostsReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply(state: &mut ListState, action: PostsAction, env: &PostsEnvironment) {
        match action {
            PostsAction::FetchPostsRequest { .. } => {
                state.loading = true;
                state.error = None;
            },
            PostsAction::FetchPostsSuccess {
                posts,
                page,
                has_more,
            } => {
                state.loading = false;
                state.posts = posts;
                state.page = page;
                state.has_more = has_more;
                state.error = None;
            },
            PostsAction::FetchPostsFailure { error } => {
                state.loading = false;
                state.error = Some(error);
            },

            PostsAction::FetchMorePostsRequest { .. } => {
                state.loading_more = true;
                state.error = None;
            },
            PostsAction::FetchMorePostsSuccess {
                posts,
                page,
                has_more,
            } => {
                state.loading_more = false;
                state.posts.extend(posts);
                state.page = page;
                state.has_more = has_more;
                state.error = None;
            },
            PostsAction::FetchMorePostsFailure { error } => {
                state.loading_more = false;
                state.error = Some(error);
            },
            PostsAction::FetchMorePostsCancelled { .. } => {
                state.loading_more = false;
            },

            PostsAction::AddPostSuccess { title, body } => {
                let id = state.next_id();
                state
                    .posts
                    .push(Post::new(id, env.default_author_id, title, body));
            },
            PostsAction::RemovePostSuccess { id } => {
                state.posts.retain(|post| post.id != id);
            },

            // Answered by the coordinator; state is untouched
            PostsAction::AddPostRequest { .. }
            | PostsAction::AddPostFailure { .. }
            | PostsAction::RemovePostRequest { .. }
            | PostsAction::RemovePostFailure { .. } => {},
        }
    }
}

impl Default for PostsReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for PostsReducer {
    type State = ListState;
    type Action = PostsAction;
    type Environment = PostsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        Self::apply(state, action, env);
        SmallVec::new()
    }
}
