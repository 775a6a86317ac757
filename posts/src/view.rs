//! Plain-text rendering of the posts list.
//!
//! [`render`] picks exactly one of three screens: the loading skeleton, the
//! error panel, or the list itself.

use crate::types::{ListState, Post};
use std::fmt::Write;

/// Skeleton rows drawn while the first page loads
pub const SKELETON_ROWS: usize = 5;

/// Shown while a next page loads
pub const LOADING_MORE: &str = "Loading more posts...";

/// Shown under the last post once everything is loaded
pub const NO_MORE_POSTS: &str = "No more posts to load";

/// Shown in place of an empty list
pub const EMPTY_LIST: &str = "No posts available. Add a new post above!";

/// Render the current state as text
#[must_use]
pub fn render(state: &ListState) -> String {
    if state.loading {
        return loading_skeleton();
    }
    if let Some(error) = &state.error {
        return error_panel(error);
    }
    post_list(state)
}

/// Counters useful while debugging paging
#[must_use]
pub fn debug_panel(state: &ListState) -> String {
    format!(
        "Posts: {} | Page: {} | Loading: {} | Loading More: {} | Has More: {}",
        state.count(),
        state.page,
        yes_no(state.loading),
        yes_no(state.loading_more),
        yes_no(state.has_more),
    )
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn loading_skeleton() -> String {
    let mut out = String::from("== Loading Posts... ==\n");
    for _ in 0..SKELETON_ROWS {
        out.push_str("  ░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░  ░░░░\n");
        out.push_str("  ░░░░░░░░░░░░░░░░░░░░░░░░░░\n");
    }
    out
}

fn error_panel(error: &str) -> String {
    format!("== Error Loading Posts ==\n{error}\n[Try Again: refresh]\n")
}

fn post_list(state: &ListState) -> String {
    let mut out = String::from("== Latest Posts ==\n");

    if state.posts.is_empty() {
        out.push_str(EMPTY_LIST);
        out.push('\n');
        return out;
    }

    for post in &state.posts {
        push_post(&mut out, post);
    }

    if state.loading_more {
        out.push_str(LOADING_MORE);
        out.push('\n');
    }
    if !state.has_more {
        out.push_str(NO_MORE_POSTS);
        out.push('\n');
    }
    out
}

fn push_post(out: &mut String, post: &Post) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "#{:<4} {}", post.id, post.title);
    for line in post.body.lines() {
        let _ = writeln!(out, "      {line}");
    }
}
