//! Infinite scroll trigger.
//!
//! [`ScrollObserver`] decides from viewport geometry when the next page
//! should be requested. It knows nothing about the store; the caller turns a
//! positive answer into a [`fetch_more_posts`](crate::actions::fetch_more_posts)
//! intent.

/// Default distance from the bottom that counts as near
pub const DEFAULT_THRESHOLD: u32 = 150;

/// Threshold the posts list uses
pub const LIST_THRESHOLD: u32 = 300;

/// Viewport measurements, in any consistent unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Offset of the top of the viewport into the content
    pub scroll_top: u32,
    /// Full height of the content
    pub scroll_height: u32,
    /// Height of the viewport
    pub client_height: u32,
}

impl Geometry {
    /// Creates a geometry
    #[must_use]
    pub const fn new(scroll_top: u32, scroll_height: u32, client_height: u32) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Geometry of a viewport scrolled all the way down
    #[must_use]
    pub const fn at_bottom(scroll_height: u32, client_height: u32) -> Self {
        Self::new(scroll_height.saturating_sub(client_height), scroll_height, client_height)
    }

    /// Content left below the viewport
    #[must_use]
    pub const fn distance_to_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
    }

    /// Whether the content is no taller than the viewport
    #[must_use]
    pub const fn fits_viewport(&self) -> bool {
        self.scroll_height <= self.client_height
    }
}

/// Fires a load request when the viewport nears the end of the content
///
/// A trigger disarms the observer until the viewport leaves the threshold
/// zone or the content grows, so lingering near the bottom asks at most once
/// per crossing.
#[derive(Clone, Debug)]
pub struct ScrollObserver {
    threshold: u32,
    armed: bool,
    triggered_at_height: Option<u32>,
}

impl Default for ScrollObserver {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScrollObserver {
    /// Creates an observer with the given threshold
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            armed: true,
            triggered_at_height: None,
        }
    }

    /// Report a scroll position; `true` means load the next page
    #[must_use]
    pub fn on_scroll(&mut self, geometry: Geometry, is_loading: bool, has_more: bool) -> bool {
        let near = geometry.distance_to_bottom() < self.threshold;
        if !near {
            self.armed = true;
            return false;
        }

        if self
            .triggered_at_height
            .is_some_and(|height| height != geometry.scroll_height)
        {
            self.armed = true;
        }

        if !self.armed || is_loading || !has_more {
            return false;
        }

        tracing::trace!(
            distance = geometry.distance_to_bottom(),
            threshold = self.threshold,
            "Near bottom, requesting more"
        );
        self.armed = false;
        self.triggered_at_height = Some(geometry.scroll_height);
        true
    }

    /// Check content that may not fill the viewport; `true` means load the next page
    ///
    /// Call after the content changes. Short content cannot be scrolled, so
    /// without this check the next page would never be requested.
    #[must_use]
    pub const fn initial_check(geometry: Geometry, is_loading: bool, has_more: bool) -> bool {
        geometry.fits_viewport() && !is_loading && has_more
    }
}
