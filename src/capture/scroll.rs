//! Scroll planning
//!
//! Computes the scroll offsets needed to cover a scrollable extent with a
//! viewport of fixed size, one axis at a time, and combines two axes into a
//! row-major grid of steps.

use crate::geometry::{ScrollOffset, Size};

/// Plans the scroll offsets for one axis
///
/// The first offset is 0. Each following offset advances by one viewport
/// but never past `total - viewport`, so the last frame sits flush with the
/// far edge of the content and usually overlaps the previous one. Content
/// that fits in the viewport needs exactly one step.
///
/// # Examples
///
/// ```
/// use webshot::capture::scroll::plan_axis;
///
/// assert_eq!(plan_axis(1000, 400), vec![0, 400, 600]);
/// assert_eq!(plan_axis(300, 400), vec![0]);
/// assert_eq!(plan_axis(800, 400), vec![0, 400]);
/// ```
pub fn plan_axis(total: u32, viewport: u32) -> Vec<u32> {
    if total <= viewport || viewport == 0 {
        return vec![0];
    }

    let max_offset = total - viewport;
    let mut offsets = vec![0];
    let mut current = 0u32;

    loop {
        let next = current.saturating_add(viewport).min(max_offset);
        if next == current {
            break;
        }
        offsets.push(next);
        current = next;
    }

    offsets
}

/// Axes along which a capture scrolls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxes {
    /// No scrolling; one viewport capture
    None,
    /// Top to bottom
    Vertical,
    /// Left to right
    Horizontal,
    /// Both axes, row-major
    Both,
}

impl ScrollAxes {
    /// Returns `true` if the vertical axis scrolls
    pub fn vertical(self) -> bool {
        matches!(self, ScrollAxes::Vertical | ScrollAxes::Both)
    }

    /// Returns `true` if the horizontal axis scrolls
    pub fn horizontal(self) -> bool {
        matches!(self, ScrollAxes::Horizontal | ScrollAxes::Both)
    }
}

/// Two-axis scroll plan
///
/// Holds the logical offsets for each axis together with the logical extent
/// of the output along each axis. An axis that does not scroll has the
/// single offset 0 and an extent of one viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPlan {
    /// Vertical offsets, ascending
    pub vertical:   Vec<u32>,
    /// Horizontal offsets, ascending
    pub horizontal: Vec<u32>,
    /// Logical size of one viewport
    pub viewport:   Size,
    /// Logical size of the stitched output
    pub extent:     Size,
}

impl ScrollPlan {
    /// Plans a capture of `content` through `viewport` along `axes`
    ///
    /// Content smaller than the viewport along a scrolled axis is captured
    /// at viewport size.
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::{
    ///     capture::scroll::{ScrollAxes, ScrollPlan},
    ///     geometry::Size,
    /// };
    ///
    /// let plan = ScrollPlan::new(Size::new(800, 600), Size::new(1000, 1500), ScrollAxes::Vertical);
    /// assert_eq!(plan.vertical, vec![0, 600, 900]);
    /// assert_eq!(plan.horizontal, vec![0]);
    /// assert_eq!(plan.extent, Size::new(800, 1500));
    /// ```
    pub fn new(viewport: Size, content: Size, axes: ScrollAxes) -> Self {
        let (vertical, height) = if axes.vertical() {
            (
                plan_axis(content.height, viewport.height),
                content.height.max(viewport.height),
            )
        } else {
            (vec![0], viewport.height)
        };

        let (horizontal, width) = if axes.horizontal() {
            (
                plan_axis(content.width, viewport.width),
                content.width.max(viewport.width),
            )
        } else {
            (vec![0], viewport.width)
        };

        Self {
            vertical,
            horizontal,
            viewport,
            extent: Size::new(width, height),
        }
    }

    /// Total number of captures the plan needs
    pub fn len(&self) -> usize {
        self.vertical.len() * self.horizontal.len()
    }

    /// Returns `true` if the plan has no steps (never the case for plans
    /// built with [`ScrollPlan::new`])
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a single capture covers the whole extent
    pub fn is_single_step(&self) -> bool {
        self.len() == 1
    }

    /// Iterates the steps row-major: every horizontal offset of a row before
    /// moving down to the next row
    pub fn steps(&self) -> impl Iterator<Item = ScrollOffset> + '_ {
        self.vertical.iter().flat_map(move |&y| {
            self.horizontal
                .iter()
                .map(move |&x| ScrollOffset::new(x, y))
        })
    }
}
