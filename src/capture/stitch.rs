//! Frame stitching
//!
//! A [`Stitcher`] merges the frames captured along a [`ScrollPlan`] into one
//! bitmap. It is a three-phase state machine:
//!
//! - **Planning**: plan known, no frame seen yet
//! - **Accumulating**: the first frame fixed the raw frame size and the canvas
//!   is allocated; each further frame is blitted in place and dropped
//! - **Finalized**: the canvas has been handed out; no more frames accepted
//!
//! Only the canvas and the frame being merged are alive at any time. Where
//! consecutive frames overlap, the [`OverlapPolicy`] decides which frame's
//! pixels are kept; either way every canvas pixel is written exactly once.
//!
//! # Examples
//!
//! ```
//! use webshot::{
//!     capture::{CaptureFrame, DevicePixelRatio, RawImage, scroll::{ScrollAxes, ScrollPlan}, stitch::Stitcher},
//!     geometry::{Rect, ScrollOffset, Size},
//!     model::OverlapPolicy,
//! };
//!
//! let viewport = Size::new(100, 400);
//! let plan = ScrollPlan::new(viewport, Size::new(100, 1000), ScrollAxes::Vertical);
//! let mut stitcher = Stitcher::new(plan.clone(), DevicePixelRatio::ONE, OverlapPolicy::KeepLater);
//!
//! for offset in plan.steps() {
//!     let frame = RawImage::from_test_pattern(100, 400);
//!     stitcher.push(CaptureFrame::new(frame, offset, Rect::from_size(viewport))).unwrap();
//! }
//!
//! let image = stitcher.finalize().unwrap();
//! assert_eq!(image.dimensions(), (100, 1000));
//! ```

use tracing::debug;

use super::{
    pixel_ratio::{DevicePixelRatio, raw_positions},
    raw_image::RawImage,
    scroll::ScrollPlan,
};
use crate::{
    error::{CaptureError, CaptureResult},
    geometry::{RawRegion, Rect, ScrollOffset},
    model::OverlapPolicy,
};

/// One captured viewport, tagged with where it was taken
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Bitmap returned by the driver
    pub image:    RawImage,
    /// Scroll position the bitmap was captured at
    pub offset:   ScrollOffset,
    /// Logical rectangle of the bitmap that shows the scrolled content;
    /// anything outside it (scrollbars, surrounding page) is discarded
    pub viewport: Rect,
}

impl CaptureFrame {
    /// Creates a new frame
    pub fn new(image: RawImage, offset: ScrollOffset, viewport: Rect) -> Self {
        Self {
            image,
            offset,
            viewport,
        }
    }
}

/// Observable phase of a [`Stitcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchPhase {
    /// No frame received yet
    Planning,
    /// At least one frame merged
    Accumulating,
    /// Output taken
    Finalized,
}

#[derive(Debug)]
enum State {
    Planning,
    Accumulating(Canvas),
    Finalized,
}

#[derive(Debug)]
struct Canvas {
    image:  RawImage,
    frame:  (u32, u32),
    xs:     Vec<u32>,
    ys:     Vec<u32>,
    filled: u64,
}

/// Merges planned frames into one seamless bitmap
#[derive(Debug)]
pub struct Stitcher {
    plan:   ScrollPlan,
    ratio:  DevicePixelRatio,
    policy: OverlapPolicy,
    state:  State,
    next:   usize,
}

impl Stitcher {
    /// Creates a stitcher for the given plan
    pub fn new(plan: ScrollPlan, ratio: DevicePixelRatio, policy: OverlapPolicy) -> Self {
        Self {
            plan,
            ratio,
            policy,
            state: State::Planning,
            next: 0,
        }
    }

    /// Returns the current phase
    pub fn phase(&self) -> StitchPhase {
        match self.state {
            State::Planning => StitchPhase::Planning,
            State::Accumulating(_) => StitchPhase::Accumulating,
            State::Finalized => StitchPhase::Finalized,
        }
    }

    /// Number of frames merged so far
    pub fn frames_merged(&self) -> usize {
        self.next
    }

    /// Number of canvas pixels written so far
    pub fn pixels_written(&self) -> u64 {
        match &self.state {
            State::Accumulating(canvas) => canvas.filled,
            _ => 0,
        }
    }

    /// Scroll offset the next frame must have been captured at, if any
    pub fn expected_offset(&self) -> Option<ScrollOffset> {
        self.plan.steps().nth(self.next)
    }

    /// Merges the next frame
    ///
    /// The frame is cropped to its viewport rectangle, then the part not
    /// covered by a neighbouring frame (per the overlap policy) is blitted
    /// into the canvas. The frame is dropped afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::StitchSequence`] if the stitcher is finalized,
    /// the plan is exhausted, the frame's offset is not the next planned
    /// step, or its size differs from the first frame.
    pub fn push(&mut self, frame: CaptureFrame) -> CaptureResult<()> {
        if matches!(self.state, State::Finalized) {
            return Err(sequence_error("stitcher already finalized"));
        }

        let expected = self.expected_offset().ok_or_else(|| {
            sequence_error(format!(
                "plan has {} steps but another frame was pushed",
                self.plan.len()
            ))
        })?;
        if frame.offset != expected {
            return Err(sequence_error(format!(
                "frame captured at ({}, {}) but step {} expects ({}, {})",
                frame.offset.x, frame.offset.y, self.next, expected.x, expected.y
            )));
        }

        let clip = self.clip_region(&frame)?;

        if matches!(self.state, State::Planning) {
            self.state = State::Accumulating(self.allocate(clip));
        }

        let State::Accumulating(canvas) = &mut self.state else {
            return Err(sequence_error("stitcher is not accumulating"));
        };

        if (clip.width, clip.height) != canvas.frame {
            return Err(sequence_error(format!(
                "frame is {}x{} but the first frame was {}x{}",
                clip.width, clip.height, canvas.frame.0, canvas.frame.1
            )));
        }

        let columns = self.plan.horizontal.len();
        let row = self.next / columns;
        let column = self.next % columns;
        let (canvas_w, canvas_h) = canvas.image.dimensions();

        let (dest_x, end_x) = kept_span(&canvas.xs, column, canvas.frame.0, canvas_w, self.policy);
        let (dest_y, end_y) = kept_span(&canvas.ys, row, canvas.frame.1, canvas_h, self.policy);

        let source = RawRegion::new(
            clip.x + (dest_x - canvas.xs[column]),
            clip.y + (dest_y - canvas.ys[row]),
            end_x - dest_x,
            end_y - dest_y,
        );
        let written = canvas.image.copy_from(&frame.image, source, dest_x, dest_y);
        canvas.filled += written;

        debug!(
            step = self.next,
            x = dest_x,
            y = dest_y,
            width = source.width,
            height = source.height,
            "merged frame"
        );

        self.next += 1;
        Ok(())
    }

    /// Takes the finished bitmap and moves to the finalized phase
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::StitchSequence`] if planned steps are still
    /// missing or the output was already taken.
    pub fn finalize(&mut self) -> CaptureResult<RawImage> {
        if self.next < self.plan.len() {
            return Err(sequence_error(format!(
                "only {} of {} planned frames were merged",
                self.next,
                self.plan.len()
            )));
        }

        match std::mem::replace(&mut self.state, State::Finalized) {
            State::Accumulating(canvas) => Ok(canvas.image),
            State::Planning => Err(sequence_error("no frames were merged")),
            State::Finalized => Err(sequence_error("stitcher already finalized")),
        }
    }

    /// Raw region of the frame's bitmap holding the scrolled viewport, with
    /// any browser chrome outside it cut away
    fn clip_region(&self, frame: &CaptureFrame) -> CaptureResult<RawRegion> {
        let (width, height) = frame.image.dimensions();
        let region = self.ratio.rect_to_raw(&frame.viewport)?.clamp_to(width, height);

        if region.width == 0 || region.height == 0 {
            return Err(CaptureError::OutOfBounds {
                region: self.ratio.rect_to_raw(&frame.viewport)?,
                width,
                height,
            });
        }

        Ok(region)
    }

    fn allocate(&self, clip: RawRegion) -> Canvas {
        let frame = (clip.width, clip.height);
        let (xs, canvas_w) = place_axis(&self.plan.horizontal, self.plan.extent.width, frame.0, self.ratio);
        let (ys, canvas_h) = place_axis(&self.plan.vertical, self.plan.extent.height, frame.1, self.ratio);

        debug!(
            width = canvas_w,
            height = canvas_h,
            frame_width = frame.0,
            frame_height = frame.1,
            steps = self.plan.len(),
            "allocated stitching canvas"
        );

        Canvas {
            image: RawImage::blank(canvas_w, canvas_h),
            frame,
            xs,
            ys,
            filled: 0,
        }
    }
}

/// Raw frame positions and canvas length along one axis
///
/// An axis without scrolling is exactly one frame long. A scrolled axis
/// ends where its last placed frame ends, which is the converted content
/// extent unless rounding would leave a row no frame covers.
fn place_axis(
    offsets: &[u32],
    logical_extent: u32,
    frame: u32,
    ratio: DevicePixelRatio,
) -> (Vec<u32>, u32) {
    if offsets.len() <= 1 {
        return (vec![0], frame);
    }

    let target = ratio.to_raw(logical_extent).max(frame);
    let positions = raw_positions(offsets, ratio, frame, target);
    let canvas = positions.last().map_or(target, |&last| last.saturating_add(frame));
    (positions, canvas)
}

/// Canvas span `[start, end)` that frame `index` writes along one axis
fn kept_span(
    positions: &[u32],
    index: usize,
    frame: u32,
    canvas: u32,
    policy: OverlapPolicy,
) -> (u32, u32) {
    let position = positions[index];
    let frame_end = position.saturating_add(frame).min(canvas);

    match policy {
        OverlapPolicy::KeepLater => {
            let end = positions
                .get(index + 1)
                .map_or(frame_end, |&next| next.min(frame_end));
            (position, end)
        }
        OverlapPolicy::KeepEarlier => {
            let start = match index.checked_sub(1) {
                Some(previous) => positions[previous]
                    .saturating_add(frame)
                    .clamp(position, frame_end),
                None => position,
            };
            (start, frame_end)
        }
    }
}

fn sequence_error(reason: impl Into<String>) -> CaptureError {
    CaptureError::StitchSequence {
        reason: reason.into(),
    }
}
