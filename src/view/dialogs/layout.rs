//! Dialog geometry
//!
//! Everything here is pure arithmetic over the host window size: the layout
//! mode, the inner dialog size, where the bordered box sits on screen, and the
//! two coordinate transforms between host-screen space and the embedded
//! terminal's local grid. The transforms must stay exact inverses of each
//! other, so both are expressed in terms of the same constants.

use ratatui::layout::Rect;

/// Rows taken by the title header above the terminal content
pub const HEADER_HEIGHT: u16 = 2;

/// Host widths below this switch the dialog to fullscreen
pub const FULLSCREEN_WIDTH_BREAKPOINT: u16 = 120;

/// Share of the host window a windowed dialog occupies, in percent
pub const WINDOWED_PERCENT: i32 = 85;

/// Border thickness on each side
pub const BORDER: u16 = 1;

/// Minimum inner width of the dialog
pub const MIN_WIDTH: u16 = 40;

/// Minimum inner height of the dialog
pub const MIN_HEIGHT: u16 = 10;

/// Minimum number of terminal rows
pub const MIN_TERMINAL_HEIGHT: u16 = 5;

/// Horizontal margin kept free around a windowed dialog (total over both sides)
const WINDOWED_MARGIN_X: i32 = 6;
/// Vertical margin kept free around a windowed dialog (total over both sides)
const WINDOWED_MARGIN_Y: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Windowed,
    Fullscreen,
}

impl LayoutMode {
    pub fn for_host_width(host_width: u16) -> Self {
        if host_width < FULLSCREEN_WIDTH_BREAKPOINT {
            LayoutMode::Fullscreen
        } else {
            LayoutMode::Windowed
        }
    }
}

/// Geometry of a dialog for a given host window size.
///
/// `width`/`height` are the inner bounds (inside the border). The default
/// value is the "no size seen yet" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub host_width: u16,
    pub host_height: u16,
    pub width: u16,
    pub height: u16,
    pub mode: LayoutMode,
}

impl Layout {
    /// Compute the layout for a host window of the given size.
    pub fn compute(host_width: u16, host_height: u16) -> Self {
        let mode = LayoutMode::for_host_width(host_width);
        let (host_w, host_h) = (i32::from(host_width), i32::from(host_height));

        let (outer_width, outer_height) = match mode {
            LayoutMode::Fullscreen => (host_w, host_h),
            LayoutMode::Windowed => (
                (host_w * WINDOWED_PERCENT / 100).min(host_w - WINDOWED_MARGIN_X),
                (host_h * WINDOWED_PERCENT / 100).min(host_h - WINDOWED_MARGIN_Y),
            ),
        };

        let border = 2 * i32::from(BORDER);
        let width = (outer_width - border).max(i32::from(MIN_WIDTH));
        let height = (outer_height - border).max(i32::from(MIN_HEIGHT));

        Self {
            host_width,
            host_height,
            width: clamp_u16(width),
            height: clamp_u16(height),
            mode,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.mode == LayoutMode::Fullscreen
    }

    /// Rows available to the embedded terminal below the header.
    pub fn terminal_height(&self) -> u16 {
        self.height
            .saturating_sub(HEADER_HEIGHT)
            .max(MIN_TERMINAL_HEIGHT)
    }

    /// Size of the dialog including its border.
    pub fn outer_size(&self) -> (u16, u16) {
        (
            self.width.saturating_add(2 * BORDER),
            self.height.saturating_add(2 * BORDER),
        )
    }

    /// Screen position `(row, col)` of the dialog's top-left border cell.
    pub fn position(&self) -> (u16, u16) {
        if self.is_fullscreen() {
            return (0, 0);
        }

        let (outer_width, outer_height) = self.outer_size();
        let row = ((i32::from(self.host_height) - i32::from(outer_height)) / 2).max(0);
        let col = ((i32::from(self.host_width) - i32::from(outer_width)) / 2).max(0);

        (clamp_u16(row), clamp_u16(col))
    }

    /// The bordered dialog rectangle in screen coordinates (not clamped to the host).
    pub fn area(&self) -> Rect {
        let (row, col) = self.position();
        let (width, height) = self.outer_size();
        Rect::new(col, row, width, height)
    }

    /// Map a host-screen point into the terminal's local grid.
    ///
    /// Points left of or above the terminal content come out negative.
    pub fn to_terminal(&self, x: i32, y: i32) -> (i32, i32) {
        let (row, col) = self.position();
        (
            x - i32::from(col) - i32::from(BORDER),
            y - i32::from(row) - i32::from(BORDER) - i32::from(HEADER_HEIGHT),
        )
    }

    /// Map a point of the terminal's local grid onto the host screen.
    pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        let (row, col) = self.position();
        (
            x + i32::from(col) + i32::from(BORDER),
            y + i32::from(row) + i32::from(BORDER) + i32::from(HEADER_HEIGHT),
        )
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: fullscreen exactly when the host is narrower than the breakpoint
        #[test]
        fn prop_mode_follows_breakpoint(width in 0u16..400, height in 0u16..200) {
            let layout = Layout::compute(width, height);
            prop_assert_eq!(layout.is_fullscreen(), width < FULLSCREEN_WIDTH_BREAKPOINT);
        }

        /// Property: floors hold for every host size
        #[test]
        fn prop_minimum_sizes_hold(width in 0u16..2000, height in 0u16..1000) {
            let layout = Layout::compute(width, height);
            prop_assert!(layout.width >= MIN_WIDTH);
            prop_assert!(layout.height >= MIN_HEIGHT);
            prop_assert!(layout.terminal_height() >= MIN_TERMINAL_HEIGHT);
        }

        /// Property: windowed dialogs keep their margins unless a floor dominates
        #[test]
        fn prop_windowed_outer_size_is_capped(width in 120u16..2000, height in 16u16..1000) {
            let layout = Layout::compute(width, height);
            let (outer_width, outer_height) = layout.outer_size();
            prop_assert!(outer_width <= width - 6);
            prop_assert!(outer_height <= height - 4);
        }

        /// Property: windowed dialogs are centered within the host
        #[test]
        fn prop_windowed_dialog_is_centered(width in 120u16..2000, height in 16u16..1000) {
            let layout = Layout::compute(width, height);
            let (row, col) = layout.position();
            let (outer_width, outer_height) = layout.outer_size();
            let left = col;
            let right = width - col - outer_width;
            let top = row;
            let bottom = height - row - outer_height;
            prop_assert!(right >= left && right - left <= 1);
            prop_assert!(bottom >= top && bottom - top <= 1);
        }

        /// Property: mouse adjustment and cursor mapping are exact inverses
        #[test]
        fn prop_transforms_are_inverses(
            width in 0u16..500,
            height in 0u16..300,
            x in -50i32..600,
            y in -50i32..400,
        ) {
            let layout = Layout::compute(width, height);
            let (tx, ty) = layout.to_terminal(x, y);
            prop_assert_eq!(layout.to_screen(tx, ty), (x, y));
            let (sx, sy) = layout.to_screen(x, y);
            prop_assert_eq!(layout.to_terminal(sx, sy), (x, y));
        }
    }
}
