use std::ops::Range;

use crate::settings::RenderWindowConfig;

/// Which list positions the surface keeps mounted around the focused item.
///
/// The window spans `window_size` items with the focused one near the top,
/// leaning toward the scroll direction. Growth toward a new window is capped
/// at `per_batch` newly mounted items per step.
#[derive(Debug, Clone, Copy)]
pub struct RenderWindow {
    config: RenderWindowConfig,
}

impl RenderWindow {
    pub fn new(config: RenderWindowConfig) -> Self {
        Self { config }
    }

    pub fn initial(&self, len: usize) -> Range<usize> {
        0..self.config.initial.max(1).min(len)
    }

    pub fn target(&self, focus: usize, len: usize) -> Range<usize> {
        if len == 0 {
            return 0..0;
        }
        let size = self.config.window_size.max(1).min(len);
        let before = (size - 1) / 2;
        let focus = focus.min(len - 1);
        let start = focus.saturating_sub(before).min(len - size);
        start..start + size
    }

    /// Next mounted range when moving from `mounted` toward the window around
    /// `focus`. Items leaving the window are dropped at once; items entering
    /// it are added at most `per_batch` at a time, nearest the focus first.
    pub fn step(&self, mounted: Range<usize>, focus: usize, len: usize) -> Range<usize> {
        let target = self.target(focus, len);
        if target.is_empty() {
            return target;
        }

        let kept_start = mounted.start.max(target.start);
        let kept_end = mounted.end.min(target.end);
        let focus = focus.min(len - 1);
        let fresh = kept_start >= kept_end;
        let (mut start, mut end) = if fresh {
            (focus, focus + 1)
        } else {
            (kept_start, kept_end)
        };

        // Remounting the focused item itself spends one slot of the batch.
        let mut budget = self.config.per_batch.max(1);
        if fresh {
            budget -= 1;
        }

        while budget > 0 && (end < target.end || start > target.start) {
            if end < target.end {
                end += 1;
                budget -= 1;
            }
            if budget > 0 && start > target.start {
                start -= 1;
                budget -= 1;
            }
        }
        start..end
    }
}
