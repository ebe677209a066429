//! Panel and scroll state for streamed log views.
//!
//! Scroll offsets follow the tail by default: `None` means auto-scroll,
//! `Some(offset)` means the user pinned a position. Capped buffers report
//! dropped entries so pinned offsets shift with the content.

use crate::deploy::phase::DeployOp;

/// Scroll state of one log panel.
#[derive(Debug, Clone)]
pub struct PanelState {
    pub title: String,
    pub expanded: bool,
    /// When `None`, the panel auto-scrolls to the bottom.
    /// When `Some(offset)`, the user has pinned the scroll position.
    pub scroll: Option<usize>,
}

impl PanelState {
    pub fn new(title: impl Into<String>) -> Self {
        PanelState {
            title: title.into(),
            expanded: false,
            scroll: None,
        }
    }

    pub fn is_following(&self) -> bool {
        self.scroll.is_none()
    }

    /// Scroll up by `n` lines. Activates pinned mode, disabling auto-scroll.
    /// When auto-scrolling, starts from the approximate bottom so the first
    /// scroll-up moves up by `n` rather than jumping to the top.
    pub fn scroll_up(&mut self, n: usize, line_count: usize) {
        let current = self.scroll.unwrap_or(line_count);
        self.scroll = Some(current.saturating_sub(n));
    }

    /// Scroll down by `n` lines, capped at the bottom. Reaching the bottom
    /// resumes auto-scroll.
    pub fn scroll_down(&mut self, n: usize, max_offset: usize) {
        if let Some(offset) = self.scroll {
            let new = (offset + n).min(max_offset);
            if new >= max_offset {
                self.scroll = None;
            } else {
                self.scroll = Some(new);
            }
        }
        // When auto-scrolling, down is a no-op: already at the bottom.
    }

    /// Resume following the tail.
    pub fn follow_tail(&mut self) {
        self.scroll = None;
    }

    /// A capped buffer dropped `dropped` oldest entries; shift a pinned
    /// offset so the view stays on the same content.
    pub fn on_trimmed(&mut self, dropped: usize) {
        if dropped == 0 {
            return;
        }
        if let Some(offset) = self.scroll {
            self.scroll = Some(offset.saturating_sub(dropped));
        }
    }
}

/// Panel set for the deployment stages, mirroring the tracker's buffers.
#[derive(Debug, Clone)]
pub struct LogView {
    build: PanelState,
    plan: PanelState,
    deploy: PanelState,
    destroy: PanelState,
    /// Stage currently receiving streamed logs, if any.
    active: Option<DeployOp>,
}

impl LogView {
    pub fn new() -> Self {
        LogView {
            build: PanelState::new(DeployOp::Build.title()),
            plan: PanelState::new(DeployOp::Plan.title()),
            deploy: PanelState::new(DeployOp::Apply.title()),
            destroy: PanelState::new(DeployOp::Destroy.title()),
            active: None,
        }
    }

    pub fn panel(&self, op: DeployOp) -> &PanelState {
        match op {
            DeployOp::Build => &self.build,
            DeployOp::Plan => &self.plan,
            DeployOp::Apply => &self.deploy,
            DeployOp::Destroy => &self.destroy,
        }
    }

    pub fn panel_mut(&mut self, op: DeployOp) -> &mut PanelState {
        match op {
            DeployOp::Build => &mut self.build,
            DeployOp::Plan => &mut self.plan,
            DeployOp::Apply => &mut self.deploy,
            DeployOp::Destroy => &mut self.destroy,
        }
    }

    pub fn active(&self) -> Option<DeployOp> {
        self.active
    }

    /// An operation started streaming: its panel expands and follows the
    /// tail; it becomes the auto-scroll target.
    pub fn activate(&mut self, op: DeployOp) {
        let panel = self.panel_mut(op);
        panel.expanded = true;
        panel.follow_tail();
        self.active = Some(op);
    }

    pub fn deactivate(&mut self) {
        self.active = None;
    }

    pub fn toggle(&mut self, op: DeployOp) {
        let panel = self.panel_mut(op);
        panel.expanded = !panel.expanded;
    }

    /// New entry landed in a stage buffer; only the active panel follows.
    /// Returns true when the active panel should render the new tail.
    pub fn on_append(&mut self, op: DeployOp, dropped: usize) -> bool {
        self.panel_mut(op).on_trimmed(dropped);
        self.active == Some(op) && self.panel(op).is_following()
    }
}

impl Default for LogView {
    fn default() -> Self {
        LogView::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_up_from_auto_scroll_pins_near_bottom() {
        let mut panel = PanelState::new("Build Logs");
        assert!(panel.is_following());

        panel.scroll_up(5, 50);
        assert_eq!(panel.scroll, Some(45));

        panel.scroll_up(10, 50);
        assert_eq!(panel.scroll, Some(35));

        // Scrolling past the top saturates at zero.
        panel.scroll_up(100, 50);
        assert_eq!(panel.scroll, Some(0));
    }

    #[test]
    fn scroll_down_resumes_auto_scroll_at_bottom() {
        let mut panel = PanelState::new("Build Logs");
        panel.scroll = Some(30);

        panel.scroll_down(5, 40);
        assert_eq!(panel.scroll, Some(35));

        panel.scroll_down(5, 40);
        assert_eq!(panel.scroll, None);

        // Already following: down is a no-op.
        panel.scroll_down(10, 40);
        assert_eq!(panel.scroll, None);
    }

    #[test]
    fn trimmed_entries_shift_pinned_offsets() {
        let mut panel = PanelState::new("Deployment Logs");
        panel.scroll = Some(10);
        panel.on_trimmed(3);
        assert_eq!(panel.scroll, Some(7));

        panel.scroll = Some(0);
        panel.on_trimmed(2);
        assert_eq!(panel.scroll, Some(0));

        // Auto-scroll is unaffected by trimming.
        panel.follow_tail();
        panel.on_trimmed(5);
        assert_eq!(panel.scroll, None);
    }

    #[test]
    fn activation_expands_and_follows() {
        let mut view = LogView::new();
        view.panel_mut(DeployOp::Build).scroll = Some(3);

        view.activate(DeployOp::Build);
        assert!(view.panel(DeployOp::Build).expanded);
        assert!(view.panel(DeployOp::Build).is_following());
        assert_eq!(view.active(), Some(DeployOp::Build));
    }

    #[test]
    fn only_the_active_following_panel_renders_new_tail() {
        let mut view = LogView::new();
        view.activate(DeployOp::Plan);

        assert!(view.on_append(DeployOp::Plan, 0));
        assert!(!view.on_append(DeployOp::Build, 0));

        // A pinned active panel stops following the tail.
        view.panel_mut(DeployOp::Plan).scroll_up(2, 10);
        assert!(!view.on_append(DeployOp::Plan, 0));
    }
}
