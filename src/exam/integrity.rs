// src/exam/integrity.rs

//! Tab-switch and inspection-panel heuristics.
//!
//! Both detectors feed one warning counter. The first violation shows a
//! dismissible warning, the second ends the session for good.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::{DEVTOOLS_THRESHOLD_PX, VISIBILITY_DEBOUNCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityState {
    Clean,
    Warned,
    Terminated,
}

/// What a single report did to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing counted (no transition, debounced, or already terminated).
    Ignored,
    Warned,
    Terminated,
}

/// Window sizes as measured by the client.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowDimensions {
    pub outer_width: u32,
    pub inner_width: u32,
    pub outer_height: u32,
    pub inner_height: u32,
}

impl WindowDimensions {
    /// True when either outer/inner delta exceeds the threshold.
    pub fn suggests_open_panel(&self) -> bool {
        self.outer_width.saturating_sub(self.inner_width) > DEVTOOLS_THRESHOLD_PX
            || self.outer_height.saturating_sub(self.inner_height) > DEVTOOLS_THRESHOLD_PX
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityView {
    pub state: IntegrityState,
    pub warning_count: u32,
    pub warning_visible: bool,
    pub dismissible: bool,
}

#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    warning_count: u32,
    page_visible: bool,
    last_counted_hide: Option<Instant>,
    panel_open: bool,
    warning_visible: bool,
}

impl Default for IntegrityMonitor {
    fn default() -> Self {
        Self {
            warning_count: 0,
            page_visible: true,
            last_counted_hide: None,
            panel_open: false,
            warning_visible: false,
        }
    }
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> IntegrityState {
        match self.warning_count {
            0 => IntegrityState::Clean,
            1 => IntegrityState::Warned,
            _ => IntegrityState::Terminated,
        }
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    /// Visibility detector. Counts visible → hidden transitions, at most
    /// once per debounce window.
    pub fn report_visibility(&mut self, visible: bool, now: Instant) -> Verdict {
        let was_visible = std::mem::replace(&mut self.page_visible, visible);

        if visible || !was_visible || self.state() == IntegrityState::Terminated {
            return Verdict::Ignored;
        }

        if let Some(last) = self.last_counted_hide {
            if now.duration_since(last) < VISIBILITY_DEBOUNCE {
                return Verdict::Ignored;
            }
        }

        self.last_counted_hide = Some(now);
        self.escalate()
    }

    /// Dimension detector. Edge-triggered: only the closed → open
    /// transition counts.
    pub fn report_dimensions(&mut self, dims: WindowDimensions) -> Verdict {
        let open = dims.suggests_open_panel();
        let was_open = std::mem::replace(&mut self.panel_open, open);

        if !open || was_open || self.state() == IntegrityState::Terminated {
            return Verdict::Ignored;
        }

        self.escalate()
    }

    /// Hides the first warning. The final warning cannot be dismissed.
    pub fn dismiss_warning(&mut self) -> bool {
        if self.state() == IntegrityState::Warned {
            self.warning_visible = false;
            true
        } else {
            false
        }
    }

    pub fn view(&self) -> IntegrityView {
        let state = self.state();
        IntegrityView {
            state,
            warning_count: self.warning_count,
            warning_visible: self.warning_visible,
            dismissible: state == IntegrityState::Warned,
        }
    }

    fn escalate(&mut self) -> Verdict {
        self.warning_count += 1;
        self.warning_visible = true;

        match self.state() {
            IntegrityState::Terminated => {
                tracing::warn!(count = self.warning_count, "integrity violation, terminating session");
                Verdict::Terminated
            }
            _ => {
                tracing::warn!(count = self.warning_count, "integrity violation, warning issued");
                Verdict::Warned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dims(outer_width: u32, inner_width: u32) -> WindowDimensions {
        WindowDimensions {
            outer_width,
            inner_width,
            outer_height: 900,
            inner_height: 880,
        }
    }

    #[test]
    fn first_hide_warns_second_terminates() {
        let mut monitor = IntegrityMonitor::new();
        let t0 = Instant::now();

        assert_eq!(monitor.report_visibility(false, t0), Verdict::Warned);
        assert!(monitor.view().dismissible);
        assert_eq!(monitor.report_visibility(true, t0 + Duration::from_secs(1)), Verdict::Ignored);
        assert_eq!(
            monitor.report_visibility(false, t0 + Duration::from_secs(4)),
            Verdict::Terminated
        );

        let view = monitor.view();
        assert_eq!(view.state, IntegrityState::Terminated);
        assert!(view.warning_visible);
        assert!(!view.dismissible);
    }

    #[test]
    fn rapid_toggles_are_debounced() {
        let mut monitor = IntegrityMonitor::new();
        let t0 = Instant::now();

        assert_eq!(monitor.report_visibility(false, t0), Verdict::Warned);
        monitor.report_visibility(true, t0 + Duration::from_millis(500));
        assert_eq!(
            monitor.report_visibility(false, t0 + Duration::from_millis(1000)),
            Verdict::Ignored
        );
        assert_eq!(monitor.warning_count(), 1);
    }

    #[test]
    fn repeated_hidden_reports_count_once() {
        let mut monitor = IntegrityMonitor::new();
        let t0 = Instant::now();

        monitor.report_visibility(false, t0);
        assert_eq!(
            monitor.report_visibility(false, t0 + Duration::from_secs(10)),
            Verdict::Ignored
        );
        assert_eq!(monitor.warning_count(), 1);
    }

    #[test]
    fn open_panel_counts_only_on_edge() {
        let mut monitor = IntegrityMonitor::new();

        assert_eq!(monitor.report_dimensions(dims(1400, 1390)), Verdict::Ignored);
        assert_eq!(monitor.report_dimensions(dims(1400, 1100)), Verdict::Warned);
        assert_eq!(monitor.report_dimensions(dims(1400, 1100)), Verdict::Ignored);
        assert_eq!(monitor.report_dimensions(dims(1400, 1395)), Verdict::Ignored);
        assert_eq!(monitor.report_dimensions(dims(1400, 1000)), Verdict::Terminated);
    }

    #[test]
    fn detectors_share_one_counter() {
        let mut monitor = IntegrityMonitor::new();

        assert_eq!(monitor.report_dimensions(dims(1400, 1100)), Verdict::Warned);
        assert_eq!(monitor.report_visibility(false, Instant::now()), Verdict::Terminated);
    }

    #[test]
    fn first_warning_is_dismissible() {
        let mut monitor = IntegrityMonitor::new();
        monitor.report_visibility(false, Instant::now());

        assert!(monitor.dismiss_warning());
        assert!(!monitor.view().warning_visible);
        assert_eq!(monitor.state(), IntegrityState::Warned);
    }

    #[test]
    fn terminated_ignores_further_reports() {
        let mut monitor = IntegrityMonitor::new();
        monitor.report_dimensions(dims(1400, 1100));
        monitor.report_dimensions(dims(1400, 1400));
        monitor.report_dimensions(dims(1400, 1100));

        assert_eq!(monitor.state(), IntegrityState::Terminated);
        assert!(!monitor.dismiss_warning());
        assert_eq!(monitor.report_dimensions(dims(1400, 1400)), Verdict::Ignored);
        assert_eq!(monitor.report_dimensions(dims(1400, 1100)), Verdict::Ignored);
        assert_eq!(monitor.warning_count(), 2);
    }
}
