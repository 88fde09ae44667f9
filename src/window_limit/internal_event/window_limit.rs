use std::time::Duration;

use crate::registered_event;
use metrics::{Counter, Histogram, counter, histogram};

registered_event! {
    WindowAdmission => {
        admitted: Counter = counter!("window_limit_admitted_total"),
        // Zero for callers admitted without waiting.
        wait: Histogram = histogram!("window_limit_wait_seconds"),
    }

    fn emit(&self, waited: Duration) {
        self.admitted.increment(1);
        self.wait.record(waited);

        if waited.is_zero() {
            trace!(target: "window_limit::stats", "Admitted without waiting");
        } else {
            debug!(target: "window_limit::stats", waited_ms = waited.as_millis(), "Admitted after waiting for a window slot");
        }
    }
}

registered_event! {
    WindowSaturated => {
        saturated: Counter = counter!("window_limit_saturated_total"),
    }

    fn emit(&self, max_requests: usize) {
        self.saturated.increment(1);
        trace!(target: "window_limit::stats", max_requests, "Window saturated; caller waiting");
    }
}

registered_event! {
    WindowReset => {
        resets: Counter = counter!("window_limit_resets_total"),
        // How full each window got before it closed.
        window_admissions: Histogram = histogram!("window_limit_window_admissions"),
    }

    fn emit(&self, admitted: usize) {
        self.resets.increment(1);
        self.window_admissions.record(admitted as f64);
        trace!(target: "window_limit::stats", admitted_in_window = admitted, "Window Reset");
    }
}
