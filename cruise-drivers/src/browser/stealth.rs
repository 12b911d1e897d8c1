//! Stealth profile: browser arguments and JS patches that keep the host
//! page's telemetry from noticing the automation.
//!
//! This is boundary machinery, not engine logic. The engine works
//! identically with stealth off; these patches only quiet the module's own
//! watchdogs (visibility tracking, mutation observers, telemetry uploads
//! that report playback-rate tampering).

use cruise_common::StealthLevel;

/// Chrome command-line arguments for a given stealth level.
pub fn build_stealth_arguments(level: StealthLevel) -> Vec<String> {
    if level == StealthLevel::Off {
        return Vec::new();
    }
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
    ];
    if level == StealthLevel::Maximum {
        args.push("--disable-gpu".to_string());
    }
    args
}

/// JavaScript patches applied after every navigation.
pub struct StealthScripts;

impl StealthScripts {
    /// Keep the page convinced it is visible and focused, so the module
    /// does not pause media or discount watch time while minimised.
    pub fn visibility_spoof() -> &'static str {
        r#"
            document.hasFocus = () => true;
            Object.defineProperty(document, 'hidden', { get: () => false });
            Object.defineProperty(document, 'visibilityState', { get: () => 'visible' });
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
        "#
    }

    /// Replace MutationObserver with an inert shim; some modules use it to
    /// detect attribute writes they did not make themselves.
    pub fn observer_shim() -> &'static str {
        r#"
            window.MutationObserver = class {
                constructor() {}
                observe() {}
                disconnect() {}
                takeRecords() { return []; }
            };
        "#
    }

    /// Filter WebSocket frames that would report automation markers upstream.
    pub fn telemetry_filter() -> &'static str {
        r#"
            const originalSend = WebSocket.prototype.send;
            WebSocket.prototype.send = function (data) {
                const str = typeof data === 'string' ? data : '';
                if (str.includes('playbackRate') || str.includes('devtools') || str.includes('automation')) {
                    return;
                }
                return originalSend.apply(this, arguments);
            };
        "#
    }

    /// The patch set for a stealth level, in application order.
    pub fn for_level(level: StealthLevel) -> Vec<&'static str> {
        match level {
            StealthLevel::Off => vec![],
            StealthLevel::Lightweight => vec![Self::visibility_spoof()],
            StealthLevel::Balanced => vec![Self::visibility_spoof(), Self::observer_shim()],
            StealthLevel::Maximum => vec![
                Self::visibility_spoof(),
                Self::observer_shim(),
                Self::telemetry_filter(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_means_off() {
        assert!(build_stealth_arguments(StealthLevel::Off).is_empty());
        assert!(StealthScripts::for_level(StealthLevel::Off).is_empty());
    }

    #[test]
    fn levels_are_cumulative() {
        let light = StealthScripts::for_level(StealthLevel::Lightweight);
        let max = StealthScripts::for_level(StealthLevel::Maximum);
        assert!(max.len() > light.len());
        assert!(max.starts_with(&light));
    }
}
