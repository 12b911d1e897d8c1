//! Driver layer binding the engine to a live browser.
//!
//! This crate exposes the WebDriver-backed [`ContentHost`] implementation
//! and the stealth boundary applied around it.
//!
//! - [`browser::driver::CruiseDriver`]: WebDriver client wrapper
//! - [`browser::host::WebDriverHost`]: the engine's view of the live page
//! - [`browser::stealth`]: stealth arguments and JS patches
//!
//! [`ContentHost`]: cruise_dom::ContentHost
pub mod browser;
