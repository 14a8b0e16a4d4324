//! Page automation abstraction.
//!
//! This module provides a unified interface over the browser primitives the
//! probe needs:
//! - `ChromePage` drives a real Chrome/Chromium over the DevTools protocol
//! - `ScriptedPage` replays a deterministic output timeline for tests

use std::time::Duration;

use super::types::{InputEvent, PageResult};

/// Trait for page automation backends
///
/// Every method addresses one of two fixed elements of the page under test:
/// the input field and the output region.
pub trait PageDriver: Send {
    /// Load `url` and wait for the load event
    fn goto(&mut self, url: &str) -> PageResult<()>;

    /// Wait until the output region exists
    fn wait_for_output(&mut self, timeout: Duration) -> PageResult<()>;

    /// Current value of the output region, `None` when it is not an editable field
    fn output_value(&mut self) -> PageResult<Option<String>>;

    /// Rendered text of the output region
    fn output_inner_text(&mut self) -> PageResult<String>;

    /// Raw text content of the output region, `None` when the DOM has none
    fn output_text_content(&mut self) -> PageResult<Option<String>>;

    fn click_input(&mut self) -> PageResult<()>;

    /// Replace the input value in one step
    fn fill_input(&mut self, text: &str) -> PageResult<()>;

    /// Type `text` key by key with `key_delay` between keystrokes
    fn type_input(&mut self, text: &str, key_delay: Duration) -> PageResult<()>;

    /// Press a named key (e.g. "Backspace") on the input field
    fn press_key(&mut self, key: &str) -> PageResult<()>;

    /// Dispatch synthetic events on the input field
    fn dispatch_input_events(&mut self, events: &[InputEvent]) -> PageResult<()>;

    /// Make sure the checkbox labelled `label` has the given state.
    ///
    /// Returns `false` when the page has no such option.
    fn set_toggle(&mut self, label: &str, enabled: bool) -> PageResult<bool>;

    /// Full page markup
    fn content(&mut self) -> PageResult<String>;

    /// Backend identifier (e.g. "chrome", "scripted")
    fn source_type(&self) -> &str;
}

/// Read the output region's text, trimmed.
///
/// An editable field's value is authoritative; otherwise the rendered text
/// is used, then the raw text content, then the empty string. Only a failure
/// of the last fallback is returned as an error.
pub fn read_output_text(driver: &mut dyn PageDriver) -> PageResult<String> {
    if let Ok(Some(value)) = driver.output_value() {
        return Ok(value.trim().to_string());
    }

    if let Ok(text) = driver.output_inner_text() {
        return Ok(text.trim().to_string());
    }

    Ok(driver
        .output_text_content()?
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}
