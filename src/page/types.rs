// Core types shared by page automation backends

use thiserror::Error;

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

/// Error types for page operations
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synthetic DOM events dispatched on the input field so reactive frameworks
/// pick up a programmatic value change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    CompositionEnd,
    Input,
    Change,
    KeyUp(char),
}

impl InputEvent {
    /// Sequence dispatched after filling the input
    pub const COMMIT: [InputEvent; 4] = [
        InputEvent::CompositionEnd,
        InputEvent::Input,
        InputEvent::Change,
        InputEvent::KeyUp(' '),
    ];

    /// Sequence dispatched while typing incrementally
    pub const NUDGE: [InputEvent; 2] = [InputEvent::Input, InputEvent::Change];

    /// JavaScript statement dispatching this event on `el`
    pub fn to_js(&self) -> String {
        match self {
            InputEvent::CompositionEnd => "el.dispatchEvent(new CompositionEvent('compositionend', { bubbles: true, cancelable: true, data: el.value }));".to_string(),
            InputEvent::Input => "el.dispatchEvent(new Event('input', { bubbles: true }));".to_string(),
            InputEvent::Change => "el.dispatchEvent(new Event('change', { bubbles: true }));".to_string(),
            InputEvent::KeyUp(key) => {
                let key = serde_json::to_string(&key.to_string()).unwrap_or_else(|_| "' '".to_string());
                format!("el.dispatchEvent(new KeyboardEvent('keyup', {{ bubbles: true, key: {} }}));", key)
            }
        }
    }
}
