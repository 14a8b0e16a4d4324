//! Chrome DevTools backend.
//!
//! Drives a headless (or headed) Chrome/Chromium through chromiumoxide. The
//! async client runs on a runtime owned by the page, so the rest of the probe
//! stays synchronous and samples on its own clock.

use std::time::Duration;

use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::debug;

use super::driver::PageDriver;
use super::types::{InputEvent, PageError, PageResult};
use crate::config::SiteSettings;

/// CSS class of the card wrapping each panel
const CARD_SELECTOR: &str = ".card";
/// CSS class of a card's title
const PANEL_TITLE_SELECTOR: &str = ".panel-title";
/// CSS class of the output region inside the output card
const OUTPUT_REGION_SELECTOR: &str = ".bg-slate-50";

/// Poll interval while waiting for the output region
const PRESENCE_POLL: Duration = Duration::from_millis(250);

/// A browser tab pointed at the tool under test
pub struct ChromePage {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    input_selector: String,
    output_panel: String,
}

impl ChromePage {
    /// Launch a browser and open a blank tab
    pub fn launch(site: &SiteSettings) -> PageResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let (browser, page, handler) = runtime.block_on(async {
            let mut builder = BrowserConfig::builder();
            if !site.headless {
                builder = builder.with_head();
            }
            if let Some(path) = &site.chrome_executable {
                builder = builder.chrome_executable(path);
            }
            let config = builder.build().map_err(PageError::Browser)?;

            let (browser, mut events) = Browser::launch(config).await.map_err(browser_error)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(browser_error)?;
            Ok::<_, PageError>((browser, page, handler))
        })?;

        debug!(headless = site.headless, "browser launched");

        Ok(Self {
            runtime,
            browser,
            page,
            handler,
            input_selector: site.input_selector.clone(),
            output_panel: site.output_panel.clone(),
        })
    }

    /// JavaScript expression that binds the output region to `el` and runs `body`
    fn with_output(&self, body: &str) -> String {
        format!(
            r#"(() => {{
  const cards = Array.from(document.querySelectorAll({card}));
  const card = cards.find((c) => Array.from(c.querySelectorAll({title}))
    .some((t) => (t.innerText || t.textContent || '').includes({panel})));
  const el = card ? card.querySelector({region}) : null;
  {body}
}})()"#,
            card = js_string(CARD_SELECTOR),
            title = js_string(PANEL_TITLE_SELECTOR),
            panel = js_string(&self.output_panel),
            region = js_string(OUTPUT_REGION_SELECTOR),
            body = body,
        )
    }

    /// JavaScript expression that binds the input field to `el` and runs `body`
    fn with_input(&self, body: &str) -> String {
        format!(
            r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) throw new Error('input field not found');
  {body}
}})()"#,
            selector = js_string(&self.input_selector),
            body = body,
        )
    }

    fn eval(&self, expression: &str) -> PageResult<serde_json::Value> {
        self.runtime.block_on(async {
            let result = self
                .page
                .evaluate(expression)
                .await
                .map_err(|e| PageError::Script(e.to_string()))?;
            Ok::<_, PageError>(result.value().cloned().unwrap_or(serde_json::Value::Null))
        })
    }

    fn eval_optional_string(&self, expression: &str) -> PageResult<Option<String>> {
        match self.eval(expression)? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(s) => Ok(Some(s)),
            other => Err(PageError::Script(format!("expected text, got {}", other))),
        }
    }
}

impl PageDriver for ChromePage {
    fn goto(&mut self, url: &str) -> PageResult<()> {
        self.runtime.block_on(async {
            self.page
                .goto(url)
                .await
                .map(|_| ())
                .map_err(|e| PageError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
        })
    }

    fn wait_for_output(&mut self, timeout: Duration) -> PageResult<()> {
        let probe = self.with_output("return !!el && el.getClientRects().length > 0;");
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Ok(serde_json::Value::Bool(true)) = self.eval(&probe) {
                return Ok(());
            }
            if std::time::Instant::now() >= deadline {
                return Err(PageError::Timeout(format!(
                    "output panel '{}' to become visible",
                    self.output_panel
                )));
            }
            std::thread::sleep(PRESENCE_POLL);
        }
    }

    fn output_value(&mut self) -> PageResult<Option<String>> {
        let expr = self.with_output(
            "if (!el) throw new Error('output region not found');
  const tag = el.tagName.toLowerCase();
  return (tag === 'textarea' || tag === 'input') ? el.value : null;",
        );
        self.eval_optional_string(&expr)
    }

    fn output_inner_text(&mut self) -> PageResult<String> {
        let expr = self.with_output(
            "if (!el) throw new Error('output region not found');
  return el.innerText;",
        );
        self.eval_optional_string(&expr)?
            .ok_or_else(|| PageError::Script("innerText unavailable".to_string()))
    }

    fn output_text_content(&mut self) -> PageResult<Option<String>> {
        let expr = self.with_output(
            "if (!el) throw new Error('output region not found');
  return el.textContent;",
        );
        self.eval_optional_string(&expr)
    }

    fn click_input(&mut self) -> PageResult<()> {
        self.runtime.block_on(async {
            let element = self
                .page
                .find_element(self.input_selector.as_str())
                .await
                .map_err(|_| PageError::ElementNotFound(self.input_selector.clone()))?;
            element.click().await.map_err(browser_error)?;
            Ok::<_, PageError>(())
        })
    }

    fn fill_input(&mut self, text: &str) -> PageResult<()> {
        let body = format!(
            "el.focus();
  const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value').set;
  setter.call(el, {text});
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  return true;",
            text = js_string(text)
        );
        self.eval(&self.with_input(&body)).map(|_| ())
    }

    fn type_input(&mut self, text: &str, key_delay: Duration) -> PageResult<()> {
        self.runtime.block_on(async {
            let element = self
                .page
                .find_element(self.input_selector.as_str())
                .await
                .map_err(|_| PageError::ElementNotFound(self.input_selector.clone()))?;
            for ch in text.chars() {
                element
                    .type_str(ch.to_string())
                    .await
                    .map_err(browser_error)?;
                tokio::time::sleep(key_delay).await;
            }
            Ok::<_, PageError>(())
        })
    }

    fn press_key(&mut self, key: &str) -> PageResult<()> {
        self.runtime.block_on(async {
            let element = self
                .page
                .find_element(self.input_selector.as_str())
                .await
                .map_err(|_| PageError::ElementNotFound(self.input_selector.clone()))?;
            element.press_key(key).await.map_err(browser_error)?;
            Ok::<_, PageError>(())
        })
    }

    fn dispatch_input_events(&mut self, events: &[InputEvent]) -> PageResult<()> {
        let statements: Vec<String> = events.iter().map(InputEvent::to_js).collect();
        let body = format!("{}\n  return true;", statements.join("\n  "));
        self.eval(&self.with_input(&body)).map(|_| ())
    }

    fn set_toggle(&mut self, label: &str, enabled: bool) -> PageResult<bool> {
        let expr = format!(
            r#"(() => {{
  const label = {label};
  const holder = Array.from(document.querySelectorAll('div')).find((d) =>
    d.querySelector('input[type="checkbox"]') &&
    Array.from(d.querySelectorAll('*')).some((n) => (n.textContent || '').trim() === label));
  if (!holder) return null;
  const box = holder.querySelector('input[type="checkbox"]');
  if (box.checked !== {enabled}) box.click();
  return box.checked;
}})()"#,
            label = js_string(label),
            enabled = enabled,
        );
        Ok(!self.eval(&expr)?.is_null())
    }

    fn content(&mut self) -> PageResult<String> {
        self.runtime
            .block_on(async { self.page.content().await })
            .map_err(browser_error)
    }

    fn source_type(&self) -> &str {
        "chrome"
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        let _ = self.runtime.block_on(self.browser.close());
        self.handler.abort();
    }
}

fn browser_error(err: CdpError) -> PageError {
    PageError::Browser(err.to_string())
}

/// Encode `s` as a JavaScript string literal
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"textarea[placeholder="Input"]"#),
            r#""textarea[placeholder=\"Input\"]""#
        );
        assert_eq!(js_string("ගෙදර\n"), "\"ගෙදර\\n\"");
    }
}
