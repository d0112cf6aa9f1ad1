//! Playwright-backed page driver
//!
//! Playwright is controlled through generated Node scripts, one per
//! synchronization point. Mutating commands (navigate, fill, click,
//! check, select) are journaled; whenever the runner reads page state
//! (waits, text, url, cookies) the whole journal replays in order and
//! the read runs at its end, so every observation sees the session's
//! full history. Command-level failures therefore surface at the next
//! synchronization point.

use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::driver::{Cookie, DriverError, DriverResult, PageDriver};

/// Marker prefixing the single JSON result line on stdout.
const RESULT_PREFIX: &str = "STORECHECK_RESULT";

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {other}")),
        }
    }
}

/// Configuration for the Playwright driver.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

#[derive(Debug, Clone)]
enum PageCommand {
    Navigate { url: String },
    Fill { selector: String, value: String },
    Check { selector: String },
    Click { selector: String },
    Select { selector: String, value: String },
}

/// One Playwright browser session.
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
    journal: Vec<PageCommand>,
}

impl PlaywrightDriver {
    /// Create a driver, verifying the Playwright installation first.
    pub fn new(config: PlaywrightConfig) -> DriverResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self {
            config,
            journal: Vec::new(),
        })
    }

    fn check_playwright_installed() -> DriverResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(DriverError::Protocol(
                "Playwright not found. Install with: npx playwright install".to_string(),
            )),
        }
    }

    /// Build the full session script: header, journal replay, then the
    /// epilogue that computes and emits the observation.
    fn build_script(&self, epilogue: &str) -> String {
        let mut script = format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

const emit = (value) => console.log('{prefix} ' + JSON.stringify(value));

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  try {{
"#,
            prefix = RESULT_PREFIX,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
        );

        for command in &self.journal {
            script.push_str(&command_to_js(command));
            script.push('\n');
        }

        script.push_str("    const result = await (async () => {\n");
        script.push_str(epilogue);
        script.push_str(
            r#"
    })();
    emit({ ok: true, value: result });
  } catch (error) {
    emit({ ok: false, error: error.message });
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// Run the session script and return the observation value.
    async fn query(&self, epilogue: &str) -> DriverResult<serde_json::Value> {
        let script = self.build_script(epilogue);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("session.js");
        std::fs::write(&script_path, &script)?;

        debug!(
            commands = self.journal.len(),
            "replaying session journal via node"
        );

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await
            .map_err(DriverError::Io)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = extract_result(&stdout).ok_or_else(|| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            DriverError::Protocol(format!(
                "no result line from node\nstdout: {stdout}\nstderr: {stderr}"
            ))
        })?;

        let parsed: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| DriverError::Protocol(format!("bad result line: {e}")))?;

        if parsed["ok"].as_bool() == Some(true) {
            Ok(parsed["value"].clone())
        } else {
            let message = parsed["error"].as_str().unwrap_or("unknown error");
            Err(classify_js_error(message))
        }
    }
}

/// The last result line wins; Playwright may log above it.
fn extract_result(stdout: &str) -> Option<&str> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let re = LINE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^{RESULT_PREFIX} (.+)$")).expect("static regex")
    });
    re.captures_iter(stdout)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn classify_js_error(message: &str) -> DriverError {
    let lower = message.to_lowercase();
    if lower.contains("net::") || lower.contains("goto") || lower.contains("navigat") {
        DriverError::Navigation(message.to_string())
    } else if lower.contains("selector") || lower.contains("element") {
        DriverError::ElementNotFound(message.to_string())
    } else if lower.contains("timeout") {
        DriverError::Timeout(message.to_string())
    } else {
        DriverError::Protocol(message.to_string())
    }
}

fn command_to_js(command: &PageCommand) -> String {
    match command {
        PageCommand::Navigate { url } => {
            format!("    await page.goto('{}');", js_str(url))
        }
        PageCommand::Fill { selector, value } => {
            format!(
                "    await page.fill('{}', '{}');",
                js_str(selector),
                js_str(value)
            )
        }
        PageCommand::Check { selector } => {
            format!("    await page.check('{}');", js_str(selector))
        }
        PageCommand::Click { selector } => {
            format!("    await page.click('{}');", js_str(selector))
        }
        PageCommand::Select { selector, value } => {
            format!(
                "    await page.selectOption('{}', '{}');",
                js_str(selector),
                js_str(value)
            )
        }
    }
}

/// Escape a Rust string into a single-quoted JS literal.
fn js_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.journal.push(PageCommand::Navigate {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        self.journal.push(PageCommand::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn check(&mut self, selector: &str) -> DriverResult<()> {
        self.journal.push(PageCommand::Check {
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        self.journal.push(PageCommand::Click {
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        self.journal.push(PageCommand::Select {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> DriverResult<bool> {
        let epilogue = format!(
            r#"      try {{
        await page.waitForSelector('{}', {{ state: 'visible', timeout: {} }});
        return true;
      }} catch {{
        return false;
      }}"#,
            js_str(selector),
            timeout.as_millis()
        );
        let value = self.query(&epilogue).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn wait_for_any(
        &mut self,
        selectors: &[&str],
        timeout: Duration,
    ) -> DriverResult<Option<usize>> {
        let targets: Vec<String> = selectors
            .iter()
            .map(|s| format!("'{}'", js_str(s)))
            .collect();
        let epilogue = format!(
            r#"      const targets = [{}];
      return await Promise.race([
        ...targets.map((s, i) =>
          page.waitForSelector(s, {{ state: 'visible', timeout: {timeout} }})
            .then(() => i)
            .catch(() => new Promise(() => {{}}))),
        new Promise(resolve => setTimeout(() => resolve(null), {timeout})),
      ]);"#,
            targets.join(", "),
            timeout = timeout.as_millis()
        );
        let value = self.query(&epilogue).await?;
        Ok(value.as_u64().map(|i| i as usize))
    }

    async fn text_of(&mut self, selector: &str) -> DriverResult<String> {
        let epilogue = format!(
            "      return (await page.locator('{}').first().textContent()) ?? '';",
            js_str(selector)
        );
        let value = self.query(&epilogue).await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn text_of_all(&mut self, selector: &str) -> DriverResult<Vec<String>> {
        let epilogue = format!(
            "      return await page.locator('{}').allTextContents();",
            js_str(selector)
        );
        let value = self.query(&epilogue).await?;
        let texts = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(texts)
    }

    async fn is_visible(&mut self, selector: &str) -> DriverResult<bool> {
        let epilogue = format!(
            "      return await page.locator('{}').first().isVisible().catch(() => false);",
            js_str(selector)
        );
        let value = self.query(&epilogue).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        let value = self.query("      return page.url();").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn cookies(&mut self) -> DriverResult<Vec<Cookie>> {
        let value = self.query("      return await context.cookies();").await?;
        let cookies = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|c| Cookie {
                        name: c["name"].as_str().unwrap_or_default().to_string(),
                        value: c["value"].as_str().unwrap_or_default().to_string(),
                        secure: c["secure"].as_bool().unwrap_or(false),
                        http_only: c["httpOnly"].as_bool().unwrap_or(false),
                        same_site: c["sameSite"].as_str().map(String::from),
                        // Playwright reports -1 for session cookies.
                        expires: c["expires"].as_f64().filter(|e| *e >= 0.0),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(cookies)
    }
}
