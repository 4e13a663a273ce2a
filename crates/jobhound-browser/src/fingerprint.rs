//! Per-session browser identity.

use jobhound_core::BrowserConfig;
use rand::seq::SliceRandom;
use rand::Rng;

/// A user agent paired with the platform it claims.
struct Desktop {
    user_agent: &'static str,
    platform: &'static str,
}

const DESKTOPS: &[Desktop] = &[
    Desktop {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        platform: "Win32",
    },
    Desktop {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        platform: "MacIntel",
    },
    Desktop {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
        platform: "Linux x86_64",
    },
    Desktop {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0",
        platform: "Win32",
    },
];

// Laptop and desktop sizes wide enough for the two-pane results layout
const WINDOWS: &[(u32, u32)] = &[(1920, 1080), (1680, 1050), (1536, 864), (1440, 900), (1366, 768)];

const TIMEZONE: &str = "America/New_York";
const LOCALE: &str = "en-US";

/// Identity a session presents for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    /// `navigator.platform` matching the user agent
    pub platform: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    pub locale: String,
}

impl FingerprintConfig {
    /// Pick a desktop and window size at random.
    ///
    /// Widths are jittered by a few pixels so repeated sessions do not share
    /// an exact window size.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let desktop = DESKTOPS.choose(&mut rng).unwrap_or(&DESKTOPS[0]);
        let (width, height) = WINDOWS.choose(&mut rng).copied().unwrap_or(WINDOWS[0]);
        let jitter = rng.gen_range(0..=16);
        Self::from_parts(desktop, width - jitter, height)
    }

    /// Fingerprint for a session: random, or the first desktop with the
    /// configured window when randomization is off.
    pub fn for_session(config: &BrowserConfig) -> Self {
        if config.randomize_fingerprint {
            Self::randomized()
        } else {
            Self::from_parts(&DESKTOPS[0], config.window_width, config.window_height)
        }
    }

    fn from_parts(desktop: &Desktop, width: u32, height: u32) -> Self {
        Self {
            user_agent: desktop.user_agent.to_string(),
            platform: desktop.platform.to_string(),
            viewport_width: width,
            viewport_height: height,
            timezone: TIMEZONE.to_string(),
            locale: LOCALE.to_string(),
        }
    }

    /// Launch switches for Chromium.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--user-agent={}", self.user_agent),
            format!("--lang={}", self.locale),
        ];
        // AutomationControlled is what sets navigator.webdriver
        args.extend(
            [
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--no-default-browser-check",
            ]
            .map(String::from),
        );
        args
    }
}
