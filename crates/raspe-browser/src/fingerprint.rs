use rand::Rng;
use raspe_core::BrowserConfig;

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub accept_language: String,
}

// Common desktop user agents
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
];

// Common viewport sizes
const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration
    #[must_use]
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..VIEWPORTS.len());
        let (width, height) = VIEWPORTS[vp_idx];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            accept_language: "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }

    /// Randomized user agent with the window size taken from `config`.
    #[must_use]
    pub fn for_config(config: &BrowserConfig) -> Self {
        Self {
            viewport_width: config.window_width,
            viewport_height: config.window_height,
            ..Self::randomized()
        }
    }

    /// Chromium command-line switches applying this fingerprint.
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            format!("--user-agent={}", self.user_agent),
            format!("--lang={}", self.primary_language()),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-infobars".to_string(),
        ]
    }

    fn primary_language(&self) -> &str {
        self.accept_language
            .split(',')
            .next()
            .unwrap_or("pt-BR")
    }
}
