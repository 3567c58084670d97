//! Chromium detection and install guidance.

use std::path::PathBuf;

/// Chromium-based executables that speak CDP, in preference order.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "chrome-browser",
    "microsoft-edge",
    "microsoft-edge-stable",
    "msedge",
    "brave-browser",
    "brave",
];

#[cfg(target_os = "macos")]
const MACOS_APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "windows")]
const WINDOWS_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Outcome of looking for a browser binary.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub found: bool,
    pub path: Option<PathBuf>,
    /// Install guidance, empty when a browser was found.
    pub install_hint: String,
}

impl DetectionResult {
    fn found(path: PathBuf) -> Self {
        Self {
            found: true,
            path: Some(path),
            install_hint: String::new(),
        }
    }
}

/// Look for a Chromium-based browser.
///
/// Order: the configured path, the `CHROME` environment variable, platform
/// install locations, then executables on `PATH`.
pub fn detect_browser(custom_path: Option<&str>) -> DetectionResult {
    let explicit = custom_path
        .map(PathBuf::from)
        .into_iter()
        .chain(std::env::var_os("CHROME").map(PathBuf::from));
    for p in explicit {
        if p.exists() {
            return DetectionResult::found(p);
        }
    }

    #[cfg(target_os = "macos")]
    if let Some(p) = MACOS_APP_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return DetectionResult::found(p);
    }

    #[cfg(target_os = "windows")]
    if let Some(p) = WINDOWS_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return DetectionResult::found(p);
    }

    if let Some(p) = CHROMIUM_EXECUTABLES
        .iter()
        .find_map(|name| which::which(name).ok())
    {
        return DetectionResult::found(p);
    }

    DetectionResult {
        found: false,
        path: None,
        install_hint: install_instructions(),
    }
}

/// Platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask chromium"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium\n  \
         Fedora:        sudo dnf install chromium\n  \
         Arch:          sudo pacman -S chromium"
    } else if cfg!(target_os = "windows") {
        "  winget install Google.Chrome"
    } else {
        "  Download from https://www.chromium.org/getting-involved/download-chromium/"
    };

    format!(
        "No Chromium-based browser found; the rendered-browser strategy cannot run.\n\n\
         {instructions}\n\n\
         Or point sitewatch at a binary:\n  \
         [render]\n  \
         chrome_path = \"/path/to/chromium\"\n\n\
         (SITEWATCH_CHROME_PATH or CHROME in the environment work too.)\n\
         To skip rendering entirely set `render.enabled = false`."
    )
}

/// Log whether a browser is available. Returns `true` when one was found.
pub fn check_and_warn(custom_path: Option<&str>) -> bool {
    let result = detect_browser(custom_path);
    match result.path {
        Some(ref path) => tracing::info!(path = %path.display(), "host browser detected"),
        None => tracing::warn!(
            "rendered-browser strategy configured but no browser was found\n{}",
            result.install_hint
        ),
    }
    result.found
}
