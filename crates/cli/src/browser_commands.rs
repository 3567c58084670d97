//! `sitewatch browser`: rendered-fetch readiness.

use std::path::Path;

use {anyhow::Result, sitewatch_browser::detect::detect_browser, sitewatch_common::StrategyKind};

pub fn status(config_path: Option<&Path>) -> Result<()> {
    let config = crate::load_config(config_path)?;
    let render = &config.render;

    println!("Rendered fetch configuration:");
    println!("  enabled:        {}", render.enabled);
    println!("  headless:       {}", render.headless);
    println!(
        "  viewport:       {}x{}",
        render.viewport_width, render.viewport_height
    );
    println!(
        "  waits:          dom {}s, settle {}s, timeout {}s",
        render.dom_wait_secs, render.settle_secs, render.timeout_secs
    );
    match render.chrome_path {
        Some(ref path) => println!("  chrome_path:    {path}"),
        None => println!("  chrome_path:    (auto-detect)"),
    }

    let chain: Vec<&str> = config
        .effective_strategies()
        .into_iter()
        .map(StrategyKind::as_str)
        .collect();
    println!("  strategies:     {}", chain.join(" -> "));

    let detection = detect_browser(render.chrome_path.as_deref());
    match detection.path {
        Some(ref path) => println!("\nBrowser found: {}", path.display()),
        None => println!("\nNo browser found.\n\n{}", detection.install_hint),
    }

    Ok(())
}
