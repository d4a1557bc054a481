//! Environment readiness check.

use crate::config::{resolve_base_dir, DOWNLOAD_DIR_ENV};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Check Chromium availability, the download directory, and available memory.
pub async fn run() -> Result<()> {
    println!("Harvest Doctor");
    println!("==============");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome or set HARVEST_CHROMIUM_PATH."),
    }

    let base_dir_ok = match resolve_base_dir(None) {
        Ok(dir) => {
            let source = if std::env::var(DOWNLOAD_DIR_ENV).is_ok() {
                DOWNLOAD_DIR_ENV
            } else {
                "default"
            };
            check_writable(&dir, source)
        }
        Err(e) => {
            println!("[!!] Download directory: {e:#}");
            false
        }
    };

    match get_available_memory_mb() {
        Some(mb) if mb >= 512 => println!("[OK] Available memory: {mb}MB (>= 512MB required)"),
        Some(mb) => println!("[!!] Available memory: {mb}MB (< 512MB, may be insufficient)"),
        None => println!("[??] Could not determine available memory"),
    }

    println!();
    if chromium_path.is_some() && base_dir_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

fn check_writable(dir: &Path, source: &str) -> bool {
    let existing = dir.ancestors().find(|p| p.exists());
    match existing.map(std::fs::metadata) {
        Some(Ok(meta)) if !meta.permissions().readonly() => {
            println!("[OK] Download directory ({source}): {}", dir.display());
            true
        }
        _ => {
            println!("[!!] Download directory not writable ({source}): {}", dir.display());
            false
        }
    }
}

/// Get available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        let bytes: u64 = s.trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").args(["-m"]).output().ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        s.lines()
            .find(|line| line.starts_with("Mem:"))
            .and_then(|line| line.split_whitespace().nth(6))
            .and_then(|v| v.parse().ok())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
