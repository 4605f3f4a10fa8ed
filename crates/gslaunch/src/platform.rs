use gslaunch_core::Platform;

/// Create the platform bundle for the current operating system.
pub fn create_platform() -> Platform {
    #[cfg(windows)]
    {
        gslaunch_windows::windows_platform()
    }

    #[cfg(unix)]
    {
        gslaunch_unix::unix_platform()
    }

    #[cfg(not(any(unix, windows)))]
    {
        compile_error!("Unsupported platform: only Unix and Windows are currently supported");
    }
}

/// Platform name for logging and diagnostics.
pub fn platform_name() -> &'static str {
    #[cfg(windows)]
    {
        "Windows"
    }

    #[cfg(unix)]
    {
        "Unix"
    }

    #[cfg(not(any(unix, windows)))]
    {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_is_constructible() {
        let platform = create_platform();
        let _ = &platform.display;
        println!("Running on platform: {}", platform_name());
    }
}
