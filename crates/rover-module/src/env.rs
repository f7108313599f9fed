//! Process environment cleanup for self-contained application images.
//!
//! When the runtime is launched from an AppImage-style launcher, the
//! launcher rewrites the process environment (interpreter paths, `PATH`
//! entries under its transient mount point) in ways that break child
//! processes spawned outside the image. Module processes must inherit a
//! clean environment, so the engine applies this cleanup exactly once at
//! initialisation.

use rover_error::CommonError;

const APPRUN_ORIGINAL_PREFIX: &str = "APPRUN_ORIGINAL_";
const MOUNT_PREFIX: &str = "/tmp/.mount_";

/// Reverts AppImage launcher environment changes:
///
/// - returns to the launch working directory recorded in `APPRUN_CWD`,
///   before anything else;
/// - restores every `APPRUN_ORIGINAL_*` value onto its original variable
///   (unsetting the variable when the recorded original is empty);
/// - unsets `ARGV0`, `ORIGIN`, and every `APPRUN*`, `APPDIR*`, `APPIMAGE*`,
///   and `AIX_*` variable;
/// - strips `/tmp/.mount_*` fragments from `PATH`-like variables, unsetting
///   a variable left with no entries.
///
/// Does nothing when `APPIMAGE` is not set.
///
/// # Errors
///
/// Returns an error when the launch working directory cannot be entered —
/// including when `APPRUN_CWD` is absent, which a conforming launcher never
/// leaves unset. The rest of the cleanup is skipped in that case.
pub fn clean_app_image_env() -> Result<(), CommonError> {
    if std::env::var_os("APPIMAGE").is_none() {
        return Ok(());
    }
    tracing::debug!("reverting AppImage launcher environment");

    std::env::set_current_dir(std::env::var_os("APPRUN_CWD").unwrap_or_default())?;

    // Restore original values where the launcher recorded them.
    for (key, value) in std::env::vars() {
        if let Some(original_key) = key.strip_prefix(APPRUN_ORIGINAL_PREFIX) {
            if original_key.is_empty() {
                continue;
            }
            if value.is_empty() {
                std::env::remove_var(original_key);
            } else {
                std::env::set_var(original_key, &value);
            }
        }
    }

    // Drop all explicit launcher variables.
    std::env::remove_var("ARGV0");
    std::env::remove_var("ORIGIN");
    let launcher_keys: Vec<String> = std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| {
            key.starts_with("APPRUN")
                || key.starts_with("APPDIR")
                || key.starts_with("APPIMAGE")
                || key.starts_with("AIX_")
        })
        .collect();
    for key in launcher_keys {
        std::env::remove_var(key);
    }

    // Strip transient mount paths from PATH-like variables.
    for (key, value) in std::env::vars() {
        if !value.contains(MOUNT_PREFIX) {
            continue;
        }
        let kept: Vec<&str> = value
            .split(':')
            .filter(|path| !path.is_empty() && !path.starts_with(MOUNT_PREFIX))
            .collect();
        if kept.is_empty() {
            std::env::remove_var(&key);
        } else {
            std::env::set_var(&key, kept.join(":"));
        }
    }

    Ok(())
}
