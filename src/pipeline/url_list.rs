use std::io::Write;

use tempfile::NamedTempFile;

use crate::error::{Result, RunError};

/// Write one URL per line to a fresh temporary file.
///
/// The file is removed when the returned handle drops.
pub fn write_url_list(urls: &[String]) -> Result<NamedTempFile> {
    validate(urls)?;

    let mut file = tempfile::Builder::new()
        .prefix("fetchpipe-urls-")
        .suffix(".txt")
        .tempfile()
        .map_err(|e| RunError::io("creating URL list", e))?;

    for url in urls {
        writeln!(file, "{url}").map_err(|e| RunError::io("writing URL list", e))?;
    }
    file.flush()
        .map_err(|e| RunError::io("writing URL list", e))?;

    // Copied into the container as-is; services there may not run as us.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(|e| RunError::io("setting URL list permissions", e))?;
    }

    Ok(file)
}

fn validate(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(RunError::Usage("at least one URL is required".into()));
    }
    for url in urls {
        if url.trim().is_empty() {
            return Err(RunError::Usage("URL arguments must not be blank".into()));
        }
        if url.contains(['\n', '\r']) {
            return Err(RunError::Usage(format!(
                "URL argument contains a line break: {url:?}"
            )));
        }
    }
    Ok(())
}
