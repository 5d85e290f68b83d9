use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use msdash_core::control::ControlPlane;
use msdash_core::model::{UploadFile, UploadOutcome, UploadRequest};

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("'{}' has no usable file name", path.display()))
}

/// `msdash upload`: package local files as a new microservice
pub async fn run_upload(
    control: &dyn ControlPlane,
    name: &str,
    description: &str,
    paths: &[PathBuf],
    out: &mut dyn Write,
) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        files.push(UploadFile {
            filename: file_name(path)?,
            bytes,
        });
    }

    let request = UploadRequest {
        name: name.to_string(),
        description: description.to_string(),
        files,
    };
    let outcome = match control.upload(request).await {
        Ok(outcome) => outcome,
        Err(e) => bail!("Error uploading. {}", e),
    };
    if let UploadOutcome::Rejected { .. } = outcome {
        bail!("{}", outcome.message());
    }
    writeln!(out, "{}", outcome.message())?;
    Ok(())
}

/// `msdash download`: save one file of a microservice package
pub async fn run_download(
    control: &dyn ControlPlane,
    folder: &str,
    filename: &str,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let url = control.download_url(folder, filename);
    let bytes = control
        .download(folder, filename)
        .await
        .with_context(|| format!("downloading {}", url))?;

    let target = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(filename));
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("writing {}", target.display()))?;
    writeln!(out, "Saved {} bytes to {}", bytes.len(), target.display())?;
    Ok(())
}
