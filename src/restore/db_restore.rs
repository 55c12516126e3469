// dgraph-backup/src/restore/db_restore.rs
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RestoreSettings;
use crate::errors::{BoxError, RestoreError};
use crate::utils::find_executable;

/// Lifecycle of one loader process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Spawned,
    AwaitingPrompt,
    Answered,
    Exited,
    TimedOut,
}

#[derive(Debug)]
pub struct LoaderRun {
    pub status: ExitStatus,
    /// Whether the scripted answer reached the loader's stdin.
    pub answered: bool,
}

impl LoaderRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// `live -f <data> -a <alpha> -z <zero> -s <schema>`
pub fn loader_args(data_path: &Path, alpha: &str, zero: &str, schema: &Path) -> Vec<OsString> {
    vec![
        "live".into(),
        "-f".into(),
        data_path.into(),
        "-a".into(),
        alpha.into(),
        "-z".into(),
        zero.into(),
        "-s".into(),
        schema.into(),
    ]
}

/// Runs the bulk loader against `data_path` with `schema`, answers its
/// confirmation prompt and waits for it to exit.
///
/// Without a configured prompt marker the answer is written as soon as the
/// process has started. With one, the loader's output is forwarded to the
/// console and the answer is held back until the marker shows up. A
/// configured timeout kills the loader.
pub async fn drive_loader(
    settings: &RestoreSettings,
    data_path: &Path,
    schema: &Path,
) -> Result<LoaderRun, RestoreError> {
    let start_error = |source: BoxError| RestoreError::LoaderStart {
        program: settings.loader_bin.clone(),
        source,
    };

    let program = find_executable(&settings.loader_bin).map_err(|e| start_error(e.into()))?;
    let args = loader_args(data_path, &settings.alpha_addr, &settings.zero_addr, schema);
    info!(program = %program.display(), ?args, "Starting loader");

    let watching = settings.loader_prompt.is_some();
    let output = || if watching { Stdio::piped() } else { Stdio::inherit() };
    let mut child = Command::new(&program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(output())
        .stderr(output())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| start_error(e.into()))?;
    let mut state = LoaderState::Spawned;
    debug!(pid = ?child.id(), ?state, "Loader spawned");

    let prompt_seen = Arc::new(Notify::new());
    let forwarders = match &settings.loader_prompt {
        Some(marker) => spawn_forwarders(&mut child, marker, &prompt_seen),
        None => Vec::new(),
    };

    let mut stdin = child.stdin.take().ok_or_else(|| RestoreError::LoaderIo {
        source: std::io::Error::other("loader stdin was not captured"),
    })?;

    let mut answered = false;
    let supervised = supervise(
        &mut child,
        &mut stdin,
        &settings.loader_answer,
        watching.then_some(prompt_seen.as_ref()),
        &mut state,
        &mut answered,
    );
    let finished = match settings.timeout {
        Some(limit) => tokio::time::timeout(limit, supervised).await.ok(),
        None => Some(supervised.await),
    };

    let status = match finished {
        Some(result) => result.map_err(|source| RestoreError::LoaderIo { source })?,
        None => {
            state = LoaderState::TimedOut;
            warn!(?state, "Loader exceeded its time limit, killing it");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill loader");
            }
            for handle in forwarders {
                handle.abort();
            }
            return Err(RestoreError::LoaderTimedOut {
                after: settings.timeout.unwrap_or_default(),
            });
        }
    };
    drop(stdin);
    for handle in forwarders {
        let _ = handle.await;
    }

    state = LoaderState::Exited;
    info!(?state, %status, answered, "Loader finished");
    Ok(LoaderRun { status, answered })
}

async fn supervise(
    child: &mut Child,
    stdin: &mut ChildStdin,
    answer: &str,
    prompt_seen: Option<&Notify>,
    state: &mut LoaderState,
    answered: &mut bool,
) -> std::io::Result<ExitStatus> {
    if let Some(prompt_seen) = prompt_seen {
        *state = LoaderState::AwaitingPrompt;
        debug!(?state, "Waiting for loader prompt");
        tokio::select! {
            _ = prompt_seen.notified() => {}
            status = child.wait() => {
                warn!("Loader exited before showing its prompt");
                return status;
            }
        }
    }

    let line = format!("{}\n", answer);
    match write_answer(stdin, &line).await {
        Ok(()) => {
            *answered = true;
            *state = LoaderState::Answered;
            debug!(?state, "Answered loader prompt");
        }
        Err(e) => warn!(error = %e, "Failed to answer loader"),
    }

    child.wait().await
}

async fn write_answer(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await
}

fn spawn_forwarders(child: &mut Child, marker: &str, prompt_seen: &Arc<Notify>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        handles.push(tokio::spawn(forward_output(
            stdout,
            tokio::io::stdout(),
            marker.to_string(),
            prompt_seen.clone(),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(tokio::spawn(forward_output(
            stderr,
            tokio::io::stderr(),
            marker.to_string(),
            prompt_seen.clone(),
        )));
    }
    handles
}

/// Copies `reader` to `writer` and signals `prompt_seen` the first time
/// `marker` passes through. The marker may straddle read boundaries.
async fn forward_output<R, W>(mut reader: R, mut writer: W, marker: String, prompt_seen: Arc<Notify>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 4096];
    let mut window: Vec<u8> = Vec::new();
    let mut seen = false;
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "Loader output closed");
                break;
            }
        };
        let chunk = &buf[..n];
        if writer.write_all(chunk).await.is_err() || writer.flush().await.is_err() {
            break;
        }

        if !seen {
            window.extend_from_slice(chunk);
            if contains(&window, marker.as_bytes()) {
                seen = true;
                prompt_seen.notify_one();
            } else {
                let keep = marker.len().saturating_sub(1);
                if window.len() > keep {
                    window.drain(..window.len() - keep);
                }
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
