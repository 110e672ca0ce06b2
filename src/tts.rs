use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("no speech engine found (install {0})")]
    NotInstalled(&'static str),
    #[error("failed to start {engine}: {source}")]
    Spawn {
        engine: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A running read-aloud process. Dropping it does not stop playback.
pub struct Utterance {
    child: Arc<Mutex<Child>>,
}

impl Utterance {
    /// Kill the engine. The finish callback still fires once.
    pub fn stop(&self) {
        if let Ok(mut child) = self.child.lock() {
            if let Err(e) = child.kill() {
                log::debug!("Speech engine already exited: {e}");
            }
        }
    }
}

/// Candidate engines for this platform, tried in order.
/// Each speaks text read from stdin at `rate` words per minute.
fn engines(rate: u32) -> Vec<(&'static str, Vec<String>)> {
    #[cfg(target_os = "macos")]
    return vec![("say", vec!["-r".into(), rate.to_string(), "-f".into(), "-".into()])];

    #[cfg(not(target_os = "macos"))]
    ["espeak-ng", "espeak"]
        .into_iter()
        .map(|cmd| (cmd, vec!["-s".to_string(), rate.to_string()]))
        .collect()
}

/// Speak `text` with the local engine on a background thread.
/// `on_finished` runs on that thread once the engine exits or is stopped.
pub fn speak<F>(text: &str, rate: u32, on_finished: F) -> Result<Utterance, TtsError>
where
    F: FnOnce() + Send + 'static,
{
    let (engine, mut child) = spawn_engine(rate)?;
    log::info!("Speaking {} chars with {engine}", text.len());

    let stdin = child.stdin.take();
    let child = Arc::new(Mutex::new(child));
    let watched = child.clone();
    let text = strip_markup(text);

    let spawned = std::thread::Builder::new()
        .name("tts-wait".into())
        .spawn(move || {
            if let Some(stdin) = stdin {
                feed(stdin, &text);
            }
            wait_for_exit(&watched);
            on_finished();
        });

    if let Err(e) = spawned {
        log::error!("Failed to spawn tts thread: {e}");
        if let Ok(mut c) = child.lock() {
            let _ = c.kill();
        }
        return Err(TtsError::Spawn {
            engine,
            source: e,
        });
    }

    Ok(Utterance { child })
}

fn spawn_engine(rate: u32) -> Result<(&'static str, Child), TtsError> {
    let candidates = engines(rate);
    let names = candidates
        .first()
        .map(|(name, _)| *name)
        .unwrap_or("a speech engine");

    for (cmd, args) in candidates {
        let spawned = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => return Ok((cmd, child)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(TtsError::Spawn { engine: cmd, source }),
        }
    }
    Err(TtsError::NotInstalled(names))
}

fn feed(mut stdin: ChildStdin, text: &str) {
    // A broken pipe here means the engine was stopped early.
    if let Err(e) = stdin.write_all(text.as_bytes()) {
        log::debug!("Speech input cut short: {e}");
    }
}

fn wait_for_exit(child: &Mutex<Child>) {
    loop {
        match child.lock() {
            Ok(mut c) => match c.try_wait() {
                Ok(None) => {}
                Ok(Some(status)) => {
                    log::info!("Speech engine exited: {status}");
                    return;
                }
                Err(e) => {
                    log::warn!("Lost track of speech engine: {e}");
                    return;
                }
            },
            Err(_) => return,
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Remove `<...>` tags so markup is not read aloud. An unclosed `<` is kept.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_removed() {
        assert_eq!(strip_markup("a<br>b <b>bold</b>"), "ab bold");
        assert_eq!(strip_markup("no tags"), "no tags");
    }

    #[test]
    fn unclosed_angle_bracket_is_kept() {
        assert_eq!(strip_markup("x < y and <i>z"), "x z");
        assert_eq!(strip_markup("a > b < c"), "a > b < c");
    }

    #[test]
    fn engine_commands_carry_rate() {
        let candidates = engines(150);
        assert!(!candidates.is_empty());
        for (_, args) in candidates {
            assert!(args.contains(&"150".to_string()));
        }
    }
}
