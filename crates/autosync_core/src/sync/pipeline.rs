//! Marker extraction pipeline.
//!
//! Two ffmpeg processes connected through an in-process pipe:
//!
//! ```text
//! producer (decode, trim, mono, 8kHz, s16le) --stdout--> [transfer thread] --stdin--> consumer (analysis)
//! ```
//!
//! The consumer runs `silencedetect`, `astats` and `ametadata` and writes only
//! text. Every pipe end is serviced by its own thread so that no process can
//! stall on a full pipe while another end is not being read.

use std::io::{self, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;

use super::types::{TrackSelector, ANALYSIS_SAMPLE_RATE};

/// Buffer size for the producer -> consumer transfer.
pub const PIPE_BUFFER_SIZE: usize = 1024 * 1024;

/// Filter graph applied by the consumer.
///
/// silencedetect at -35dB for at least 0.3s, per-frame astats with reset, and
/// the overall RMS level printed with its pts_time to stdout.
pub const ANALYSIS_FILTER_GRAPH: &str = "silencedetect=noise=-35dB:d=0.3,\
astats=metadata=1:reset=1,\
ametadata=print:key=lavfi.astats.Overall.RMS_level:file=-";

/// Combined text output of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Consumer stdout followed by consumer stderr.
    ///
    /// Process errors are folded in as a `Pipe error:` line, so non-empty text
    /// does not imply the analysis ran.
    pub text: String,
    /// Spawn or I/O error hit while running, for logging.
    pub process_error: Option<String>,
}

impl PipelineOutput {
    fn failed(message: String) -> Self {
        Self {
            text: format!("Pipe error: {}", message),
            process_error: Some(message),
        }
    }

    /// Check if the pipeline produced no text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Build the producer command: decode one audio stream to raw 8kHz mono PCM.
pub fn producer_command(
    ffmpeg: &Path,
    input: &Path,
    track: TrackSelector,
    window_secs: u32,
) -> Command {
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-nostdin", "-hide_banner", "-hwaccel", "auto", "-threads", "0"])
        .arg("-i")
        .arg(input);

    match track {
        TrackSelector::Explicit(id) => {
            cmd.arg("-map").arg(format!("0:{}", id));
        }
        TrackSelector::BestAvailable => {
            cmd.arg("-vn");
        }
    }

    cmd.arg("-t")
        .arg(window_secs.to_string())
        .args(["-ac", "1"])
        .arg("-ar")
        .arg(ANALYSIS_SAMPLE_RATE.to_string())
        .args(["-f", "s16le", "-"]);
    cmd
}

/// Build the consumer command: analyze raw PCM from stdin, emit text only.
pub fn consumer_command(ffmpeg: &Path) -> Command {
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-nostdin", "-hide_banner", "-threads", "0"])
        .args(["-f", "s16le"])
        .arg("-ar")
        .arg(ANALYSIS_SAMPLE_RATE.to_string())
        .args(["-ac", "1", "-i", "-"])
        .arg("-af")
        .arg(ANALYSIS_FILTER_GRAPH)
        .args(["-f", "null", "-"]);
    cmd
}

/// Run the full extraction/analysis pipeline for one input stream.
pub fn extract_analysis_text(
    ffmpeg: &Path,
    input: &Path,
    track: TrackSelector,
    window_secs: u32,
) -> PipelineOutput {
    run_piped(
        producer_command(ffmpeg, input, track, window_secs),
        consumer_command(ffmpeg),
    )
}

/// Run two processes with the producer's stdout feeding the consumer's stdin.
///
/// Never fails: errors are folded into the returned text. Both children are
/// waited for before returning.
pub fn run_piped(producer: Command, consumer: Command) -> PipelineOutput {
    match run_piped_inner(producer, consumer) {
        Ok(text) => PipelineOutput {
            text,
            process_error: None,
        },
        Err(e) => {
            tracing::debug!("Pipeline failed: {}", e);
            PipelineOutput::failed(e.to_string())
        }
    }
}

fn run_piped_inner(mut producer: Command, mut consumer: Command) -> io::Result<String> {
    producer
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    consumer
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("Running producer: {:?}", producer);
    let mut producer = ChildGuard::new("producer", producer.spawn()?);
    tracing::debug!("Running consumer: {:?}", consumer);
    let mut consumer = ChildGuard::new("consumer", consumer.spawn()?);

    let producer_stdout = take_pipe(producer.child.stdout.take(), "producer stdout")?;
    let producer_stderr = take_pipe(producer.child.stderr.take(), "producer stderr")?;
    let consumer_stdin = take_pipe(consumer.child.stdin.take(), "consumer stdin")?;
    let consumer_stdout = take_pipe(consumer.child.stdout.take(), "consumer stdout")?;
    let consumer_stderr = take_pipe(consumer.child.stderr.take(), "consumer stderr")?;

    let (stdout_bytes, stderr_bytes) = service_pipes(
        producer_stdout,
        producer_stderr,
        consumer_stdin,
        consumer_stdout,
        consumer_stderr,
    )?;

    let producer_status = producer.wait()?;
    let consumer_status = consumer.wait()?;
    tracing::debug!(
        "Pipeline finished (producer: {}, consumer: {}, {} + {} bytes)",
        producer_status,
        consumer_status,
        stdout_bytes.len(),
        stderr_bytes.len()
    );

    let mut text = String::from_utf8_lossy(&stdout_bytes).into_owned();
    text.push_str(&String::from_utf8_lossy(&stderr_bytes));
    Ok(text)
}

/// Move bytes between the pipe ends until both processes close them.
///
/// Returns consumer stdout and consumer stderr.
fn service_pipes(
    producer_stdout: ChildStdout,
    mut producer_stderr: ChildStderr,
    mut consumer_stdin: ChildStdin,
    mut consumer_stdout: ChildStdout,
    mut consumer_stderr: ChildStderr,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    thread::scope(|s| {
        let transfer = s.spawn(move || {
            let mut reader = BufReader::with_capacity(PIPE_BUFFER_SIZE, producer_stdout);
            let copied = io::copy(&mut reader, &mut consumer_stdin);
            // Closing stdin is the consumer's end-of-stream
            drop(consumer_stdin);
            copied
        });

        let drain = s.spawn(move || io::copy(&mut producer_stderr, &mut io::sink()));

        let capture = s.spawn(move || {
            let mut buf = Vec::new();
            consumer_stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let mut stderr_bytes = Vec::new();
        let stderr_read = consumer_stderr.read_to_end(&mut stderr_bytes);

        // A broken pipe here only means the consumer stopped reading early.
        match join_helper(transfer.join(), "transfer") {
            Ok(bytes) => tracing::trace!("Transferred {} bytes of PCM", bytes),
            Err(e) => tracing::debug!("Transfer ended early: {}", e),
        }
        if let Err(e) = join_helper(drain.join(), "producer stderr drain") {
            tracing::debug!("Producer stderr drain failed: {}", e);
        }
        let stdout_bytes = join_helper(capture.join(), "consumer stdout capture")?;
        stderr_read?;

        Ok((stdout_bytes, stderr_bytes))
    })
}

fn join_helper<T>(joined: thread::Result<io::Result<T>>, name: &str) -> io::Result<T> {
    joined.unwrap_or_else(|_| Err(io::Error::other(format!("{} thread panicked", name))))
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> io::Result<T> {
    pipe.ok_or_else(|| {
        io::Error::new(io::ErrorKind::BrokenPipe, format!("Failed to capture {}", name))
    })
}

/// Owns a child process and reaps it on every exit path.
struct ChildGuard {
    name: &'static str,
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(name: &'static str, child: Child) -> Self {
        Self {
            name,
            child,
            reaped: false,
        }
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!("Killing {} process {}", self.name, self.child.id());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn producer_maps_explicit_track() {
        let cmd = producer_command(
            Path::new("ffmpeg"),
            Path::new("/media/source.mkv"),
            TrackSelector::Explicit(2),
            300,
        );
        let args = args_of(&cmd).join(" ");
        assert!(args.starts_with("-nostdin -hide_banner"));
        assert!(args.contains("-i /media/source.mkv -map 0:2 -t 300 -ac 1 -ar 8000 -f s16le -"));
        assert!(!args.contains("-vn"));
    }

    #[test]
    fn producer_drops_video_for_best_available() {
        let cmd = producer_command(
            Path::new("ffmpeg"),
            Path::new("lang.mkv"),
            TrackSelector::BestAvailable,
            120,
        );
        let args = args_of(&cmd);
        assert!(args.contains(&"-vn".to_string()));
        assert!(!args.contains(&"-map".to_string()));
        assert!(args.join(" ").contains("-t 120"));
    }

    #[test]
    fn consumer_reads_stdin_and_writes_no_media() {
        let cmd = consumer_command(Path::new("ffmpeg"));
        let args = args_of(&cmd);
        let joined = args.join(" ");
        assert!(joined.contains("-f s16le -ar 8000 -ac 1 -i -"));
        assert!(joined.ends_with("-f null -"));
        // Filter graph is passed as a single argument
        assert!(args.contains(&ANALYSIS_FILTER_GRAPH.to_string()));
        assert!(ANALYSIS_FILTER_GRAPH.starts_with("silencedetect=noise=-35dB:d=0.3,astats="));
    }

    #[test]
    fn spawn_failure_is_folded_into_text() {
        let output = run_piped(
            Command::new("/nonexistent/autosync-producer"),
            Command::new("/nonexistent/autosync-consumer"),
        );
        assert!(output.text.starts_with("Pipe error:"));
        assert!(output.process_error.is_some());
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[cfg(unix)]
    #[test]
    fn producer_output_reaches_consumer() {
        let output = run_piped(sh("printf 'silence_start: 1.5\\n'"), sh("cat"));
        assert_eq!(output.text, "silence_start: 1.5\n");
        assert!(output.process_error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn consumer_stderr_follows_stdout() {
        let output = run_piped(sh("printf data"), sh("cat; printf ' err' >&2"));
        assert_eq!(output.text, "data err");
    }

    #[cfg(unix)]
    #[test]
    fn large_streams_do_not_deadlock() {
        // Producer floods stderr before writing stdout; consumer counts bytes.
        let output = run_piped(
            sh("head -c 300000 /dev/zero >&2; head -c 3000000 /dev/zero"),
            sh("wc -c"),
        );
        assert_eq!(output.text.trim(), "3000000");
    }

    #[cfg(unix)]
    #[test]
    fn silent_processes_produce_empty_output() {
        let output = run_piped(sh("exit 1"), sh("cat >/dev/null; exit 1"));
        assert!(output.is_empty());
        assert!(output.process_error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn consumer_spawn_failure_reaps_producer() {
        let output = run_piped(sh("sleep 5"), Command::new("/nonexistent/autosync-consumer"));
        assert!(output.text.starts_with("Pipe error:"));
    }
}
