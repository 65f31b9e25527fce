//! Engine adapter - UCI over a child process
//!
//! Owns the external engine for the whole session: spawned once at startup,
//! reused across every turn and every game, terminated on drop. The stdout
//! of the process is pumped into a channel by a background thread so every
//! wait on the engine can be bounded with `recv_timeout` - the adapter API
//! itself stays blocking and serial.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::chess::{Move, Position};
use crate::error::{BotError, BotResult};
use crate::orchestrator::MoveSource;

/// Extra wall time allowed beyond a movetime limit before the engine is
/// declared wedged.
const LIMIT_GRACE: Duration = Duration::from_secs(2);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on one search: fixed depth, think time, or both.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub movetime: Option<Duration>,
    /// Hard wall-clock cap for searches that carry no time limit of their
    /// own (a bare depth limit gives no wall-time bound).
    pub hard_cap: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            depth: None,
            movetime: Some(Duration::from_millis(1000)),
            hard_cap: Duration::from_secs(60),
        }
    }
}

impl SearchLimits {
    /// The `go …` command these limits translate to.
    pub fn go_command(&self) -> String {
        let mut cmd = String::from("go");
        if let Some(depth) = self.depth {
            cmd.push_str(&format!(" depth {depth}"));
        }
        if let Some(movetime) = self.movetime {
            cmd.push_str(&format!(" movetime {}", movetime.as_millis()));
        }
        if self.depth.is_none() && self.movetime.is_none() {
            cmd.push_str(&format!(" movetime {}", Duration::from_millis(1000).as_millis()));
        }
        cmd
    }

    /// How long to wait for `bestmove` before giving up on the process.
    pub fn deadline(&self) -> Duration {
        match self.movetime {
            Some(movetime) => movetime + LIMIT_GRACE,
            None => self.hard_cap,
        }
    }
}

/// UCI options forwarded to the engine at spawn.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    pub skill_level: Option<u32>,
}

impl EngineOptions {
    fn setoption_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(threads) = self.threads {
            lines.push(format!("setoption name Threads value {threads}"));
        }
        if let Some(hash) = self.hash_mb {
            lines.push(format!("setoption name Hash value {hash}"));
        }
        if let Some(skill) = self.skill_level {
            lines.push(format!("setoption name Skill Level value {skill}"));
        }
        lines
    }
}

/// The engine's answer for one turn; discarded once applied.
#[derive(Debug, Clone)]
pub struct EngineSuggestion {
    pub mv: Move,
    pub score_cp: Option<i32>,
    pub mate_in: Option<i32>,
    pub depth: Option<u32>,
}

/// Handle to the external UCI engine process.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

impl UciEngine {
    /// Start the engine and run the `uci`/`isready` handshake.
    pub fn spawn(path: &Path, options: &EngineOptions) -> BotResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BotError::EngineUnavailable(format!("failed to start {}: {e}", path.display()))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BotError::EngineUnavailable("engine stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BotError::EngineUnavailable("engine stdout not captured".into()))?;

        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name("engine-stdout".into())
            .spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            })?;

        let mut engine = UciEngine {
            child,
            stdin,
            lines: rx,
        };

        engine.send("uci")?;
        let name = engine.wait_for_prefix("uciok", HANDSHAKE_TIMEOUT, |line| {
            line.strip_prefix("id name ").map(str::to_string)
        })?;
        info!(
            "[ENGINE] Started {} ({})",
            path.display(),
            name.as_deref().unwrap_or("unknown engine")
        );

        for line in options.setoption_lines() {
            engine.send(&line)?;
        }
        engine.send("isready")?;
        engine.wait_for_prefix("readyok", HANDSHAKE_TIMEOUT, |_| None::<String>)?;
        Ok(engine)
    }

    fn send(&mut self, command: &str) -> BotResult<()> {
        debug!("[ENGINE] >> {command}");
        writeln!(self.stdin, "{command}")
            .and_then(|_| self.stdin.flush())
            .map_err(|e| BotError::EngineUnavailable(format!("engine stdin closed: {e}")))
    }

    /// Drain engine output until a line starting with `prefix` arrives,
    /// collecting the last value `capture` extracts along the way.
    fn wait_for_prefix<T>(
        &mut self,
        prefix: &str,
        timeout: Duration,
        mut capture: impl FnMut(&str) -> Option<T>,
    ) -> BotResult<Option<T>> {
        let deadline = Instant::now() + timeout;
        let mut captured = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    debug!("[ENGINE] << {line}");
                    if let Some(value) = capture(&line) {
                        captured = Some(value);
                    }
                    if line.starts_with(prefix) {
                        return Ok(captured);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(BotError::EngineUnavailable(format!(
                        "no `{prefix}` from engine within {timeout:?}"
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BotError::EngineUnavailable(
                        "engine process exited mid-search".into(),
                    ));
                }
            }
        }
    }
}

/// Pull score/depth out of a UCI `info` line.
fn parse_info_line(line: &str) -> (Option<i32>, Option<i32>, Option<u32>) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut score_cp = None;
    let mut mate_in = None;
    let mut depth = None;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                depth = tokens.get(i + 1).and_then(|t| t.parse().ok());
                i += 2;
            }
            "score" => match tokens.get(i + 1) {
                Some(&"cp") => {
                    score_cp = tokens.get(i + 2).and_then(|t| t.parse().ok());
                    i += 3;
                }
                Some(&"mate") => {
                    mate_in = tokens.get(i + 2).and_then(|t| t.parse().ok());
                    i += 3;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }
    (score_cp, mate_in, depth)
}

impl MoveSource for UciEngine {
    fn best_move(
        &mut self,
        position: &Position,
        limits: &SearchLimits,
    ) -> BotResult<EngineSuggestion> {
        let moves = position.uci_history();
        let position_cmd = if moves.is_empty() {
            "position startpos".to_string()
        } else {
            format!("position startpos moves {}", moves.join(" "))
        };
        self.send(&position_cmd)?;
        self.send(&limits.go_command())?;

        let started = Instant::now();
        let deadline = started + limits.deadline();
        let mut score_cp = None;
        let mut mate_in = None;
        let mut depth = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    debug!("[ENGINE] << {line}");
                    if line.starts_with("info ") {
                        let (cp, mate, d) = parse_info_line(&line);
                        if cp.is_some() {
                            score_cp = cp;
                        }
                        if mate.is_some() {
                            mate_in = mate;
                        }
                        if d.is_some() {
                            depth = d;
                        }
                    } else if let Some(rest) = line.strip_prefix("bestmove") {
                        let token = rest.split_whitespace().next().unwrap_or("");
                        if token.is_empty() || token == "(none)" {
                            return Err(BotError::EngineUnavailable(
                                "engine returned no move".into(),
                            ));
                        }
                        let mv: Move = token.parse().map_err(|_| {
                            BotError::EngineUnavailable(format!("unparseable bestmove `{token}`"))
                        })?;
                        info!(
                            "[ENGINE] bestmove {mv} score_cp={score_cp:?} mate={mate_in:?} depth={depth:?} elapsed={:?}",
                            started.elapsed()
                        );
                        return Ok(EngineSuggestion {
                            mv,
                            score_cp,
                            mate_in,
                            depth,
                        });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(BotError::EngineUnavailable(format!(
                        "no bestmove within {:?}",
                        limits.deadline()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BotError::EngineUnavailable(
                        "engine process exited mid-search".into(),
                    ));
                }
            }
        }
    }

    fn new_game(&mut self) -> BotResult<()> {
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.wait_for_prefix("readyok", HANDSHAKE_TIMEOUT, |_| None::<String>)?;
        Ok(())
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(_) => break,
            }
        }
        warn!("[ENGINE] Engine did not quit cleanly, killing process");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
