//! Drives one replay: the load, user commands and playback ticks all go through a single loop, so
//! nothing needs locking and every frame reflects the mutation that produced it.

use std::{
    future::{pending, Future},
    io::BufRead,
    pin::Pin,
    thread,
};

use anyhow::Result;
use strum::{Display, EnumString};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{sleep_until, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    config::DisplayConfig,
    replay::{Pacing, ReplayController},
    sink::{Frame, Sink},
    store::LoadError,
    trajectory::Sample,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    Play,
    Pause,
    Reset,
    /// Fetch the samples again
    Reload,
    Quit,
}

pub struct Session {
    replay: ReplayController,
    display: DisplayConfig,
    autoplay: bool,
}

impl Session {
    pub fn new(pacing: Pacing, display: DisplayConfig, autoplay: bool) -> Self {
        Self {
            replay: ReplayController::new(pacing),
            display,
            autoplay,
        }
    }

    pub fn replay(&self) -> &ReplayController {
        &self.replay
    }

    pub fn frame(&self) -> Frame {
        Frame::new(&self.replay, &self.display)
    }

    /// Runs until `quit`, or until the command stream is closed and nothing is playing or loading.
    ///
    /// `load` is called once at startup and again on every `reload`.
    pub async fn run<F, L, S>(
        &mut self,
        mut load: F,
        mut commands: UnboundedReceiver<Command>,
        sink: &mut S,
    ) -> Result<()>
    where
        F: FnMut() -> L,
        L: Future<Output = Result<Vec<Sample>, LoadError>>,
        S: Sink + ?Sized,
    {
        sink.render(&self.frame())?;

        let mut loading: Option<Pin<Box<L>>> = Some(Box::pin(load()));
        let mut commands_open = true;
        loop {
            if !commands_open && loading.is_none() && !self.replay.is_playing() {
                debug!("No more commands and nothing playing");
                break;
            }

            let deadline = self.replay.next_tick();
            // Commands win over a tick that is due at the same time, so a pause always lands first
            let changed = tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(Command::Quit) => break,
                    Some(Command::Reload) => {
                        info!("Reloading samples");
                        loading = Some(Box::pin(load()));
                        false
                    }
                    Some(command) => self.apply(command),
                    None => {
                        commands_open = false;
                        false
                    }
                },
                result = wait_for_load(&mut loading) => {
                    loading = None;
                    self.finish_load(result)
                }
                _ = wait_until(deadline) => {
                    let changed = self.replay.tick();
                    debug!(cursor = self.replay.cursor(), "tick");
                    changed
                }
            };

            if changed {
                sink.render(&self.frame())?;
            }
        }

        Ok(())
    }

    fn apply(&mut self, command: Command) -> bool {
        let changed = match command {
            Command::Play => self.replay.play(),
            Command::Pause => self.replay.pause(),
            Command::Reset => self.replay.reset(),
            Command::Reload | Command::Quit => false,
        };
        debug!(%command, changed, state = ?self.replay.state(), "applied command");
        changed
    }

    fn finish_load(&mut self, result: Result<Vec<Sample>, LoadError>) -> bool {
        match result {
            Ok(samples) => {
                info!(samples = samples.len(), "Loaded trajectory");
                if !self.replay.on_load(samples) {
                    return false;
                }
                if self.autoplay {
                    self.replay.play();
                }
                true
            }
            Err(e) => {
                error!("Error loading route data: {e}");
                false
            }
        }
    }
}

async fn wait_for_load<L: Future + ?Sized>(loading: &mut Option<Pin<Box<L>>>) -> L::Output {
    match loading {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Forwards commands, one per line, until the input ends or the receiver goes away.
pub fn read_commands<R: BufRead>(reader: R, tx: &UnboundedSender<Command>) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if tx.send(command).is_err() {
                    break;
                }
            }
            Err(_) => warn!("Unknown command {line:?}, expected play, pause, reset, reload or quit"),
        }
    }
    Ok(())
}

/// Stdin is read on a plain thread; it is left behind when the process exits.
pub fn spawn_stdin_reader() -> UnboundedReceiver<Command> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        if let Err(e) = read_commands(stdin.lock(), &tx) {
            error!("Failed to read commands: {e}");
        }
    });
    rx
}
