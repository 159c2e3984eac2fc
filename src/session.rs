//! Interactive control session against a single player.
//!
//! One line of input at a time is interpreted against an explicit state
//! machine. Remote failures are reported inline and the loop continues;
//! only quit, end-of-input, or Ctrl+C at the prompt ends the session.

use std::io::Write as _;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::control::ControlClient;
use crate::protocol::{EpisodeRequest, PlaybackStatus};

/// Built-in test episode: a short beep, enough to confirm the audio path.
const TEST_EPISODE_URL: &str = "https://www.soundjay.com/misc/beep-07a.wav";

const HELP: &str = "Commands:
  s, status      show playback status
  p, pause       toggle pause/resume
  stop           stop playback
  +N / -N        skip forward/backward N seconds (e.g. +15, -30)
  vol [0-100]    set volume percent
  play           play a short test episode
  play-url       play an episode from a URL
  beam URL       play an audio URL directly
  info           show player information
  monitor        live status until Ctrl+C
  q, quit        leave the session";

/// Where the session currently is. `Idle` is terminal and reached only on
/// quit, end-of-input, or a top-level interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingCommand,
    Executing,
    Monitoring,
}

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    PauseToggle,
    Stop,
    Skip(i64),
    Volume(i64),
    PlayTest,
    PlayUrl,
    Beam(String),
    Info,
    Monitor,
    Quit,
}

impl Command {
    /// Parses a non-empty line. The command token is matched
    /// case-insensitively; everything after it is preserved verbatim, so
    /// beamed URLs keep their case.
    pub fn parse(line: &str) -> Result<Command, String> {
        let trimmed = line.trim();
        let (token_raw, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (trimmed, ""),
        };
        let token = token_raw.to_ascii_lowercase();

        match token.as_str() {
            "q" | "quit" => Ok(Command::Quit),
            "s" | "status" => Ok(Command::Status),
            "p" | "pause" => Ok(Command::PauseToggle),
            "stop" => Ok(Command::Stop),
            "play" => Ok(Command::PlayTest),
            "play-url" => Ok(Command::PlayUrl),
            "info" => Ok(Command::Info),
            "monitor" => Ok(Command::Monitor),
            "vol" => rest
                .parse::<i64>()
                .map(Command::Volume)
                .map_err(|_| "invalid volume, use 'vol [0-100]'".to_string()),
            "beam" => {
                if rest.is_empty() {
                    Err("usage: beam URL".to_string())
                } else {
                    Ok(Command::Beam(rest.to_string()))
                }
            }
            t if t.starts_with('+') || t.starts_with('-') => t
                .parse::<i64>()
                .map(Command::Skip)
                .map_err(|_| format!("unknown command '{token_raw}', type 'q' to quit")),
            _ => Err(format!("unknown command '{token_raw}', type 'q' to quit")),
        }
    }
}

/// Clamps a user-supplied percentage into the player's 0.0..=1.0 range.
fn percent_to_volume(percent: i64) -> f32 {
    percent.clamp(0, 100) as f32 / 100.0
}

/// `HH:MM:SS` above an hour, `MM:SS` below.
pub fn format_duration(total_secs: i64) -> String {
    let total = total_secs.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

pub fn render_status(status: &PlaybackStatus) -> String {
    let mut out = format!(
        "state: {}\nposition: {} / {}\nvolume: {}%",
        if status.is_playing {
            "Playing"
        } else {
            "Paused/Stopped"
        },
        format_duration(status.position),
        format_duration(status.duration),
        (status.volume * 100.0).round() as i64,
    );
    if let Some(episode) = &status.current_episode {
        out.push_str(&format!(
            "\nepisode: {}\npodcast: {}",
            episode.episode_title, episode.podcast_name
        ));
    }
    out
}

async fn read_trimmed_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(
            line.trim_end_matches(|c| c == '\r' || c == '\n')
                .to_string(),
        ),
        Err(e) => {
            warn!("input read failed: {e}");
            None
        }
    }
}

async fn prompt<R: AsyncBufRead + Unpin>(reader: &mut R, text: &str) -> Option<String> {
    print!("{text}");
    let _ = std::io::stdout().flush();
    read_trimmed_line(reader).await
}

/// Drives one interactive session. Generic over the input source so tests
/// can script it.
pub struct SessionController<R> {
    client: ControlClient,
    input: R,
    monitor_interval: Duration,
    state: SessionState,
}

impl<R: AsyncBufRead + Unpin> SessionController<R> {
    pub fn new(client: ControlClient, input: R, monitor_interval: Duration) -> Self {
        Self {
            client,
            input,
            monitor_interval,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Top-level read-eval loop. Returns on quit, end-of-input, or Ctrl+C
    /// at the prompt.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("{HELP}\n");
        loop {
            self.state = SessionState::AwaitingCommand;
            print!("> ");
            let _ = std::io::stdout().flush();

            let line = tokio::select! {
                line = read_trimmed_line(&mut self.input) => line,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    None
                }
            };
            let Some(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command).await;
        }
        self.state = SessionState::Idle;
        println!("Session closed.");
        Ok(())
    }

    /// Executes one command. `Monitor` enters the monitoring sub-loop
    /// directly; everything else passes through `Executing` and returns to
    /// `AwaitingCommand` whether it succeeded or not.
    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::Monitor => {
                let cancel = CancellationToken::new();
                self.monitor(&cancel).await;
            }
            Command::Quit => {}
            other => {
                self.state = SessionState::Executing;
                self.dispatch(other).await;
                self.state = SessionState::AwaitingCommand;
            }
        }
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Status => self.show_status().await,
            Command::PauseToggle => self.toggle().await,
            Command::Stop => match self.client.stop().await {
                Ok(()) => println!("Stopped"),
                Err(e) => println!("Failed to stop: {e}"),
            },
            Command::Skip(seconds) => match self.client.skip(seconds).await {
                Ok(()) if seconds >= 0 => println!("Skipped forward {seconds}s"),
                Ok(()) => println!("Skipped backward {}s", seconds.abs()),
                Err(e) => println!("Failed to skip: {e}"),
            },
            Command::Volume(percent) => {
                let volume = percent_to_volume(percent);
                match self.client.set_volume(volume).await {
                    Ok(()) => println!("Volume set to {}%", (volume * 100.0).round() as i64),
                    Err(e) => println!("Failed to set volume: {e}"),
                }
            }
            Command::PlayTest => {
                let episode = EpisodeRequest {
                    episode_id: None,
                    episode_url: TEST_EPISODE_URL.to_string(),
                    episode_title: "Test Episode".to_string(),
                    podcast_name: "Test Podcast".to_string(),
                    episode_duration: Some(60),
                    episode_artwork: None,
                    start_position: None,
                };
                match self.client.play(&episode).await {
                    Ok(()) => println!("Playing test episode"),
                    Err(e) => println!("Failed to play test episode: {e}"),
                }
            }
            Command::PlayUrl => self.play_url().await,
            Command::Beam(url) => {
                let episode = EpisodeRequest {
                    episode_id: None,
                    episode_url: url.clone(),
                    episode_title: "Beamed Audio".to_string(),
                    podcast_name: "Direct URL".to_string(),
                    episode_duration: Some(3600),
                    episode_artwork: None,
                    start_position: None,
                };
                match self.client.play(&episode).await {
                    Ok(()) => println!("Beaming audio from {url}"),
                    Err(e) => println!("Failed to beam audio: {e}"),
                }
            }
            Command::Info => match self.client.info().await {
                Ok(player) => {
                    println!("name: {}", player.name);
                    println!("version: {}", player.version);
                    println!(
                        "server: {}",
                        player.server_url.as_deref().unwrap_or("none")
                    );
                }
                Err(e) => println!("Failed to get player info: {e}"),
            },
            // Handled in execute.
            Command::Monitor | Command::Quit => {}
        }
    }

    /// Status-first pause/resume toggle: queries live state and issues the
    /// complementary command, resuming iff the player was not playing. One
    /// extra round trip per toggle buys freedom from state drift. When the
    /// status query fails, neither command is issued.
    async fn toggle(&mut self) {
        match self.client.status().await {
            Ok(status) if status.is_playing => match self.client.pause().await {
                Ok(()) => println!("Paused"),
                Err(e) => println!("Failed to pause: {e}"),
            },
            Ok(_) => match self.client.resume().await {
                Ok(()) => println!("Resumed"),
                Err(e) => println!("Failed to resume: {e}"),
            },
            Err(e) => println!("Could not determine playback state, leaving it untouched: {e}"),
        }
    }

    /// Blocking monitoring sub-loop: renders status on a fixed interval
    /// until Ctrl+C or cancellation, then returns to the prompt. Never
    /// exits the session.
    pub async fn monitor(&mut self, cancel: &CancellationToken) {
        self.state = SessionState::Monitoring;
        println!(
            "Live status every {}s, Ctrl+C to stop",
            self.monitor_interval.as_secs_f64()
        );
        loop {
            self.show_status().await;
            tokio::select! {
                _ = tokio::time::sleep(self.monitor_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    println!("Monitoring stopped");
                    break;
                }
                _ = cancel.cancelled() => {
                    println!("Monitoring stopped");
                    break;
                }
            }
        }
        self.state = SessionState::AwaitingCommand;
    }

    async fn show_status(&self) {
        match self.client.status().await {
            Ok(status) => println!("{}", render_status(&status)),
            Err(e) => println!("Failed to get status: {e}"),
        }
    }

    async fn play_url(&mut self) {
        let Some(url) = prompt(&mut self.input, "Episode URL: ").await else {
            return;
        };
        let url = url.trim().to_string();
        if url.is_empty() {
            println!("A URL is required");
            return;
        }

        let title = prompt(&mut self.input, "Episode title (optional): ")
            .await
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Custom Episode".to_string());
        let podcast = prompt(&mut self.input, "Podcast name (optional): ")
            .await
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Custom Podcast".to_string());

        let episode = EpisodeRequest {
            episode_id: None,
            episode_url: url,
            episode_title: title.clone(),
            podcast_name: podcast,
            episode_duration: Some(3600),
            episode_artwork: None,
            start_position: None,
        };
        match self.client.play(&episode).await {
            Ok(()) => println!("Playing '{title}'"),
            Err(e) => println!("Failed to play episode: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CurrentEpisode;

    #[test]
    fn aliases_parse() {
        assert_eq!(Command::parse("s").unwrap(), Command::Status);
        assert_eq!(Command::parse("status").unwrap(), Command::Status);
        assert_eq!(Command::parse("p").unwrap(), Command::PauseToggle);
        assert_eq!(Command::parse("PAUSE").unwrap(), Command::PauseToggle);
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn skip_tokens_keep_their_sign() {
        assert_eq!(Command::parse("+15").unwrap(), Command::Skip(15));
        assert_eq!(Command::parse("-30").unwrap(), Command::Skip(-30));
        assert_eq!(Command::parse("+5").unwrap(), Command::Skip(5));
        assert_eq!(Command::parse("-300").unwrap(), Command::Skip(-300));
    }

    #[test]
    fn bare_sign_is_rejected() {
        assert!(Command::parse("+").is_err());
        assert!(Command::parse("-abc").is_err());
    }

    #[test]
    fn volume_requires_a_number() {
        assert_eq!(Command::parse("vol 75").unwrap(), Command::Volume(75));
        assert_eq!(Command::parse("vol -10").unwrap(), Command::Volume(-10));
        assert!(Command::parse("vol").is_err());
        assert!(Command::parse("vol loud").is_err());
    }

    #[test]
    fn beam_preserves_url_case_and_requires_argument() {
        assert_eq!(
            Command::parse("BEAM http://Host/Path.MP3").unwrap(),
            Command::Beam("http://Host/Path.MP3".to_string())
        );
        assert!(Command::parse("beam").is_err());
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn percent_clamps_into_unit_range() {
        assert_eq!(percent_to_volume(150), 1.0);
        assert_eq!(percent_to_volume(-10), 0.0);
        assert_eq!(percent_to_volume(75), 0.75);
        assert_eq!(percent_to_volume(0), 0.0);
        assert_eq!(percent_to_volume(100), 1.0);
    }

    #[test]
    fn durations_format_like_a_clock() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "01:00:00");
        assert_eq!(format_duration(7325), "02:02:05");
        assert_eq!(format_duration(-5), "00:00");
    }

    #[test]
    fn status_rendering_includes_episode_when_present() {
        let mut status = PlaybackStatus {
            is_playing: true,
            position: 65,
            duration: 3600,
            volume: 0.8,
            current_episode: None,
        };
        let rendered = render_status(&status);
        assert!(rendered.contains("Playing"));
        assert!(rendered.contains("01:05 / 01:00:00"));
        assert!(rendered.contains("80%"));
        assert!(!rendered.contains("episode:"));

        status.current_episode = Some(CurrentEpisode {
            episode_id: None,
            episode_title: "Episode Seven".to_string(),
            podcast_name: "Some Show".to_string(),
            episode_artwork: None,
            duration: 3600,
        });
        let rendered = render_status(&status);
        assert!(rendered.contains("episode: Episode Seven"));
        assert!(rendered.contains("podcast: Some Show"));
    }
}
