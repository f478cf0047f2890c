use std::sync::Arc;

use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

use neonbot_common::models::{ChatMessage, ControlOp, SettingsKey};
use neonbot_common::traits::api::LyricsProvider;
use neonbot_common::traits::repository_traits::SettingsStore;

use crate::Error;
use crate::karaoke::{DEFAULT_DELAY_SECS, KaraokeControl, KaraokeLauncher, LaunchRequest, validate_delay};

/// Discord rejects messages over 2000 characters; leave room for the fence.
pub const LYRICS_CHUNK_CHARS: usize = 1900;

const INTERNAL_ERROR: &str = "Something went wrong while starting karaoke. Please try again.";

/// A parsed prefix command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Sing { query: String, delay: Option<f64> },
    Pause,
    Resume,
    Stop,
    Lyrics { query: String },
    Ping,
}

/// Lines to send back to the channel the command came from, one message each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandResponse {
    pub texts: Vec<String>,
}

impl CommandResponse {
    fn single(text: impl Into<String>) -> Self {
        Self {
            texts: vec![text.into()],
        }
    }
}

/// Parse `text` as a prefix command.
///
/// `Ok(None)` means "not for us" (no prefix, unknown name). A recognised
/// command with bad arguments is `Err(Error::Validation(usage))`.
pub fn parse_chat_command(prefix: &str, text: &str) -> Result<Option<ChatCommand>, Error> {
    let Some(rest) = text.trim().strip_prefix(prefix) else {
        return Ok(None);
    };
    let mut parts = rest.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match name.to_lowercase().as_str() {
        "sing" | "karaoke" => parse_sing(prefix, &args)?,
        "pause" => ChatCommand::Pause,
        "resume" => ChatCommand::Resume,
        "stop" => ChatCommand::Stop,
        "lyrics" => {
            if args.is_empty() {
                return Err(Error::Validation(format!(
                    "Usage: `{prefix}lyrics <artist - title>`"
                )));
            }
            ChatCommand::Lyrics {
                query: args.join(" "),
            }
        }
        "ping" => ChatCommand::Ping,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn parse_sing(prefix: &str, args: &[&str]) -> Result<ChatCommand, Error> {
    let usage = || Error::Validation(format!("Usage: `{prefix}sing [-d seconds] <artist - title>`"));

    let (delay, rest) = match args {
        [flag, value, rest @ ..] if *flag == "-d" || *flag == "--delay" => {
            let delay: f64 = value.parse().map_err(|_| usage())?;
            (Some(delay), rest)
        }
        [flag] if *flag == "-d" || *flag == "--delay" => return Err(usage()),
        _ => (None, args),
    };
    if rest.is_empty() {
        return Err(usage());
    }
    Ok(ChatCommand::Sing {
        query: rest.join(" "),
        delay,
    })
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// line boundaries where possible.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= max_chars {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= max_chars {
            current.push_str(line);
            current_len = line_len;
        } else {
            // Hard split for a single overlong line.
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Platform-neutral command handling shared by prefix and slash commands.
pub struct CommandService {
    launcher: KaraokeLauncher,
    control: Arc<KaraokeControl>,
    settings: Arc<dyn SettingsStore>,
    lyrics: Arc<dyn LyricsProvider>,
    prefix: String,
}

impl CommandService {
    pub fn new(
        launcher: KaraokeLauncher,
        control: Arc<KaraokeControl>,
        settings: Arc<dyn SettingsStore>,
        lyrics: Arc<dyn LyricsProvider>,
        prefix: &str,
    ) -> Self {
        debug!("Initializing CommandService with prefix '{}'", prefix);
        Self {
            launcher,
            control,
            settings,
            lyrics,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Processes a chat message and returns the replies, if it was a command.
    pub async fn handle_chat_line(&self, msg: &ChatMessage) -> Result<Option<CommandResponse>, Error> {
        if msg.author_is_bot {
            return Ok(None);
        }
        let command = match parse_chat_command(&self.prefix, &msg.content) {
            Ok(Some(c)) => c,
            Ok(None) => return Ok(None),
            Err(Error::Validation(usage)) => return Ok(Some(CommandResponse::single(usage))),
            Err(e) => return Err(e),
        };
        debug!(author = %msg.author_name, channel = %msg.channel_id, "chat command {command:?}");

        let response = match command {
            ChatCommand::Sing { query, delay } => {
                let request = LaunchRequest::new(msg.channel_id, &query)
                    .in_guild(msg.guild_id)
                    .with_delay(delay);
                match self.start_karaoke(request).await {
                    // The control message already announces the song.
                    Ok(_) => CommandResponse::default(),
                    Err(reply) => CommandResponse::single(reply),
                }
            }
            ChatCommand::Pause => CommandResponse::single(self.control(msg.channel_id, ControlOp::Pause).await),
            ChatCommand::Resume => CommandResponse::single(self.control(msg.channel_id, ControlOp::Resume).await),
            ChatCommand::Stop => CommandResponse::single(self.control(msg.channel_id, ControlOp::Stop).await),
            ChatCommand::Lyrics { query } => CommandResponse {
                texts: self.lyrics(&query).await,
            },
            ChatCommand::Ping => CommandResponse::single(self.ping()),
        };
        Ok(Some(response))
    }

    /// Launch karaoke. `Ok` carries a confirmation for the invoker, `Err`
    /// the user-facing reason it did not start.
    pub async fn start_karaoke(&self, request: LaunchRequest) -> Result<String, String> {
        match self.launcher.launch(request).await {
            Ok(session) => Ok(format!(
                "Starting **{}** - {} ({} lines, {}s apart).",
                session.song().title,
                session.song().artist,
                session.lines().iter().filter(|l| !l.trim().is_empty()).count(),
                session.delay().as_secs_f64(),
            )),
            Err(e) if e.is_user_facing() => Err(e.to_string()),
            Err(e) => {
                error!("karaoke launch failed: {e}");
                Err(INTERNAL_ERROR.to_string())
            }
        }
    }

    pub async fn control(&self, channel_id: Id<ChannelMarker>, op: ControlOp) -> String {
        self.control.apply(channel_id, op).await.reply()
    }

    pub async fn set_default_delay(
        &self,
        guild_id: Option<Id<GuildMarker>>,
        channel_id: Id<ChannelMarker>,
        delay_secs: f64,
    ) -> String {
        let key = SettingsKey::for_location(guild_id, channel_id);
        let delay_secs = match validate_delay(delay_secs) {
            Ok(d) => d,
            Err(e) => return e.to_string(),
        };
        match self.settings.set_default_delay(key, delay_secs).await {
            Ok(()) => {
                info!(%key, delay_secs, "default karaoke delay updated");
                format!("Default karaoke delay set to {delay_secs}s.")
            }
            Err(e) if e.is_user_facing() => e.to_string(),
            Err(e) => {
                error!(%key, "could not save default delay: {e}");
                "Could not save the setting. Please try again.".to_string()
            }
        }
    }

    pub async fn get_default_delay(
        &self,
        guild_id: Option<Id<GuildMarker>>,
        channel_id: Id<ChannelMarker>,
    ) -> String {
        let key = SettingsKey::for_location(guild_id, channel_id);
        match self.settings.get_default_delay(key).await {
            Ok(Some(delay)) => format!("Default karaoke delay is {delay}s."),
            Ok(None) => format!("No default set; karaoke uses {DEFAULT_DELAY_SECS}s."),
            Err(e) => {
                warn!(%key, "could not read default delay: {e}");
                format!("Could not read the setting; karaoke uses {DEFAULT_DELAY_SECS}s.")
            }
        }
    }

    /// Full lyrics as a header message followed by fenced chunks.
    pub async fn lyrics(&self, query: &str) -> Vec<String> {
        let song = match self.lyrics.fetch(query).await {
            Ok(Some(song)) if !song.is_blank() => song,
            Ok(_) => return vec![format!("Could not find lyrics for **{query}**.")],
            Err(e) => {
                warn!(query, "lyrics lookup failed: {e}");
                return vec![format!("Could not find lyrics for **{query}**.")];
            }
        };

        let mut texts = vec![format!(
            "\u{1F4DC} **{}** - {} (via {})",
            song.title, song.artist, song.source
        )];
        texts.extend(
            chunk_text(&song.full_text, LYRICS_CHUNK_CHARS)
                .into_iter()
                .map(|chunk| format!("```\n{chunk}\n```")),
        );
        texts
    }

    pub fn ping(&self) -> String {
        "\u{1F3D3} Pong!".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karaoke::{SessionRegistry, notices};
    use crate::test_utils::helpers::{MemorySettings, RecordingOutput, StaticLyrics};

    fn service(lyrics: StaticLyrics) -> (CommandService, Arc<RecordingOutput>, SessionRegistry) {
        let registry = SessionRegistry::new();
        let output = Arc::new(RecordingOutput::new());
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        let lyrics: Arc<dyn LyricsProvider> = Arc::new(lyrics);
        let control = Arc::new(KaraokeControl::new(registry.clone(), output.clone()));
        let launcher = KaraokeLauncher::new(registry.clone(), lyrics.clone(), settings.clone(), output.clone());
        (
            CommandService::new(launcher, control, settings, lyrics, "+"),
            output,
            registry,
        )
    }

    fn chat(content: &str) -> ChatMessage {
        ChatMessage {
            channel_id: Id::new(7),
            guild_id: Some(Id::new(70)),
            author_id: Id::new(1),
            author_name: "singer".into(),
            author_is_bot: false,
            content: content.into(),
        }
    }

    #[test]
    fn parses_sing_with_delay_flag() {
        assert_eq!(
            parse_chat_command("+", "+sing -d 1.5 Adele - Hello").unwrap(),
            Some(ChatCommand::Sing {
                query: "Adele - Hello".into(),
                delay: Some(1.5)
            })
        );
        assert_eq!(
            parse_chat_command("+", "  +KARAOKE queen").unwrap(),
            Some(ChatCommand::Sing {
                query: "queen".into(),
                delay: None
            })
        );
    }

    #[test]
    fn bad_sing_arguments_return_usage() {
        for text in ["+sing", "+sing -d", "+sing -d abc song", "+sing -d 2"] {
            let err = parse_chat_command("+", text).unwrap_err();
            assert!(matches!(err, Error::Validation(ref u) if u.contains("+sing")), "{text}");
        }
    }

    #[test]
    fn ignores_non_commands() {
        assert_eq!(parse_chat_command("+", "hello there").unwrap(), None);
        assert_eq!(parse_chat_command("+", "+dance").unwrap(), None);
        assert_eq!(parse_chat_command("+", "+").unwrap(), None);
        assert_eq!(parse_chat_command("!", "!stop").unwrap(), Some(ChatCommand::Stop));
    }

    #[test]
    fn chunks_respect_limit_and_line_breaks() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(chunk_text(text, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(chunk_text("abcdefg", 3), vec!["abc", "def", "g"]);
        assert!(chunk_text("", 10).is_empty());

        let long = "la ".repeat(2000);
        for chunk in chunk_text(&long, LYRICS_CHUNK_CHARS) {
            assert!(chunk.chars().count() <= LYRICS_CHUNK_CHARS);
        }
    }

    #[tokio::test]
    async fn lyrics_reply_has_header_and_fenced_chunks() {
        let (svc, _, _) = service(StaticLyrics::with_song("Hello", "Adele", "line one\nline two"));
        let texts = svc.lyrics("adele - hello").await;
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("**Hello** - Adele"));
        assert_eq!(texts[1], "```\nline one\nline two\n```");
    }

    #[tokio::test]
    async fn missing_lyrics_is_reported() {
        let (svc, output, registry) = service(StaticLyrics::not_found());
        let reply = svc.handle_chat_line(&chat("+sing nothing here")).await.unwrap().unwrap();
        assert_eq!(reply.texts, vec!["Could not find lyrics for **nothing here**.".to_string()]);
        assert!(output.control_surfaces().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_delay_is_rejected_before_launch() {
        let (svc, output, _) = service(StaticLyrics::with_song("a", "b", "line"));
        let reply = svc.handle_chat_line(&chat("+sing -d 20 a - b")).await.unwrap().unwrap();
        assert!(reply.texts[0].contains("between 0.1 and 10"));
        assert!(output.records().is_empty());
    }

    #[tokio::test]
    async fn control_without_session_says_so() {
        let (svc, _, _) = service(StaticLyrics::not_found());
        let reply = svc.handle_chat_line(&chat("+pause")).await.unwrap().unwrap();
        assert_eq!(reply.texts, vec![notices::NOTHING_RUNNING.to_string()]);
    }

    #[tokio::test]
    async fn bots_are_ignored() {
        let (svc, _, _) = service(StaticLyrics::not_found());
        let mut msg = chat("+ping");
        msg.author_is_bot = true;
        assert!(svc.handle_chat_line(&msg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delay_settings_round_trip() {
        let (svc, _, _) = service(StaticLyrics::not_found());
        let guild = Some(Id::new(70));
        assert!(svc.get_default_delay(guild, Id::new(7)).await.contains("No default"));
        assert_eq!(
            svc.set_default_delay(guild, Id::new(7), 3.5).await,
            "Default karaoke delay set to 3.5s."
        );
        assert_eq!(svc.get_default_delay(guild, Id::new(8)).await, "Default karaoke delay is 3.5s.");
        assert!(svc.set_default_delay(guild, Id::new(7), 0.0).await.contains("between"));
    }
}
