//! Interactive chat loop over any reader/writer pair.
//!
//! The loop owns one session from banner to close. Writing against
//! `BufRead`/`Write` instead of stdin/stdout directly keeps full
//! transcripts testable without a terminal.

use std::io::{BufRead, Write};

use crate::context::CollaboratorContext;
use crate::engine::prompts;
use crate::engine::Orchestrator;
use crate::ports::SmallTalkKind;
use crate::session::SessionState;

/// One interactive session between a user and the engine.
pub struct ChatLoop<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ChatLoop<R, W> {
    /// Creates a loop reading utterances from `input` and writing the
    /// transcript to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Runs the session until EOF or a quit command, then closes it.
    ///
    /// Blank lines are skipped without consuming a turn. Whatever ends the
    /// session, any task still in flight is audited as abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error string when I/O fails or a turn fails on an
    /// infrastructure boundary.
    pub async fn run(
        mut self,
        engine: &Orchestrator,
        ctx: &CollaboratorContext,
    ) -> Result<(), String> {
        writeln!(self.output, "confab (type /quit to end the session)")
            .map_err(|e| format!("write error: {e}"))?;
        let mut state = SessionState::new(ctx.clock.now());

        loop {
            write!(self.output, "you> ").map_err(|e| format!("write error: {e}"))?;
            self.output.flush().map_err(|e| format!("write error: {e}"))?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(|e| format!("read error: {e}"))?;
            if read == 0 {
                break;
            }
            let utterance = line.trim();
            if utterance.is_empty() {
                continue;
            }
            if utterance == "/quit" || utterance == "/exit" {
                break;
            }

            let reply = match engine.take_turn(ctx, &mut state, utterance).await {
                Ok(reply) => reply,
                Err(err) => {
                    let _ = engine.end_session(ctx, &mut state);
                    return Err(format!("turn failed: {err}"));
                }
            };
            writeln!(self.output, "bot> {reply}").map_err(|e| format!("write error: {e}"))?;
        }

        engine.end_session(ctx, &mut state).map_err(|e| format!("failed to close session: {e}"))?;
        writeln!(self.output, "bot> {}", prompts::small_talk_reply(SmallTalkKind::Farewell))
            .map_err(|e| format!("write error: {e}"))?;
        Ok(())
    }
}
