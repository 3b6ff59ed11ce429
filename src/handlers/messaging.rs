//! PRIVMSG handler: marks the speaker armed. Never suppresses.

use denoise_proto::Message;
use tracing::trace;

use super::{Context, Handler, Outcome};

pub struct PrivmsgHandler;

impl Handler for PrivmsgHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let (Some(nick), Some(targets)) = (msg.source_nickname(), msg.arg(0)) else {
            return Outcome::Relay;
        };
        if ctx.roster.is_me(nick) {
            return Outcome::Relay;
        }

        let now = ctx.now;
        for target in targets.split(',') {
            if !ctx.roster.is_channel(target) {
                continue;
            }
            if let Some(record) = ctx.tracker.get_or_create(target, nick) {
                record.spoke(now);
                trace!(channel = %target, nick = %nick, "Speaker armed");
            }
        }
        Outcome::Relay
    }
}
