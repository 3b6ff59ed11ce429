//! Channel membership handlers: JOIN, PART, KICK.

use denoise_proto::Message;
use tracing::{debug, trace};

use super::{Context, Handler, Outcome};
use crate::denoise::{Actor, Churn};

/// Handler for JOIN. Runs after the roster update.
///
/// Our own JOIN starts tracking the channel. Anyone else's JOIN is decided
/// on the record as it stood before this join, which is then marked quiet.
pub struct JoinHandler;

impl Handler for JoinHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let (Some(prefix), Some(channels)) = (msg.prefix.as_ref(), msg.arg(0)) else {
            return Outcome::Relay;
        };
        let Some(actor) = Actor::from_prefix(prefix) else {
            return Outcome::Relay;
        };

        if ctx.roster.is_me(actor.nick) {
            for channel in channels.split(',').filter(|c| !c.is_empty()) {
                ctx.tracker.add_channel(channel);
            }
            return Outcome::Relay;
        }

        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            let now = ctx.now;
            let Some(record) = ctx.tracker.get_or_create(channel, actor.nick) else {
                continue;
            };
            let prior = record.clone();
            record.joined(now);

            if ctx.decide(Some(&prior)).is_forward() {
                debug!(channel = %channel, nick = %actor.nick, "Forwarding JOIN");
                ctx.forward(&Churn::Join { channel, actor });
            } else {
                trace!(channel = %channel, nick = %actor.nick, "Suppressing JOIN");
            }
        }
        Outcome::Handled
    }
}

/// Handler for PART. Runs before the roster update.
pub struct PartHandler;

impl Handler for PartHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let (Some(prefix), Some(channels)) = (msg.prefix.as_ref(), msg.arg(0)) else {
            return Outcome::Relay;
        };
        let Some(actor) = Actor::from_prefix(prefix) else {
            return Outcome::Relay;
        };

        if ctx.roster.is_me(actor.nick) {
            for channel in channels.split(',').filter(|c| !c.is_empty()) {
                ctx.tracker.remove_channel(channel);
            }
            return Outcome::Relay;
        }

        let reason = msg.arg(1);
        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            if !ctx.tracker.is_tracked(channel) {
                debug!(channel = %channel, nick = %actor.nick, "Desync: PART in untracked channel");
                continue;
            }
            let verdict = ctx.decide(ctx.tracker.lookup(channel, actor.nick));
            if verdict.is_forward() {
                debug!(channel = %channel, nick = %actor.nick, "Forwarding PART");
                ctx.forward(&Churn::Part {
                    channel,
                    actor,
                    reason,
                });
            } else {
                trace!(channel = %channel, nick = %actor.nick, "Suppressing PART");
            }
            ctx.retire(channel, actor.nick);
        }
        Outcome::Handled
    }
}

/// Handler for KICK. Runs before the roster update.
///
/// Kicks are relayed as-is. Being kicked ourselves releases the channel;
/// anyone else kicked is retired like a PART.
pub struct KickHandler;

impl Handler for KickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let (Some(channel), Some(victim)) = (msg.arg(0), msg.arg(1)) else {
            return Outcome::Relay;
        };

        if ctx.roster.is_me(victim) {
            ctx.tracker.remove_channel(channel);
        } else {
            ctx.retire(channel, victim);
        }
        Outcome::Relay
    }
}
