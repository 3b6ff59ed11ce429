//! Network-wide presence handlers: QUIT and NICK.
//!
//! Both affect every channel the user shares with us and are decided per
//! channel, since a user can be armed in one channel and silent in another.

use denoise_proto::Message;
use tracing::{debug, trace};

use super::{Context, Handler, Outcome};
use crate::denoise::{Actor, Churn, Verdict};

/// Handler for QUIT. Runs before the roster update.
pub struct QuitHandler;

impl Handler for QuitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let Some(actor) = msg.prefix.as_ref().and_then(Actor::from_prefix) else {
            return Outcome::Relay;
        };

        if ctx.roster.is_me(actor.nick) {
            let released = ctx.tracker.clear();
            debug!(channels = released, "Own QUIT, released all channels");
            return Outcome::Relay;
        }

        let verdicts = verdicts_for(ctx, actor.nick);
        let reason = msg.arg(0);
        for (channel, verdict) in &verdicts {
            if verdict.is_forward() {
                debug!(channel = %channel, nick = %actor.nick, "Forwarding QUIT");
                ctx.forward(&Churn::Quit {
                    channel,
                    actor,
                    reason,
                });
            } else {
                trace!(channel = %channel, nick = %actor.nick, "Suppressing QUIT");
            }
            ctx.retire(channel, actor.nick);
        }
        Outcome::Handled
    }
}

/// Handler for NICK. Runs before the roster update.
pub struct NickHandler;

impl Handler for NickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> Outcome {
        let (Some(old), Some(new)) = (msg.source_nickname(), msg.arg(0)) else {
            return Outcome::Relay;
        };

        if ctx.roster.is_me(old) {
            return Outcome::Relay;
        }

        // Decide on the record as it was before the rename.
        let verdicts = verdicts_for(ctx, old);

        // Records kept for channels the user already left move too, so a
        // rejoin under the new nick still finds them.
        let mut holding = Vec::new();
        ctx.tracker
            .for_all_channels_of(old, |channel, _| holding.push(channel.to_owned()));
        for channel in &holding {
            ctx.tracker.rename(channel, old, new);
        }

        for (channel, verdict) in &verdicts {
            if verdict.is_forward() {
                debug!(channel = %channel, old = %old, new = %new, "Forwarding NICK");
                ctx.forward(&Churn::Nick { channel, old, new });
            } else {
                trace!(channel = %channel, old = %old, new = %new, "Suppressing NICK");
            }
        }
        Outcome::Handled
    }
}

/// Verdict for `nick` in every tracked channel the roster has them in.
///
/// Membership comes from the roster, which has not seen this message yet.
/// A record alone does not count: armed users keep theirs after leaving.
fn verdicts_for(ctx: &Context<'_>, nick: &str) -> Vec<(String, Verdict)> {
    ctx.roster
        .channels_of(nick)
        .into_iter()
        .filter(|channel| ctx.tracker.is_tracked(channel))
        .map(|channel| {
            let verdict = ctx.decide(ctx.tracker.lookup(&channel, nick));
            (channel, verdict)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::Harness;
    use std::time::Duration;

    fn two_channels() -> Harness {
        let mut h = Harness::in_channel("me", "#a");
        h.feed(":me!u@h JOIN #b");
        h.feed(":bob!b@host JOIN #a");
        h.feed(":bob!b@host JOIN #b");
        h
    }

    #[test]
    fn test_quit_decided_per_channel() {
        let mut h = two_channels();
        h.feed(":bob!b@host PRIVMSG #a :only here");
        h.advance(Duration::from_secs(3));

        let sent = h.feed(":bob!b@host QUIT :Quit: gone");
        assert_eq!(
            sent,
            vec![":denoise!denoise@denoise.relay NOTICE #a :[QUIT] bob (b@host): Quit: gone"]
        );
        // Silent in #b, so that record is gone; armed in #a, kept.
        assert!(h.tracker.lookup("#b", "bob").is_none());
        assert!(h.tracker.lookup("#a", "bob").is_some());
    }

    #[test]
    fn test_quit_of_unknown_user_suppressed() {
        let mut h = two_channels();
        assert!(h.feed(":stranger!s@host QUIT :bye").is_empty());
    }

    #[test]
    fn test_self_quit_releases_everything() {
        let mut h = two_channels();
        h.feed(":bob!b@host PRIVMSG #a :hi");
        let sent = h.feed(":me!u@h QUIT :leaving");
        assert_eq!(sent, vec![":me!u@h QUIT :leaving"]);
        assert_eq!(h.tracker.channel_count(), 0);
    }

    #[test]
    fn test_nick_moves_record_everywhere() {
        let mut h = two_channels();
        h.feed(":bob!b@host PRIVMSG #a :hi");
        h.feed(":bob!b@host PRIVMSG #b :hi");
        let spoke_a = h.tracker.lookup("#a", "bob").unwrap().last_spoke_at;

        let sent = h.feed(":bob!b@host NICK robert");
        assert_eq!(
            sent,
            vec![
                ":denoise!denoise@denoise.relay NOTICE #a :[NICK] bob -> robert",
                ":denoise!denoise@denoise.relay NOTICE #b :[NICK] bob -> robert",
            ]
        );
        for chan in ["#a", "#b"] {
            assert!(h.tracker.lookup(chan, "bob").is_none());
        }
        assert_eq!(h.tracker.lookup("#a", "robert").unwrap().last_spoke_at, spoke_a);
        assert!(h.roster.member("#a", "robert").is_some());
    }

    #[test]
    fn test_nick_of_silent_user_suppressed_but_migrated() {
        let mut h = two_channels();
        assert!(h.feed(":bob!b@host NICK quietbob").is_empty());
        assert!(h.tracker.lookup("#a", "quietbob").is_some());
        assert!(h.tracker.lookup("#a", "bob").is_none());
    }

    #[test]
    fn test_quit_skips_channel_already_left() {
        let mut h = two_channels();
        h.feed(":bob!b@host PRIVMSG #a :brb");
        h.feed(":bob!b@host PART #a");
        h.advance(Duration::from_secs(2));

        // Armed in #a, but no longer there; silent in #b.
        assert!(h.feed(":bob!b@host QUIT :gone").is_empty());
        assert!(h.tracker.lookup("#b", "bob").is_none());
    }

    #[test]
    fn test_nick_skips_channel_already_left() {
        let mut h = two_channels();
        h.feed(":bob!b@host PRIVMSG #a :brb");
        h.feed(":bob!b@host PRIVMSG #b :still here");
        h.feed(":bob!b@host PART #a");

        let sent = h.feed(":bob!b@host NICK robert");
        assert_eq!(
            sent,
            vec![":denoise!denoise@denoise.relay NOTICE #b :[NICK] bob -> robert"]
        );
        assert!(h.roster.member("#a", "robert").is_none());

        // The kept record followed the rename, so a rejoin is still shown.
        let sent = h.feed(":robert!b@host JOIN #a");
        assert_eq!(
            sent,
            vec![":denoise!denoise@denoise.relay NOTICE #a :[JOIN] robert (b@host)"]
        );
    }

    #[test]
    fn test_own_nick_relayed() {
        let mut h = two_channels();
        let sent = h.feed(":me!u@h NICK me2");
        assert_eq!(sent, vec![":me!u@h NICK me2"]);
        assert!(h.roster.is_me("me2"));
    }
}
