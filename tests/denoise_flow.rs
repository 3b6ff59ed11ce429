//! Integration tests for churn filtering through a live relay.

mod common;

use std::time::Duration;

use common::{FakeUpstream, TestClient, TestRelay, UpstreamConn};
use tokio::time::sleep;

const MARKER: &str = ":irc.test NOTICE alice :marker";

/// Register `alice` and join `#chan`, draining what the client sees.
async fn joined(client: &mut TestClient, server: &mut UpstreamConn) -> anyhow::Result<()> {
    client.register("alice").await?;
    server.accept_registration("alice").await?;
    client.recv().await?;

    server.send_raw(":alice!a@client.host JOIN #chan").await?;
    assert_eq!(client.recv().await?, ":alice!a@client.host JOIN #chan");
    server
        .send_raw(":irc.test 353 alice = #chan :alice @bob")
        .await?;
    client.recv().await?;
    server.send_raw(":irc.test 366 alice #chan :End of /NAMES list.").await?;
    client.recv().await?;
    Ok(())
}

#[tokio::test]
async fn test_silent_user_churn_is_suppressed() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(17711, &upstream.hostspec(), &["-a", "10"])?;
    let mut client = TestClient::connect("127.0.0.1:17711").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    server.send_raw(":lurker!l@idle.host JOIN #chan").await?;
    server.send_raw(":lurker!l@idle.host PART #chan :gone").await?;
    server.send_raw(":ghost!g@idle.host QUIT :Ping timeout").await?;
    server.send_raw(MARKER).await?;

    assert_eq!(client.recv().await?, MARKER);
    Ok(())
}

#[tokio::test]
async fn test_recent_speaker_churn_is_announced() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(17712, &upstream.hostspec(), &["-a", "10"])?;
    let mut client = TestClient::connect("127.0.0.1:17712").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    server.send_raw(":bob!b@bob.host PRIVMSG #chan :hello").await?;
    assert_eq!(client.recv().await?, ":bob!b@bob.host PRIVMSG #chan :hello");

    server.send_raw(":bob!b@bob.host NICK robert").await?;
    assert_eq!(
        client.recv().await?,
        ":denoise!denoise@denoise.relay NOTICE #chan :[NICK] bob -> robert"
    );

    server.send_raw(":robert!b@bob.host PART #chan :later").await?;
    assert_eq!(
        client.recv().await?,
        ":denoise!denoise@denoise.relay NOTICE #chan :[PART] robert (b@bob.host): later"
    );

    // Still armed after leaving, so a quick rejoin shows too.
    server.send_raw(":robert!b@bob.host JOIN #chan").await?;
    assert_eq!(
        client.recv().await?,
        ":denoise!denoise@denoise.relay NOTICE #chan :[JOIN] robert (b@bob.host)"
    );

    Ok(())
}

#[tokio::test]
async fn test_speaker_goes_quiet_after_window() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(17713, &upstream.hostspec(), &["-a", "1"])?;
    let mut client = TestClient::connect("127.0.0.1:17713").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    server.send_raw(":bob!b@bob.host PRIVMSG #chan :anyone?").await?;
    client.recv().await?;

    sleep(Duration::from_millis(2500)).await;
    server.send_raw(":bob!b@bob.host PART #chan").await?;
    server.send_raw(MARKER).await?;
    assert_eq!(client.recv().await?, MARKER);

    Ok(())
}

#[tokio::test]
async fn test_own_churn_and_kicks_always_relay() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(17714, &upstream.hostspec(), &["-a", "10"])?;
    let mut client = TestClient::connect("127.0.0.1:17714").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    for line in [
        ":bob!b@bob.host KICK #chan carol :behave",
        ":alice!a@client.host NICK alicia",
        ":alicia!a@client.host PART #chan :brb",
        ":alicia!a@client.host JOIN #chan",
    ] {
        server.send_raw(line).await?;
        assert_eq!(client.recv().await?, line);
    }

    Ok(())
}

#[tokio::test]
async fn test_announcer_nick_is_configurable() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(
        17715,
        &upstream.hostspec(),
        &["-a", "10", "--announce-as", "herald"],
    )?;
    let mut client = TestClient::connect("127.0.0.1:17715").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    server.send_raw(":bob!b@bob.host PRIVMSG #chan :hi").await?;
    client.recv().await?;
    server.send_raw(":bob!b@bob.host QUIT :Quit: off").await?;
    assert_eq!(
        client.recv().await?,
        ":herald!herald@denoise.relay NOTICE #chan :[QUIT] bob (b@bob.host): Quit: off"
    );

    Ok(())
}

#[tokio::test]
async fn test_departed_channel_hears_nothing_of_later_quit() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let _relay = TestRelay::spawn(17716, &upstream.hostspec(), &["-a", "10"])?;
    let mut client = TestClient::connect("127.0.0.1:17716").await?;
    let mut server = upstream.accept().await?;
    joined(&mut client, &mut server).await?;

    server.send_raw(":alice!a@client.host JOIN #other").await?;
    client.recv().await?;
    server.send_raw(":bob!b@bob.host JOIN #other").await?;

    server.send_raw(":bob!b@bob.host PRIVMSG #chan :see you").await?;
    assert_eq!(client.recv().await?, ":bob!b@bob.host PRIVMSG #chan :see you");
    server.send_raw(":bob!b@bob.host PART #chan").await?;
    assert_eq!(
        client.recv().await?,
        ":denoise!denoise@denoise.relay NOTICE #chan :[PART] bob (b@bob.host)"
    );

    // Gone from #chan and silent in #other.
    server.send_raw(":bob!b@bob.host QUIT :Quit: bye").await?;
    server.send_raw(MARKER).await?;
    assert_eq!(client.recv().await?, MARKER);
    Ok(())
}
