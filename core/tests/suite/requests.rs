use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_channel::Receiver;
use async_channel::Sender;
use pretty_assertions::assert_eq;
use serde_json::json;
use themer_core::StylesheetCompiler;
use themer_core::ThemeService;
use themer_protocol::InboundEvent;
use themer_protocol::OutboundEvent;
use themer_test_support::EchoCompiler;
use themer_test_support::GatedCompiler;
use themer_test_support::TestInstall;
use themer_test_support::inbound;
use themer_test_support::next_event;
use themer_test_support::next_reply;
use tracing::Instrument;
use tracing_test::traced_test;

struct Running {
    tx_inbound: Sender<InboundEvent>,
    rx_event: Receiver<OutboundEvent>,
    run: tokio::task::JoinHandle<()>,
}

async fn run_service(
    install: &TestInstall,
    compiler: Arc<dyn StylesheetCompiler>,
) -> Result<Running> {
    let (tx_event, rx_event) = async_channel::unbounded();
    let service = ThemeService::start(&install.config, compiler, tx_event).await?;
    next_event(&rx_event).await?;
    next_event(&rx_event).await?;

    let (tx_inbound, rx_inbound) = async_channel::unbounded();
    let run = tokio::spawn(async move { service.run(rx_inbound).await }.in_current_span());
    Ok(Running {
        tx_inbound,
        rx_event,
        run,
    })
}

fn request(event_type: &str, reply: &str) -> Result<InboundEvent> {
    inbound(json!({
        "meta": { "type": event_type, "namespace": "themes", "reply": reply },
    }))
}

fn activate(theme: &str, reply: &str) -> Result<InboundEvent> {
    inbound(json!({
        "meta": { "type": "activate-theme", "namespace": "themes", "reply": reply },
        "theme": theme,
    }))
}

#[tokio::test]
#[traced_test]
async fn answers_only_well_formed_requests_for_its_namespace() -> Result<()> {
    let install = TestInstall::new()?;
    install.write_theme("dark", "Dark", "a {}")?;
    let running = run_service(&install, Arc::new(EchoCompiler::default())).await?;

    for event in [
        inbound(json!({
            "meta": { "type": "get-themes", "namespace": "clock", "reply": "r-other" },
        }))?,
        inbound(json!({ "meta": { "type": "get-themes", "namespace": "themes" } }))?,
        inbound(json!({
            "meta": { "type": "activate-theme", "namespace": "themes", "reply": "r-bad" },
        }))?,
        request("refresh-everything", "r-unknown")?,
        request("get-themes", "r-get")?,
    ] {
        running.tx_inbound.send(event).await?;
    }
    drop(running.tx_inbound);
    running.run.await?;

    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.meta.event_type, "r-get");
    assert_eq!(reply.themes.len(), 1);
    assert!(running.rx_event.try_recv().is_err());
    assert!(logs_contain("dropping request"));
    Ok(())
}

#[tokio::test]
async fn get_themes_does_not_rescan() -> Result<()> {
    let install = TestInstall::new()?;
    install.write_theme("dark", "Dark", "a {}")?;
    let running = run_service(&install, Arc::new(EchoCompiler::default())).await?;

    std::fs::remove_dir_all(&install.config.themes_dir)?;
    running.tx_inbound.send(request("get-themes", "r-get")?).await?;
    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.themes.len(), 1);

    running
        .tx_inbound
        .send(request("reload-themes", "r-reload")?)
        .await?;
    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.meta.event_type, "r-reload");
    assert_eq!(reply.themes, Vec::new());
    Ok(())
}

#[tokio::test]
async fn requests_interleave_with_an_activation_in_flight() -> Result<()> {
    let install = TestInstall::new()?;
    install.write_theme("dark", "Dark", "a {}")?;
    let compiler = GatedCompiler::new();
    let running = run_service(&install, compiler.clone()).await?;

    running.tx_inbound.send(activate("dark", "r-act")?).await?;
    compiler.wait_started().await?;

    // The active id is updated before activation finishes.
    running.tx_inbound.send(request("get-themes", "r-get")?).await?;
    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.meta.event_type, "r-get");
    assert_eq!(reply.active_theme.as_deref(), Some("dark"));

    compiler.release();
    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.meta.event_type, "r-act");
    assert_eq!(install.read_staged("index.css")?, "a {}");
    Ok(())
}

#[tokio::test]
async fn closing_the_bus_waits_for_in_flight_requests() -> Result<()> {
    let install = TestInstall::new()?;
    install.write_theme("dark", "Dark", "a {}")?;
    let compiler = GatedCompiler::new();
    let mut running = run_service(&install, compiler.clone()).await?;

    running.tx_inbound.send(activate("dark", "r-act")?).await?;
    compiler.wait_started().await?;
    drop(running.tx_inbound);

    let still_running = tokio::time::timeout(Duration::from_millis(100), &mut running.run).await;
    assert!(still_running.is_err(), "run returned with work in flight");

    compiler.release();
    running.run.await?;
    let reply = next_reply(&running.rx_event).await?;
    assert_eq!(reply.meta.event_type, "r-act");
    assert_eq!(install.read_staged("id")?, "dark");
    Ok(())
}
