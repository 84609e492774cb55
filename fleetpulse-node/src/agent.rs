//! Agent supervisor and its periodic activities.
//!
//! One agent instance walks `unregistered -> running -> stopped`. Entering
//! running resolves the display name, opens the MQTT session, and spawns
//! three tasks: the transport event loop, the self-heartbeat, and the
//! backend-beacon monitor. Restart is owned here as stop-then-start; the
//! previous session's tasks are fully joined before a new one begins, so two
//! heartbeat loops never publish under the same identity.

use crate::commands::{self, ControlEvent, DispatchOutcome};
use crate::config::NodeConfig;
use crate::identity;
use crate::link::ServerLink;
use crate::metrics;
use anyhow::{Context, Result};
use fleetpulse_common::bus::MessageBus;
use fleetpulse_common::clock;
use fleetpulse_common::log::{LogEntry, LogLevel};
use fleetpulse_common::topics;
use fleetpulse_common::wire::{CommandMessage, NodeState, NodeStatus, ServerHeartbeat};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, Outgoing, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct NodeAgent {
    cfg: NodeConfig,
    uid: String,
    name: Arc<Mutex<String>>,
}

/// One running period: transport session plus the task handles that must be
/// joined before the session closes. The periodic tasks and the transport
/// event loop stop on separate signals: the heartbeat and monitor are joined
/// before the goodbye goes out, while the event loop outlives it to flush
/// the final publishes.
struct Session {
    client: AsyncClient,
    pacing_tx: watch::Sender<bool>,
    transport_tx: watch::Sender<bool>,
    event_loop: JoinHandle<()>,
    periodic: Vec<JoinHandle<()>>,
    control_rx: mpsc::UnboundedReceiver<ControlEvent>,
}

impl NodeAgent {
    pub fn new(cfg: NodeConfig) -> Self {
        Self {
            cfg,
            uid: identity::hardware_uid(),
            name: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Runs until a shutdown command or ctrl-c. Restart commands loop back
    /// through full re-registration.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let display = identity::resolve_name(
                &self.cfg.backend_url,
                &self.uid,
                self.cfg.register_timeout,
            )
            .await;
            *self.name.lock() = display;

            let mut session = self
                .start_session()
                .await
                .context("failed to open transport session")?;
            info!("node {} running as {}", self.uid, self.name.lock());

            let event = tokio::select! {
                ev = session.control_rx.recv() => ev.unwrap_or(ControlEvent::Shutdown),
                _ = tokio::signal::ctrl_c() => ControlEvent::Shutdown,
            };

            match event {
                ControlEvent::Shutdown => {
                    self.stop_session(session).await;
                    info!("node {} stopped", self.uid);
                    return Ok(());
                }
                ControlEvent::Restart => {
                    self.stop_session(session).await;
                    info!("restarting in {:?}", self.cfg.restart_delay);
                    tokio::time::sleep(self.cfg.restart_delay).await;
                }
            }
        }
    }

    async fn start_session(&self) -> Result<Session> {
        let mut opts = MqttOptions::new(
            format!("fleetpulse-node-{}", self.uid),
            &self.cfg.broker_host,
            self.cfg.broker_port,
        );
        opts.set_keep_alive(Duration::from_secs(15));
        let (client, mut eventloop) = AsyncClient::new(opts, 64);

        client
            .subscribe(topics::command(&self.uid), QoS::AtLeastOnce)
            .await
            .context("subscribe to command topic")?;
        client
            .subscribe(topics::SERVER_HEARTBEAT, QoS::AtLeastOnce)
            .await
            .context("subscribe to server heartbeat")?;

        let (pacing_tx, pacing_rx) = watch::channel(false);
        let (transport_tx, transport_rx) = watch::channel(false);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let link = Arc::new(ServerLink::new(self.cfg.server_offline_timeout));

        // Transport event loop: drives the connection and routes inbound
        // publishes (commands addressed to us, backend beacons). After the
        // stop signal it keeps polling until the disconnect packet has gone
        // out, so publishes queued by the shutdown path reach the wire.
        let event_loop = {
            let uid = self.uid.clone();
            let name = self.name.clone();
            let link = link.clone();
            let bus = client.clone();
            let control_tx = control_tx.clone();
            let mut shutdown = transport_rx;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        event = eventloop.poll() => match event {
                            Ok(Event::Incoming(Incoming::Publish(p))) => {
                                handle_publish(&p.topic, &p.payload, &uid, &name, &link, &bus, &control_tx).await;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                error!("MQTT connection error: {e}");
                                tokio::time::sleep(Duration::from_secs(2)).await;
                            }
                        }
                    }
                }
                while let Ok(event) = eventloop.poll().await {
                    if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                        break;
                    }
                }
            })
        };

        let periodic = vec![
            spawn_self_heartbeat(
                client.clone(),
                self.uid.clone(),
                self.name.clone(),
                link.clone(),
                self.cfg.heartbeat_interval,
                pacing_rx.clone(),
            ),
            spawn_server_monitor(
                client.clone(),
                self.uid.clone(),
                self.name.clone(),
                link,
                self.cfg.monitor_interval,
                pacing_rx,
            ),
        ];

        Ok(Session { client, pacing_tx, transport_tx, event_loop, periodic, control_rx })
    }

    /// Halts every periodic activity, publishes the explicit goodbye once no
    /// task can follow it with another heartbeat, and only then releases the
    /// transport.
    async fn stop_session(&self, session: Session) {
        let display = self.name.lock().clone();
        close_session(&session.client, &self.uid, &display, &session.pacing_tx, session.periodic)
            .await;

        // Disconnect is queued behind the goodbye publishes; the event loop
        // drains the queue up to the disconnect packet before it exits.
        let _ = session.client.disconnect().await;
        let _ = session.transport_tx.send(true);
        let _ = session.event_loop.await;
    }
}

/// Shutdown ordering for one session's publishers: the heartbeat and monitor
/// are signaled and fully joined first, so the offline marker published here
/// is the last status message of the session.
async fn close_session<B: MessageBus>(
    bus: &B,
    uid: &str,
    name: &str,
    pacing_tx: &watch::Sender<bool>,
    periodic: Vec<JoinHandle<()>>,
) {
    let _ = pacing_tx.send(true);
    for handle in periodic {
        let _ = handle.await;
    }

    publish_domain_log(bus, uid, name, LogLevel::Warning, "Node shutting down").await;

    let offline = NodeStatus::offline_marker(uid, name, &metrics::local_ip());
    match serde_json::to_vec(&offline) {
        Ok(payload) => {
            if let Err(e) = bus.publish(&topics::status(uid), payload).await {
                error!("failed to publish offline status: {e}");
            }
        }
        Err(e) => error!("failed to encode offline status: {e}"),
    }
}

/// Heartbeat cadence: doubled for the cycle while the backend is perceived
/// down, back to normal once reachability returns.
fn heartbeat_wait(interval: Duration, reachable: bool) -> Duration {
    if reachable {
        interval
    } else {
        interval * 2
    }
}

fn spawn_self_heartbeat<B: MessageBus>(
    bus: B,
    uid: String,
    name: Arc<Mutex<String>>,
    link: Arc<ServerLink>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let display = name.lock().clone();
            let status = NodeStatus {
                uid: uid.clone(),
                name: display.clone(),
                ip: metrics::local_ip(),
                cpu: metrics::sample_cpu(),
                temp: metrics::sample_temp(),
                status: NodeState::Online,
                last_seen: clock::wall_clock(),
            };
            match serde_json::to_vec(&status) {
                Ok(payload) => {
                    if let Err(e) = bus.publish(&topics::status(&uid), payload).await {
                        error!("failed to publish status: {e}");
                    }
                }
                Err(e) => error!("failed to encode status: {e}"),
            }
            publish_domain_log(&bus, &uid, &display, LogLevel::Debug, "Heartbeat check").await;
            debug!("status published");

            let wait = heartbeat_wait(interval, link.is_reachable());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }
        }
    })
}

fn spawn_server_monitor<B: MessageBus>(
    bus: B,
    uid: String,
    name: Arc<Mutex<String>>,
    link: Arc<ServerLink>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if link.tick(Instant::now()) {
                        warn!("backend heartbeat lost, stretching cadence");
                        let display = name.lock().clone();
                        publish_domain_log(
                            &bus,
                            &uid,
                            &display,
                            LogLevel::Warning,
                            "Backend heartbeat lost",
                        )
                        .await;
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

async fn handle_publish<B: MessageBus>(
    topic: &str,
    payload: &[u8],
    uid: &str,
    name: &Arc<Mutex<String>>,
    link: &ServerLink,
    bus: &B,
    control_tx: &mpsc::UnboundedSender<ControlEvent>,
) {
    if topic == topics::SERVER_HEARTBEAT {
        match serde_json::from_slice::<ServerHeartbeat>(payload) {
            Ok(_) => {
                if link.observe_beacon(Instant::now()) {
                    info!("backend heartbeat regained");
                    let display = name.lock().clone();
                    publish_domain_log(bus, uid, &display, LogLevel::Info, "Backend reachable again")
                        .await;
                }
            }
            Err(e) => error!("malformed server heartbeat: {e}"),
        }
        return;
    }

    if topic == topics::command(uid) {
        let display = name.lock().clone();
        let msg = match serde_json::from_slice::<CommandMessage>(payload) {
            Ok(msg) => msg,
            Err(e) => {
                error!("malformed command payload: {e}");
                publish_domain_log(
                    bus,
                    uid,
                    &display,
                    LogLevel::Error,
                    format!("Dropping malformed command: {e}"),
                )
                .await;
                return;
            }
        };

        match commands::dispatch(msg, name) {
            DispatchOutcome::Renamed { from, to } => {
                info!("renamed from {from} to {to}");
                publish_domain_log(
                    bus,
                    uid,
                    &to,
                    LogLevel::Info,
                    format!("Renamed from {from} to {to}"),
                )
                .await;
            }
            DispatchOutcome::Control(event) => {
                info!("received {event:?} command");
                let _ = control_tx.send(event);
            }
            DispatchOutcome::ArityMismatch { action, expected, got } => {
                error!("command {action} arity mismatch: expected {expected}, got {got}");
                publish_domain_log(
                    bus,
                    uid,
                    &display,
                    LogLevel::Error,
                    format!("Dropping command {action}: expected {expected} args, got {got}"),
                )
                .await;
            }
            DispatchOutcome::UnknownAction { action } => {
                warn!("unknown command {action}");
                publish_domain_log(
                    bus,
                    uid,
                    &display,
                    LogLevel::Warning,
                    format!("Dropping unknown command {action}"),
                )
                .await;
            }
        }
    }
}

async fn publish_domain_log<B: MessageBus>(
    bus: &B,
    uid: &str,
    origin: &str,
    level: LogLevel,
    message: impl Into<String>,
) {
    let entry = LogEntry::new(origin, level, message.into());
    match serde_json::to_vec(&entry) {
        Ok(payload) => {
            if let Err(e) = bus.publish(&topics::log(uid), payload).await {
                error!("failed to publish log entry: {e}");
            }
        }
        Err(e) => error!("failed to encode log entry: {e}"),
    }
}
