//! Core reconciliation engine
//!
//! The DdnsEngine is responsible for:
//! - Picking one resolver per cycle, round-robin over the roster
//! - Rebuilding the host map from the DNS provider
//! - Creating missing records and correcting stale ones
//! - Dispatching change notifications
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │  Scheduler   │  one tick = one cycle
//!                  └──────────────┘
//!                          │
//!                          ▼
//!                  ┌──────────────┐
//!                  │  DdnsEngine  │── owns HostMap + cursor
//!                  └──────────────┘
//!                          │
//!         ┌────────────────┼────────────────┐
//!         │                │                │
//!         ▼                ▼                ▼
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │AddressResolver│ │ DnsProvider  │ │   Notifier   │
//! │  (1 / cycle) │ │fetch/create/ │ │ (background, │
//! │              │ │   update     │ │   tracked)   │
//! └──────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Resolve the public address with the next resolver (failure aborts)
//! 2. Fetch records for every hostname into a fresh map (any failure aborts,
//!    the previous map is kept)
//! 3. For each hostname in configured order: create if absent, update if the
//!    content differs or is not an address, otherwise do nothing. Per-host
//!    failures are logged and the next host is processed.
//!
//! The host map is patched synchronously after each successful write, before
//! the next host is looked at. Notifications are the only background work and
//! never touch the map.

use crate::config::DdnsConfig;
use crate::error::{Error, Result, Step};
use crate::host_map::{HostMap, HostRecord};
use crate::interval::poll_interval;
use crate::traits::{AddressResolver, DnsProvider, Notification, Notifier};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Scheduler started driving the engine
    Started {
        hosts_count: usize,
        resolvers_count: usize,
        interval: Duration,
    },

    /// A resolver reported the public address
    AddressResolved {
        resolver: String,
        address: Ipv4Addr,
    },

    /// The resolver for this cycle failed; the cycle was abandoned
    ResolveFailed { resolver: String, error: String },

    /// Fetching records failed; the cycle was abandoned
    RefreshFailed { hostname: String, error: String },

    /// A missing record was created
    RecordCreated { hostname: String, address: Ipv4Addr },

    /// A stale record was corrected
    RecordUpdated {
        hostname: String,
        previous: String,
        address: Ipv4Addr,
    },

    /// A record already pointed at the resolved address
    RecordUnchanged { hostname: String, address: Ipv4Addr },

    /// Creating or updating a record failed
    RecordFailed { hostname: String, error: String },

    /// A notification could not be delivered
    NotificationFailed { hostname: String, error: String },

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Resolver used for this cycle
    pub resolver: String,
    /// Address it reported
    pub address: Ipv4Addr,
    /// Records created
    pub created: usize,
    /// Records corrected
    pub updated: usize,
    /// Records already correct
    pub unchanged: usize,
    /// Hosts whose create or update failed
    pub failed: usize,
    /// When the cycle finished
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    /// Number of DNS writes that succeeded in this cycle
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

enum HostOutcome {
    Created,
    Updated,
    Unchanged,
    Failed,
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Hand to a [`Scheduler`](crate::Scheduler), or call
///    [`run_cycle()`](DdnsEngine::run_cycle) directly
/// 3. Drain notifications with
///    [`drain_notifications()`](DdnsEngine::drain_notifications) before dropping
///
/// ## Threading
///
/// Cycles take `&mut self` and therefore never overlap. The only concurrent
/// work is notification delivery, which runs on tasks tracked in a `JoinSet`.
pub struct DdnsEngine {
    /// Resolver roster, in rotation order (never empty)
    resolvers: Vec<Box<dyn AddressResolver>>,

    /// DNS provider for reading and writing records
    provider: Box<dyn DnsProvider>,

    /// Optional notification sink
    notifier: Option<Arc<dyn Notifier>>,

    /// Hostnames to manage, in processing order
    hostnames: Arc<[String]>,

    /// Poll interval computed from the roster length
    poll_interval: Duration,

    /// Upper bound for any single capability call
    request_timeout: Duration,

    /// How long shutdown waits for notifications
    shutdown_grace: Duration,

    /// Index of the next resolver to use
    cursor: usize,

    /// Records as last observed from the provider
    host_map: HostMap,

    /// In-flight notification deliveries
    notifications: JoinSet<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `resolvers`: Resolver roster in rotation order (must not be empty)
    /// - `provider`: DNS provider implementation
    /// - `notifier`: Optional notifier; `None` disables notifications
    /// - `config`: cfddns configuration (hostnames, interval, engine settings)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolvers: Vec<Box<dyn AddressResolver>>,
        provider: Box<dyn DnsProvider>,
        notifier: Option<Arc<dyn Notifier>>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if resolvers.is_empty() {
            return Err(Error::config("Resolver roster cannot be empty"));
        }
        if config.hostnames.is_empty() {
            return Err(Error::config("No hostnames configured"));
        }
        config.engine.validate()?;

        let interval = poll_interval(&config.interval_policy(), resolvers.len());
        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            resolvers,
            provider,
            notifier,
            hostnames: config.hostnames.iter().cloned().collect(),
            poll_interval: interval,
            request_timeout: config.engine.request_timeout(),
            shutdown_grace: config.engine.shutdown_grace(),
            cursor: 0,
            host_map: HostMap::new(),
            notifications: JoinSet::new(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Initialize every resolver in the roster
    ///
    /// Stops at the first failure, which is reported with the resolver's name.
    pub async fn initialize(&self) -> Result<()> {
        for resolver in &self.resolvers {
            bounded(self.request_timeout, "resolver initialization", resolver.initialize())
                .await
                .map_err(|e| e.in_step(Step::Resolve, resolver.name()))?;
            debug!("Resolver [{}] initialized", resolver.name());
        }
        Ok(())
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: The cycle reached the host check step
    /// - `Err(Error)`: The cycle was abandoned at the resolve or refresh step;
    ///   the error carries the step and the resolver or hostname involved
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.reap_notifications();

        let (resolver, address) = self.resolve_address().await?;
        self.refresh_host_map().await?;

        let mut report = CycleReport {
            resolver,
            address,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            finished_at: Utc::now(),
        };

        let hostnames = Arc::clone(&self.hostnames);
        for hostname in hostnames.iter() {
            match self.check_host(hostname, address).await {
                HostOutcome::Created => report.created += 1,
                HostOutcome::Updated => report.updated += 1,
                HostOutcome::Unchanged => report.unchanged += 1,
                HostOutcome::Failed => report.failed += 1,
            }
        }

        report.finished_at = Utc::now();
        debug!(
            "Cycle complete via {}: {} created, {} updated, {} unchanged, {} failed",
            report.resolver, report.created, report.updated, report.unchanged, report.failed
        );
        Ok(report)
    }

    /// Pick the next resolver and advance the cursor
    ///
    /// The cursor advances whether or not the resolver succeeds, so a failing
    /// provider is never asked twice in a row.
    fn next_resolver(&mut self) -> usize {
        let len = self.resolvers.len();
        if self.cursor >= len {
            self.cursor = 0;
        }
        let index = self.cursor;
        self.cursor = (index + 1) % len;
        index
    }

    async fn resolve_address(&mut self) -> Result<(String, Ipv4Addr)> {
        let index = self.next_resolver();
        let resolver = &self.resolvers[index];
        let name = resolver.name().to_string();
        debug!("Resolving external address via [{}]", name);

        match bounded(self.request_timeout, "address lookup", resolver.resolve()).await {
            Ok(address) => {
                debug!("[{}] reports external address {}", name, address);
                self.emit_event(EngineEvent::AddressResolved {
                    resolver: name.clone(),
                    address,
                });
                Ok((name, address))
            }
            Err(e) => {
                warn!("Skipping cycle, resolver [{}] failed: {}", name, e);
                self.emit_event(EngineEvent::ResolveFailed {
                    resolver: name.clone(),
                    error: e.to_string(),
                });
                Err(e.in_step(Step::Resolve, name))
            }
        }
    }

    async fn refresh_host_map(&mut self) -> Result<()> {
        let mut fresh = HostMap::new();

        for hostname in self.hostnames.iter() {
            let fetched = bounded(
                self.request_timeout,
                "record fetch",
                self.provider.fetch_records(hostname),
            )
            .await;

            match fetched {
                Ok(records) => {
                    for record in &records {
                        debug!("A record [{}] currently points at [{}]", record.name, record.content);
                    }
                    fresh.merge(&records);
                }
                Err(e) => {
                    warn!(
                        "Skipping cycle, fetching records for {} failed: {}",
                        hostname, e
                    );
                    self.emit_event(EngineEvent::RefreshFailed {
                        hostname: hostname.clone(),
                        error: e.to_string(),
                    });
                    return Err(e.in_step(Step::Refresh, hostname.clone()));
                }
            }
        }

        self.host_map.replace(fresh);
        Ok(())
    }

    async fn check_host(&mut self, hostname: &str, address: Ipv4Addr) -> HostOutcome {
        let Some(current) = self.host_map.get(hostname).cloned() else {
            debug!("Host [{}] not found, adding...", hostname);
            return self.create_host(hostname, address).await;
        };

        match current.address() {
            Some(existing) if existing == address => {
                debug!("Host [{}] has correct IP address set, skipping...", hostname);
                self.emit_event(EngineEvent::RecordUnchanged {
                    hostname: hostname.to_string(),
                    address,
                });
                HostOutcome::Unchanged
            }
            Some(_) => {
                debug!("Host [{}] has different IP address, setting...", hostname);
                self.update_host(hostname, current, address).await
            }
            None => {
                debug!("Host [{}] has invalid IP address, setting...", hostname);
                self.update_host(hostname, current, address).await
            }
        }
    }

    async fn create_host(&mut self, hostname: &str, address: Ipv4Addr) -> HostOutcome {
        let created = bounded(
            self.request_timeout,
            "record create",
            self.provider.create_record(hostname, address),
        )
        .await;

        match created {
            Ok(record) => {
                info!("Created A record {} -> {}", hostname, address);
                self.host_map
                    .insert(hostname, HostRecord::from_record(&record));
                self.emit_event(EngineEvent::RecordCreated {
                    hostname: hostname.to_string(),
                    address,
                });
                HostOutcome::Created
            }
            Err(e) => {
                let e = e.in_step(Step::Create, hostname);
                error!("{}", e);
                self.emit_event(EngineEvent::RecordFailed {
                    hostname: hostname.to_string(),
                    error: e.to_string(),
                });
                HostOutcome::Failed
            }
        }
    }

    async fn update_host(
        &mut self,
        hostname: &str,
        current: HostRecord,
        address: Ipv4Addr,
    ) -> HostOutcome {
        let updated = bounded(
            self.request_timeout,
            "record update",
            self.provider
                .update_record(&current.record_id, hostname, address),
        )
        .await;

        match updated {
            Ok(()) => {
                let previous = self
                    .host_map
                    .patch_content(hostname, address)
                    .unwrap_or(current.content);
                info!("Updated {} -> {} (previous: {})", hostname, address, previous);
                self.emit_event(EngineEvent::RecordUpdated {
                    hostname: hostname.to_string(),
                    previous: previous.clone(),
                    address,
                });
                self.dispatch_notification(Notification::new(hostname, previous, address));
                HostOutcome::Updated
            }
            Err(e) => {
                let e = e.in_step(Step::Update, hostname);
                error!("{}", e);
                self.emit_event(EngineEvent::RecordFailed {
                    hostname: hostname.to_string(),
                    error: e.to_string(),
                });
                HostOutcome::Failed
            }
        }
    }

    /// Deliver a notification on a tracked background task
    fn dispatch_notification(&mut self, notification: Notification) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let event_tx = self.event_tx.clone();
        let timeout = self.request_timeout;

        self.notifications.spawn(async move {
            let delivered = bounded(timeout, "notification", notifier.notify(&notification)).await;
            match delivered {
                Ok(()) => debug!(
                    "[{}] notified change of {}",
                    notifier.notifier_name(),
                    notification.hostname
                ),
                Err(e) => {
                    let e = e.in_step(Step::Notify, notification.hostname.clone());
                    warn!("{}", e);
                    send_event(
                        &event_tx,
                        EngineEvent::NotificationFailed {
                            hostname: notification.hostname,
                            error: e.to_string(),
                        },
                    );
                }
            }
        });
    }

    /// Collect notification tasks that already finished
    fn reap_notifications(&mut self) {
        while let Some(finished) = self.notifications.try_join_next() {
            if let Err(e) = finished {
                warn!("Notification task failed: {}", e);
            }
        }
    }

    /// Wait for in-flight notifications, abandoning them after `grace`
    pub async fn drain_notifications(&mut self, grace: Duration) {
        if self.notifications.is_empty() {
            return;
        }

        debug!("Waiting for {} pending notification(s)", self.notifications.len());
        let notifications = &mut self.notifications;
        let drained = tokio::time::timeout(grace, async {
            while let Some(finished) = notifications.join_next().await {
                if let Err(e) = finished {
                    warn!("Notification task failed: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Abandoning {} pending notification(s) after {:?}",
                self.notifications.len(),
                grace
            );
            self.notifications.abort_all();
        }
    }

    /// Emit an engine event
    ///
    /// Dropped with a warning when the channel is full; silently dropped when
    /// nobody is listening.
    pub(crate) fn emit_event(&self, event: EngineEvent) {
        send_event(&self.event_tx, event);
    }

    /// The poll interval derived from the configured policy and roster length
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Grace period for pending notifications at shutdown
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Records as last observed from the provider
    pub fn host_map(&self) -> &HostMap {
        &self.host_map
    }

    /// Index of the resolver the next cycle will use
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of resolvers in the roster
    pub fn roster_len(&self) -> usize {
        self.resolvers.len()
    }

    /// Managed hostnames, in processing order
    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    /// Number of notification tasks not yet collected
    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }
}

fn send_event(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    if let Err(TrySendError::Full(_)) = tx.try_send(event) {
        warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
    }
}

/// Run a capability call under the request timeout
async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, timeout)),
    }
}
