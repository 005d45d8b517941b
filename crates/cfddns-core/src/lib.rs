// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// This library owns the reconciliation loop that keeps a set of A-records
// pointed at the host's public IPv4 address:
// - **AddressResolver**: Trait for probing one external IP-lookup service
// - **DnsProvider**: Trait for fetching, creating and updating A-records
// - **Notifier**: Trait for fire-and-forget change notifications
// - **interval**: Poll interval controller (courtesy rate limit for free resolvers)
// - **DdnsEngine**: One reconciliation cycle: resolve, refresh, compare, correct
// - **Scheduler**: Drives the engine on a fixed timer until shutdown
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Capabilities live behind traits, implementations in plugin crates
// 2. **Single Writer**: The host map is only touched by the engine, inside the cycle
// 3. **Round-Robin**: One resolver per cycle, rotated in roster order
// 4. **Idempotency**: A record that already matches is never written
// 5. **Bounded Calls**: Every capability call runs under a request timeout

pub mod config;
pub mod engine;
pub mod error;
pub mod host_map;
pub mod interval;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    DdnsConfig, EngineConfig, NotifierConfig, ProviderConfig, ResolverConfig, ResponseFormat,
};
pub use engine::{CycleReport, DdnsEngine, EngineEvent};
pub use error::{Error, Result, Step};
pub use host_map::{HostMap, HostRecord};
pub use interval::{IntervalPolicy, poll_interval};
pub use scheduler::Scheduler;
pub use traits::{AddressResolver, DnsProvider, DnsRecord, Notification, Notifier, ResolveError};
