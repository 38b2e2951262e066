//! Vault subsystem: views, allocation, platform detection, packets, builder

pub mod allocation;
pub mod builder;
pub mod packets;
pub mod platform;
pub mod view;

pub use allocation::{AllocationMap, AllocationResolver};
pub use builder::TransactionBuilder;
pub use packets::{BrokerClient, Operation, PacketData, PacketGenerator, ProofService};
pub use platform::{Platform, PlatformEntry, PlatformInfo, PlatformRegistry};
pub use view::{fetch_vault_view, StrategyView, VaultView};
