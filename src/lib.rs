//! Satay Aptos SDK
//!
//! Transaction building for Satay vaults and multi-rewards staking. Given a
//! user's intent ("deposit X into vault V", "stake Y of token T"), the SDK
//! auto-detects the vault's strategy platform, resolves the on-chain
//! allocation map, generates MovePosition proof packets where required, and
//! assembles a submit-ready entry-function payload. Signing and submission
//! stay with the caller.
//!
//! ```no_run
//! use satay_aptos_sdk::chain::FullnodeClient;
//! use satay_aptos_sdk::config::SdkConfig;
//! use satay_aptos_sdk::vault::TransactionBuilder;
//!
//! # async fn example() -> satay_aptos_sdk::types::SdkResult<()> {
//! let config = SdkConfig::new("https://fullnode.mainnet.aptoslabs.com");
//! let client = FullnodeClient::new(&config.fullnode_url);
//! let builder = TransactionBuilder::new(&client, &config);
//!
//! let payload = builder.build_deposit("0x1234", 1_000_000, "0xfeed").await?;
//! // hand `payload` to the wallet/submission layer
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod metadata;
pub mod staking;
pub mod types;
pub mod vault;

pub use config::SdkConfig;
pub use staking::StakingClient;
pub use types::{EntryArgument, EntryFunctionPayload, SdkError, SdkResult};
pub use vault::TransactionBuilder;
