//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod commission;
mod persistence;
mod ranking;
mod store;

pub use commission::{CommissionEngine, Payout, SaleOutcome, SaleReceipt, WeightingPolicy};
pub use persistence::{LoadReport, PersistenceCodec, HEADER};
pub use ranking::{merge_sort_descending, RankedMember, RankingService};
pub use store::MemberStore;
