pub mod resolve_between;
pub mod spaced;

pub use resolve_between::{ResolveRankError, ResolveRankQuery, ResolveRankResponse};
pub use spaced::{GenerateSpacedRanksError, GenerateSpacedRanksQuery, GenerateSpacedRanksResponse};
