//! Rank key utilities for clients that compute positions themselves

pub mod queries;

pub use queries::{
    GenerateSpacedRanksError, GenerateSpacedRanksQuery, GenerateSpacedRanksResponse,
    ResolveRankError, ResolveRankQuery, ResolveRankResponse,
};
