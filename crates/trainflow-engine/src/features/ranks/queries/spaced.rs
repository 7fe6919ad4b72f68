use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::RankKey;

/// Upper bound for one request; larger lists are seeded in batches
pub const MAX_SPACED_RANKS: usize = 10_000;

/// Evenly spaced keys for seeding a new sibling list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSpacedRanksQuery {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSpacedRanksResponse {
    pub ranks: Vec<RankKey>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateSpacedRanksError {
    #[error("Count must be between 0 and {max}")]
    CountTooLarge { max: usize },
}

impl Request<Result<GenerateSpacedRanksResponse, GenerateSpacedRanksError>>
    for GenerateSpacedRanksQuery
{
}

impl GenerateSpacedRanksQuery {
    pub fn validate(&self) -> Result<(), GenerateSpacedRanksError> {
        if self.count > MAX_SPACED_RANKS {
            return Err(GenerateSpacedRanksError::CountTooLarge {
                max: MAX_SPACED_RANKS,
            });
        }
        Ok(())
    }
}

#[tracing::instrument]
pub async fn handle(
    query: GenerateSpacedRanksQuery,
) -> Result<GenerateSpacedRanksResponse, GenerateSpacedRanksError> {
    query.validate()?;
    Ok(GenerateSpacedRanksResponse {
        ranks: RankKey::evenly_spaced(query.count),
    })
}
