use mediator::Request;
use serde::{Deserialize, Serialize};
use trainflow_common::{RankKey, TrainflowError};

/// Rank key strictly between two optional neighbour keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRankQuery {
    #[serde(default)]
    pub lower: Option<String>,
    #[serde(default)]
    pub upper: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRankResponse {
    pub rank: RankKey,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveRankError {
    #[error(transparent)]
    Rank(#[from] TrainflowError),
}

impl Request<Result<ResolveRankResponse, ResolveRankError>> for ResolveRankQuery {}

impl ResolveRankQuery {
    fn parse(key: Option<&str>) -> Result<Option<RankKey>, ResolveRankError> {
        Ok(key.map(RankKey::parse).transpose()?)
    }
}

#[tracing::instrument]
pub async fn handle(query: ResolveRankQuery) -> Result<ResolveRankResponse, ResolveRankError> {
    let lower = ResolveRankQuery::parse(query.lower.as_deref())?;
    let upper = ResolveRankQuery::parse(query.upper.as_deref())?;
    let rank = RankKey::between(lower.as_ref(), upper.as_ref())?;
    Ok(ResolveRankResponse { rank })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn query(lower: Option<&str>, upper: Option<&str>) -> ResolveRankQuery {
        ResolveRankQuery {
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_between_bounds() {
        assert_eq!(handle(query(None, None)).await.unwrap().rank.as_str(), "m");
        assert_eq!(handle(query(Some("b"), Some("d"))).await.unwrap().rank.as_str(), "c");
        assert_eq!(handle(query(Some("b"), Some("c"))).await.unwrap().rank.as_str(), "bm");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        assert!(matches!(
            handle(query(Some("d"), Some("b"))).await,
            Err(ResolveRankError::Rank(TrainflowError::InvalidOrder { .. }))
        ));
        assert!(matches!(
            handle(query(Some("B1"), None)).await,
            Err(ResolveRankError::Rank(TrainflowError::MalformedRank { .. }))
        ));
    }
}
