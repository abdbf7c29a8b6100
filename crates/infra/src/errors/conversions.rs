//! Conversions from external infrastructure errors into domain errors.

use poolstats_domain::PoolStatsError;
use prometheus::Error as PrometheusError;
use r2d2::Error as PoolError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PoolStatsError);

impl From<InfraError> for PoolStatsError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PoolStatsError> for InfraError {
    fn from(value: PoolStatsError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoPoolStatsError {
    fn into_poolstats(self) -> PoolStatsError;
}

/* -------------------------------------------------------------------------- */
/* prometheus::Error → PoolStatsError */
/* -------------------------------------------------------------------------- */

impl IntoPoolStatsError for PrometheusError {
    fn into_poolstats(self) -> PoolStatsError {
        match self {
            PrometheusError::AlreadyReg => PoolStatsError::DuplicateRegistration(
                "descriptor set already registered with the prometheus registry".into(),
            ),
            PrometheusError::InconsistentCardinality { expect, got } => {
                PoolStatsError::InvalidConfiguration(format!(
                    "label cardinality mismatch: expected {expect}, got {got}"
                ))
            }
            PrometheusError::Msg(message) => PoolStatsError::Exposition(message),
            other => PoolStatsError::Exposition(other.to_string()),
        }
    }
}

impl From<PrometheusError> for InfraError {
    fn from(value: PrometheusError) -> Self {
        InfraError(value.into_poolstats())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → PoolStatsError */
/* -------------------------------------------------------------------------- */

impl IntoPoolStatsError for PoolError {
    fn into_poolstats(self) -> PoolStatsError {
        PoolStatsError::SnapshotUnavailable(format!("connection pool error: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_poolstats())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_reg_maps_to_duplicate_registration() {
        let mapped: PoolStatsError = InfraError::from(PrometheusError::AlreadyReg).into();
        match mapped {
            PoolStatsError::DuplicateRegistration(msg) => assert!(msg.contains("already")),
            other => panic!("expected duplicate registration, got {:?}", other),
        }
    }

    #[test]
    fn cardinality_maps_to_invalid_configuration() {
        let err = PrometheusError::InconsistentCardinality { expect: 1, got: 2 };
        let mapped: PoolStatsError = InfraError::from(err).into();
        assert!(matches!(mapped, PoolStatsError::InvalidConfiguration(_)));
    }

    #[test]
    fn message_maps_to_exposition_error() {
        let err = PrometheusError::Msg("descriptor mismatch".into());
        let mapped: PoolStatsError = InfraError::from(err).into();
        assert_eq!(mapped, PoolStatsError::Exposition("descriptor mismatch".into()));
    }

    #[test]
    fn domain_error_round_trips_through_newtype() {
        let original = PoolStatsError::Internal("boom".into());
        let back: PoolStatsError = InfraError::from(original.clone()).into();
        assert_eq!(back, original);
    }
}
