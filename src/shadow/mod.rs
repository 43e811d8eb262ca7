// shadow/mod.rs
use async_trait::async_trait;
use metrics::counter;
use tracing::{error, info};

use crate::error::PanelError;
use crate::models::{LightState, ShadowDocument};

/// One request/response read of a thing's shadow document.
#[async_trait]
pub trait ShadowReader: Send + Sync {
    async fn get_shadow(&self, thing_name: &str) -> Result<ShadowDocument, PanelError>;
}

/// Initial panel state derived from the last-reported shadow value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialState {
    pub reported: LightState,
    pub desired: LightState,
}

/// Fetches the shadow once and derives the initial reported/desired pair.
/// A document without a `state.reported` branch is malformed.
pub async fn read_initial_state(
    reader: &dyn ShadowReader,
    thing_name: &str,
) -> Result<InitialState, PanelError> {
    let doc = reader.get_shadow(thing_name).await?;
    let reported = doc
        .reported_status()
        .ok_or_else(|| PanelError::MalformedShadow("missing state.reported".into()))?;
    info!(%reported, "Initial shadow state");
    Ok(InitialState {
        reported,
        desired: reported.inverse(),
    })
}

/// Same read, but with the source's failure semantics: errors are logged and
/// swallowed, leaving the panel in its pre-initialization state.
pub async fn try_read_initial_state(
    reader: &dyn ShadowReader,
    thing_name: &str,
) -> Option<InitialState> {
    match read_initial_state(reader, thing_name).await {
        Ok(initial) => Some(initial),
        Err(e) => {
            counter!("panel_snapshot_failures_total").increment(1);
            error!("Error getting device shadow: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LightStatus, ShadowState};

    struct FixedReader(Result<ShadowDocument, PanelError>);

    #[async_trait]
    impl ShadowReader for FixedReader {
        async fn get_shadow(&self, _thing_name: &str) -> Result<ShadowDocument, PanelError> {
            match &self.0 {
                Ok(doc) => Ok(doc.clone()),
                Err(_) => Err(PanelError::SnapshotRead("network".into())),
            }
        }
    }

    fn reported_doc(status: LightState) -> ShadowDocument {
        ShadowDocument {
            state: ShadowState {
                reported: Some(LightStatus { status }),
                desired: None,
            },
        }
    }

    #[tokio::test]
    async fn initial_desired_is_inverse_of_reported() {
        for reported in [LightState::On, LightState::Off] {
            let reader = FixedReader(Ok(reported_doc(reported)));
            let initial = read_initial_state(&reader, "lamp").await.unwrap();
            assert_eq!(initial.reported, reported);
            assert_eq!(initial.desired, reported.inverse());
        }
    }

    #[tokio::test]
    async fn missing_reported_branch_is_malformed() {
        let reader = FixedReader(Ok(ShadowDocument::default()));
        let err = read_initial_state(&reader, "lamp").await.unwrap_err();
        assert!(matches!(err, PanelError::MalformedShadow(_)));
    }

    #[tokio::test]
    async fn failed_read_is_swallowed() {
        let reader = FixedReader(Err(PanelError::SnapshotRead("network".into())));
        assert!(try_read_initial_state(&reader, "lamp").await.is_none());
    }
}
