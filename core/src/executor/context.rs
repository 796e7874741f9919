use crate::state::StateManager;

use super::cancel::CancelToken;

/// Run-scoped handles shared by every stage.
#[derive(Clone, Default)]
pub struct StageContext {
    pub cancel: CancelToken,
    /// Progress sink; stages run fine without one.
    pub state: Option<StateManager>,
}

impl StageContext {
    pub fn new(cancel: CancelToken, state: StateManager) -> Self {
        Self {
            cancel,
            state: Some(state),
        }
    }
}
