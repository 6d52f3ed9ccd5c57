use crate::core::MoveOutcome;

pub struct GameRenderState {
    pub title: String,
    pub map: String,
    pub won: bool,
    pub error: Option<String>,
    pub last_change: Option<MoveOutcome>,
    /// Extra status shown below the controls, e.g. the generation being played.
    pub status: Option<String>,
}
