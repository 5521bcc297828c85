//! Errors surfaced by the advisor and the game session.
//!
//! Failures of the external move-generation service are recovered inside the
//! suggestion client and only ever appear here as [`CoachError::Service`] on
//! the backend seam. They never escape the move pipeline.

use crate::board::Move;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CoachError {
   /// Move text that is not UCI notation
   #[error("Invalid move format: {0}")]
   InvalidMove(String),

   #[error("Skill level must be between 1 and 10, got {0}")]
   InvalidSkillLevel(String),

   #[error("Hint level must be one of: basic, intermediate, advanced (got {0})")]
   InvalidHintLevel(String),

   #[error("Invalid position: {0}")]
   InvalidPosition(String),

   /// Well-formed, but not in the legal-move set
   #[error("Illegal move: {0}")]
   IllegalMove(Move),

   #[error("No legal moves available")]
   NoLegalMoves,

   #[error("It is not your turn")]
   OutOfTurn,

   #[error("Unable to generate hint: {0}")]
   GenerationFailed(String),

   #[error("Move generation service failed: {0}")]
   Service(String),
}

impl CoachError {
   /// Errors caused by the caller's input rather than by the advisor
   pub fn is_client_error(&self) -> bool {
      matches!(
         self,
         CoachError::InvalidMove(_)
            | CoachError::InvalidSkillLevel(_)
            | CoachError::InvalidHintLevel(_)
            | CoachError::InvalidPosition(_)
            | CoachError::IllegalMove(_)
            | CoachError::OutOfTurn
      )
   }
}

impl From<reqwest::Error> for CoachError {
   fn from(err: reqwest::Error) -> CoachError {
      CoachError::Service(err.to_string())
   }
}

pub type CoachResult<T> = Result<T, CoachError>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn client_errors_are_distinguished() {
      assert!(CoachError::OutOfTurn.is_client_error());
      assert!(CoachError::InvalidSkillLevel("11".into()).is_client_error());
      assert!(CoachError::IllegalMove("e2e5".parse().unwrap()).is_client_error());
      assert!(!CoachError::NoLegalMoves.is_client_error());
      assert!(!CoachError::GenerationFailed("empty".into()).is_client_error());
   }

   #[test]
   fn messages_name_the_problem() {
      assert_eq!(CoachError::IllegalMove("e2e5".parse().unwrap()).to_string(), "Illegal move: e2e5");
      assert_eq!(CoachError::NoLegalMoves.to_string(), "No legal moves available");
   }
}
