//! Credential rotation: daily schedule, login collaborator seam, and the
//! stop/refresh/restart sequence over the feed pipeline.

pub mod error;
pub mod login;
pub mod rotator;
pub mod schedule;

pub use error::{RotationError, RotationResult};
pub use login::{FixedLoginProvider, LoginOutcome, LoginProvider};
pub use rotator::{CredentialRotator, RotationReport, RotatorConfig};
pub use schedule::{next_rotation, until_next_rotation};
