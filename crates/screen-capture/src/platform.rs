// Host platform capability interfaces
//
// The session never talks to a real device directly. Permission checks,
// the consent token, the projection it unlocks and the virtual display bound
// to the encoder surface are all reached through these traits.

use crate::error::CaptureResult;
use crate::geometry::Rect;
use crate::surface::Surface;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Runtime capabilities a recording needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    RecordAudio,
    WriteStorage,
}

pub const REQUIRED_CAPABILITIES: [Capability; 2] = [Capability::RecordAudio, Capability::WriteStorage];

/// Runtime permission system of the host
pub trait PermissionGate: Send {
    fn is_granted(&self, capability: Capability) -> bool;

    /// Ask the host for the given capabilities, true when all were granted
    fn request(&self, capabilities: &[Capability]) -> bool;

    fn missing(&self, capabilities: &[Capability]) -> Vec<Capability> {
        capabilities
            .iter()
            .copied()
            .filter(|capability| !self.is_granted(*capability))
            .collect()
    }
}

/// Result code of an accepted consent flow
pub const RESULT_OK: i32 = -1;
/// Result code of a cancelled consent flow
pub const RESULT_CANCELED: i32 = 0;

/// Opaque credential authorising screen mirroring for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentToken {
    grant: Uuid,
}

impl ConsentToken {
    pub fn issue() -> Self {
        Self { grant: Uuid::new_v4() }
    }

    pub fn grant_id(&self) -> Uuid {
        self.grant
    }
}

/// What the consent flow delivered back to the requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentResult {
    pub result_code: i32,
    pub token: Option<ConsentToken>,
}

impl ConsentResult {
    pub fn granted() -> Self {
        Self {
            result_code: RESULT_OK,
            token: Some(ConsentToken::issue()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            result_code: RESULT_CANCELED,
            token: None,
        }
    }

    /// The token, when the flow ended affirmatively
    pub fn into_token(self) -> Option<ConsentToken> {
        if self.result_code == RESULT_OK {
            self.token
        } else {
            None
        }
    }
}

/// Virtual display creation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayFlags(u32);

impl DisplayFlags {
    /// Mirror the real display's content
    pub const AUTO_MIRROR: DisplayFlags = DisplayFlags(1 << 4);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: DisplayFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Parameters of a virtual display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySpec {
    pub width: u32,
    pub height: u32,
    pub density: u32,
    pub flags: DisplayFlags,
    /// Part of the surface the mirrored screen renders into
    pub viewport: Rect,
}

/// Grants projections in exchange for consent tokens
pub trait CaptureProvider: Send {
    fn open_projection(&self, token: ConsentToken) -> CaptureResult<Box<dyn Projection>>;
}

/// A live screen projection; stopping it releases the consent token
pub trait Projection: Send {
    fn create_virtual_display(&mut self, spec: DisplaySpec, surface: &Surface) -> CaptureResult<Box<dyn VirtualDisplay>>;

    fn stop(&mut self) -> CaptureResult<()>;
}

/// Mirrored render target bound to an encoder surface
pub trait VirtualDisplay: Send {
    fn release(&mut self) -> CaptureResult<()>;
}
