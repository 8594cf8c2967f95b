pub mod address_editor;
pub mod channel_control;
pub mod device_client;
pub mod session;

pub use address_editor::{AddressEditor, AddressError, EditorMode};
pub use channel_control::{
    ChannelControl, ChannelControlError, ChannelPhase, CommitOutcome, Release,
};
pub use device_client::{
    DeviceApi, DeviceClientError, HttpDeviceClient, DEFAULT_REQUEST_TIMEOUT,
};
pub use session::{describe_failure, SessionController, SessionOutcome, SessionView, SkipReason};

#[cfg(test)]
#[path = "tests/fake_device.rs"]
pub(crate) mod fake_device;
