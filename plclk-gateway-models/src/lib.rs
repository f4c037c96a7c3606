pub mod constants;
pub mod platform;
pub mod proto;
pub mod settings;

pub use platform::{ClockId, ClockLocator, PlatformNode, PlatformTree, PropertyValue};
pub use proto::{
    read_frame, write_frame, ControlRequest, ControlResponse, FrameRead, Opcode, WireDecode,
    WireEncode, MAX_FRAME_LEN, READ_TEXT_CAP,
};
pub use settings::Settings;
