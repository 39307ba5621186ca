//! RTP/RAOP protocol implementation for AirPlay audio streaming

mod control;
mod packet;
pub mod packet_buffer;
pub mod raop;
pub mod raop_timing;
mod timing;

#[cfg(test)]
mod packet_tests;
#[cfg(test)]
mod wrapping_tests;

#[cfg(test)]
mod tests {
    #[path = "tests/control.rs"]
    mod control_tests;
    #[path = "tests/extra_packet.rs"]
    mod extra_packet_tests;
    #[path = "tests/packet.rs"]
    mod packet_tests;
    #[path = "tests/packet_buffer.rs"]
    mod packet_buffer_tests;
    #[path = "tests/packet_buffer_extra.rs"]
    mod packet_buffer_extra_tests;
    #[path = "tests/packet_extra.rs"]
    mod packet_extra_tests;
    #[path = "tests/packet_proptest.rs"]
    mod packet_proptest;
    #[path = "tests/raop.rs"]
    mod raop_tests;
    #[path = "tests/raop_timing.rs"]
    mod raop_timing_tests;
    #[path = "tests/timing.rs"]
    mod timing_tests;
}

pub use control::{ControlPacket, RetransmitRequest};
pub use packet::{PayloadType, RtpDecodeError, RtpHeader, RtpPacket};
pub use timing::{NtpTimestamp, TimingPacket, TimingRequest, TimingResponse};

/// RTP protocol constants for AirPlay
pub mod constants {
    /// Base RTP audio port searched during `SETUP` port allocation
    pub const AUDIO_PORT_BASE: u16 = 6000;

    /// Audio frames per RTP packet (352 samples at 44.1kHz ≈ 8ms)
    pub const FRAMES_PER_PACKET: usize = 352;

    /// Default audio sample rate
    pub const SAMPLE_RATE: u32 = 44100;

    /// Default audio channel count (stereo)
    pub const CHANNELS: u8 = 2;

    /// Default bits per sample
    pub const BITS_PER_SAMPLE: u8 = 16;
}
